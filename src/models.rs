// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Records returned by the wallet engine and the request/response bodies of
//! the REST API. JSON field names are camelCase.
//!
//! ## Model Categories
//!
//! - **Users**: xPub records, looked up by xPub id or public key
//! - **Access keys**: credentials bound to an xPub, identified by key hash
//! - **UTXOs**: unspent outputs owned by an xPub
//! - **Paging**: the `{ content, page }` envelope of every list response

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::UtxoType;
use crate::query::{Metadata, Page};

// =============================================================================
// Users
// =============================================================================

/// A wallet user, keyed by the hash of its xPub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Hex SHA-256 of the xPub string.
    pub id: String,
    /// Compressed public key of the xPub, hex encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    pub current_balance: u64,
    pub next_internal_num: u32,
    pub next_external_num: u32,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Body of `PATCH /users/current`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserMetadataRequest {
    #[serde(default)]
    pub metadata: Metadata,
}

/// Response of `GET /v1/xpub` and the v2 current-user endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    pub current_balance: u64,
    pub metadata: Metadata,
}

impl From<&UserRecord> for CurrentUserResponse {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id.clone(),
            public_key: record.public_key.clone(),
            current_balance: record.current_balance,
            metadata: record.metadata.clone(),
        }
    }
}

// =============================================================================
// Access Keys
// =============================================================================

/// An access key bound to an xPub.
///
/// Only the hash of the key is stored; `key` is the public key and is kept
/// so clients can list what they registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeyRecord {
    /// Hex SHA-256 of the access key.
    pub id: String,
    pub xpub_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl AccessKeyRecord {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

// =============================================================================
// UTXOs
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoRecord {
    /// Hex SHA-256 of `<txid>|<vout>`.
    pub id: String,
    pub xpub_id: String,
    pub transaction_id: String,
    pub output_index: u32,
    pub satoshis: u64,
    pub script_pub_key: String,
    #[serde(rename = "type")]
    pub utxo_type: UtxoType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spending_tx_id: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Admin
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub users: u64,
    pub access_keys: u64,
    pub utxos: u64,
    pub balance: u64,
}

// =============================================================================
// Transaction Callback
// =============================================================================

/// Broadcast status pushed by the transaction processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCallback {
    pub txid: String,
    pub tx_status: String,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub block_height: Option<u64>,
    #[serde(default)]
    pub merkle_path: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub competing_txs: Vec<String>,
    #[serde(default)]
    pub extra_info: Option<String>,
}

// =============================================================================
// Paging
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDescription {
    pub number: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

/// List response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageModel<T> {
    pub content: Vec<T>,
    pub page: PageDescription,
}

impl<T> PageModel<T> {
    pub fn new(content: Vec<T>, page: &Page, total_elements: u64) -> Self {
        let size = u64::from(page.size.max(1));
        Self {
            content,
            page: PageDescription {
                number: page.number,
                size: page.size,
                total_elements,
                total_pages: total_elements.div_ceil(size),
            },
        }
    }
}
