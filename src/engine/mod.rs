// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Engine Contract
//!
//! Handlers and the auth pipeline reach wallet data only through
//! [`WalletEngine`]. The trait is object safe and shared as
//! `Arc<dyn WalletEngine>` in [`crate::state::AppState`].
//!
//! Lookups return `Ok(None)` for unknown records; `Err` is reserved for
//! backend failures and becomes a 500 at the HTTP boundary.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::ApiError;
use crate::filter::Conditions;
use crate::models::{AccessKeyRecord, AdminStats, TransactionCallback, UserRecord, UtxoRecord};
use crate::query::{Metadata, Page};

pub mod memory;

pub use memory::InMemoryEngine;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("engine backend failure: {0}")]
    Backend(String),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::internal(err.to_string())
    }
}

/// Inputs shared by every search/count call.
#[derive(Debug, Clone, Copy)]
pub struct SearchRequest<'a> {
    /// Restrict results to records owned by this xPub id.
    pub xpub_id: Option<&'a str>,
    pub metadata: &'a Metadata,
    pub conditions: &'a Conditions,
    pub page: &'a Page,
}

#[async_trait]
pub trait WalletEngine: Send + Sync {
    /// Access key by the hex SHA-256 of the key.
    async fn authenticate_access_key(
        &self,
        hashed_key: &str,
    ) -> Result<Option<AccessKeyRecord>, EngineError>;

    async fn get_user_by_xpub_id(&self, xpub_id: &str) -> Result<Option<UserRecord>, EngineError>;

    /// User by compressed public key hex.
    async fn get_user_by_pub_key(&self, pub_key: &str) -> Result<Option<UserRecord>, EngineError>;

    async fn search_access_keys(
        &self,
        request: SearchRequest<'_>,
    ) -> Result<Vec<AccessKeyRecord>, EngineError>;

    async fn count_access_keys(&self, request: SearchRequest<'_>) -> Result<u64, EngineError>;

    async fn search_utxos(&self, request: SearchRequest<'_>) -> Result<Vec<UtxoRecord>, EngineError>;

    async fn count_utxos(&self, request: SearchRequest<'_>) -> Result<u64, EngineError>;

    /// Merge `metadata` into the user's metadata. `null` values remove keys.
    async fn update_user_metadata(
        &self,
        xpub_id: &str,
        metadata: Metadata,
    ) -> Result<UserRecord, EngineError>;

    async fn admin_stats(&self) -> Result<AdminStats, EngineError>;

    async fn handle_transaction_callback(
        &self,
        callback: TransactionCallback,
    ) -> Result<(), EngineError>;
}
