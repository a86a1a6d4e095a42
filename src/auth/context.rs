// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller identity resolved once per request.

use serde::Serialize;

use crate::models::UserRecord;

/// How the caller authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    Admin,
    XPub,
    AccessKey,
}

/// The authenticated caller.
///
/// Built by the auth middleware and read-only afterwards. `Admin` carries no
/// key material and `AccessKeyUser` never carries the raw xPub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserContext {
    Admin,
    XPubUser {
        xpub: String,
        xpub_id: String,
        record: UserRecord,
    },
    AccessKeyUser {
        xpub_id: String,
        record: UserRecord,
    },
}

impl UserContext {
    pub fn auth_type(&self) -> AuthType {
        match self {
            UserContext::Admin => AuthType::Admin,
            UserContext::XPubUser { .. } => AuthType::XPub,
            UserContext::AccessKeyUser { .. } => AuthType::AccessKey,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserContext::Admin)
    }

    pub fn xpub_id(&self) -> Option<&str> {
        match self {
            UserContext::Admin => None,
            UserContext::XPubUser { xpub_id, .. } | UserContext::AccessKeyUser { xpub_id, .. } => {
                Some(xpub_id)
            }
        }
    }

    /// The raw xPub, only known when the caller presented it.
    pub fn xpub(&self) -> Option<&str> {
        match self {
            UserContext::XPubUser { xpub, .. } => Some(xpub),
            _ => None,
        }
    }

    pub fn record(&self) -> Option<&UserRecord> {
        match self {
            UserContext::Admin => None,
            UserContext::XPubUser { record, .. } | UserContext::AccessKeyUser { record, .. } => {
                Some(record)
            }
        }
    }
}

/// A non-admin caller, as handed to user endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub xpub_id: String,
    pub xpub: Option<String>,
    pub auth_type: AuthType,
    pub record: UserRecord,
}

impl UserIdentity {
    /// `None` for admins.
    pub fn from_context(context: &UserContext) -> Option<Self> {
        match context {
            UserContext::Admin => None,
            UserContext::XPubUser {
                xpub,
                xpub_id,
                record,
            } => Some(Self {
                xpub_id: xpub_id.clone(),
                xpub: Some(xpub.clone()),
                auth_type: AuthType::XPub,
                record: record.clone(),
            }),
            UserContext::AccessKeyUser { xpub_id, record } => Some(Self {
                xpub_id: xpub_id.clone(),
                xpub: None,
                auth_type: AuthType::AccessKey,
                record: record.clone(),
            }),
        }
    }
}
