// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audience extractors.
//!
//! A handler declares who may call it through its argument type:
//!
//! ```rust,ignore
//! async fn current_user(AsUser(user): AsUser) -> Json<CurrentUserResponse> { ... }
//! async fn status(_admin: AsAdmin) -> Json<bool> { ... }
//! async fn keys(AsAdminOrUser(ctx): AsAdminOrUser) -> ... { ... }
//! ```
//!
//! Handlers never inspect the auth type themselves.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::context::UserIdentity;
use super::{SignatureStatus, UserContext};
use crate::error::ApiError;
use crate::state::AppState;

fn user_context(parts: &Parts) -> Result<UserContext, ApiError> {
    parts
        .extensions
        .get::<UserContext>()
        .cloned()
        .ok_or(ApiError::MissingAuthHeader)
}

/// Any caller except the admin.
pub struct AsUser(pub UserIdentity);

impl FromRequestParts<AppState> for AsUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        let context = user_context(parts)?;
        UserIdentity::from_context(&context)
            .map(AsUser)
            .ok_or(ApiError::AdminAuthOnUserEndpoint)
    }
}

/// The admin only. Unless signing is disabled the admin's request must carry
/// a valid signature.
pub struct AsAdmin;

impl FromRequestParts<AppState> for AsAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !user_context(parts)?.is_admin() {
            return Err(ApiError::NotAnAdminKey);
        }
        if state.config.signing_disabled {
            return Ok(AsAdmin);
        }

        match parts.extensions.get::<SignatureStatus>() {
            Some(status) if status.verified => Ok(AsAdmin),
            Some(status) => Err(status.error.clone().unwrap_or(ApiError::InvalidSignature)),
            None => Err(ApiError::InvalidSignature),
        }
    }
}

/// Admin or user.
pub struct AsAdminOrUser(pub UserContext);

impl FromRequestParts<AppState> for AsAdminOrUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let context = user_context(parts)?;
        if context.is_admin() {
            AsAdmin::from_request_parts(parts, state).await?;
        }
        Ok(AsAdminOrUser(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::Request;
    use chrono::Utc;

    use crate::config::AppConfig;
    use crate::engine::InMemoryEngine;
    use crate::models::UserRecord;

    fn state(signing_disabled: bool) -> AppState {
        let mut config = AppConfig::with_admin_key("admin");
        config.signing_disabled = signing_disabled;
        AppState::new(config, Arc::new(InMemoryEngine::new()))
    }

    fn parts_with(context: Option<UserContext>, status: Option<SignatureStatus>) -> Parts {
        let mut parts = Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        if let Some(context) = context {
            parts.extensions.insert(context);
        }
        if let Some(status) = status {
            parts.extensions.insert(status);
        }
        parts
    }

    fn xpub_user() -> UserContext {
        let now = Utc::now();
        UserContext::XPubUser {
            xpub: "xpub".into(),
            xpub_id: "id".into(),
            record: UserRecord {
                id: "id".into(),
                public_key: None,
                current_balance: 0,
                next_internal_num: 0,
                next_external_num: 0,
                metadata: Default::default(),
                created_at: now,
                updated_at: now,
                deleted_at: None,
            },
        }
    }

    fn verified() -> SignatureStatus {
        SignatureStatus {
            verified: true,
            error: None,
        }
    }

    #[tokio::test]
    async fn as_user_rejects_admin() {
        let mut parts = parts_with(Some(UserContext::Admin), Some(verified()));
        let result = AsUser::from_request_parts(&mut parts, &state(false)).await;
        assert!(matches!(result, Err(ApiError::AdminAuthOnUserEndpoint)));
    }

    #[tokio::test]
    async fn as_user_accepts_user() {
        let mut parts = parts_with(Some(xpub_user()), None);
        let AsUser(user) = AsUser::from_request_parts(&mut parts, &state(false))
            .await
            .unwrap();
        assert_eq!(user.xpub_id, "id");
    }

    #[tokio::test]
    async fn as_admin_rejects_user() {
        let mut parts = parts_with(Some(xpub_user()), Some(verified()));
        let result = AsAdmin::from_request_parts(&mut parts, &state(false)).await;
        assert!(matches!(result, Err(ApiError::NotAnAdminKey)));
    }

    #[tokio::test]
    async fn as_admin_requires_verified_signature() {
        let unverified = SignatureStatus {
            verified: false,
            error: Some(ApiError::SignatureExpired),
        };
        let mut parts = parts_with(Some(UserContext::Admin), Some(unverified.clone()));
        let result = AsAdmin::from_request_parts(&mut parts, &state(false)).await;
        assert!(matches!(result, Err(ApiError::SignatureExpired)));

        let mut parts = parts_with(Some(UserContext::Admin), Some(unverified));
        assert!(AsAdmin::from_request_parts(&mut parts, &state(true)).await.is_ok());

        let mut parts = parts_with(Some(UserContext::Admin), Some(verified()));
        assert!(AsAdmin::from_request_parts(&mut parts, &state(false)).await.is_ok());
    }

    #[tokio::test]
    async fn missing_context_is_missing_auth_header() {
        let mut parts = parts_with(None, None);
        let result = AsAdminOrUser::from_request_parts(&mut parts, &state(false)).await;
        assert!(matches!(result, Err(ApiError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn as_admin_or_user_accepts_both() {
        let mut parts = parts_with(Some(xpub_user()), None);
        assert!(AsAdminOrUser::from_request_parts(&mut parts, &state(false)).await.is_ok());

        let mut parts = parts_with(Some(UserContext::Admin), Some(verified()));
        let AsAdminOrUser(ctx) = AsAdminOrUser::from_request_parts(&mut parts, &state(false))
            .await
            .unwrap();
        assert!(ctx.is_admin());
    }
}
