// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Auth middleware: header classification and user lookup.
//!
//! ```text
//! x-auth-xpub == admin key        -> Admin
//! x-auth-xpub set                 -> XPubUser (validated, looked up by id or public key)
//! x-auth-key set                  -> AccessKeyUser (looked up by key hash)
//! neither                         -> missing auth header
//! ```
//!
//! When both headers are present the xPub wins.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::keys::{self, hash_hex};
use super::{UserContext, HEADER_ACCESS_KEY, HEADER_XPUB};
use crate::error::ApiError;
use crate::state::AppState;

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Resolve the caller from request headers.
pub async fn resolve_user_context(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<UserContext, ApiError> {
    if let Some(xpub) = header_value(headers, HEADER_XPUB) {
        if xpub == state.config.admin_key {
            tracing::debug!("admin key presented");
            return Ok(UserContext::Admin);
        }
        return resolve_xpub(state, xpub).await;
    }

    if let Some(access_key) = header_value(headers, HEADER_ACCESS_KEY) {
        return resolve_access_key(state, access_key).await;
    }

    Err(ApiError::MissingAuthHeader)
}

async fn resolve_xpub(state: &AppState, xpub: &str) -> Result<UserContext, ApiError> {
    let key = keys::parse_xpub(xpub).map_err(|err| {
        tracing::debug!(error = %err, "invalid xpub presented");
        ApiError::Authorization
    })?;

    let xpub_id = hash_hex(xpub);
    let record = if state.config.new_transaction_flow_enabled {
        state.engine.get_user_by_pub_key(&keys::public_key_hex(&key)).await?
    } else {
        state.engine.get_user_by_xpub_id(&xpub_id).await?
    };
    let record = record.ok_or_else(|| {
        tracing::debug!("unknown xpub presented");
        ApiError::Authorization
    })?;

    Ok(UserContext::XPubUser {
        xpub: xpub.to_string(),
        xpub_id: record.id.clone(),
        record,
    })
}

async fn resolve_access_key(state: &AppState, access_key: &str) -> Result<UserContext, ApiError> {
    if state.config.new_transaction_flow_enabled {
        tracing::debug!("access key presented while access keys are disabled");
        return Err(ApiError::Authorization);
    }

    let key = state
        .engine
        .authenticate_access_key(&hash_hex(access_key))
        .await?
        .filter(|k| !k.is_revoked() && k.deleted_at.is_none())
        .ok_or_else(|| {
            tracing::debug!("unknown or revoked access key presented");
            ApiError::Authorization
        })?;

    let record = state
        .engine
        .get_user_by_xpub_id(&key.xpub_id)
        .await?
        .ok_or(ApiError::Authorization)?;

    Ok(UserContext::AccessKeyUser {
        xpub_id: key.xpub_id,
        record,
    })
}

/// Classify the caller and store the [`UserContext`] for later layers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_user_context(&state, request.headers()).await {
        Ok(context) => {
            tracing::debug!(auth_type = ?context.auth_type(), "caller authenticated");
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::auth::AuthType;
    use bitcoin::bip32::{Xpriv, Xpub};
    use bitcoin::NetworkKind;
    use crate::config::AppConfig;
    use crate::engine::InMemoryEngine;
    use crate::query::Metadata;

    fn root_xpub(seed: u8) -> String {
        let xpriv = Xpriv::new_master(NetworkKind::Main, &[seed; 32]).unwrap();
        Xpub::from_priv(keys::secp(), &xpriv).to_string()
    }

    struct Fixture {
        state: AppState,
        engine: Arc<InMemoryEngine>,
        admin_key: String,
        user_xpub: String,
    }

    async fn fixture(new_flow: bool) -> Fixture {
        let admin_key = root_xpub(10u8);
        let user_xpub = root_xpub(11u8);

        let mut config = AppConfig::with_admin_key(admin_key.clone());
        config.new_transaction_flow_enabled = new_flow;
        let engine = Arc::new(InMemoryEngine::new());
        engine.insert_user(&user_xpub, Metadata::new()).await;

        Fixture {
            state: AppState::new(config, engine.clone()),
            engine,
            admin_key,
            user_xpub,
        }
    }

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                value.parse().unwrap(),
            );
        }
        headers
    }

    #[tokio::test]
    async fn no_headers_is_missing_auth_header() {
        let f = fixture(false).await;
        let result = resolve_user_context(&f.state, &HeaderMap::new()).await;
        assert_eq!(result, Err(ApiError::MissingAuthHeader));
    }

    #[tokio::test]
    async fn admin_key_resolves_to_admin() {
        let f = fixture(false).await;
        let ctx = resolve_user_context(&f.state, &headers(&[(HEADER_XPUB, &f.admin_key)]))
            .await
            .unwrap();
        assert_eq!(ctx, UserContext::Admin);
    }

    #[tokio::test]
    async fn known_xpub_resolves_to_user() {
        let f = fixture(false).await;
        let ctx = resolve_user_context(&f.state, &headers(&[(HEADER_XPUB, &f.user_xpub)]))
            .await
            .unwrap();
        assert_eq!(ctx.auth_type(), AuthType::XPub);
        assert_eq!(ctx.xpub_id(), Some(hash_hex(&f.user_xpub).as_str()));
    }

    #[tokio::test]
    async fn invalid_and_unknown_xpubs_are_opaque() {
        let f = fixture(false).await;
        let unknown = root_xpub(12u8);
        for xpub in ["not-an-xpub", unknown.as_str()] {
            let result = resolve_user_context(&f.state, &headers(&[(HEADER_XPUB, xpub)])).await;
            assert_eq!(result, Err(ApiError::Authorization));
        }
    }

    #[tokio::test]
    async fn access_key_resolves_and_revocation_rejects() {
        let f = fixture(false).await;
        let xpub_id = hash_hex(&f.user_xpub);
        let record = f.engine.insert_access_key(&xpub_id, "02abcdef").await;

        let ctx = resolve_user_context(&f.state, &headers(&[(HEADER_ACCESS_KEY, "02abcdef")]))
            .await
            .unwrap();
        assert_eq!(ctx.auth_type(), AuthType::AccessKey);
        assert_eq!(ctx.xpub(), None);

        f.engine.revoke_access_key(&record.id).await.unwrap();
        let result =
            resolve_user_context(&f.state, &headers(&[(HEADER_ACCESS_KEY, "02abcdef")])).await;
        assert_eq!(result, Err(ApiError::Authorization));
    }

    #[tokio::test]
    async fn xpub_wins_over_access_key() {
        let f = fixture(false).await;
        let ctx = resolve_user_context(
            &f.state,
            &headers(&[(HEADER_XPUB, &f.user_xpub), (HEADER_ACCESS_KEY, "02abcdef")]),
        )
        .await
        .unwrap();
        assert_eq!(ctx.auth_type(), AuthType::XPub);
    }

    #[tokio::test]
    async fn new_flow_looks_up_by_public_key_and_disables_access_keys() {
        let f = fixture(true).await;
        let xpub_id = hash_hex(&f.user_xpub);
        f.engine.insert_access_key(&xpub_id, "02abcdef").await;

        let ctx = resolve_user_context(&f.state, &headers(&[(HEADER_XPUB, &f.user_xpub)]))
            .await
            .unwrap();
        assert_eq!(ctx.xpub_id(), Some(xpub_id.as_str()));

        let result =
            resolve_user_context(&f.state, &headers(&[(HEADER_ACCESS_KEY, "02abcdef")])).await;
        assert_eq!(result, Err(ApiError::Authorization));
    }
}
