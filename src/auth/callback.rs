// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token check for the transaction callback route.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::ApiError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_MAC_KEY: &[u8] = b"spv-wallet-callback-token";

fn token_mac(token: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(TOKEN_MAC_KEY).ok()?;
    mac.update(token.as_bytes());
    Some(mac)
}

/// Constant-time comparison over fixed-length MACs of both tokens.
fn tokens_match(expected: &str, presented: &str) -> bool {
    match (token_mac(expected), token_mac(presented)) {
        (Some(expected), Some(presented)) => presented
            .verify_slice(&expected.finalize().into_bytes())
            .is_ok(),
        _ => false,
    }
}

/// Compare the `Authorization: Bearer` token against `expected`.
///
/// A missing header or a non-bearer scheme is `InvalidOrMissingToken`; a
/// wrong token is `InvalidToken`. With no configured token every request is
/// rejected.
pub fn check_callback_token(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::InvalidOrMissingToken)?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::InvalidOrMissingToken)?;

    match expected {
        Some(expected) if tokens_match(expected, token) => Ok(()),
        Some(_) => Err(ApiError::InvalidToken),
        None => {
            tracing::warn!("callback request received but no callback token is configured");
            Err(ApiError::InvalidToken)
        }
    }
}

pub async fn callback_token_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match check_callback_token(request.headers(), state.config.callback_token.as_deref()) {
        Ok(()) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}
