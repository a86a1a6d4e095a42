// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed request verification.
//!
//! The signature envelope is carried in headers. The signed message is
//! `key ‖ authHash ‖ nonce ‖ authTime` where `key` is the xPub (or admin key)
//! or the access key the caller authenticated with. The body is buffered in
//! full to check `authHash`, then handed to the next layer unchanged.
//!
//! Check order: `x-auth-time` must parse, the signature must be present, the
//! body hash must match, the timestamp must be within the TTL, and finally
//! the signature must recover to the address of the identity key.

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use http_body_util::LengthLimitError;

use super::keys;
use super::{
    UserContext, HEADER_ACCESS_KEY, HEADER_AUTH_HASH, HEADER_AUTH_NONCE, HEADER_AUTH_SIGNATURE,
    HEADER_AUTH_TIME,
};
use crate::error::ApiError;
use crate::state::AppState;

/// Outcome of signature verification, stored in the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub verified: bool,
    /// Why verification failed, when it did.
    pub error: Option<ApiError>,
}

impl SignatureStatus {
    fn from_result(result: Result<(), ApiError>) -> Self {
        match result {
            Ok(()) => Self {
                verified: true,
                error: None,
            },
            Err(err) => Self {
                verified: false,
                error: Some(err),
            },
        }
    }
}

/// What the identity key is, which decides how its address is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningIdentity {
    /// Address of the child key derived from the nonce.
    XPub,
    /// Address of the compressed public key itself.
    AccessKey,
}

/// The signature envelope of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePayload {
    pub key: String,
    pub auth_hash: String,
    pub auth_nonce: String,
    pub auth_time: i64,
    pub body: String,
    pub signature: String,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or_default()
}

impl SignaturePayload {
    /// Read the envelope. A missing or non-numeric `x-auth-time` is an
    /// invalid signature.
    pub fn from_headers(headers: &HeaderMap, key: String, body: String) -> Result<Self, ApiError> {
        let auth_time = header_str(headers, HEADER_AUTH_TIME)
            .parse::<i64>()
            .map_err(|_| ApiError::InvalidSignature)?;

        Ok(Self {
            key,
            auth_hash: header_str(headers, HEADER_AUTH_HASH).to_string(),
            auth_nonce: header_str(headers, HEADER_AUTH_NONCE).to_string(),
            auth_time,
            body,
            signature: header_str(headers, HEADER_AUTH_SIGNATURE).to_string(),
        })
    }

    /// Envelope checks that need no cryptography.
    pub fn check_requirements(&self, ttl: Duration, now_millis: i64) -> Result<(), ApiError> {
        if self.signature.is_empty() {
            return Err(ApiError::MissingSignature);
        }
        if keys::body_hash(&self.body) != self.auth_hash {
            return Err(ApiError::AuthHashMismatch);
        }
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        if now_millis.saturating_sub(self.auth_time) > ttl_millis {
            return Err(ApiError::SignatureExpired);
        }
        Ok(())
    }

    pub fn signing_message(&self) -> String {
        format!(
            "{}{}{}{}",
            self.key, self.auth_hash, self.auth_nonce, self.auth_time
        )
    }

    /// Address the signature must recover to.
    pub fn signing_address(&self, identity: SigningIdentity) -> Result<String, keys::KeyError> {
        match identity {
            SigningIdentity::XPub => {
                let xpub = keys::decode_xpub(&self.key)?;
                Ok(keys::xpub_address(&keys::derive_from_nonce(&xpub, &self.auth_nonce)?))
            }
            SigningIdentity::AccessKey => keys::address_from_public_key_hex(&self.key),
        }
    }

    pub fn verify(&self, identity: SigningIdentity) -> Result<(), ApiError> {
        let address = self.signing_address(identity).map_err(|err| {
            tracing::debug!(error = %err, "cannot derive signing address");
            ApiError::InvalidSignature
        })?;
        keys::verify_message(&address, &self.signature, &self.signing_message()).map_err(|err| {
            tracing::debug!(error = %err, "signature does not verify");
            ApiError::InvalidSignature
        })
    }
}

/// Run every check on the envelope of one request.
pub fn verify_request(
    headers: &HeaderMap,
    identity: SigningIdentity,
    key: String,
    body: String,
    ttl: Duration,
    now_millis: i64,
) -> Result<(), ApiError> {
    let payload = SignaturePayload::from_headers(headers, key, body)?;
    payload.check_requirements(ttl, now_millis)?;
    payload.verify(identity)
}

/// Whether a body read failed on the size limit rather than on I/O.
fn exceeds_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return true;
        }
        source = err.source();
    }
    false
}

/// Signature check for API route groups. Runs after the auth middleware.
///
/// Failures abort the request for access-key callers and when signing is
/// required. Otherwise they are only recorded in [`SignatureStatus`].
pub async fn signature_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(context) = request.extensions().get::<UserContext>().cloned() else {
        return ApiError::internal("signature check ran without a user context").into_response();
    };

    let (mut parts, body) = request.into_parts();
    let bytes = match to_bytes(body, state.config.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(err) if exceeds_length_limit(&err) => {
            tracing::debug!(limit = state.config.max_body_bytes, "request body too large");
            return ApiError::RequestBodyTooLarge.into_response();
        }
        Err(err) => {
            return ApiError::internal(format!("cannot buffer request body: {err}")).into_response();
        }
    };

    let (identity, key) = match &context {
        UserContext::Admin => (SigningIdentity::XPub, state.config.admin_key.clone()),
        UserContext::XPubUser { xpub, .. } => (SigningIdentity::XPub, xpub.clone()),
        UserContext::AccessKeyUser { .. } => (
            SigningIdentity::AccessKey,
            header_str(&parts.headers, HEADER_ACCESS_KEY).to_string(),
        ),
    };

    let result = verify_request(
        &parts.headers,
        identity,
        key,
        String::from_utf8_lossy(&bytes).into_owned(),
        state.config.signature_ttl,
        Utc::now().timestamp_millis(),
    );

    let mandatory = matches!(context, UserContext::AccessKeyUser { .. })
        || (state.config.require_signing && !state.config.signing_disabled);
    if let Err(err) = &result {
        if mandatory {
            return err.clone().into_response();
        }
        tracing::debug!(code = err.code(), "unverified signature on optional route");
    }

    parts.extensions.insert(SignatureStatus::from_result(result));
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
