// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API error taxonomy.
//!
//! Every failure that reaches a client is rendered by [`ApiError`]'s
//! `IntoResponse` implementation as a `{ "code", "message" }` envelope.
//! Middleware aborts the chain by returning the error as a response, handlers
//! return it through `Result`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Neither `x-auth-xpub` nor `x-auth-key` was presented.
    #[error("missing auth header")]
    MissingAuthHeader,
    /// Identity invalid, unknown or untrusted. Deliberately opaque.
    #[error("unauthorized")]
    Authorization,
    #[error("xpub provided is not an admin key")]
    NotAnAdminKey,
    #[error("cannot call user's endpoints with admin authorization")]
    AdminAuthOnUserEndpoint,
    #[error("missing signature")]
    MissingSignature,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("auth hash and body hash do not match")]
    AuthHashMismatch,
    #[error("signature has expired")]
    SignatureExpired,
    #[error("invalid or missing bearer token")]
    InvalidOrMissingToken,
    #[error("invalid authorization token")]
    InvalidToken,
    #[error("cannot bind request body")]
    CannotBindRequest,
    #[error("cannot parse request query params")]
    CannotParseQueryParams,
    #[error("invalid filter option: {0}")]
    InvalidFilterOption(String),
    #[error("request body is too large")]
    RequestBodyTooLarge,
    #[error("route not found")]
    RouteNotFound,
    #[error("method not allowed")]
    MethodNotAllowed,
    /// Unexpected failure. The detail is logged, never sent to the client.
    #[error("internal server error")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }

    /// Stable machine-readable code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingAuthHeader => "error-unauthorized-auth-header-missing",
            ApiError::Authorization => "error-unauthorized",
            ApiError::NotAnAdminKey => "error-unauthorized-xpub-not-an-admin-key",
            ApiError::AdminAuthOnUserEndpoint => "error-admin-auth-on-user-endpoint",
            ApiError::MissingSignature => "error-unauthorized-signature-missing",
            ApiError::InvalidSignature => "error-unauthorized-signature-invalid",
            ApiError::AuthHashMismatch => "error-unauthorized-auth-hash-mismatch",
            ApiError::SignatureExpired => "error-unauthorized-signature-expired",
            ApiError::InvalidOrMissingToken => "error-unauthorized-token-invalid-or-missing",
            ApiError::InvalidToken => "error-unauthorized-token-invalid",
            ApiError::CannotBindRequest => "error-bind-body-invalid",
            ApiError::CannotParseQueryParams => "error-query-params-invalid",
            ApiError::InvalidFilterOption(_) => "error-bind-invalid-filter-option",
            ApiError::RequestBodyTooLarge => "error-request-body-too-large",
            ApiError::RouteNotFound => "error-route-not-found",
            ApiError::MethodNotAllowed => "error-route-method-not-allowed",
            ApiError::Internal(_) => "error-internal-server-error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingAuthHeader
            | ApiError::Authorization
            | ApiError::NotAnAdminKey
            | ApiError::AdminAuthOnUserEndpoint
            | ApiError::MissingSignature
            | ApiError::InvalidSignature
            | ApiError::AuthHashMismatch
            | ApiError::SignatureExpired
            | ApiError::InvalidOrMissingToken
            | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::CannotBindRequest
            | ApiError::CannotParseQueryParams
            | ApiError::InvalidFilterOption(_) => StatusCode::BAD_REQUEST,
            ApiError::RequestBodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ApiError::Internal(detail) => {
                tracing::error!(code = self.code(), detail = %detail, "request failed");
            }
            _ if status == StatusCode::UNAUTHORIZED => {
                tracing::warn!(code = self.code(), "request rejected");
            }
            _ => tracing::debug!(code = self.code(), "request rejected"),
        }

        let body = Json(ErrorBody {
            code: self.code(),
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}
