// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON body extractor rejecting with `error-bind-body-invalid`.
pub struct BindJson<T>(pub T);

impl<T, S> FromRequest<S> for BindJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(BindJson(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "cannot bind request body");
                Err(ApiError::CannotBindRequest)
            }
        }
    }
}
