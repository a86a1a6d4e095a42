// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Current-user endpoints.

use axum::{extract::State, routing::get, Json, Router};

use super::access_keys::search_page;
use super::BindJson;
use crate::auth::AsUser;
use crate::error::ApiError;
use crate::filter::AccessKeyFilter;
use crate::models::{AccessKeyRecord, CurrentUserResponse, PageModel, UpdateUserMetadataRequest};
use crate::query::SearchQuery;
use crate::state::AppState;

pub fn routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/users/current",
            get(get_current_user).patch(update_current_user),
        )
        .route("/users/current/keys", get(search_current_user_keys))
}

/// The caller's user record.
pub async fn get_current_user(AsUser(user): AsUser) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse::from(&user.record))
}

/// Merge metadata into the caller's record. `null` values remove keys.
pub async fn update_current_user(
    AsUser(user): AsUser,
    State(state): State<AppState>,
    BindJson(body): BindJson<UpdateUserMetadataRequest>,
) -> Result<Json<CurrentUserResponse>, ApiError> {
    let updated = state
        .engine
        .update_user_metadata(&user.xpub_id, body.metadata)
        .await?;
    Ok(Json(CurrentUserResponse::from(&updated)))
}

/// Access keys of the caller.
pub async fn search_current_user_keys(
    AsUser(user): AsUser,
    State(state): State<AppState>,
    SearchQuery(params): SearchQuery<AccessKeyFilter>,
) -> Result<Json<PageModel<AccessKeyRecord>>, ApiError> {
    search_page(&state, Some(&user.xpub_id), params).await.map(Json)
}
