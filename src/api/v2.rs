// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Endpoints of the new transaction flow, mounted under `/api/v2` only when
//! the flow is enabled. Users are identified by xPub only.

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::auth::AsUser;
use crate::state::AppState;

pub fn routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/users/current", get(get_current_user))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfoResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    pub current_balance: u64,
}

pub async fn get_current_user(AsUser(user): AsUser) -> Json<UserInfoResponse> {
    Json(UserInfoResponse {
        id: user.xpub_id,
        public_key: user.record.public_key,
        current_balance: user.record.current_balance,
    })
}
