// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::AppConfig;
use crate::engine::WalletEngine;

/// Read-only after startup; cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub engine: Arc<dyn WalletEngine>,
}

impl AppState {
    pub fn new(config: AppConfig, engine: Arc<dyn WalletEngine>) -> Self {
        Self {
            config: Arc::new(config),
            engine,
        }
    }
}
