// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Search parameters bound from the query string.
//!
//! A search request carries paging (`page`, `size`, `sort`, `sortBy`), the
//! fields of a filter `F`, and a free-form `metadata` map. Paging and the
//! filter are each read from the full decoded tree, so they share the
//! top-level namespace without knowing about each other.

use std::collections::BTreeMap;

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::de::{from_node, from_tree, BindError};
use super::decode::{decode_all, QueryNode};
use crate::error::ApiError;

pub const DEFAULT_PAGE_NUMBER: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_SORT_BY: &str = "created_at";

/// Free-form metadata filter.
pub type Metadata = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Paging options with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub number: u32,
    pub size: u32,
    pub sort: SortDirection,
    /// Backend column name (snake_case).
    pub sort_by: String,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: DEFAULT_PAGE_NUMBER,
            size: DEFAULT_PAGE_SIZE,
            sort: SortDirection::Desc,
            sort_by: DEFAULT_SORT_BY.to_string(),
        }
    }
}

impl Page {
    /// Number of records to skip.
    pub fn offset(&self) -> usize {
        (self.number.saturating_sub(1) as usize).saturating_mul(self.size as usize)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPage {
    page: Option<i64>,
    size: Option<i64>,
    sort: Option<String>,
    sort_by: Option<String>,
}

impl RawPage {
    fn into_page(self) -> Result<Page, BindError> {
        let mut page = Page::default();

        if let Some(number) = self.page.filter(|n| *n > 0) {
            page.number = u32::try_from(number).map_err(|_| BindError::new("page is too large"))?;
        }
        if let Some(size) = self.size.filter(|n| *n > 0) {
            page.size = u32::try_from(size)
                .unwrap_or(MAX_PAGE_SIZE)
                .min(MAX_PAGE_SIZE);
        }
        if let Some(sort) = self.sort.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            page.sort = match sort.to_ascii_lowercase().as_str() {
                "asc" => SortDirection::Asc,
                "desc" => SortDirection::Desc,
                other => return Err(BindError::new(format!("invalid sort direction '{other}'"))),
            };
        }
        if let Some(sort_by) = self.sort_by.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            page.sort_by = to_snake_case(sort_by);
        }

        Ok(page)
    }
}

/// Bound search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams<F> {
    pub page: Page,
    pub conditions: F,
    pub metadata: Metadata,
}

/// Decode and bind a raw query string.
pub fn parse_search_params<F: DeserializeOwned>(raw_query: &str) -> Result<SearchParams<F>, BindError> {
    let tree = decode_all(raw_query).map_err(|e| BindError::new(e.to_string()))?;

    let page = from_tree::<RawPage>(&tree)?.into_page()?;
    let conditions = from_tree::<F>(&tree)?;
    let metadata = match tree.get("metadata") {
        None => Metadata::new(),
        Some(node @ (QueryNode::Map(_) | QueryNode::Conflict { .. })) => {
            from_node::<Metadata>(node)?
        }
        Some(_) => return Err(BindError::new("metadata must be a map")),
    };

    Ok(SearchParams {
        page,
        conditions,
        metadata,
    })
}

/// `createdAt` -> `created_at`. Already snake_case input is unchanged.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Extractor binding [`SearchParams`] from the request URI.
///
/// Any decode or bind failure rejects with `CannotParseQueryParams`; the
/// cause is only logged.
pub struct SearchQuery<F>(pub SearchParams<F>);

impl<F, S> FromRequestParts<S> for SearchQuery<F>
where
    F: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts.uri.query().unwrap_or_default();
        parse_search_params(raw).map(SearchQuery).map_err(|e| {
            tracing::debug!(error = %e, "cannot bind search params");
            ApiError::CannotParseQueryParams
        })
    }
}
