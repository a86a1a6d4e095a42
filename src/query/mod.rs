// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Query Binding
//!
//! Search endpoints accept nested bracket-notation query strings:
//!
//! ```text
//! GET /api/v1/access-keys?createdRange[from]=2024-02-26T11:01:28Z&size=5&metadata[app]=pos
//! ```
//!
//! - [`decode`] turns the raw query into a [`QueryTree`]
//! - [`de`] is a serde `Deserializer` over that tree
//! - [`bind`] produces [`SearchParams<F>`] and the [`SearchQuery`] extractor

pub mod bind;
pub mod de;
pub mod decode;
pub mod textual;

pub use bind::{
    parse_search_params, Metadata, Page, SearchParams, SearchQuery, SortDirection,
};
pub use de::BindError;
pub use decode::{decode_all, decode_key, DecodeError, QueryNode, QueryTree};
