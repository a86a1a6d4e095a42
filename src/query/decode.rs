// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bracket-notation query-string decoder.
//!
//! Keys follow the grammar `base ( "[" segment "]" )*` where a segment is
//! empty (array push) or made of ASCII letters, digits and underscores.
//!
//! | Query | Tree |
//! |-------|------|
//! | `k=v&k=w` | `k: "v"` (first value wins) |
//! | `k[a][b]=v` | `k: { a: { b: "v" } }` |
//! | `k[]=v1&k[]=v2` | `k: ["v1", "v2"]` |
//! | `k[a][]=v1&k[a][]=v2` | `k: { a: ["v1", "v2"] }` |
//!
//! Malformed keys are skipped. An array segment followed by more nesting
//! fails the whole decode. A path that needs a map where a value or list
//! already sits leaves a [`QueryNode::Conflict`] behind, which only fails
//! once something reads that node as a map.

use std::collections::BTreeMap;

use thiserror::Error;

/// One node of the decoded tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryNode {
    Value(String),
    List(Vec<String>),
    Map(BTreeMap<String, QueryNode>),
    /// A value or list that a longer key tried to nest into. Reads as
    /// `terminal`; reading it as a map fails with `key`.
    Conflict {
        key: String,
        terminal: Box<QueryNode>,
    },
}

impl QueryNode {
    fn conflict(key: &str, terminal: QueryNode) -> Self {
        QueryNode::Conflict {
            key: key.to_string(),
            terminal: Box::new(terminal),
        }
    }
}

/// Top level of a decoded query string.
pub type QueryTree = BTreeMap<String, QueryNode>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unsupported array-like access to map key {0}")]
    ArrayLikeAccess(String),
    #[error("invalid access to map key {0}")]
    InvalidAccess(String),
}

/// Raw `key -> values` pairs grouped by key, values in order of appearance.
pub fn group_raw(raw_query: &str) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(raw_query.as_bytes()) {
        grouped
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    grouped
}

/// Decode every key of the query string.
pub fn decode_all(raw_query: &str) -> Result<QueryTree, DecodeError> {
    decode_grouped(&group_raw(raw_query), None)
}

/// Decode only the keys whose base is `top` and return the node under it.
///
/// `Ok(None)` means the key was not provided at all. A `top` that was given
/// as a plain value or as a top-level list cannot be read as a map and is an
/// error.
pub fn decode_key(raw_query: &str, top: &str) -> Result<Option<QueryNode>, DecodeError> {
    let mut tree = decode_grouped(&group_raw(raw_query), Some(top))?;
    match tree.remove(top) {
        None => Ok(None),
        Some(node @ QueryNode::Map(_)) => Ok(Some(node)),
        Some(QueryNode::Conflict { key, .. }) => Err(DecodeError::InvalidAccess(key)),
        Some(_) => Err(DecodeError::InvalidAccess(top.to_string())),
    }
}

pub(crate) fn decode_grouped(
    grouped: &BTreeMap<String, Vec<String>>,
    only: Option<&str>,
) -> Result<QueryTree, DecodeError> {
    let mut tree = QueryTree::new();

    for (raw_key, values) in grouped {
        let Some(first) = values.first() else {
            continue;
        };
        let Some((base, segments)) = parse_key(raw_key) else {
            tracing::debug!(key = %raw_key, "skipping malformed query key");
            continue;
        };
        if only.is_some_and(|top| top != base) {
            continue;
        }

        if let Some(pos) = segments.iter().position(|s| s.is_empty()) {
            if pos + 1 != segments.len() {
                return Err(DecodeError::ArrayLikeAccess(raw_key.clone()));
            }
        }

        let leaf = match segments.last() {
            Some(last) if last.is_empty() => QueryNode::List(values.clone()),
            _ => QueryNode::Value(first.clone()),
        };

        // Path of map keys; a trailing `[]` turns its parent into the list.
        let mut path: Vec<&str> = Vec::with_capacity(segments.len() + 1);
        path.push(base);
        path.extend(segments.iter().copied().filter(|s| !s.is_empty()));

        insert(&mut tree, &path, leaf, raw_key);
    }

    Ok(tree)
}

fn insert(level: &mut BTreeMap<String, QueryNode>, path: &[&str], leaf: QueryNode, raw_key: &str) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };

    if rest.is_empty() {
        match level.get_mut(*head) {
            None => {
                level.insert(head.to_string(), leaf);
            }
            Some(slot) => {
                if !matches!(slot, QueryNode::Conflict { .. }) {
                    // A map here was built by a longer key.
                    let terminal = match std::mem::replace(slot, QueryNode::Map(BTreeMap::new())) {
                        QueryNode::Map(_) => leaf,
                        occupant => occupant,
                    };
                    *slot = QueryNode::conflict(raw_key, terminal);
                }
            }
        }
        return;
    }

    let child = level
        .entry(head.to_string())
        .or_insert_with(|| QueryNode::Map(BTreeMap::new()));
    match child {
        QueryNode::Map(inner) => insert(inner, rest, leaf, raw_key),
        QueryNode::Conflict { .. } => {}
        QueryNode::Value(_) | QueryNode::List(_) => {
            let occupant = std::mem::replace(child, QueryNode::Map(BTreeMap::new()));
            *child = QueryNode::conflict(raw_key, occupant);
        }
    }
}

/// Split `base[a][b]` into `("base", ["a", "b"])`, `None` when malformed.
fn parse_key(key: &str) -> Option<(&str, Vec<&str>)> {
    let (base, mut rest) = match key.find('[') {
        Some(idx) => key.split_at(idx),
        None => (key, ""),
    };
    if base.is_empty() || base.contains(']') {
        return None;
    }

    let mut segments = Vec::new();
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let end = inner.find(']')?;
        let segment = &inner[..end];
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return None;
        }
        segments.push(segment);
        rest = &inner[end + 1..];
    }
    Some((base, segments))
}

/// Canonical flattening of a tree back into `(key, value)` pairs, sorted by
/// key. List items keep their order.
pub fn flatten(tree: &QueryTree) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, node) in tree {
        flatten_node(key.clone(), node, &mut pairs);
    }
    pairs
}

fn flatten_node(prefix: String, node: &QueryNode, out: &mut Vec<(String, String)>) {
    match node {
        QueryNode::Value(value) => out.push((prefix, value.clone())),
        QueryNode::List(items) => {
            let key = format!("{prefix}[]");
            out.extend(items.iter().map(|item| (key.clone(), item.clone())));
        }
        QueryNode::Map(children) => {
            for (key, child) in children {
                flatten_node(format!("{prefix}[{key}]"), child, out);
            }
        }
        QueryNode::Conflict { terminal, .. } => flatten_node(prefix, terminal, out),
    }
}
