// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Search Filters
//!
//! Typed filters bound from the query string and compiled into a
//! backend-agnostic [`Conditions`] map keyed by snake_case column names.
//!
//! Every filter embeds [`ModelFilter`], which is compiled first:
//!
//! - `includeDeleted` unset or false adds `deleted_at = null`
//! - non-empty `createdRange` / `updatedRange` add `created_at` / `updated_at`
//!   ranges rendered as `{"$gte": .., "$lte": ..}`
//!
//! Admin variants wrap the user filter and add an `xpub_id` scope.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

use crate::error::ApiError;
use crate::query::textual;

pub mod access_keys;
pub mod utxos;

pub use access_keys::{AccessKeyFilter, AdminAccessKeyFilter};
pub use utxos::{AdminUtxoFilter, UtxoFilter, UtxoType};

/// Unix timestamp of `0001-01-01T00:00:00Z`, the zero instant.
const ZERO_INSTANT_SECS: i64 = -62_135_596_800;

/// Compile a filter into backend conditions.
pub trait ToDbConditions {
    fn to_db_conditions(&self) -> Result<Conditions, ApiError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Text(String),
    Time(DateTime<Utc>),
}

impl Serialize for ConditionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConditionValue::Bool(v) => serializer.serialize_bool(*v),
            ConditionValue::Int(v) => serializer.serialize_i64(*v),
            ConditionValue::UInt(v) => serializer.serialize_u64(*v),
            ConditionValue::Text(v) => serializer.serialize_str(v),
            ConditionValue::Time(v) => v.serialize(serializer),
        }
    }
}

impl From<bool> for ConditionValue {
    fn from(v: bool) -> Self {
        ConditionValue::Bool(v)
    }
}

impl From<u32> for ConditionValue {
    fn from(v: u32) -> Self {
        ConditionValue::UInt(u64::from(v))
    }
}

impl From<u64> for ConditionValue {
    fn from(v: u64) -> Self {
        ConditionValue::UInt(v)
    }
}

impl From<i64> for ConditionValue {
    fn from(v: i64) -> Self {
        ConditionValue::Int(v)
    }
}

impl From<String> for ConditionValue {
    fn from(v: String) -> Self {
        ConditionValue::Text(v)
    }
}

impl From<DateTime<Utc>> for ConditionValue {
    fn from(v: DateTime<Utc>) -> Self {
        ConditionValue::Time(v)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Column must be null.
    IsNull,
    Equals(ConditionValue),
    /// Inclusive time range, at least one bound set.
    Range {
        gte: Option<DateTime<Utc>>,
        lte: Option<DateTime<Utc>>,
    },
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Condition::IsNull => serializer.serialize_none(),
            Condition::Equals(value) => value.serialize(serializer),
            Condition::Range { gte, lte } => {
                let len = usize::from(gte.is_some()) + usize::from(lte.is_some());
                let mut map = serializer.serialize_map(Some(len))?;
                if let Some(from) = gte {
                    map.serialize_entry("$gte", from)?;
                }
                if let Some(to) = lte {
                    map.serialize_entry("$lte", to)?;
                }
                map.end()
            }
        }
    }
}

/// Column name -> condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Conditions(BTreeMap<String, Condition>);

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, condition: Condition) {
        self.0.insert(column.into(), condition);
    }

    /// Add an equality condition when `value` is set.
    pub fn apply_if_some<T>(&mut self, column: &str, value: Option<&T>)
    where
        T: Clone + Into<ConditionValue>,
    {
        if let Some(value) = value {
            self.insert(column, Condition::Equals(value.clone().into()));
        }
    }

    /// Add a range condition when `range` has at least one usable bound.
    pub fn apply_range(&mut self, column: &str, range: Option<&TimeRange>) {
        if let Some(condition) = range.and_then(TimeRange::to_condition) {
            self.insert(column, condition);
        }
    }

    pub fn get(&self, column: &str) -> Option<&Condition> {
        self.0.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Inclusive time range. Nil and zero bounds are treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TimeRange {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    fn bound(value: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        value.filter(|t| !is_zero_instant(t))
    }

    pub fn is_empty(&self) -> bool {
        Self::bound(self.from).is_none() && Self::bound(self.to).is_none()
    }

    pub fn to_condition(&self) -> Option<Condition> {
        if self.is_empty() {
            return None;
        }
        Some(Condition::Range {
            gte: Self::bound(self.from),
            lte: Self::bound(self.to),
        })
    }
}

fn is_zero_instant(t: &DateTime<Utc>) -> bool {
    t.timestamp() == ZERO_INSTANT_SECS && t.timestamp_subsec_nanos() == 0
}

/// Fields shared by every filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelFilter {
    #[serde(default, deserialize_with = "textual::from_str_opt")]
    pub include_deleted: Option<bool>,
    #[serde(default)]
    pub created_range: Option<TimeRange>,
    #[serde(default)]
    pub updated_range: Option<TimeRange>,
}

impl ToDbConditions for ModelFilter {
    fn to_db_conditions(&self) -> Result<Conditions, ApiError> {
        let mut conditions = Conditions::new();
        if self.include_deleted != Some(true) {
            conditions.insert("deleted_at", Condition::IsNull);
        }
        conditions.apply_range("created_at", self.created_range.as_ref());
        conditions.apply_range("updated_at", self.updated_range.as_ref());
        Ok(conditions)
    }
}
