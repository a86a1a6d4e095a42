// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Field helper for scalars that arrive as text.
//!
//! `#[serde(flatten)]` buffers values before the inner struct sees them, so a
//! flattened `Option<bool>` receives the string `"true"` rather than a call to
//! `deserialize_bool`. Fields that may sit behind a flatten use
//! `#[serde(default, deserialize_with = "crate::query::textual::from_str_opt")]`.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};

pub fn from_str_opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    deserializer.deserialize_option(TextualVisitor(PhantomData))
}

struct TextualVisitor<T>(PhantomData<T>);

impl<'de, T> Visitor<'de> for TextualVisitor<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    type Value = Option<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar or its textual form")
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        let v = v.trim();
        if v.is_empty() {
            return Ok(None);
        }
        v.parse::<T>()
            .map(Some)
            .map_err(|e| E::custom(format!("invalid value '{v}': {e}")))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        self.visit_str(&v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        self.visit_str(&v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        self.visit_str(&v.to_string())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        self.visit_str(&v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Inner {
        #[serde(default, deserialize_with = "super::from_str_opt")]
        include_deleted: Option<bool>,
        #[serde(default, deserialize_with = "super::from_str_opt")]
        output_index: Option<u32>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Outer {
        #[serde(flatten)]
        inner: Inner,
    }

    #[test]
    fn flattened_text_scalars_parse() {
        let tree = crate::query::decode::decode_all("includeDeleted=true&outputIndex=7").unwrap();
        let outer: Outer = crate::query::de::from_tree(&tree).unwrap();
        assert_eq!(outer.inner.include_deleted, Some(true));
        assert_eq!(outer.inner.output_index, Some(7));
    }

    #[test]
    fn json_numbers_are_accepted_too() {
        let outer: Outer =
            serde_json::from_str(r#"{"includeDeleted":false,"outputIndex":3}"#).unwrap();
        assert_eq!(outer.inner.include_deleted, Some(false));
        assert_eq!(outer.inner.output_index, Some(3));
    }

    #[test]
    fn garbage_fails() {
        let tree = crate::query::decode::decode_all("outputIndex=x").unwrap();
        assert!(crate::query::de::from_tree::<Outer>(&tree).is_err());
    }
}
