// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! serde `Deserializer` over a decoded query tree.
//!
//! Query values are always text, so scalar targets (`bool`, integers,
//! floats, `char`) are parsed from their textual form. Struct fields are
//! matched by their serde name; keys without a matching field are ignored
//! unless the target denies unknown fields.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt::Display;

use serde::de::{
    self, value::BorrowedStrDeserializer, DeserializeSeed, Deserializer, MapAccess, SeqAccess,
    Visitor,
};
use serde::forward_to_deserialize_any;
use thiserror::Error;

use super::decode::{DecodeError, QueryNode, QueryTree};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BindError(String);

impl BindError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    fn invalid(raw: &str, err: impl Display) -> Self {
        Self(format!("invalid value '{raw}': {err}"))
    }
}

impl de::Error for BindError {
    fn custom<T: Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

/// Deserialize `T` from the whole tree, treated as a map.
pub fn from_tree<'de, T: de::Deserialize<'de>>(tree: &'de QueryTree) -> Result<T, BindError> {
    T::deserialize(MapDeserializer::new(tree))
}

/// Deserialize `T` from a single node.
pub fn from_node<'de, T: de::Deserialize<'de>>(node: &'de QueryNode) -> Result<T, BindError> {
    T::deserialize(NodeDeserializer { node })
}

struct MapDeserializer<'de> {
    iter: btree_map::Iter<'de, String, QueryNode>,
    pending: Option<&'de QueryNode>,
}

impl<'de> MapDeserializer<'de> {
    fn new(map: &'de BTreeMap<String, QueryNode>) -> Self {
        Self {
            iter: map.iter(),
            pending: None,
        }
    }
}

impl<'de> MapAccess<'de> for MapDeserializer<'de> {
    type Error = BindError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        match self.iter.next() {
            Some((key, node)) => {
                self.pending = Some(node);
                seed.deserialize(BorrowedStrDeserializer::new(key.as_str()))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Self::Error> {
        let node = self
            .pending
            .take()
            .ok_or_else(|| BindError::new("value requested before key"))?;
        seed.deserialize(NodeDeserializer { node })
    }
}

impl<'de> Deserializer<'de> for MapDeserializer<'de> {
    type Error = BindError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_map(self)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_some(self)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

struct ListDeserializer<'de> {
    iter: std::slice::Iter<'de, String>,
}

impl<'de> SeqAccess<'de> for ListDeserializer<'de> {
    type Error = BindError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Self::Error> {
        match self.iter.next() {
            Some(item) => seed.deserialize(ScalarDeserializer(item)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct NodeDeserializer<'de> {
    node: &'de QueryNode,
}

impl<'de> NodeDeserializer<'de> {
    fn scalar(&self) -> Result<ScalarDeserializer<'de>, BindError> {
        match self.node {
            QueryNode::Value(raw) => Ok(ScalarDeserializer(raw)),
            QueryNode::List(_) => Err(BindError::new("expected a single value, found a list")),
            QueryNode::Map(_) => Err(BindError::new("expected a single value, found a map")),
            QueryNode::Conflict { terminal, .. } => NodeDeserializer { node: terminal }.scalar(),
        }
    }
}

macro_rules! via_scalar {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
                self.scalar()?.$method(visitor)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for NodeDeserializer<'de> {
    type Error = BindError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.node {
            QueryNode::Value(raw) => visitor.visit_borrowed_str(raw),
            QueryNode::List(items) => visitor.visit_seq(ListDeserializer { iter: items.iter() }),
            QueryNode::Map(children) => visitor.visit_map(MapDeserializer::new(children)),
            QueryNode::Conflict { terminal, .. } => {
                NodeDeserializer { node: terminal }.deserialize_any(visitor)
            }
        }
    }

    via_scalar! {
        deserialize_bool deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
        deserialize_f32 deserialize_f64 deserialize_char
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.node {
            QueryNode::Value(raw) => visitor.visit_seq(ListDeserializer {
                iter: std::slice::from_ref(raw).iter(),
            }),
            QueryNode::List(items) => visitor.visit_seq(ListDeserializer { iter: items.iter() }),
            QueryNode::Map(_) => Err(BindError::new("expected a list, found a map")),
            QueryNode::Conflict { terminal, .. } => {
                NodeDeserializer { node: terminal }.deserialize_seq(visitor)
            }
        }
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.node {
            QueryNode::Map(children) => visitor.visit_map(MapDeserializer::new(children)),
            QueryNode::Conflict { key, .. } => {
                Err(BindError::new(DecodeError::InvalidAccess(key.clone()).to_string()))
            }
            _ => Err(BindError::new("expected a map")),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.scalar()?.deserialize_enum(name, variants, visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        i128 u128 str string bytes byte_buf unit unit_struct tuple tuple_struct identifier
    }
}

/// A single textual value.
struct ScalarDeserializer<'de>(&'de str);

macro_rules! parse_scalar {
    ($($method:ident => $visit:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
                let parsed = self
                    .0
                    .trim()
                    .parse::<$ty>()
                    .map_err(|e| BindError::invalid(self.0, e))?;
                visitor.$visit(parsed)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for ScalarDeserializer<'de> {
    type Error = BindError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_borrowed_str(self.0)
    }

    parse_scalar! {
        deserialize_bool => visit_bool: bool,
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_f32 => visit_f32: f32,
        deserialize_f64 => visit_f64: f64,
        deserialize_char => visit_char: char,
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        BorrowedStrDeserializer::<BindError>::new(self.0).deserialize_enum(name, variants, visitor)
    }

    forward_to_deserialize_any! {
        i128 u128 str string bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}
