//! String-keyed tag trees used by the persistence hooks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One value in a tag tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TagValue {
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Text(String),
    List(Vec<TagValue>),
    Compound(TagCompound),
}

/// Ordered map of named tag values. BTreeMap keeps serialized output stable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TagCompound(BTreeMap<String, TagValue>);

impl TagCompound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn put(&mut self, key: impl Into<String>, value: TagValue) {
        self.0.insert(key.into(), value);
    }

    pub fn put_bool(&mut self, key: impl Into<String>, v: bool) {
        self.put(key, TagValue::Bool(v));
    }

    pub fn put_int(&mut self, key: impl Into<String>, v: i32) {
        self.put(key, TagValue::Int(v));
    }

    pub fn put_long(&mut self, key: impl Into<String>, v: i64) {
        self.put(key, TagValue::Long(v));
    }

    pub fn put_float(&mut self, key: impl Into<String>, v: f32) {
        self.put(key, TagValue::Float(v));
    }

    pub fn put_double(&mut self, key: impl Into<String>, v: f64) {
        self.put(key, TagValue::Double(v));
    }

    pub fn put_text(&mut self, key: impl Into<String>, v: impl Into<String>) {
        self.put(key, TagValue::Text(v.into()));
    }

    pub fn put_compound(&mut self, key: impl Into<String>, v: TagCompound) {
        self.put(key, TagValue::Compound(v));
    }

    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.0.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key) {
            Some(TagValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.get(key) {
            Some(TagValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_long(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            Some(TagValue::Long(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.get(key) {
            Some(TagValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_double(&self, key: &str) -> Option<f64> {
        match self.get(key) {
            Some(TagValue::Double(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(TagValue::Text(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn get_compound(&self, key: &str) -> Option<&TagCompound> {
        match self.get(key) {
            Some(TagValue::Compound(v)) => Some(v),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TagValue)> {
        self.0.iter()
    }
}
