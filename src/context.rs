//! The immutable attribute record carried by every node.
//!
//! A child's context is its parent's context merged with whatever the
//! declaration or the loader supplied for that child. Keys supplied for the
//! child win on collision.

use std::collections::BTreeMap;
use std::ops::Index;
use std::sync::Arc;

use serde::de::DeserializeOwned;

pub use serde_json::Value;

/// Attribute name → value mapping.
///
/// Cloning is cheap (shared storage). Builder methods copy on write, so a
/// `Context` that has been handed to a node is never observed changing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Context {
    attrs: Arc<BTreeMap<String, Value>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set `key` and return self.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Arc::make_mut(&mut self.attrs).insert(key.into(), value.into());
        self
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// Deserialize the attribute stored under `key` into `T`.
    ///
    /// Returns `None` when the key is absent, `Some(Err(_))` when the stored
    /// value does not have the shape of `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<Result<T, serde_json::Error>> {
        self.attrs.get(key).map(|value| T::deserialize(value))
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge `extra` over `self`. Keys in `extra` win.
    pub fn merged(&self, extra: &Context) -> Context {
        if extra.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return extra.clone();
        }
        let mut attrs = (*self.attrs).clone();
        attrs.extend(extra.iter().map(|(k, v)| (k.to_string(), v.clone())));
        Context {
            attrs: Arc::new(attrs),
        }
    }

    /// Required keys that are not present, in declaration order.
    pub fn missing<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|key| !self.contains(key))
            .map(|key| key.as_str())
            .collect()
    }
}

impl Index<&str> for Context {
    type Output = Value;

    /// # Panics
    ///
    /// Panics if `key` is not present.
    fn index(&self, key: &str) -> &Value {
        match self.attrs.get(key) {
            Some(value) => value,
            None => panic!("context has no attribute '{key}'"),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Context {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self {
            attrs: Arc::new(iter.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }
}

impl From<serde_json::Map<String, Value>> for Context {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}
