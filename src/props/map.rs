//! Key/value props collection

use serde::Serialize;
use serde_json::{Map, Value};

use super::{Prop, Proper};

/// Plain props keyed by name, in insertion order.
///
/// Every entry becomes a filterable eager prop. Re-inserting a key replaces
/// its value but keeps its original position.
#[derive(Debug, Clone, Default)]
pub struct PropsMap(Map<String, Value>);

impl PropsMap {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Insert a value, encoding it eagerly.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Serialize) -> crate::Result<()> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|source| crate::InertiaError::Serialize {
            what: format!("prop {:?}", key),
            source,
        })?;
        self.0.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl From<Map<String, Value>> for PropsMap {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl Proper for PropsMap {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn into_props(self) -> Vec<Prop> {
        self.0.into_iter().map(|(k, v)| Prop::new(k, v)).collect()
    }
}
