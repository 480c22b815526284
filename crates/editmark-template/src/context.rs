//! Template formatting context.

use indexmap::IndexMap;

use crate::value::Value;

/// Named values available to templates and expressions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatContext {
    vars: IndexMap<String, Value>,
}

impl FormatContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from a JSON object.
    pub fn from_json_map(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        let vars = map
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.clone())))
            .collect();
        Self { vars }
    }

    /// Insert or replace a variable.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.vars.shift_remove(key)
    }

    /// Overlay another context, replacing existing keys.
    pub fn extend(&mut self, other: &FormatContext) {
        for (k, v) in &other.vars {
            self.vars.insert(k.clone(), v.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FormatContext {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut ctx = Self::new();
        for (k, v) in iter {
            ctx.insert(k, v);
        }
        ctx
    }
}
