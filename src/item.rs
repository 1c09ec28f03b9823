//! Item - one exposure's metadata record
//!
//! An [`Item`] is the engine's unit of input: an immutable mapping from
//! normalized attribute names to scalar or sequence values, produced by an
//! external metadata-extraction step. The engine only ever reads it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable identity of an item, used for membership sets and queue merging
pub type ItemId = String;

/// Attribute values that mean "not specified" in upstream pools
const INVALID_VALUES: &[&str] = &["", "null", "n/a", "--"];

/// One exposure's flat metadata record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item {
    attrs: BTreeMap<String, Value>,
}

impl Item {
    /// Create an item from raw attributes, normalizing attribute names
    /// (trimmed, lowercased)
    pub fn new<I, K>(attrs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let attrs = attrs
            .into_iter()
            .map(|(k, v)| (normalize_attr(k.as_ref()), v))
            .collect();
        Self { attrs }
    }

    /// Create an item builder for tests and simple callers
    pub fn builder() -> ItemBuilder {
        ItemBuilder::default()
    }

    /// Raw attribute lookup by normalized name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attrs.get(&normalize_attr(name))
    }

    /// True if the attribute is present with a usable value
    pub fn has(&self, name: &str) -> bool {
        self.get_str(name).is_some()
    }

    /// String view of an attribute, used for constraint matching.
    ///
    /// Scalars render as their natural string form; sequences render as a
    /// comma-joined list of scalar renderings. Values in the
    /// unspecified-value set (`"null"`, `"--"`, empty) count as absent.
    pub fn get_str(&self, name: &str) -> Option<String> {
        let rendered = render_value(self.get(name)?)?;
        if INVALID_VALUES.contains(&rendered.to_ascii_lowercase().as_str()) {
            None
        } else {
            Some(rendered)
        }
    }

    /// Stable identity for membership and reprocess-queue keys: the
    /// `expname` attribute when present, else the canonical JSON rendering
    /// of the whole attribute map.
    pub fn id(&self) -> ItemId {
        match self.get_str("expname") {
            Some(expname) => expname,
            None => serde_json::to_string(&self.attrs).unwrap_or_default(),
        }
    }

    /// The exposure's file reference, as recorded in association members
    pub fn expname(&self) -> String {
        self.get_str("expname").unwrap_or_else(|| self.id())
    }

    /// Iterate over all attributes
    pub fn attrs(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.attrs.iter()
    }
}

/// Builder for constructing items attribute by attribute
#[derive(Debug, Default, Clone)]
pub struct ItemBuilder {
    attrs: BTreeMap<String, Value>,
}

impl ItemBuilder {
    /// Set a string attribute
    pub fn attr(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.attrs
            .insert(normalize_attr(name.as_ref()), Value::String(value.into()));
        self
    }

    /// Set an attribute from any JSON value
    pub fn attr_value(mut self, name: impl AsRef<str>, value: Value) -> Self {
        self.attrs.insert(normalize_attr(name.as_ref()), value);
        self
    }

    pub fn build(self) -> Item {
        Item { attrs: self.attrs }
    }
}

fn normalize_attr(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(render_value).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(","))
            }
        }
        Value::Null | Value::Object(_) => None,
    }
}
