//! The read-only runtime namespace handed to command behaviors.
//!
//! [`RuntimeConfig`] is the final product of the resolution pipeline: a
//! nested key-value structure isomorphic to a TOML table, constructed once
//! after validation and never mutated. Dotted-path reads are explicit
//! ([`get_path`](RuntimeConfig::get_path) and the typed lookups) rather than
//! resting on dynamic attribute access, and the inverse transform
//! ([`to_table`](RuntimeConfig::to_table)) recovers the plain mapping
//! exactly.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};
use toml::{Table, Value};

/// One entry of a [`RuntimeConfig`]: either a scalar/array value or a nested
/// section (a subcommand's namespace).
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNode {
    Value(Value),
    Section(RuntimeConfig),
}

impl ConfigNode {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ConfigNode::Value(v) => Some(v),
            ConfigNode::Section(_) => None,
        }
    }

    pub fn as_section(&self) -> Option<&RuntimeConfig> {
        match self {
            ConfigNode::Section(s) => Some(s),
            ConfigNode::Value(_) => None,
        }
    }
}

/// Immutable nested configuration produced by a resolved invocation.
///
/// A child command's namespace is reachable from the root by its declared
/// name: `config.get_path("nested.subsub.nested_arg")`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeConfig {
    entries: BTreeMap<String, ConfigNode>,
}

impl RuntimeConfig {
    /// Recursively convert a plain table into a namespace. Every table value
    /// becomes a nested section; every other value is kept as-is.
    pub fn from_table(table: Table) -> Self {
        let entries = table
            .into_iter()
            .map(|(key, value)| {
                let node = match value {
                    Value::Table(inner) => ConfigNode::Section(Self::from_table(inner)),
                    other => ConfigNode::Value(other),
                };
                (key, node)
            })
            .collect();
        Self { entries }
    }

    /// Inverse of [`from_table`](Self::from_table): recover the plain nested
    /// mapping, structure-preserving.
    pub fn to_table(&self) -> Table {
        self.entries
            .iter()
            .map(|(key, node)| {
                let value = match node {
                    ConfigNode::Value(v) => v.clone(),
                    ConfigNode::Section(s) => Value::Table(s.to_table()),
                };
                (key.clone(), value)
            })
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&ConfigNode> {
        self.entries.get(key)
    }

    /// Follow a dotted path ("nested.subsub.nested_arg") through sections.
    pub fn get_path(&self, path: &str) -> Option<&ConfigNode> {
        let mut segments = path.split('.');
        let mut node = self.get(segments.next()?)?;
        for segment in segments {
            node = node.as_section()?.get(segment)?;
        }
        Some(node)
    }

    /// The nested namespace of a subcommand, by name.
    pub fn section(&self, key: &str) -> Option<&RuntimeConfig> {
        self.get(key).and_then(ConfigNode::as_section)
    }

    pub fn value(&self, path: &str) -> Option<&Value> {
        self.get_path(path).and_then(ConfigNode::as_value)
    }

    pub fn str(&self, path: &str) -> Option<&str> {
        self.value(path).and_then(Value::as_str)
    }

    pub fn int(&self, path: &str) -> Option<i64> {
        self.value(path).and_then(Value::as_integer)
    }

    pub fn float(&self, path: &str) -> Option<f64> {
        self.value(path).and_then(Value::as_float)
    }

    pub fn bool(&self, path: &str) -> Option<bool> {
        self.value(path).and_then(Value::as_bool)
    }

    pub fn str_or<'a>(&'a self, path: &str, default: &'a str) -> &'a str {
        self.str(path).unwrap_or(default)
    }

    pub fn int_or(&self, path: &str, default: i64) -> i64 {
        self.int(path).unwrap_or(default)
    }

    pub fn bool_or(&self, path: &str, default: bool) -> bool {
        self.bool(path).unwrap_or(default)
    }

    /// Name of the subcommand selected at this level, if any.
    pub fn subcommand(&self) -> Option<&str> {
        self.str("subcommand")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Renders exactly like the plain-table form of the namespace.
impl fmt::Display for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_table())
    }
}

impl Serialize for RuntimeConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, node) in &self.entries {
            map.serialize_entry(key, node)?;
        }
        map.end()
    }
}

impl Serialize for ConfigNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConfigNode::Value(v) => v.serialize(serializer),
            ConfigNode::Section(s) => s.serialize(serializer),
        }
    }
}
