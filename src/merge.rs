//! Flat configuration keyed by fully-qualified paths, and the precedence
//! overlay that combines value sources.
//!
//! The internal key is a [`KeyPath`]: the ordered sequence of subcommand names
//! (root excluded) followed by the field name. The underscore-joined string
//! form exists only at the clap boundary ([`KeyPath::flag_dest`]) and the
//! dotted form only in error messages ([`KeyPath::dotted`]), so two fields
//! can never collide internally just because their joined names coincide.
//!
//! `FlatConfig` is transient: it lives between argument parsing and
//! validation and is never handed to user code.

use std::collections::BTreeMap;
use std::fmt;

use toml::Value;

/// Fully-qualified key: subcommand names from (not including) the root,
/// then the field name. Root-level fields have a single segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub(crate) struct KeyPath(Vec<String>);

impl KeyPath {
    /// The empty path (the root command's own level).
    pub(crate) fn root() -> Self {
        Self(Vec::new())
    }

    pub(crate) fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Extend the path with one more segment, returning a new path.
    pub(crate) fn child(&self, segment: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Self(segments)
    }

    pub(crate) fn segments(&self) -> &[String] {
        &self.0
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn starts_with(&self, prefix: &KeyPath) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    pub(crate) fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Underscore-joined form used as the clap argument id / destination.
    /// Only generated at the CLI-flag-naming boundary.
    pub(crate) fn flag_dest(&self) -> String {
        self.0.join("_")
    }

    /// Dotted form for error messages ("nested.subsub.nested_arg").
    pub(crate) fn dotted(&self) -> String {
        self.0.join(".")
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted())
    }
}

/// Transient flat mapping from [`KeyPath`] to raw value, used only during
/// the merge/validate phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FlatConfig {
    entries: BTreeMap<KeyPath, Value>,
}

impl FlatConfig {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, path: KeyPath, value: Value) {
        self.entries.insert(path, value);
    }

    pub(crate) fn get(&self, path: &KeyPath) -> Option<&Value> {
        self.entries.get(path)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&KeyPath, &Value)> {
        self.entries.iter()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overlay `other` on top of `self`, key by key. `other` wins on conflict.
    pub(crate) fn overlay(&mut self, other: FlatConfig) {
        for (path, value) in other.entries {
            self.entries.insert(path, value);
        }
    }
}

/// Combine the file layer (base) with explicitly supplied CLI values
/// (overlay, highest priority). Schema defaults are not merged here; the
/// validator fills them for keys absent from the result, which is what makes
/// a file value beat a default while a CLI value beats both.
///
/// When a config file was used, `config_file` is pinned to the literal path,
/// so file content can never override where it came from.
pub(crate) fn merge_sources(
    cli: FlatConfig,
    file: Option<FlatConfig>,
    config_file: Option<&str>,
) -> FlatConfig {
    let mut merged = file.unwrap_or_default();
    merged.overlay(cli);
    if let Some(path) = config_file {
        merged.insert(
            KeyPath::from_segments(["config_file"]),
            Value::String(path.to_string()),
        );
    }
    merged
}
