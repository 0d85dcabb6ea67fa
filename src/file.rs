//! Config file loading and flattening.
//!
//! One whole-file blocking read per invocation. A missing file or
//! unparsable TOML is fatal and propagates with the path attached. There
//! is no fallback to defaults, because a user who pointed at a file wants
//! that file.
//!
//! Flattening maps the nested document onto [`KeyPath`]s against the
//! command tree: a table whose name matches a subcommand at that level is
//! descended into (`[nested.subsub]` keys land under `nested.subsub.*`);
//! any other table is kept whole as an opaque leaf value, which is how
//! lenient schemas retain extra structure from shared config files.

use std::path::Path;

use toml::{Table, Value};

use crate::command::Command;
use crate::error::FigtreeError;
use crate::merge::{FlatConfig, KeyPath};

/// Read and parse a TOML config file.
pub(crate) fn load_table(path: &Path) -> Result<Table, FigtreeError> {
    let content = std::fs::read_to_string(path).map_err(|e| FigtreeError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    content
        .parse::<Table>()
        .map_err(|e| FigtreeError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Flatten a parsed config file against the command tree.
pub(crate) fn flatten_table(table: Table, root: &Command) -> FlatConfig {
    let mut flat = FlatConfig::new();
    flatten_level(table, root, &KeyPath::root(), &mut flat);
    flat
}

fn flatten_level(table: Table, node: &Command, prefix: &KeyPath, out: &mut FlatConfig) {
    for (key, value) in table {
        match (node.subcommand(&key), value) {
            (Some(child), Value::Table(inner)) => {
                flatten_level(inner, child, &prefix.child(&key), out);
            }
            (_, value) => {
                out.insert(prefix.child(&key), value);
            }
        }
    }
}
