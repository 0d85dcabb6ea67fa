//! Recursive validation across the command tree.
//!
//! Operates on pre-merged data with no I/O. The parse step already
//! committed to a single subcommand chain, so there is no branching: each
//! level validates its own slice of the flat configuration and then
//! descends into exactly the chosen child, if any.
//!
//! Per node:
//!
//! 1. Extract the node's slice: entries whose path is the node's prefix
//!    plus one trailing segment. Entries for other (unselected) subtrees
//!    are left behind; they configure invocations that didn't happen.
//! 2. Validate the slice against the node's schema. The node's dotted path
//!    scopes field names in any error.
//! 3. If a child was chosen, append it to the dispatch queue, recurse, and
//!    splice the child's record into this node's record under the child's
//!    name, alongside a `subcommand` key naming the choice.
//!
//! Any failure aborts the whole resolution; nothing is partially committed.

use std::collections::BTreeMap;

use toml::{Table, Value};

use crate::command::Command;
use crate::error::FigtreeError;
use crate::merge::{FlatConfig, KeyPath};

/// Validate the merged flat configuration along the selected chain,
/// producing the nested record and filling `queue` root-to-leaf.
/// The caller seeds `queue` with the root.
pub(crate) fn validate_tree(
    root: &Command,
    chain: &[String],
    flat: &FlatConfig,
    queue: &mut Vec<Command>,
) -> Result<Table, FigtreeError> {
    validate_node(root, &KeyPath::root(), chain, flat, queue)
}

fn validate_node(
    node: &Command,
    prefix: &KeyPath,
    chain: &[String],
    flat: &FlatConfig,
    queue: &mut Vec<Command>,
) -> Result<Table, FigtreeError> {
    let supplied = slice_for(prefix, flat);
    let record = node.schema().validate(supplied, &prefix.dotted())?;

    let mut table: Table = record.into_iter().collect();

    if let Some((chosen, rest)) = chain.split_first() {
        let child = node
            .subcommand(chosen)
            .expect("figtree: parsed subcommand missing from tree");
        queue.push(child.clone());
        let child_table = validate_node(child, &prefix.child(chosen), rest, flat, queue)?;
        table.insert("subcommand".to_string(), Value::String(chosen.clone()));
        table.insert(chosen.clone(), Value::Table(child_table));
    }
    Ok(table)
}

/// Entries relevant to one node: path equals the node's prefix plus exactly
/// one more segment (the field name), which is stripped.
fn slice_for(prefix: &KeyPath, flat: &FlatConfig) -> BTreeMap<String, Value> {
    flat.iter()
        .filter(|(path, _)| path.len() == prefix.len() + 1 && path.starts_with(prefix))
        .filter_map(|(path, value)| path.last().map(|name| (name.to_string(), value.clone())))
        .collect()
}
