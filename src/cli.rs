//! Bridge between the command tree and clap.
//!
//! This module is the only place that talks to the argument parser. It does
//! two things:
//!
//! - [`build_parser`] walks the tree and produces one `clap::Command` with
//!   nested subcommands, one level per [`Command`]. Each CLI-visible field
//!   becomes a `--flag` (underscores replaced by hyphens); booleans are
//!   presence flags, list/set fields accept repeated occurrences, int and
//!   float fields get typed value parsers so malformed values are usage
//!   errors at parse time. Help text comes from field descriptions; clap
//!   supplies `-h`/`--help` and rejects unknown flags and subcommands.
//!
//! - [`extract`] reads the parse result back into a [`FlatConfig`], keeping
//!   only values the user explicitly supplied (`ValueSource::CommandLine`).
//!   Schema defaults are applied later, during validation, which is what
//!   gives config-file values their place between flags and defaults. It
//!   also records the selected subcommand chain, root to leaf.
//!
//! Argument ids are the underscore-joined [`KeyPath`] destinations: a field
//! `arg` on `subsub` under `nested` gets the id `nested_subsub_arg`, so it
//! can never collide with a root-level field of the same name.

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches};
use toml::Value;

use crate::command::Command;
use crate::merge::{FlatConfig, KeyPath};
use crate::schema::FieldKind;

/// Parse result: explicitly supplied values keyed by path, plus the chain
/// of selected subcommand names (root excluded, outermost first).
#[derive(Debug, Default)]
pub(crate) struct ParsedArgs {
    pub(crate) values: FlatConfig,
    pub(crate) chain: Vec<String>,
}

/// Build the full CLI parser for a command tree. The program name is the
/// root command's declared name.
pub(crate) fn build_parser(root: &Command) -> clap::Command {
    build_level(root, &KeyPath::root())
}

fn build_level(node: &Command, prefix: &KeyPath) -> clap::Command {
    let mut cmd = clap::Command::new(node.name().to_string())
        .about(node.description().to_string())
        .disable_version_flag(true);

    for field in node.schema().fields() {
        if !field.is_cli() {
            continue;
        }
        let id = prefix.child(field.name()).flag_dest();
        let flag = field.name().replace('_', "-");
        let mut arg = Arg::new(id)
            .long(flag)
            .help(field.description().to_string());
        arg = match field.kind() {
            FieldKind::Bool => arg.action(ArgAction::SetTrue),
            FieldKind::StrList | FieldKind::StrSet => arg.action(ArgAction::Append),
            FieldKind::Int => arg.value_parser(clap::value_parser!(i64)),
            FieldKind::Float => arg.value_parser(clap::value_parser!(f64)),
            FieldKind::Str | FieldKind::Enum(_) => arg,
        };
        cmd = cmd.arg(arg);
    }

    if !node.subcommands().is_empty() {
        cmd = cmd.subcommand_required(true);
        for child in node.subcommands() {
            cmd = cmd.subcommand(build_level(child, &prefix.child(child.name())));
        }
    }
    cmd
}

/// Walk the matches alongside the tree, collecting explicitly supplied
/// values and the selected subcommand chain.
pub(crate) fn extract(root: &Command, matches: &ArgMatches) -> ParsedArgs {
    let mut parsed = ParsedArgs::default();
    extract_level(root, &KeyPath::root(), matches, &mut parsed);
    parsed
}

fn extract_level(node: &Command, prefix: &KeyPath, matches: &ArgMatches, out: &mut ParsedArgs) {
    for field in node.schema().fields() {
        if !field.is_cli() {
            continue;
        }
        let path = prefix.child(field.name());
        let id = path.flag_dest();
        if matches.value_source(&id) != Some(ValueSource::CommandLine) {
            continue;
        }
        let value = match field.kind() {
            FieldKind::Bool => Value::Boolean(true),
            FieldKind::Int => Value::Integer(
                *matches
                    .get_one::<i64>(&id)
                    .expect("figtree: typed int flag missing after parse"),
            ),
            FieldKind::Float => Value::Float(
                *matches
                    .get_one::<f64>(&id)
                    .expect("figtree: typed float flag missing after parse"),
            ),
            FieldKind::StrList | FieldKind::StrSet => Value::Array(
                matches
                    .get_many::<String>(&id)
                    .expect("figtree: repeated flag missing after parse")
                    .map(|s| Value::String(s.clone()))
                    .collect(),
            ),
            FieldKind::Str | FieldKind::Enum(_) => Value::String(
                matches
                    .get_one::<String>(&id)
                    .expect("figtree: string flag missing after parse")
                    .clone(),
            ),
        };
        out.values.insert(path, value);
    }

    if let Some((name, sub_matches)) = matches.subcommand()
        && let Some(child) = node.subcommand(name)
    {
        out.chain.push(name.to_string());
        extract_level(child, &prefix.child(name), sub_matches, out);
    }
}
