//! Declarative command trees with layered configuration. Describe commands,
//! their settings, and their nesting once, and get a CLI, a config-file
//! format, validation, and dispatch from that single description.
//!
//! ```ignore
//! let root = Command::builder("app", "Do the thing")
//!     .schema(
//!         Schema::builder()
//!             .field(FieldSpec::str("name").help("who to greet"))
//!             .field(FieldSpec::int("count").default_value(1))
//!             .build()?,
//!     )
//!     .behavior(|config: &RuntimeConfig| {
//!         println!("{} x{}", config.str_or("name", "?"), config.int_or("count", 1));
//!         Ok(())
//!     })
//!     .build()?;
//! root.start()?;
//! ```
//!
//! That single call parses the process arguments, loads the optional TOML
//! config file, validates the merged result against the schema, and runs the
//! behavior with a typed, read-only namespace.
//!
//! # Design: schema as source of truth
//!
//! Each command carries a [`Schema`]: an ordered set of [`FieldSpec`]s naming
//! the settings the command understands, their types, defaults, and help
//! text. Everything else derives from it:
//!
//! - **CLI flags.** Each field becomes a `--flag` on the generated parser,
//!   typed to match (booleans are presence flags, lists repeat). Fields
//!   marked [`file_only`](FieldSpec::file_only) get no flag and can only be
//!   set from the config file.
//! - **Config file sections.** A subcommand's settings live in the TOML
//!   section of the same name; nesting in the tree is nesting in the file.
//! - **Validation.** Required fields without a value fail resolution before
//!   any behavior runs. Values are coerced to the declared kind, and enum
//!   fields accept only their declared variant names.
//!
//! # Layer precedence
//!
//! ```text
//! Schema defaults       FieldSpec::default_value(...)
//!        overridden by
//! Config file           --config-file path.toml
//!        overridden by
//! CLI flags             only flags actually supplied count
//! ```
//!
//! A default on a flag never shadows the config file: a CLI value
//! participates only when the user typed it.
//!
//! # Command trees
//!
//! Commands nest via [`CommandBuilder::subcommand`]. Flags of nested commands
//! are disambiguated by prefixing: the `nested_arg` field of `app nested
//! subsub` parses as `--nested-arg` in context but is stored internally under
//! the full path, so sibling commands may reuse field names freely. Name
//! collisions that would be ambiguous (two subcommands with the same name
//! under one parent, a field shadowing a subcommand) are rejected when the
//! tree is built, not at parse time.
//!
//! Running an invocation dispatches every behavior on the selected chain,
//! root first: `app nested subsub` runs `app`'s behavior, then `nested`'s,
//! then `subsub`'s. Each behavior receives the same root [`RuntimeConfig`]
//! and reads its own section by path.
//!
//! # Errors
//!
//! All failures surface as [`FigtreeError`]. Usage errors from the argument
//! parser keep clap's rendering; [`Command::start`] exits through clap for
//! those so `--help` and mistyped flags behave like any clap application.

pub mod error;
pub mod logging;
pub mod namespace;
pub mod parallel;
pub mod schema;

mod cli;
mod command;
mod file;
mod merge;
mod resolve;

#[cfg(test)]
mod fixtures;

pub use command::{Behavior, Command, CommandBuilder, Resolution};
pub use error::FigtreeError;
pub use namespace::{ConfigNode, RuntimeConfig};
pub use schema::{
    EnumVariant, Extras, FieldDefault, FieldKind, FieldSpec, Schema, SchemaBuilder,
    CONFIG_FILE_FIELD, LOG_FILE_FIELD,
};
