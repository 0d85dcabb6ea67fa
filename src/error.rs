use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FigtreeError {
    #[error("Missing required field '{field}'")]
    MissingField { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unknown key '{key}' (schema forbids extra keys)")]
    ExtraKey { key: String },

    #[error("Failed to read {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error(transparent)]
    Usage(#[from] clap::Error),

    #[error("'{name}' is a subcommand; start() must be called on the root command")]
    NotRoot { name: String },

    #[error("Duplicate field '{name}' in schema")]
    DuplicateField { name: String },

    #[error("Command '{parent}' declares two subcommands named '{name}'")]
    DuplicateCommand { parent: String, name: String },

    #[error("Flag destination '{dest}' is produced by more than one field")]
    PathCollision { dest: String },

    #[error("Subcommand '{name}' is already attached to a parent command")]
    AlreadyAttached { name: String },

    #[error("Command '{name}' failed: {reason}")]
    CommandFailed { name: String, reason: String },
}
