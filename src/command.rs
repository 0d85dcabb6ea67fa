//! The command tree and the resolution pipeline that runs over it.
//!
//! A [`Command`] is one level of the CLI/config tree: a name, a description,
//! a [`Schema`] for its own fields, and an ordered set of subcommands. Trees
//! are built bottom-up through [`CommandBuilder`]; `build()` is the explicit
//! construction pass that links parent back-references and rejects the
//! ambiguities the flat key space cannot represent: duplicate sibling
//! names, a field shadowing a subcommand, and any two flag destinations
//! colliding after underscore-joining.
//!
//! Resolution ([`Command::resolve_from`]) is the whole pipeline in order:
//! parse arguments, load and flatten the config file (if a `config_file`
//! field is declared and set), merge under CLI-beats-file-beats-defaults
//! precedence, initialize logging from `log_file` so early output is
//! capturable, validate recursively along the selected subcommand chain,
//! and produce a [`Resolution`] holding the read-only [`RuntimeConfig`] plus
//! the root-to-leaf dispatch queue. [`Command::start`] does all of that and
//! then dispatches, exiting through clap on usage errors like any CLI
//! program would.

use std::ffi::OsString;
use std::path::Path;
use std::sync::{Arc, OnceLock, Weak};

use toml::Value;

use crate::cli;
use crate::error::FigtreeError;
use crate::file;
use crate::logging;
use crate::merge::{self, FlatConfig, KeyPath};
use crate::namespace::RuntimeConfig;
use crate::resolve;
use crate::schema::{FieldDefault, FieldSpec, Schema, CONFIG_FILE_FIELD, LOG_FILE_FIELD};

/// What a command does when dispatched. Implemented for closures taking the
/// shared namespace, so simple commands don't need a named type.
pub trait Behavior: Send + Sync {
    fn run(&self, config: &RuntimeConfig) -> Result<(), FigtreeError>;
}

impl<F> Behavior for F
where
    F: Fn(&RuntimeConfig) -> Result<(), FigtreeError> + Send + Sync,
{
    fn run(&self, config: &RuntimeConfig) -> Result<(), FigtreeError> {
        self(config)
    }
}

/// Default behavior for commands that only group subcommands.
struct Noop;

impl Behavior for Noop {
    fn run(&self, _config: &RuntimeConfig) -> Result<(), FigtreeError> {
        Ok(())
    }
}

pub(crate) struct CommandNode {
    name: String,
    description: String,
    schema: Schema,
    subcommands: Vec<Command>,
    behavior: Box<dyn Behavior>,
    parent: OnceLock<Weak<CommandNode>>,
}

/// One level of the command tree. Cheap to clone (shared by reference);
/// the tree itself is immutable once built.
#[derive(Clone)]
pub struct Command {
    node: Arc<CommandNode>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.node.name)
            .field("subcommands", &self.node.subcommands.len())
            .field("root", &self.is_root())
            .finish()
    }
}

impl Command {
    pub fn builder(name: &str, description: &str) -> CommandBuilder {
        CommandBuilder {
            name: name.to_string(),
            description: description.to_string(),
            schema: Schema::empty(),
            subcommands: Vec::new(),
            behavior: Box::new(Noop),
            log_file: None,
            config_file: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn description(&self) -> &str {
        &self.node.description
    }

    pub fn schema(&self) -> &Schema {
        &self.node.schema
    }

    pub fn subcommands(&self) -> &[Command] {
        &self.node.subcommands
    }

    pub(crate) fn subcommand(&self, name: &str) -> Option<&Command> {
        self.node.subcommands.iter().find(|c| c.name() == name)
    }

    /// True for the one node in a built tree with no parent.
    pub fn is_root(&self) -> bool {
        self.node.parent.get().is_none()
    }

    /// Run the full pipeline on explicit arguments (first item is the
    /// program name, as clap expects) without dispatching.
    pub fn resolve_from<I, T>(&self, args: I) -> Result<Resolution, FigtreeError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        if !self.is_root() {
            return Err(FigtreeError::NotRoot {
                name: self.node.name.clone(),
            });
        }

        let parser = cli::build_parser(self);
        let matches = parser.try_get_matches_from(args)?;
        let parsed = cli::extract(self, &matches);

        let config_path = self.config_file_value(&parsed.values);
        let file_layer = match &config_path {
            Some(path) => {
                let table = file::load_table(Path::new(path))?;
                Some(file::flatten_table(table, self))
            }
            None => None,
        };
        let merged = merge::merge_sources(parsed.values, file_layer, config_path.as_deref());

        // Logging comes up before validation so failures there are logged.
        if let Some(path) = self.log_file_value(&merged) {
            logging::init(Some(Path::new(&path)))?;
        }

        let mut queue = vec![self.clone()];
        let table = resolve::validate_tree(self, &parsed.chain, &merged, &mut queue)?;
        Ok(Resolution {
            config: RuntimeConfig::from_table(table),
            queue,
        })
    }

    /// Resolve from explicit arguments and dispatch. Usage errors are
    /// returned rather than printed, which is the form tests want.
    pub fn start_from<I, T>(&self, args: I) -> Result<Resolution, FigtreeError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let resolution = self.resolve_from(args)?;
        resolution.dispatch()?;
        Ok(resolution)
    }

    /// Resolve from the process arguments and dispatch. On a usage error
    /// (unknown flag, bad value, missing subcommand, `--help`) this prints
    /// clap's message and exits the process; everything else propagates.
    pub fn start(&self) -> Result<Resolution, FigtreeError> {
        match self.start_from(std::env::args_os()) {
            Err(FigtreeError::Usage(err)) => err.exit(),
            other => other,
        }
    }

    /// Path of the config file for this invocation: the explicitly supplied
    /// CLI value, or the field's declared default. `None` (field undeclared,
    /// or required but not given) means no file layer; the latter case fails
    /// validation afterwards.
    fn config_file_value(&self, cli_values: &FlatConfig) -> Option<String> {
        let field = self.node.schema.field(CONFIG_FILE_FIELD)?;
        let path = KeyPath::from_segments([CONFIG_FILE_FIELD]);
        if let Some(Value::String(s)) = cli_values.get(&path) {
            return Some(s.clone());
        }
        match field.default() {
            FieldDefault::Value(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn log_file_value(&self, merged: &FlatConfig) -> Option<String> {
        let field = self.node.schema.field(LOG_FILE_FIELD)?;
        let path = KeyPath::from_segments([LOG_FILE_FIELD]);
        if let Some(Value::String(s)) = merged.get(&path) {
            return Some(s.clone());
        }
        match field.default() {
            FieldDefault::Value(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn link_children(&self) -> Result<(), FigtreeError> {
        for child in &self.node.subcommands {
            child
                .node
                .parent
                .set(Arc::downgrade(&self.node))
                .map_err(|_| FigtreeError::AlreadyAttached {
                    name: child.node.name.clone(),
                })?;
        }
        Ok(())
    }

    /// Reject name and flag-destination ambiguities across the subtree,
    /// computed as if this command were the root.
    fn check_collisions(&self) -> Result<(), FigtreeError> {
        let mut dests = std::collections::BTreeSet::new();
        self.collect_dests(&KeyPath::root(), &mut dests)
    }

    fn collect_dests(
        &self,
        prefix: &KeyPath,
        dests: &mut std::collections::BTreeSet<String>,
    ) -> Result<(), FigtreeError> {
        let mut child_names = std::collections::BTreeSet::new();
        for child in &self.node.subcommands {
            if !child_names.insert(child.name().to_string()) {
                return Err(FigtreeError::DuplicateCommand {
                    parent: self.node.name.clone(),
                    name: child.name().to_string(),
                });
            }
        }

        for field in self.node.schema.fields() {
            let dest = prefix.child(field.name()).flag_dest();
            // A field named like a sibling subcommand would make the file
            // layout and the namespace splice ambiguous.
            if child_names.contains(field.name()) {
                return Err(FigtreeError::PathCollision { dest });
            }
            // "subcommand" is the key the validator writes the selected
            // child's name under; a field of that name would be overwritten.
            if !self.node.subcommands.is_empty() && field.name() == "subcommand" {
                return Err(FigtreeError::PathCollision { dest });
            }
            if !dests.insert(dest.clone()) {
                return Err(FigtreeError::PathCollision { dest });
            }
        }

        if !self.node.subcommands.is_empty() {
            let selector = format!("{}_subcommand", self.node.name);
            if !dests.insert(selector.clone()) {
                return Err(FigtreeError::PathCollision { dest: selector });
            }
        }

        for child in &self.node.subcommands {
            child.collect_dests(&prefix.child(child.name()), dests)?;
        }
        Ok(())
    }

    pub(crate) fn behavior(&self) -> &dyn Behavior {
        self.node.behavior.as_ref()
    }
}

/// Builder for one command level. Subcommands are themselves built
/// `Command`s, so trees grow bottom-up; `build()` runs the construction
/// pass for this level.
pub struct CommandBuilder {
    name: String,
    description: String,
    schema: Schema,
    subcommands: Vec<Command>,
    behavior: Box<dyn Behavior>,
    log_file: Option<String>,
    config_file: bool,
}

impl CommandBuilder {
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn subcommand(mut self, command: Command) -> Self {
        self.subcommands.push(command);
        self
    }

    pub fn behavior<B: Behavior + 'static>(mut self, behavior: B) -> Self {
        self.behavior = Box::new(behavior);
        self
    }

    /// Declare a `log_file` field with the given default, unless the schema
    /// already declares one. Its value feeds logging setup before
    /// validation runs.
    pub fn log_file(mut self, default: &str) -> Self {
        self.log_file = Some(default.to_string());
        self
    }

    /// Declare a required `config_file` field, unless the schema already
    /// declares one. When set at runtime, the named TOML file becomes the
    /// middle precedence layer.
    pub fn config_file(mut self) -> Self {
        self.config_file = true;
        self
    }

    pub fn build(self) -> Result<Command, FigtreeError> {
        let mut schema = self.schema;
        if self.config_file && schema.field(CONFIG_FILE_FIELD).is_none() {
            schema = schema.with_field(FieldSpec::str(CONFIG_FILE_FIELD).help("Config file to use"))?;
        }
        if let Some(default) = &self.log_file
            && schema.field(LOG_FILE_FIELD).is_none()
        {
            schema = schema.with_field(
                FieldSpec::str(LOG_FILE_FIELD)
                    .default_value(default.as_str())
                    .help("Path of run log"),
            )?;
        }

        let command = Command {
            node: Arc::new(CommandNode {
                name: self.name,
                description: self.description,
                schema,
                subcommands: self.subcommands,
                behavior: self.behavior,
                parent: OnceLock::new(),
            }),
        };
        command.link_children()?;
        command.check_collisions()?;
        Ok(command)
    }
}

/// A fully resolved invocation: the shared read-only namespace and the
/// root-to-leaf queue of commands to run.
#[derive(Debug)]
pub struct Resolution {
    config: RuntimeConfig,
    queue: Vec<Command>,
}

impl Resolution {
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Names of the queued commands, root first.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.queue.iter().map(Command::name)
    }

    /// Invoke each queued behavior in order with the shared namespace.
    /// A behavior failure propagates immediately; later commands don't run.
    pub fn dispatch(&self) -> Result<(), FigtreeError> {
        for command in &self.queue {
            tracing::info!(command = command.name(), "running");
            command.behavior().run(&self.config)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{run_log, sample_tree, simple_root};
    use crate::schema::EnumVariant;
    use std::io::Write;

    #[test]
    fn parse_validate_dispatch_root_only() {
        let log = run_log();
        let root = simple_root(&log);
        root.start_from(["app", "--string", "abc", "--value", "4", "--minus"])
            .unwrap();
        assert_eq!(log.lock().unwrap().as_slice(), ["20 abc -8"]);
    }

    #[test]
    fn defaults_apply_when_flags_omitted() {
        let log = run_log();
        let root = simple_root(&log);
        root.start_from(["app", "--string", "abc"]).unwrap();
        // value defaults to 7, minus to false, no_cli to 20
        assert_eq!(log.lock().unwrap().as_slice(), ["20 abc 14"]);
    }

    #[test]
    fn dispatch_queue_runs_root_to_leaf() {
        let log = run_log();
        let root = sample_tree(&log);
        let resolution = root
            .start_from([
                "app", "--string", "abc", "nested", "subsub", "--nested-arg", "ok",
            ])
            .unwrap();
        assert_eq!(
            resolution.commands().collect::<Vec<_>>(),
            ["app", "nested", "subsub"]
        );
        assert_eq!(
            log.lock().unwrap().as_slice(),
            ["app abc 14", "nested", "subsub ok"]
        );
    }

    #[test]
    fn resolution_is_debuggable() {
        let log = run_log();
        let root = simple_root(&log);
        let resolution = root.resolve_from(["app", "--string", "abc"]).unwrap();
        let rendered = format!("{resolution:?}");
        assert!(rendered.contains("app"));
    }

    #[test]
    fn same_field_name_at_two_depths_resolves_independently() {
        let log = run_log();
        let root = sample_tree(&log);
        let resolution = root
            .start_from(["app", "--string", "abc", "print", "--string", "22"])
            .unwrap();
        assert_eq!(resolution.config().str("string"), Some("abc"));
        assert_eq!(resolution.config().str("print.string"), Some("22"));
        assert_eq!(log.lock().unwrap().as_slice(), ["app abc 14", "print 22"]);
    }

    #[test]
    fn start_on_subcommand_is_rejected_without_running() {
        let log = run_log();
        let root = sample_tree(&log);
        let greet = root.subcommand("greet").unwrap().clone();
        let err = greet.start_from(["greet"]).unwrap_err();
        assert!(matches!(err, FigtreeError::NotRoot { .. }));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_required_field_fails_before_any_behavior() {
        let log = run_log();
        let root = sample_tree(&log);
        let err = root.start_from(["app", "greet"]).unwrap_err();
        assert!(matches!(err, FigtreeError::MissingField { .. }));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn behavior_failure_aborts_remaining_dispatch() {
        let log = run_log();
        let inner_log = log.clone();
        let failing = Command::builder("boom", "always fails")
            .behavior(move |_: &RuntimeConfig| {
                Err(FigtreeError::CommandFailed {
                    name: "boom".into(),
                    reason: "on purpose".into(),
                })
            })
            .build()
            .unwrap();
        let after_log = log.clone();
        let root = Command::builder("app", "test")
            .behavior(move |_: &RuntimeConfig| {
                inner_log.lock().unwrap().push("root".into());
                Ok(())
            })
            .subcommand(failing)
            .build()
            .unwrap();
        let err = root.start_from(["app", "boom"]).unwrap_err();
        assert!(matches!(err, FigtreeError::CommandFailed { .. }));
        // root ran, nothing after the failure did
        assert_eq!(after_log.lock().unwrap().as_slice(), ["root"]);
    }

    // -- config file layer -------------------------------------------------

    fn write_config(content: &str) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (dir, path.to_string_lossy().into_owned())
    }

    fn file_root(log: &crate::fixtures::test::RunLog) -> Command {
        let log = log.clone();
        Command::builder("app", "Print a value and exit")
            .schema(
                Schema::builder()
                    .field(FieldSpec::str("string").help("value to print"))
                    .field(FieldSpec::int("value").default_value(7))
                    .build()
                    .unwrap(),
            )
            .config_file()
            .behavior(move |config: &RuntimeConfig| {
                log.lock().unwrap().push(format!(
                    "{} {}",
                    config.str_or("string", "?"),
                    config.int_or("value", 0)
                ));
                Ok(())
            })
            .build()
            .unwrap()
    }

    #[test]
    fn file_value_beats_default() {
        let log = run_log();
        let root = file_root(&log);
        let (_dir, path) = write_config("string = \"aaa\"\nvalue = 3\n");
        root.start_from(["app", "--config-file", &path]).unwrap();
        assert_eq!(log.lock().unwrap().as_slice(), ["aaa 3"]);
    }

    #[test]
    fn cli_value_beats_file_value() {
        let log = run_log();
        let root = file_root(&log);
        let (_dir, path) = write_config("string = \"aaa\"\nvalue = 3\n");
        root.start_from(["app", "--config-file", &path, "--value", "4"])
            .unwrap();
        assert_eq!(log.lock().unwrap().as_slice(), ["aaa 4"]);
    }

    #[test]
    fn config_file_key_holds_literal_path() {
        let log = run_log();
        let root = file_root(&log);
        let (_dir, path) = write_config("string = \"aaa\"\n");
        let resolution = root.resolve_from(["app", "--config-file", &path]).unwrap();
        assert_eq!(resolution.config().str("config_file"), Some(path.as_str()));
    }

    #[test]
    fn file_only_field_settable_from_file() {
        let log = run_log();
        let inner = log.clone();
        let root = Command::builder("app", "")
            .schema(
                Schema::builder()
                    .field(FieldSpec::int("no_cli").default_value(20).file_only())
                    .build()
                    .unwrap(),
            )
            .config_file()
            .behavior(move |config: &RuntimeConfig| {
                inner
                    .lock()
                    .unwrap()
                    .push(config.int_or("no_cli", 0).to_string());
                Ok(())
            })
            .build()
            .unwrap();
        let (_dir, path) = write_config("no_cli = 42\n");
        root.start_from(["app", "--config-file", &path]).unwrap();
        assert_eq!(log.lock().unwrap().as_slice(), ["42"]);
    }

    #[test]
    fn missing_config_file_is_fatal() {
        let log = run_log();
        let root = file_root(&log);
        let err = root
            .start_from(["app", "--config-file", "/no/such/file.toml"])
            .unwrap_err();
        assert!(matches!(err, FigtreeError::IoError { .. }));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn file_extras_are_retained_by_default() {
        let log = run_log();
        let root = file_root(&log);
        let (_dir, path) = write_config("string = \"aaa\"\nvalue = 3\nextra = 9\n");
        let resolution = root.resolve_from(["app", "--config-file", &path]).unwrap();
        assert_eq!(resolution.config().int("extra"), Some(9));
    }

    #[test]
    fn file_extras_rejected_under_deny_extras() {
        let root = Command::builder("app", "strict")
            .schema(
                Schema::builder()
                    .field(FieldSpec::str("string"))
                    .deny_extras()
                    .build()
                    .unwrap(),
            )
            .config_file()
            .build()
            .unwrap();
        let (_dir, path) = write_config("string = \"aaa\"\nextra = 9\n");
        let err = root
            .start_from(["app", "--config-file", &path])
            .unwrap_err();
        match err {
            FigtreeError::ExtraKey { key } => assert_eq!(key, "extra"),
            other => panic!("expected ExtraKey, got {other:?}"),
        }
    }

    #[test]
    fn enum_field_resolves_by_name_end_to_end() {
        let root = Command::builder("app", "enum demo")
            .schema(
                Schema::builder()
                    .field(FieldSpec::enumeration(
                        "value1",
                        vec![EnumVariant::new("a", 123), EnumVariant::new("b", 456)],
                    ))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let resolution = root.resolve_from(["app", "--value1", "b"]).unwrap();
        assert_eq!(resolution.config().str("value1"), Some("b"));

        let err = root.resolve_from(["app", "--value1", "123"]).unwrap_err();
        assert!(matches!(err, FigtreeError::InvalidValue { .. }));
    }

    // -- tree construction pass --------------------------------------------

    #[test]
    fn duplicate_sibling_names_rejected() {
        let a = Command::builder("x", "").build().unwrap();
        let b = Command::builder("x", "").build().unwrap();
        let err = Command::builder("app", "")
            .subcommand(a)
            .subcommand(b)
            .build()
            .unwrap_err();
        assert!(matches!(err, FigtreeError::DuplicateCommand { .. }));
    }

    #[test]
    fn field_shadowing_subcommand_rejected() {
        let sub = Command::builder("print", "").build().unwrap();
        let err = Command::builder("app", "")
            .schema(
                Schema::builder()
                    .field(FieldSpec::str("print"))
                    .build()
                    .unwrap(),
            )
            .subcommand(sub)
            .build()
            .unwrap_err();
        assert!(matches!(err, FigtreeError::PathCollision { .. }));
    }

    #[test]
    fn subcommand_field_on_branching_node_rejected() {
        // The validator records the selected child under "subcommand"; a
        // field of that name on a branching node would be overwritten.
        let sub = Command::builder("child", "").build().unwrap();
        let err = Command::builder("app", "")
            .schema(
                Schema::builder()
                    .field(FieldSpec::str("subcommand"))
                    .build()
                    .unwrap(),
            )
            .subcommand(sub)
            .build()
            .unwrap_err();
        match err {
            FigtreeError::PathCollision { dest } => assert_eq!(dest, "subcommand"),
            other => panic!("expected PathCollision, got {other:?}"),
        }
    }

    #[test]
    fn subcommand_field_on_leaf_node_allowed() {
        let leaf = Command::builder("app", "")
            .schema(
                Schema::builder()
                    .field(FieldSpec::str("subcommand").default_value("mine"))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let resolution = leaf.resolve_from(["app"]).unwrap();
        assert_eq!(resolution.config().str("subcommand"), Some("mine"));
    }

    #[test]
    fn flag_dest_collision_across_levels_rejected() {
        // root field "print_x" and field "x" under subcommand "print" both
        // join to "print_x".
        let sub = Command::builder("print", "")
            .schema(
                Schema::builder()
                    .field(FieldSpec::str("x"))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let err = Command::builder("app", "")
            .schema(
                Schema::builder()
                    .field(FieldSpec::str("print_x"))
                    .build()
                    .unwrap(),
            )
            .subcommand(sub)
            .build()
            .unwrap_err();
        match err {
            FigtreeError::PathCollision { dest } => assert_eq!(dest, "print_x"),
            other => panic!("expected PathCollision, got {other:?}"),
        }
    }

    #[test]
    fn attaching_a_subcommand_twice_rejected() {
        let shared = Command::builder("shared", "").build().unwrap();
        let _first = Command::builder("app1", "")
            .subcommand(shared.clone())
            .build()
            .unwrap();
        let err = Command::builder("app2", "")
            .subcommand(shared)
            .build()
            .unwrap_err();
        assert!(matches!(err, FigtreeError::AlreadyAttached { .. }));
    }

    #[test]
    fn builder_conveniences_do_not_override_declared_fields() {
        let root = Command::builder("app", "")
            .schema(
                Schema::builder()
                    .field(FieldSpec::str("config_file").default_value("mine.toml"))
                    .build()
                    .unwrap(),
            )
            .config_file()
            .build()
            .unwrap();
        // the declared field (with its default) survives
        assert!(matches!(
            root.schema().field("config_file").unwrap().default(),
            FieldDefault::Value(_)
        ));
    }
}
