#[cfg(test)]
pub mod test {
    use std::sync::{Arc, Mutex};

    use crate::command::Command;
    use crate::namespace::RuntimeConfig;
    use crate::schema::{FieldSpec, Schema};

    /// Shared capture of behavior output, in dispatch order.
    pub type RunLog = Arc<Mutex<Vec<String>>>;

    pub fn run_log() -> RunLog {
        Arc::default()
    }

    /// Root command with no subcommands:
    /// fields `string` (required), `value` (default 7), `minus` (bool),
    /// `no_cli` (default 20, file-only). The behavior records
    /// `"{no_cli} {string} {value * (minus ? -2 : 2)}"`.
    pub fn simple_root(log: &RunLog) -> Command {
        let log = log.clone();
        Command::builder("app", "Print a value and exit")
            .schema(
                Schema::builder()
                    .field(FieldSpec::str("string").help("value to print"))
                    .field(
                        FieldSpec::int("value")
                            .default_value(7)
                            .help("value to double and print"),
                    )
                    .field(FieldSpec::bool("minus").help("negate the result"))
                    .field(
                        FieldSpec::int("no_cli")
                            .default_value(20)
                            .help("not accessible from the cli")
                            .file_only(),
                    )
                    .build()
                    .unwrap(),
            )
            .behavior(move |config: &RuntimeConfig| {
                let sign = if config.bool_or("minus", false) { -2 } else { 2 };
                log.lock().unwrap().push(format!(
                    "{} {} {}",
                    config.int_or("no_cli", 0),
                    config.str_or("string", "?"),
                    config.int_or("value", 0) * sign,
                ));
                Ok(())
            })
            .build()
            .unwrap()
    }

    /// Command tree exercising nesting and name reuse:
    ///
    /// ```text
    /// app (string required, value default 7, minus, no_cli file-only)
    /// ├── greet
    /// ├── print  (string required, same name as the root's field)
    /// └── nested
    ///     └── subsub (nested_arg required, unused default 12 file-only)
    /// ```
    pub fn sample_tree(log: &RunLog) -> Command {
        let greet_log = log.clone();
        let greet = Command::builder("greet", "Print 'Hello'")
            .behavior(move |_: &RuntimeConfig| {
                greet_log.lock().unwrap().push("greet".into());
                Ok(())
            })
            .build()
            .unwrap();

        let print_log = log.clone();
        let print = Command::builder("print", "Print a value")
            .schema(
                Schema::builder()
                    .field(FieldSpec::str("string").help("value to print"))
                    .build()
                    .unwrap(),
            )
            .behavior(move |config: &RuntimeConfig| {
                print_log
                    .lock()
                    .unwrap()
                    .push(format!("print {}", config.str_or("print.string", "?")));
                Ok(())
            })
            .build()
            .unwrap();

        let subsub_log = log.clone();
        let subsub = Command::builder("subsub", "Print 'I'm nested'")
            .schema(
                Schema::builder()
                    .field(FieldSpec::str("nested_arg").help("nested arg to print"))
                    .field(
                        FieldSpec::int("unused")
                            .default_value(12)
                            .help("unused int")
                            .file_only(),
                    )
                    .build()
                    .unwrap(),
            )
            .behavior(move |config: &RuntimeConfig| {
                subsub_log.lock().unwrap().push(format!(
                    "subsub {}",
                    config.str_or("nested.subsub.nested_arg", "?")
                ));
                Ok(())
            })
            .build()
            .unwrap();

        let nested_log = log.clone();
        let nested = Command::builder("nested", "Print 'nested'")
            .subcommand(subsub)
            .behavior(move |_: &RuntimeConfig| {
                nested_log.lock().unwrap().push("nested".into());
                Ok(())
            })
            .build()
            .unwrap();

        let root_log = log.clone();
        Command::builder("app", "Print a value and exit")
            .schema(
                Schema::builder()
                    .field(FieldSpec::str("string").help("some value"))
                    .field(
                        FieldSpec::int("value")
                            .default_value(7)
                            .help("value to double and print"),
                    )
                    .field(FieldSpec::bool("minus").help("negate the result"))
                    .field(
                        FieldSpec::int("no_cli")
                            .default_value(20)
                            .help("unused int")
                            .file_only(),
                    )
                    .build()
                    .unwrap(),
            )
            .subcommand(greet)
            .subcommand(print)
            .subcommand(nested)
            .behavior(move |config: &RuntimeConfig| {
                let sign = if config.bool_or("minus", false) { -2 } else { 2 };
                root_log.lock().unwrap().push(format!(
                    "app {} {}",
                    config.str_or("string", "?"),
                    config.int_or("value", 0) * sign,
                ));
                Ok(())
            })
            .build()
            .unwrap()
    }
}
