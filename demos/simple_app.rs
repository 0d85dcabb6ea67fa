//! Smallest possible application: one command, two settings, one behavior.
//!
//! ```sh
//! cargo run --example simple_app -- --string hello --value 3
//! ```

use figtree::{Command, FieldSpec, FigtreeError, RuntimeConfig, Schema};

fn main() -> Result<(), FigtreeError> {
    let app = Command::builder("simple-app", "Print a value and exit")
        .schema(
            Schema::builder()
                .field(FieldSpec::str("string").help("value to print"))
                .field(
                    FieldSpec::int("value")
                        .default_value(4)
                        .help("value to double and print"),
                )
                .build()?,
        )
        .behavior(|config: &RuntimeConfig| {
            println!(
                "{} {}",
                config.str_or("string", ""),
                config.int_or("value", 0) * 2
            );
            Ok(())
        })
        .build()?;
    app.start()?;
    Ok(())
}
