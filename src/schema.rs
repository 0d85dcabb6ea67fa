//! Field descriptors and schema validation.
//!
//! A [`Schema`] is the single source of truth for one command level: every
//! flag, TOML key, default, and help string derives from its [`FieldSpec`]s.
//! Schemas are immutable values built once through [`SchemaBuilder`];
//! [`Schema::with_field`] returns a *new* schema rather than mutating the
//! original, so a schema shared across commands or tests can never be
//! patched under someone's feet.
//!
//! Validation is strict about types but lenient about extra keys by default:
//! unknown keys supplied via a config file are retained as-is unless the
//! schema was built with [`SchemaBuilder::deny_extras`].

use std::collections::{BTreeMap, BTreeSet};

use toml::Value;

use crate::error::FigtreeError;

/// Name of the field that points at the TOML config file, when declared.
pub const CONFIG_FILE_FIELD: &str = "config_file";

/// Name of the field that points at the log file, when declared.
pub const LOG_FILE_FIELD: &str = "log_file";

/// Declared type of a configuration field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Str,
    Int,
    Float,
    Bool,
    /// Repeatable string flag, order-preserving.
    StrList,
    /// Repeatable string flag, deduplicated and sorted.
    StrSet,
    /// Closed set of symbolic names. Values are validated by *name*:
    /// supplying a variant's raw value is rejected.
    Enum(Vec<EnumVariant>),
}

/// One member of an enum-typed field: a symbolic name and the value it
/// stands for. Lookup is always by name; the value is available to callers
/// that need to translate (see [`FieldSpec::enum_value`]).
#[derive(Debug, Clone, PartialEq)]
pub struct EnumVariant {
    pub name: String,
    pub value: Value,
}

impl EnumVariant {
    pub fn new(name: &str, value: impl Into<Value>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// Whether a field has a default or must be supplied by some layer.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    /// No default; absence from every source fails validation.
    Required,
    Value(Value),
}

/// Declarative description of one configuration value: type, default,
/// help text, and whether it is exposed as a command-line flag.
///
/// Created once when the command tree is declared, immutable thereafter.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    name: String,
    kind: FieldKind,
    default: FieldDefault,
    description: String,
    cli: bool,
}

impl FieldSpec {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        // A presence flag with no default is unsatisfiable when absent.
        let default = match kind {
            FieldKind::Bool => FieldDefault::Value(Value::Boolean(false)),
            _ => FieldDefault::Required,
        };
        Self {
            name: name.to_string(),
            kind,
            default,
            description: String::new(),
            cli: true,
        }
    }

    pub fn str(name: &str) -> Self {
        Self::new(name, FieldKind::Str)
    }

    pub fn int(name: &str) -> Self {
        Self::new(name, FieldKind::Int)
    }

    pub fn float(name: &str) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn bool(name: &str) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn str_list(name: &str) -> Self {
        Self::new(name, FieldKind::StrList)
    }

    pub fn str_set(name: &str) -> Self {
        Self::new(name, FieldKind::StrSet)
    }

    pub fn enumeration(name: &str, variants: Vec<EnumVariant>) -> Self {
        Self::new(name, FieldKind::Enum(variants))
    }

    /// Set the default value (clears the required marker).
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = FieldDefault::Value(value.into());
        self
    }

    /// Help text shown in `--help` and carried into error context.
    pub fn help(mut self, text: &str) -> Self {
        self.description = text.to_string();
        self
    }

    /// Hide the field from the command line. It stays settable via config
    /// file or default; the flag simply does not exist, so supplying it is
    /// an unrecognized-argument usage error.
    pub fn file_only(mut self) -> Self {
        self.cli = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn default(&self) -> &FieldDefault {
        &self.default
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_cli(&self) -> bool {
        self.cli
    }

    /// For enum fields, translate a validated symbolic name into the value
    /// it stands for.
    pub fn enum_value(&self, name: &str) -> Option<&Value> {
        match &self.kind {
            FieldKind::Enum(variants) => variants
                .iter()
                .find(|v| v.name == name)
                .map(|v| &v.value),
            _ => None,
        }
    }
}

/// Policy for keys supplied (via a config file) that match no declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extras {
    /// Unknown keys are silently retained in the validated record.
    #[default]
    Allow,
    /// Unknown keys fail validation.
    Forbid,
}

/// Immutable, validatable schema for one command level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    extras: Extras,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Schema with no fields (commands that only group subcommands).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn extras(&self) -> Extras {
        self.extras
    }

    /// Return a new schema with one more field. The original is untouched.
    pub fn with_field(&self, field: FieldSpec) -> Result<Schema, FigtreeError> {
        if self.field(&field.name).is_some() {
            return Err(FigtreeError::DuplicateField { name: field.name });
        }
        let mut fields = self.fields.clone();
        fields.push(field);
        Ok(Schema {
            fields,
            extras: self.extras,
        })
    }

    /// Validate one level's supplied values against this schema.
    ///
    /// Returns the fully-typed, coerced and defaulted record. `scope` is the
    /// dotted command path ("" for the root) used to qualify field names in
    /// errors.
    ///
    /// - Declared fields are coerced to their kind; coercion failure is
    ///   [`FigtreeError::InvalidValue`].
    /// - Absent fields take their default; absent *required* fields are
    ///   [`FigtreeError::MissingField`].
    /// - Remaining keys are retained ([`Extras::Allow`]) or rejected
    ///   ([`Extras::Forbid`]).
    pub fn validate(
        &self,
        mut supplied: BTreeMap<String, Value>,
        scope: &str,
    ) -> Result<BTreeMap<String, Value>, FigtreeError> {
        let mut record = BTreeMap::new();
        for field in &self.fields {
            match supplied.remove(&field.name) {
                Some(raw) => {
                    let coerced = coerce(field, raw, scope)?;
                    record.insert(field.name.clone(), coerced);
                }
                None => match &field.default {
                    FieldDefault::Value(default) => {
                        record.insert(field.name.clone(), default.clone());
                    }
                    FieldDefault::Required => {
                        return Err(FigtreeError::MissingField {
                            field: scoped(scope, &field.name),
                        });
                    }
                },
            }
        }
        match self.extras {
            Extras::Allow => record.extend(supplied),
            Extras::Forbid => {
                if let Some(key) = supplied.into_keys().next() {
                    return Err(FigtreeError::ExtraKey {
                        key: scoped(scope, &key),
                    });
                }
            }
        }
        Ok(record)
    }
}

/// Builder collecting fields for an immutable [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldSpec>,
    extras: Extras,
}

impl SchemaBuilder {
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Reject keys that match no declared field instead of retaining them.
    pub fn deny_extras(mut self) -> Self {
        self.extras = Extras::Forbid;
        self
    }

    pub fn build(self) -> Result<Schema, FigtreeError> {
        let mut seen = BTreeSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.clone()) {
                return Err(FigtreeError::DuplicateField {
                    name: field.name.clone(),
                });
            }
        }
        Ok(Schema {
            fields: self.fields,
            extras: self.extras,
        })
    }
}

fn scoped(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

fn coerce(field: &FieldSpec, raw: Value, scope: &str) -> Result<Value, FigtreeError> {
    let fail = |reason: String| FigtreeError::InvalidValue {
        field: scoped(scope, &field.name),
        reason,
    };
    match &field.kind {
        FieldKind::Str => match raw {
            Value::String(s) => Ok(Value::String(s)),
            other => Err(fail(format!("expected a string, got {}", type_name(&other)))),
        },
        FieldKind::Int => match raw {
            Value::Integer(i) => Ok(Value::Integer(i)),
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| fail(format!("'{s}' is not an integer"))),
            other => Err(fail(format!(
                "expected an integer, got {}",
                type_name(&other)
            ))),
        },
        FieldKind::Float => match raw {
            Value::Float(f) => Ok(Value::Float(f)),
            Value::Integer(i) => Ok(Value::Float(i as f64)),
            Value::String(s) => s
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| fail(format!("'{s}' is not a number"))),
            other => Err(fail(format!("expected a float, got {}", type_name(&other)))),
        },
        FieldKind::Bool => match raw {
            Value::Boolean(b) => Ok(Value::Boolean(b)),
            Value::String(s) => s
                .parse::<bool>()
                .map(Value::Boolean)
                .map_err(|_| fail(format!("'{s}' is not a boolean"))),
            other => Err(fail(format!(
                "expected a boolean, got {}",
                type_name(&other)
            ))),
        },
        FieldKind::StrList => string_items(raw).map(Value::Array).map_err(fail),
        FieldKind::StrSet => {
            let items = string_items(raw).map_err(fail)?;
            let set: BTreeSet<String> = items
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => s,
                    _ => unreachable!("string_items yields strings only"),
                })
                .collect();
            Ok(Value::Array(set.into_iter().map(Value::String).collect()))
        }
        FieldKind::Enum(variants) => match raw {
            Value::String(name) if variants.iter().any(|v| v.name == name) => {
                Ok(Value::String(name))
            }
            other => {
                let allowed: Vec<&str> = variants.iter().map(|v| v.name.as_str()).collect();
                Err(fail(format!(
                    "'{}' is not one of {}",
                    display_scalar(&other),
                    allowed.join(", ")
                )))
            }
        },
    }
}

fn string_items(raw: Value) -> Result<Vec<Value>, String> {
    match raw {
        Value::Array(items) => {
            for item in &items {
                if !matches!(item, Value::String(_)) {
                    return Err(format!(
                        "expected strings, got {} element",
                        type_name(item)
                    ));
                }
            }
            Ok(items)
        }
        Value::String(s) => Ok(vec![Value::String(s)]),
        other => Err(format!(
            "expected a list of strings, got {}",
            type_name(&other)
        )),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "a string",
        Value::Integer(_) => "an integer",
        Value::Float(_) => "a float",
        Value::Boolean(_) => "a boolean",
        Value::Array(_) => "an array",
        Value::Table(_) => "a table",
        Value::Datetime(_) => "a datetime",
    }
}

fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
