//! Binding vocabulary and mapping configuration.
//!
//! A mapping configuration assigns a [`BindingSpec`] to schema paths. The
//! stored JSON form is a flat object keyed by dot-joined paths:
//!
//! ```json
//! {
//!   "transaccion.usuarios": { "type": "list_source", "table": "patient_data" },
//!   "transaccion.usuarios.codSexo": { "type": "source_field", "table": "patient_data", "column": "sex" },
//!   "transaccion.tipoNota": "RS"
//! }
//! ```
//!
//! A bare scalar is read as a static literal.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ModelError, Result};
use crate::path::SchemaPath;
use crate::schema::SchemaNode;

/// How a single schema node obtains its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum BindingSpec {
    /// A literal stored in the configuration.
    Static { value: Value },
    /// A column of a row fetched from the external source.
    SourceField { table: String, column: String },
    /// A column of a row fetched from a local table.
    LocalField { table: String, column: String },
    /// Follow a context value into a reference table.
    ForeignLookup {
        source_column: String,
        ref_table: String,
        match_column: String,
        return_column: String,
    },
    /// Repeat an array node once per row of `table`.
    ListSource { table: String },
    /// A value computed from context fields.
    Derived { derivation: Derivation },
}

impl BindingSpec {
    pub fn is_list_source(&self) -> bool {
        matches!(self, Self::ListSource { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Static { .. } => "static",
            Self::SourceField { .. } => "source_field",
            Self::LocalField { .. } => "local_field",
            Self::ForeignLookup { .. } => "foreign_lookup",
            Self::ListSource { .. } => "list_source",
            Self::Derived { .. } => "derived",
        }
    }
}

/// Computed-field functions available to [`BindingSpec::Derived`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Derivation {
    /// Ceiling of whole days between two date columns.
    DaysBetween {
        start_column: String,
        end_column: String,
    },
    /// The context value of `column`, or `default` when it is null or blank.
    Fallback { column: String, default: Value },
}

/// Why a binding does not fit the node it is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A `list_source` binding on something other than an array.
    ListSourceOutsideArray,
    /// An array bound to anything but `list_source`.
    ArrayWithoutListSource,
    /// The path does not exist in the schema.
    UnknownPath,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingViolation {
    pub path: SchemaPath,
    pub kind: ViolationKind,
}

impl fmt::Display for BindingViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.kind {
            ViolationKind::ListSourceOutsideArray => "list_source is only valid on array nodes",
            ViolationKind::ArrayWithoutListSource => "array nodes must be bound to list_source",
            ViolationKind::UnknownPath => "path is not part of the schema",
        };
        write!(f, "{}: {reason}", self.path)
    }
}

/// Mapping from schema path to binding. Key order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "BTreeMap<SchemaPath, Value>")]
pub struct MappingConfig {
    bindings: BTreeMap<SchemaPath, BindingSpec>,
}

impl MappingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the stored JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<SchemaPath, Value> = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builder-style insert keyed by a dot-joined path.
    pub fn with(mut self, path: &str, binding: BindingSpec) -> Result<Self> {
        self.insert(SchemaPath::parse(path)?, binding);
        Ok(self)
    }

    pub fn insert(&mut self, path: SchemaPath, binding: BindingSpec) -> Option<BindingSpec> {
        self.bindings.insert(path, binding)
    }

    pub fn get(&self, path: &SchemaPath) -> Option<&BindingSpec> {
        self.bindings.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SchemaPath, &BindingSpec)> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Report bindings that do not fit the node kind they are attached to.
    pub fn check_against(&self, schema: &SchemaNode) -> Vec<BindingViolation> {
        let mut violations = Vec::new();
        for (path, binding) in &self.bindings {
            let kind = match schema.find(path) {
                None => Some(ViolationKind::UnknownPath),
                Some(node) if node.is_array() && !binding.is_list_source() => {
                    Some(ViolationKind::ArrayWithoutListSource)
                }
                Some(node) if !node.is_array() && binding.is_list_source() => {
                    Some(ViolationKind::ListSourceOutsideArray)
                }
                Some(_) => None,
            };
            if let Some(kind) = kind {
                violations.push(BindingViolation {
                    path: path.clone(),
                    kind,
                });
            }
        }
        violations
    }
}

impl Serialize for MappingConfig {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bindings.serialize(serializer)
    }
}

impl TryFrom<BTreeMap<SchemaPath, Value>> for MappingConfig {
    type Error = ModelError;

    fn try_from(raw: BTreeMap<SchemaPath, Value>) -> Result<Self> {
        let mut bindings = BTreeMap::new();
        for (path, value) in raw {
            let binding = match value {
                Value::Object(_) => serde_json::from_value(value).map_err(|error| {
                    ModelError::Message(format!("invalid binding at '{path}': {error}"))
                })?,
                Value::Array(_) => {
                    return Err(ModelError::Message(format!(
                        "invalid binding at '{path}': arrays are not bindings"
                    )));
                }
                literal => BindingSpec::Static { value: literal },
            };
            bindings.insert(path, binding);
        }
        Ok(Self { bindings })
    }
}
