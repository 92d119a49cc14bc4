//! Schema-driven document interpreter.
//!
//! The interpreter walks the schema tree together with a mapping
//! configuration. Objects recurse with the same context, arrays fetch rows
//! and recurse once per row with that row layered onto the context, and
//! leaves resolve their binding against the context.
//!
//! A failing collaborator call never aborts the walk: the failure is logged
//! with the node path and table, and that node degrades to an empty array or
//! null.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use rips_model::{
    BindingSpec, ContextMode, ExecutionContext, LeafKind, MappingConfig, RipsDocument, Row,
    SchemaField, SchemaNode, SchemaPath, value_to_string,
};

use crate::derive;
use crate::join::{ColumnNameJoin, DateFilter, GlobalParams, JoinStrategy};
use crate::source::{DataSource, SourceResult};

/// Knobs that change how bindings resolve and rows are joined.
#[derive(Debug, Clone)]
pub struct InterpreterOptions {
    pub context_mode: ContextMode,
    pub join: Arc<dyn JoinStrategy>,
    pub date_filter: DateFilter,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            context_mode: ContextMode::default(),
            join: Arc::new(ColumnNameJoin::default()),
            date_filter: DateFilter::default(),
        }
    }
}

pub struct Interpreter<'a> {
    source: &'a dyn DataSource,
    mapping: &'a MappingConfig,
    params: &'a GlobalParams,
    options: &'a InterpreterOptions,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        source: &'a dyn DataSource,
        mapping: &'a MappingConfig,
        params: &'a GlobalParams,
        options: &'a InterpreterOptions,
    ) -> Self {
        Self {
            source,
            mapping,
            params,
            options,
        }
    }

    /// Interpret a whole schema into a document.
    pub fn run(&self, schema: &SchemaNode) -> RipsDocument {
        let root = self.interpret(schema, &SchemaPath::root(), &ExecutionContext::new(), None);
        RipsDocument::from_value(root)
    }

    /// Interpret one node. `ordinal` is the 1-based row number of the
    /// innermost enclosing array, if any.
    pub fn interpret(
        &self,
        node: &SchemaNode,
        path: &SchemaPath,
        context: &ExecutionContext,
        ordinal: Option<usize>,
    ) -> Value {
        match node {
            SchemaNode::Root(fields) | SchemaNode::Object(fields) => {
                Value::Object(self.interpret_fields(fields, path, context, ordinal))
            }
            SchemaNode::Array(fields) => self.interpret_array(fields, path, context),
            SchemaNode::Leaf(kind) => self.interpret_leaf(*kind, path, context, ordinal),
        }
    }

    fn interpret_fields(
        &self,
        fields: &[SchemaField],
        path: &SchemaPath,
        context: &ExecutionContext,
        ordinal: Option<usize>,
    ) -> Map<String, Value> {
        fields
            .iter()
            .map(|field| {
                let child = path.child(&field.name);
                let value = self.interpret(&field.node, &child, context, ordinal);
                (field.name.clone(), value)
            })
            .collect()
    }

    fn interpret_array(
        &self,
        fields: &[SchemaField],
        path: &SchemaPath,
        context: &ExecutionContext,
    ) -> Value {
        let table = match self.mapping.get(path) {
            Some(BindingSpec::ListSource { table }) => table,
            Some(other) => {
                warn!(path = %path, binding = other.label(), "array node is not bound to a list source");
                return Value::Array(Vec::new());
            }
            None => {
                debug!(path = %path, "array node has no binding");
                return Value::Array(Vec::new());
            }
        };

        let rows = match self.fetch(table, context) {
            Ok(rows) => rows,
            Err(error) => {
                warn!(path = %path, table = %table, error = %error, "row fetch failed, emitting empty array");
                return Value::Array(Vec::new());
            }
        };
        debug!(path = %path, table = %table, rows = rows.len(), "expanding array");

        let items = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| {
                let row_context = context.merged(table, row);
                Value::Object(self.interpret_fields(fields, path, &row_context, Some(index + 1)))
            })
            .collect();
        Value::Array(items)
    }

    fn fetch(&self, table: &str, context: &ExecutionContext) -> SourceResult<Vec<Row>> {
        let columns = self.source.columns_of(table)?;
        let mut predicates = Vec::new();
        predicates.extend(self.options.date_filter.predicate(&columns, self.params));
        predicates.extend(self.options.join.join_predicates(table, &columns, context));
        self.source.fetch_rows(table, &predicates)
    }

    fn interpret_leaf(
        &self,
        kind: LeafKind,
        path: &SchemaPath,
        context: &ExecutionContext,
        ordinal: Option<usize>,
    ) -> Value {
        if kind == LeafKind::Sequence {
            return ordinal.map_or(Value::Null, Value::from);
        }
        let Some(binding) = self.mapping.get(path) else {
            return Value::Null;
        };
        match binding {
            BindingSpec::Static { value } => value.clone(),
            BindingSpec::SourceField { table, column } | BindingSpec::LocalField { table, column } => {
                context
                    .resolve(self.options.context_mode, table, column)
                    .cloned()
                    .unwrap_or(Value::Null)
            }
            BindingSpec::ForeignLookup {
                source_column,
                ref_table,
                match_column,
                return_column,
            } => {
                let Some(key) = context.get(source_column).and_then(value_to_string) else {
                    return Value::Null;
                };
                match self.source.find_one(ref_table, match_column, &key) {
                    Ok(found) => found
                        .and_then(|mut row| row.remove(return_column))
                        .unwrap_or(Value::Null),
                    Err(error) => {
                        warn!(path = %path, table = %ref_table, error = %error, "reference lookup failed");
                        Value::Null
                    }
                }
            }
            BindingSpec::Derived { derivation } => derive::evaluate(derivation, context),
            BindingSpec::ListSource { table } => {
                warn!(path = %path, table = %table, "list source bound to a leaf");
                Value::Null
            }
        }
    }
}
