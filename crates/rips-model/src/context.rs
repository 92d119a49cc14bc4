//! Row context accumulated while walking the schema.
//!
//! Each array level pushes the current row as a frame. Lookups search from
//! the innermost frame outwards, which is the same as a shallow merge where
//! the child row wins on name collisions.
//!
//! That shadowing is kept for compatibility with existing mapping
//! configurations, but it is a hazard: a `date` column on a service row hides
//! the encounter's `date` silently. [`ContextMode::Namespaced`] resolves
//! table-qualified bindings only against frames of that table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A fetched row: column name to scalar value.
pub type Row = BTreeMap<String, Value>;

/// Field resolution policy for table-qualified bindings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    /// Innermost frame holding the column wins, whatever its table.
    #[default]
    Shadowing,
    /// Only frames fetched from the binding's table are consulted.
    Namespaced,
}

#[derive(Debug, Clone, PartialEq)]
struct Frame {
    table: String,
    row: Row,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    frames: Vec<Frame>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context seeded with caller-supplied values (no table).
    pub fn with_values(values: Row) -> Self {
        Self {
            frames: vec![Frame {
                table: String::new(),
                row: values,
            }],
        }
    }

    /// Child context with `row` from `table` layered on top.
    #[must_use]
    pub fn merged(&self, table: &str, row: Row) -> Self {
        let mut frames = self.frames.clone();
        frames.push(Frame {
            table: table.to_string(),
            row,
        });
        Self { frames }
    }

    /// Shadowing lookup: the innermost frame holding `column`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.row.get(column))
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Lookup restricted to frames fetched from `table`.
    pub fn get_qualified(&self, table: &str, column: &str) -> Option<&Value> {
        self.frames
            .iter()
            .rev()
            .filter(|frame| frame.table == table)
            .find_map(|frame| frame.row.get(column))
    }

    /// Resolve a table-qualified binding according to `mode`.
    pub fn resolve(&self, mode: ContextMode, table: &str, column: &str) -> Option<&Value> {
        match mode {
            ContextMode::Shadowing => self.get(column),
            ContextMode::Namespaced => self.get_qualified(table, column),
        }
    }

    /// The merged view as a single map.
    pub fn flatten(&self) -> Row {
        let mut out = Row::new();
        for frame in &self.frames {
            for (key, value) in &frame.row {
                out.insert(key.clone(), value.clone());
            }
        }
        out
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Render a scalar the way reference lookups and string comparisons see it.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}
