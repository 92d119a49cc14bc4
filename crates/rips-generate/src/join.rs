//! Predicate construction for array nodes.
//!
//! Two independent filters apply when an array node fetches its rows: a date
//! range from the caller's [`GlobalParams`], and a parent-child join chosen by
//! a [`JoinStrategy`]. The default strategy infers joins from column-name
//! coincidence; [`DeclaredJoins`] replaces the guess with explicit keys.

use std::collections::BTreeMap;
use std::fmt::Debug;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use rips_model::ExecutionContext;

use crate::source::{ColumnInfo, Predicate};

pub const DEFAULT_DATE_COLUMNS: &[&str] = &["date", "date_service"];
pub const DEFAULT_KEY_COLUMNS: &[&str] = &["pid", "encounter"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Caller-supplied parameters for one generation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalParams {
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

impl GlobalParams {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            date_range: Some(DateRange { start, end }),
        }
    }
}

/// Decides which equality predicates tie a child table to its context.
pub trait JoinStrategy: Send + Sync + Debug {
    fn join_predicates(
        &self,
        table: &str,
        columns: &[ColumnInfo],
        context: &ExecutionContext,
    ) -> Vec<Predicate>;

    fn name(&self) -> &'static str;
}

fn has_column(columns: &[ColumnInfo], name: &str) -> bool {
    columns.iter().any(|c| c.name == name)
}

/// Joins on every key column the table has and the context already holds.
///
/// This is a guess: any table that happens to carry a `pid` column is joined
/// to whatever `pid` the context holds, related or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNameJoin {
    key_columns: Vec<String>,
}

impl ColumnNameJoin {
    pub fn new(key_columns: Vec<String>) -> Self {
        Self { key_columns }
    }
}

impl Default for ColumnNameJoin {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_COLUMNS.iter().map(|c| (*c).to_string()).collect())
    }
}

impl JoinStrategy for ColumnNameJoin {
    fn join_predicates(
        &self,
        _table: &str,
        columns: &[ColumnInfo],
        context: &ExecutionContext,
    ) -> Vec<Predicate> {
        self.key_columns
            .iter()
            .filter(|key| has_column(columns, key))
            .filter_map(|key| {
                context
                    .get(key)
                    .map(|value| Predicate::equals(key.clone(), value.clone()))
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "column_name"
    }
}

/// One declared join: `column` of the child table equals `context_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinKey {
    pub column: String,
    pub context_key: String,
}

impl JoinKey {
    pub fn new(column: &str, context_key: &str) -> Self {
        Self {
            column: column.to_string(),
            context_key: context_key.to_string(),
        }
    }
}

/// Joins taken from configuration. Undeclared tables are not filtered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredJoins {
    joins: BTreeMap<String, Vec<JoinKey>>,
}

impl DeclaredJoins {
    pub fn new(joins: BTreeMap<String, Vec<JoinKey>>) -> Self {
        Self { joins }
    }

    #[must_use]
    pub fn with(mut self, table: &str, key: JoinKey) -> Self {
        self.joins.entry(table.to_string()).or_default().push(key);
        self
    }
}

impl JoinStrategy for DeclaredJoins {
    fn join_predicates(
        &self,
        table: &str,
        columns: &[ColumnInfo],
        context: &ExecutionContext,
    ) -> Vec<Predicate> {
        let Some(keys) = self.joins.get(table) else {
            return Vec::new();
        };
        keys.iter()
            .filter(|key| has_column(columns, &key.column))
            .filter_map(|key| {
                context
                    .get(&key.context_key)
                    .map(|value| Predicate::equals(key.column.clone(), value.clone()))
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "declared"
    }
}

/// Picks the first date-like column a table has for the run's date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFilter {
    columns: Vec<String>,
}

impl DateFilter {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// The range predicate for `columns`, if the run has a range and the
    /// table has a date-like column. The end day is inclusive.
    pub fn predicate(&self, columns: &[ColumnInfo], params: &GlobalParams) -> Option<Predicate> {
        let range = params.date_range?;
        let column = self.columns.iter().find(|c| has_column(columns, c))?;
        Some(Predicate::between(
            column.clone(),
            range.start.format("%Y-%m-%d").to_string(),
            format!("{} 23:59:59", range.end.format("%Y-%m-%d")),
        ))
    }
}

impl Default for DateFilter {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_COLUMNS.iter().map(|c| (*c).to_string()).collect())
    }
}
