//! RIPS document validation.
//!
//! [`validate`] re-walks a generated document and returns every finding in
//! document order. It never mutates the document and never fails: findings
//! are data, tagged error or warning.

pub mod codes;
mod engine;
pub mod record;
pub mod rules;

pub use engine::{STRUCTURE_RULE, ValidationOptions, validate, validate_with};
pub use rules::{Check, Rule, RuleEnv, Verdict};
