//! Declarative rule tables.
//!
//! Each record kind has an ordered table of [`Rule`]s. Findings come out in
//! table order for every record, so the order of the whole report follows
//! the document walk and the tables alone.

mod service;
mod transaction;
mod user;

use std::borrow::Cow;

use chrono::NaiveDate;
use serde_json::Value;

use rips_model::{Severity, ValidationError};

use crate::record::Record;

pub use service::{CONSULTATION_RULES, MEDICATION_RULES, PROCEDURE_RULES};
pub use transaction::TRANSACTION_RULES;
pub use user::USER_RULES;

/// Inputs shared by every rule in a run.
#[derive(Debug, Clone, Copy)]
pub struct RuleEnv {
    /// Date ages are computed against.
    pub reference_date: NaiveDate,
}

/// Outcome of a custom predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(Cow<'static, str>),
}

/// The predicate a rule applies to its field.
#[derive(Clone, Copy)]
pub enum Check {
    /// Non-blank.
    Required,
    /// Required, and exactly this many characters.
    ExactLength(usize),
    /// Required, and a length within the inclusive range.
    LengthBetween(usize, usize),
    /// Required, and a member of the set.
    OneOf(&'static [&'static str]),
    /// A string or null; never a number, bool or container.
    StringOrNull,
    /// Required, and a parseable date-time.
    DateTime,
    /// Required, and a parseable date.
    Date,
    /// When present, a number that is not negative.
    NonNegative,
    /// When present, an integer within the inclusive range.
    IntegerBetween(i64, i64),
    /// Equal to the record's 1-based position.
    Sequence,
    Custom(fn(&Record<'_>, &RuleEnv) -> Verdict),
}

pub struct Rule {
    pub id: &'static str,
    pub field: &'static str,
    /// Human-readable field name used in messages.
    pub label: &'static str,
    pub severity: Severity,
    pub check: Check,
}

impl Rule {
    pub const fn error(
        id: &'static str,
        field: &'static str,
        label: &'static str,
        check: Check,
    ) -> Self {
        Self {
            id,
            field,
            label,
            severity: Severity::Error,
            check,
        }
    }

    pub const fn warning(
        id: &'static str,
        field: &'static str,
        label: &'static str,
        check: Check,
    ) -> Self {
        Self {
            id,
            field,
            label,
            severity: Severity::Warning,
            check,
        }
    }

    /// Run this rule against one record, producing at most one finding.
    pub fn apply(
        &self,
        record: &Record<'_>,
        env: &RuleEnv,
        scope: &str,
    ) -> Option<ValidationError> {
        match self.evaluate(record, env) {
            Verdict::Pass => None,
            Verdict::Fail(message) => Some(ValidationError {
                rule: self.id.to_string(),
                scope: scope.to_string(),
                field: self.field.to_string(),
                message: message.into_owned(),
                value: record.value(self.field).clone(),
                severity: self.severity,
            }),
        }
    }

    fn evaluate(&self, record: &Record<'_>, env: &RuleEnv) -> Verdict {
        let label = self.label;
        let text = record.text(self.field);
        match self.check {
            Check::Required => match text {
                Some(_) => Verdict::Pass,
                None => required(label),
            },
            Check::ExactLength(length) => match text {
                None => required(label),
                Some(value) if value.chars().count() == length => Verdict::Pass,
                Some(_) => fail(format!("{label} must be exactly {length} characters")),
            },
            Check::LengthBetween(min, max) => match text {
                None => fail(format!("{label} must be between {min} and {max} characters")),
                Some(value) if (min..=max).contains(&value.chars().count()) => Verdict::Pass,
                Some(_) => fail(format!("{label} must be between {min} and {max} characters")),
            },
            Check::OneOf(allowed) => match text {
                None => required(label),
                Some(value) if allowed.contains(&value.as_str()) => Verdict::Pass,
                Some(value) => fail(format!(
                    "{label} '{value}' is not one of: {}",
                    allowed.join(", ")
                )),
            },
            Check::StringOrNull => match record.value(self.field) {
                Value::String(_) | Value::Null => Verdict::Pass,
                _ => fail(format!("{label} must be a string or null")),
            },
            Check::DateTime => match text {
                None => required(label),
                Some(_) if record.datetime(self.field).is_some() => Verdict::Pass,
                Some(value) => fail(format!("{label} '{value}' is not a valid date-time")),
            },
            Check::Date => match text {
                None => required(label),
                Some(_) if record.date(self.field).is_some() => Verdict::Pass,
                Some(value) => fail(format!("{label} '{value}' is not a valid date")),
            },
            Check::NonNegative => match (text, record.number(self.field)) {
                (None, _) => Verdict::Pass,
                (Some(_), Some(number)) if number >= 0.0 => Verdict::Pass,
                (Some(_), Some(_)) => fail(format!("{label} must not be negative")),
                (Some(_), None) => fail(format!("{label} must be a number")),
            },
            Check::IntegerBetween(min, max) => match (text, record.number(self.field)) {
                (None, _) => Verdict::Pass,
                (Some(_), Some(number))
                    if number.fract() == 0.0 && number >= min as f64 && number <= max as f64 =>
                {
                    Verdict::Pass
                }
                (Some(_), _) => fail(format!(
                    "{label} must be an integer between {min} and {max}"
                )),
            },
            Check::Sequence => {
                let expected = record.position() + 1;
                match record.number(self.field) {
                    Some(number) if number == expected as f64 => Verdict::Pass,
                    _ => fail(format!("{label} must be {expected}")),
                }
            }
            Check::Custom(predicate) => predicate(record, env),
        }
    }
}

pub(crate) fn fail(message: impl Into<Cow<'static, str>>) -> Verdict {
    Verdict::Fail(message.into())
}

fn required(label: &str) -> Verdict {
    fail(format!("{label} is required"))
}

/// Apply a rule table to one record. Every rule runs; nothing short-circuits.
pub fn apply_all(
    rules: &[Rule],
    record: &Record<'_>,
    env: &RuleEnv,
    scope: &str,
    findings: &mut Vec<ValidationError>,
) {
    for rule in rules {
        findings.extend(rule.apply(record, env, scope));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn env() -> RuleEnv {
        RuleEnv {
            reference_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        }
    }

    fn run(rule: &Rule, value: Value, position: usize) -> Option<ValidationError> {
        let map = json!({ "f": value });
        let record = Record::new(map.as_object().unwrap(), position);
        rule.apply(&record, &env(), "scope")
    }

    #[test]
    fn exact_length_distinguishes_missing_from_wrong() {
        let rule = Rule::error("T", "f", "Code", Check::ExactLength(3));
        assert_eq!(run(&rule, json!(null), 0).unwrap().message, "Code is required");
        assert_eq!(
            run(&rule, json!("ab"), 0).unwrap().message,
            "Code must be exactly 3 characters"
        );
        assert!(run(&rule, json!("abc"), 0).is_none());
    }

    #[test]
    fn non_negative_skips_missing_values() {
        let rule = Rule::error("T", "f", "Value", Check::NonNegative);
        assert!(run(&rule, json!(null), 0).is_none());
        assert!(run(&rule, json!(0), 0).is_none());
        assert!(run(&rule, json!("12.5"), 0).is_none());
        assert!(run(&rule, json!(-1), 0).is_some());
        assert!(run(&rule, json!("abc"), 0).is_some());
    }

    #[test]
    fn sequence_matches_position() {
        let rule = Rule::error("T", "f", "Consecutive", Check::Sequence);
        assert!(run(&rule, json!(3), 2).is_none());
        assert_eq!(
            run(&rule, json!(2), 2).unwrap().message,
            "Consecutive must be 3"
        );
    }

    #[test]
    fn finding_carries_rule_metadata() {
        let rule = Rule::warning("W1", "f", "Note", Check::Required);
        let finding = run(&rule, json!(""), 0).unwrap();
        assert_eq!(finding.rule, "W1");
        assert_eq!(finding.scope, "scope");
        assert_eq!(finding.field, "f");
        assert_eq!(finding.severity, Severity::Warning);
        assert_eq!(finding.value, json!(""));
    }
}
