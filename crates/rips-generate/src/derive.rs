//! Computed fields.

use serde_json::Value;

use rips_model::{Derivation, ExecutionContext, value_to_string};
use rips_validate::record::parse_datetime;

const SECONDS_PER_DAY: i64 = 86_400;

/// Evaluate a derivation against the current context.
pub fn evaluate(derivation: &Derivation, context: &ExecutionContext) -> Value {
    match derivation {
        Derivation::DaysBetween {
            start_column,
            end_column,
        } => {
            let start = context.get(start_column).and_then(value_to_string);
            let end = context.get(end_column).and_then(value_to_string);
            match (start, end) {
                (Some(start), Some(end)) => {
                    days_between(&start, &end).map_or(Value::Null, Value::from)
                }
                _ => Value::Null,
            }
        }
        Derivation::Fallback { column, default } => match context.get(column) {
            Some(value) if !is_blank(value) => value.clone(),
            _ => default.clone(),
        },
    }
}

/// Ceiling of whole days from `start` to `end`. Either side may be a date or
/// a date-time; `None` when either fails to parse.
pub fn days_between(start: &str, end: &str) -> Option<i64> {
    let start = parse_datetime(start)?;
    let end = parse_datetime(end)?;
    let seconds = (end - start).num_seconds();
    let partial = seconds.rem_euclid(SECONDS_PER_DAY) != 0;
    Some(seconds.div_euclid(SECONDS_PER_DAY) + i64::from(partial))
}

fn is_blank(value: &Value) -> bool {
    value_to_string(value).is_none_or(|text| text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use rips_model::Row;

    use super::*;

    #[test]
    fn days_round_up_partial_days() {
        assert_eq!(days_between("2024-01-01", "2024-01-04"), Some(3));
        assert_eq!(days_between("2024-01-01 08:00", "2024-01-04 09:00"), Some(4));
        assert_eq!(days_between("2024-01-01", "2024-01-01"), Some(0));
        assert_eq!(days_between("2024-01-01", "soon"), None);
    }

    #[test]
    fn fallback_replaces_blank_values() {
        let mut row = Row::new();
        row.insert("route".to_string(), json!("  "));
        row.insert("cause".to_string(), json!("21"));
        let context = ExecutionContext::new().merged("form_encounter", row);

        let fallback = |column: &str| Derivation::Fallback {
            column: column.to_string(),
            default: json!("38"),
        };
        assert_eq!(evaluate(&fallback("route"), &context), json!("38"));
        assert_eq!(evaluate(&fallback("cause"), &context), json!("21"));
        assert_eq!(evaluate(&fallback("missing"), &context), json!("38"));
    }

    #[test]
    fn days_between_reads_context_columns() {
        let mut row = Row::new();
        row.insert("start_date".to_string(), json!("2024-02-01"));
        row.insert("end_date".to_string(), json!("2024-02-11"));
        let context = ExecutionContext::new().merged("prescriptions", row);
        let derivation = Derivation::DaysBetween {
            start_column: "start_date".to_string(),
            end_column: "end_date".to_string(),
        };
        assert_eq!(evaluate(&derivation, &context), json!(10));
    }
}
