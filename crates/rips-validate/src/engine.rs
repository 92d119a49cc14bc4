//! Document walk.
//!
//! The walk visits the transaction, then each user in array order, then each
//! user's consultations, procedures and medications. Rule tables run against
//! every record; only the structural gate at the top stops the walk early.

use chrono::{Local, NaiveDate};
use serde_json::{Map, Value};
use tracing::{debug, info};

use rips_model::document::{
    CONSULTATIONS_KEY, MEDICATIONS_KEY, PROCEDURES_KEY, SERVICES_KEY, TRANSACTION_KEY, USERS_KEY,
};
use rips_model::{RipsDocument, Severity, ValidationError, error_count, warning_count};

use crate::record::Record;
use crate::rules::{
    CONSULTATION_RULES, MEDICATION_RULES, PROCEDURE_RULES, Rule, RuleEnv, TRANSACTION_RULES,
    USER_RULES, apply_all,
};

/// Rule id for findings about the document's shape rather than its values.
pub const STRUCTURE_RULE: &str = "DOC-STRUCTURE";

/// Service arrays that carry rules, in walk order.
static SERVICE_TABLES: &[(&str, &[Rule])] = &[
    (CONSULTATIONS_KEY, CONSULTATION_RULES),
    (PROCEDURES_KEY, PROCEDURE_RULES),
    (MEDICATIONS_KEY, MEDICATION_RULES),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Date ages are computed against.
    pub reference_date: NaiveDate,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            reference_date: Local::now().date_naive(),
        }
    }
}

/// Validate a document against today's date.
pub fn validate(document: &RipsDocument) -> Vec<ValidationError> {
    validate_with(document, &ValidationOptions::default())
}

/// Validate a document. Findings follow document order.
pub fn validate_with(document: &RipsDocument, options: &ValidationOptions) -> Vec<ValidationError> {
    let env = RuleEnv {
        reference_date: options.reference_date,
    };
    let mut findings = Vec::new();

    let Some(transaction) = document.transaction() else {
        findings.push(structural(
            "document",
            TRANSACTION_KEY,
            "Transaction object is missing",
            document.root().get(TRANSACTION_KEY).cloned().unwrap_or(Value::Null),
        ));
        return findings;
    };
    let Some(users) = transaction.get(USERS_KEY).and_then(Value::as_array) else {
        findings.push(structural(
            TRANSACTION_KEY,
            USERS_KEY,
            "Users must be an array",
            transaction.get(USERS_KEY).cloned().unwrap_or(Value::Null),
        ));
        return findings;
    };

    apply_all(
        TRANSACTION_RULES,
        &Record::new(transaction, 0),
        &env,
        TRANSACTION_KEY,
        &mut findings,
    );

    for (index, user) in users.iter().enumerate() {
        let scope = format!("{TRANSACTION_KEY}.{USERS_KEY}[{index}]");
        let Some(user) = user.as_object() else {
            findings.push(structural(
                &scope,
                USERS_KEY,
                "User must be an object",
                user.clone(),
            ));
            continue;
        };
        apply_all(USER_RULES, &Record::new(user, index), &env, &scope, &mut findings);
        validate_services(user, &scope, &env, &mut findings);
    }

    info!(
        users = users.len(),
        errors = error_count(&findings),
        warnings = warning_count(&findings),
        "validation complete"
    );
    findings
}

fn validate_services(
    user: &Map<String, Value>,
    user_scope: &str,
    env: &RuleEnv,
    findings: &mut Vec<ValidationError>,
) {
    let Some(services) = user.get(SERVICES_KEY).and_then(Value::as_object) else {
        findings.push(structural(
            user_scope,
            SERVICES_KEY,
            "Services must be an object",
            user.get(SERVICES_KEY).cloned().unwrap_or(Value::Null),
        ));
        return;
    };
    let scope = format!("{user_scope}.{SERVICES_KEY}");

    for (key, rules) in SERVICE_TABLES {
        let items = match services.get(*key) {
            None | Some(Value::Null) => continue,
            Some(Value::Array(items)) => items,
            Some(other) => {
                findings.push(structural(
                    &scope,
                    key,
                    "Service list must be an array",
                    other.clone(),
                ));
                continue;
            }
        };
        debug!(scope = %scope, service = key, count = items.len(), "validating services");
        for (index, item) in items.iter().enumerate() {
            let item_scope = format!("{scope}.{key}[{index}]");
            match item.as_object() {
                Some(fields) => {
                    apply_all(rules, &Record::new(fields, index), env, &item_scope, findings)
                }
                None => findings.push(structural(
                    &item_scope,
                    key,
                    "Service record must be an object",
                    item.clone(),
                )),
            }
        }
    }
}

fn structural(scope: &str, field: &str, message: &str, value: Value) -> ValidationError {
    ValidationError {
        rule: STRUCTURE_RULE.to_string(),
        scope: scope.to_string(),
        field: field.to_string(),
        message: message.to_string(),
        value,
        severity: Severity::Error,
    }
}
