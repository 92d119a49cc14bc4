//! Typed clinical records for the selection pipeline.
//!
//! [`ClinicalSource`] is the batch contract the pipeline consumes: each
//! method is one call covering every id it is given. [`EmrTables`] answers
//! it from any [`RowSource`] laid out like the EMR database.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use rips_model::{Row, value_to_string};

use crate::source::{Predicate, RowSource, SourceResult};

/// EMR table and column names.
pub mod emr {
    pub const FACILITY_TABLE: &str = "facility";
    pub const PATIENT_TABLE: &str = "patient_data";
    pub const ENCOUNTER_TABLE: &str = "form_encounter";
    pub const BILLING_TABLE: &str = "billing";
    pub const PRESCRIPTION_TABLE: &str = "prescriptions";
    pub const PROVIDER_TABLE: &str = "users";

    /// Billing code types that carry diagnoses.
    pub const DIAGNOSIS_CODE_TYPES: &[&str] = &["ICD10"];
    /// Billing code types that carry procedures.
    pub const PROCEDURE_CODE_TYPES: &[&str] = &["CUPS", "CPT4"];
    /// Billing code type of the consultation itself.
    pub const CONSULTATION_CODE_TYPE: &str = "CONSULTA";
    /// Billing option recording whether the patient is unable to work.
    pub const UNABLE_TO_WORK_CODE_TYPE: &str = "INCAPACIDAD";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    pub name: Option<String>,
    pub tax_id: Option<String>,
    /// Twelve-character provider registration code.
    pub provider_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub pid: String,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    pub user_type: Option<String>,
    pub birth_date: Option<String>,
    pub sex: Option<String>,
    pub country: Option<String>,
    pub municipality: Option<String>,
    pub zone: Option<String>,
    pub country_of_origin: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub encounter: String,
    pub pid: String,
    pub date: Option<String>,
    pub provider_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingLine {
    pub encounter: String,
    pub pid: String,
    pub code_type: String,
    pub code: String,
    pub fee: f64,
    pub date: Option<String>,
}

impl BillingLine {
    pub fn is_diagnosis(&self) -> bool {
        emr::DIAGNOSIS_CODE_TYPES.contains(&self.code_type.as_str())
    }

    pub fn is_procedure(&self) -> bool {
        emr::PROCEDURE_CODE_TYPES.contains(&self.code_type.as_str())
    }

    pub fn is_consultation(&self) -> bool {
        self.code_type == emr::CONSULTATION_CODE_TYPE
    }

    pub fn is_unable_to_work_option(&self) -> bool {
        self.code_type == emr::UNABLE_TO_WORK_CODE_TYPE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: String,
    pub pid: String,
    pub encounter: String,
    pub drug: Option<String>,
    pub drug_code: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub strength: Option<String>,
    pub unit: Option<String>,
    pub form: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
}

pub trait ClinicalSource: Send + Sync {
    fn primary_facility(&self) -> SourceResult<Option<Facility>>;
    fn patients(&self, pids: &[String]) -> SourceResult<Vec<Patient>>;
    /// Every encounter of the given patients.
    fn encounters(&self, pids: &[String]) -> SourceResult<Vec<Encounter>>;
    fn billing_lines(&self, encounters: &[String]) -> SourceResult<Vec<BillingLine>>;
    fn prescriptions(&self, encounters: &[String]) -> SourceResult<Vec<Prescription>>;
    fn providers(&self, ids: &[String]) -> SourceResult<Vec<Provider>>;
}

/// [`ClinicalSource`] over EMR-shaped tables.
#[derive(Debug)]
pub struct EmrTables<S: ?Sized> {
    source: Arc<S>,
}

impl<S: ?Sized> EmrTables<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }
}

impl<S: RowSource + ?Sized> EmrTables<S> {
    fn fetch_in(&self, table: &str, column: &str, ids: &[String]) -> SourceResult<Vec<Row>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let values = ids.iter().cloned().map(Value::String).collect();
        self.source
            .fetch_rows(table, &[Predicate::any_of(column, values)])
    }
}

impl<S: RowSource + ?Sized> ClinicalSource for EmrTables<S> {
    fn primary_facility(&self) -> SourceResult<Option<Facility>> {
        let rows = self.source.fetch_rows(emr::FACILITY_TABLE, &[])?;
        let primary = rows
            .iter()
            .find(|row| flag(row, "primary_business_entity"))
            .or_else(|| rows.first());
        Ok(primary.map(|row| Facility {
            id: key(row, "id"),
            name: text(row, "name"),
            tax_id: text(row, "federal_ein"),
            provider_code: text(row, "facility_code"),
        }))
    }

    fn patients(&self, pids: &[String]) -> SourceResult<Vec<Patient>> {
        let rows = self.fetch_in(emr::PATIENT_TABLE, "pid", pids)?;
        Ok(rows
            .iter()
            .map(|row| Patient {
                pid: key(row, "pid"),
                document_type: text(row, "document_type"),
                document_number: text(row, "pubpid"),
                user_type: text(row, "user_type"),
                birth_date: text(row, "DOB"),
                sex: text(row, "sex"),
                country: text(row, "country_code"),
                municipality: text(row, "municipality_code"),
                zone: text(row, "zone_code"),
                country_of_origin: text(row, "origin_country_code"),
            })
            .collect())
    }

    fn encounters(&self, pids: &[String]) -> SourceResult<Vec<Encounter>> {
        let rows = self.fetch_in(emr::ENCOUNTER_TABLE, "pid", pids)?;
        Ok(rows
            .iter()
            .map(|row| Encounter {
                encounter: key(row, "encounter"),
                pid: key(row, "pid"),
                date: text(row, "date"),
                provider_id: text(row, "provider_id"),
            })
            .collect())
    }

    fn billing_lines(&self, encounters: &[String]) -> SourceResult<Vec<BillingLine>> {
        let rows = self.fetch_in(emr::BILLING_TABLE, "encounter", encounters)?;
        Ok(rows
            .iter()
            .filter(|row| !row.contains_key("activity") || flag(row, "activity"))
            .map(|row| BillingLine {
                encounter: key(row, "encounter"),
                pid: key(row, "pid"),
                code_type: key(row, "code_type"),
                code: key(row, "code"),
                fee: number(row, "fee"),
                date: text(row, "date"),
            })
            .collect())
    }

    fn prescriptions(&self, encounters: &[String]) -> SourceResult<Vec<Prescription>> {
        let rows = self.fetch_in(emr::PRESCRIPTION_TABLE, "encounter", encounters)?;
        Ok(rows
            .iter()
            .map(|row| Prescription {
                id: key(row, "id"),
                pid: key(row, "patient_id"),
                encounter: key(row, "encounter"),
                drug: text(row, "drug"),
                drug_code: text(row, "rxnorm_drugcode"),
                start_date: text(row, "start_date"),
                end_date: text(row, "end_date"),
                quantity: number(row, "quantity"),
                unit_price: number(row, "price"),
                strength: text(row, "size"),
                unit: text(row, "unit"),
                form: text(row, "form"),
            })
            .collect())
    }

    fn providers(&self, ids: &[String]) -> SourceResult<Vec<Provider>> {
        let rows = self.fetch_in(emr::PROVIDER_TABLE, "id", ids)?;
        Ok(rows
            .iter()
            .map(|row| Provider {
                id: key(row, "id"),
                document_type: text(row, "document_type"),
                document_number: text(row, "federaltaxid"),
            })
            .collect())
    }
}

/// Trimmed text; `None` when null or blank.
fn text(row: &Row, column: &str) -> Option<String> {
    let value = row.get(column).and_then(value_to_string)?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Identifier columns; empty when absent.
fn key(row: &Row, column: &str) -> String {
    text(row, column).unwrap_or_default()
}

fn number(row: &Row, column: &str) -> f64 {
    match row.get(column) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn flag(row: &Row, column: &str) -> bool {
    match row.get(column) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(s.trim(), "1" | "true" | "yes"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::memory::MemoryDataSource;

    use super::*;

    fn rows(values: Value) -> Vec<Row> {
        serde_json::from_value(values).unwrap()
    }

    #[test]
    fn primary_facility_prefers_flagged_row() {
        let source = MemoryDataSource::new().with_table(
            emr::FACILITY_TABLE,
            rows(json!([
                {"id": 1, "name": "Annex", "primary_business_entity": 0},
                {"id": 2, "name": "Main", "federal_ein": "900123456", "primary_business_entity": 1}
            ])),
        );
        let facility = EmrTables::new(Arc::new(source))
            .primary_facility()
            .unwrap()
            .unwrap();
        assert_eq!(facility.id, "2");
        assert_eq!(facility.tax_id.as_deref(), Some("900123456"));
    }

    #[test]
    fn billing_skips_inactive_lines_and_empty_requests() {
        let source = MemoryDataSource::new().with_table(
            emr::BILLING_TABLE,
            rows(json!([
                {"encounter": 5, "pid": 1, "code_type": "ICD10", "code": "J00X", "fee": 0, "activity": 1},
                {"encounter": 5, "pid": 1, "code_type": "CUPS", "code": "903841", "fee": "12000", "activity": 0}
            ])),
        );
        let tables = EmrTables::new(Arc::new(source));
        let lines = tables.billing_lines(&["5".to_string()]).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].is_diagnosis());
        assert!(tables.billing_lines(&[]).unwrap().is_empty());
    }
}
