//! Selection-based pipeline.
//!
//! Maps an explicit list of patient/encounter selections straight into the
//! typed [`Transaction`]. All reads are batched: phase one fetches the
//! facility, patients and encounters; phase two fetches billing lines,
//! prescriptions and providers for the encounters phase one resolved. Each
//! phase runs its fetches on scoped threads and merges the results only
//! after every fetch has returned.

use std::collections::{BTreeMap, BTreeSet};
use std::thread::{self, ScopedJoinHandle};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use rips_model::{
    Consultation, Medication, Procedure, Services, Transaction, User, value_to_string,
};
use rips_validate::record::parse_datetime;

use crate::clinical::{
    BillingLine, ClinicalSource, Encounter, Facility, Patient, Prescription, Provider,
};
use crate::derive::days_between;
use crate::error::{GenerateError, Result, SourceError};
use crate::source::{ReferenceTableStore, SourceResult, YesNoRow, default_yes_no_rows};

/// Codes the EMR does not carry; every generated record uses these.
pub mod defaults {
    pub const MODALITY: &str = "01";
    pub const SERVICE_GROUP: &str = "01";
    pub const SERVICE_CODE: u32 = 334;
    pub const PURPOSE: &str = "44";
    pub const CAUSE: &str = "38";
    pub const PRINCIPAL_DIAGNOSIS_TYPE: &str = "01";
    pub const ENTRY_ROUTE: &str = "02";
    pub const COLLECTION_CONCEPT: &str = "05";
    pub const MEDICATION_TYPE: &str = "01";
    pub const NOTE_TYPE: &str = "RS";
}

/// How many related diagnoses a consultation carries.
const RELATED_DIAGNOSES: usize = 3;

/// One patient and the encounters to report for them. Ids may be given as
/// JSON strings or numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    #[serde(deserialize_with = "id_from_scalar")]
    pub patient_id: String,
    #[serde(default, deserialize_with = "ids_from_scalars")]
    pub encounter_ids: Vec<String>,
}

fn scalar_id<E: serde::de::Error>(value: &Value) -> std::result::Result<String, E> {
    match value {
        Value::String(_) | Value::Number(_) => {
            value_to_string(value).ok_or_else(|| E::custom("empty id"))
        }
        other => Err(E::custom(format!("expected a string or number id, got {other}"))),
    }
}

fn id_from_scalar<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    scalar_id(&Value::deserialize(deserializer)?)
}

fn ids_from_scalars<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<String>, D::Error> {
    Vec::<Value>::deserialize(deserializer)?
        .iter()
        .map(scalar_id)
        .collect()
}

impl Selection {
    pub fn new(patient_id: &str, encounter_ids: &[&str]) -> Self {
        Self {
            patient_id: patient_id.to_string(),
            encounter_ids: encounter_ids.iter().map(|e| (*e).to_string()).collect(),
        }
    }
}

/// Compact description of a selection list for error messages.
pub fn describe_selections(selections: &[Selection]) -> String {
    selections
        .iter()
        .map(|s| format!("{}:{}", s.patient_id, s.encounter_ids.join("|")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Everything fetched for one run, keyed for lookup.
#[derive(Debug, Default)]
struct Batch {
    facility: Option<Facility>,
    patients: BTreeMap<String, Patient>,
    /// Keyed by `(pid, encounter)` so an encounter only reaches its owner.
    encounters: BTreeMap<(String, String), Encounter>,
    billing: BTreeMap<(String, String), Vec<BillingLine>>,
    prescriptions: BTreeMap<(String, String), Vec<Prescription>>,
    providers: BTreeMap<String, Provider>,
}

/// The yes/no codes used for the disability flag.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DisabilityCodes {
    yes: String,
    no: String,
}

pub struct DirectPipeline<'a> {
    clinical: &'a dyn ClinicalSource,
    reference: &'a dyn ReferenceTableStore,
}

impl<'a> DirectPipeline<'a> {
    pub fn new(clinical: &'a dyn ClinicalSource, reference: &'a dyn ReferenceTableStore) -> Self {
        Self {
            clinical,
            reference,
        }
    }

    /// Build the transaction for `selections`.
    ///
    /// Any failure is logged with the selections and returned whole; no
    /// partial transaction is ever produced.
    pub fn build(&self, selections: &[Selection]) -> Result<Transaction> {
        self.build_inner(selections).map_err(|err| {
            let described = describe_selections(selections);
            error!(selections = %described, error = %err, "selection pipeline failed");
            match err {
                GenerateError::Source(source) => GenerateError::SelectionFailed {
                    selections: described,
                    message: source.to_string(),
                },
                other => other,
            }
        })
    }

    fn build_inner(&self, selections: &[Selection]) -> Result<Transaction> {
        let codes = self.disability_codes()?;
        let batch = self.fetch_batch(selections)?;

        let mut users = Vec::new();
        for selection in selections {
            let Some(patient) = batch.patients.get(&selection.patient_id) else {
                warn!(patient = %selection.patient_id, "selected patient not found, skipping");
                continue;
            };
            let consecutive = users.len() as u32 + 1;
            users.push(build_user(&batch, &codes, patient, selection, consecutive));
        }
        info!(users = users.len(), "selection pipeline built users");

        let facility = batch.facility.as_ref();
        Ok(Transaction {
            obligated_party_id: facility.and_then(|f| f.tax_id.clone()),
            invoice_number: None,
            note_type: Some(defaults::NOTE_TYPE.to_string()),
            note_number: None,
            users,
        })
    }

    /// Yes/no codes from the reference table, seeding it on first use.
    fn disability_codes(&self) -> Result<DisabilityCodes> {
        let mut rows = self.reference.yes_no_rows()?;
        if rows.is_empty() {
            rows = default_yes_no_rows();
            self.reference.insert_yes_no_rows(&rows)?;
            info!(rows = rows.len(), "seeded yes/no reference table");
        }
        let pick = |affirmative: bool| match rows.iter().find(|row| row.affirmative == affirmative) {
            Some(row) => row.code.clone(),
            None => {
                warn!(affirmative, "yes/no reference table lacks a row, using default");
                default_code(affirmative)
            }
        };
        Ok(DisabilityCodes {
            yes: pick(true),
            no: pick(false),
        })
    }

    fn fetch_batch(&self, selections: &[Selection]) -> Result<Batch> {
        let pids = unique(selections.iter().map(|s| s.patient_id.clone()));
        let requested: BTreeSet<(&str, &str)> = selections
            .iter()
            .flat_map(|s| {
                s.encounter_ids
                    .iter()
                    .map(move |e| (s.patient_id.as_str(), e.as_str()))
            })
            .collect();

        let clinical = self.clinical;
        let (facility, patients, encounters) = thread::scope(|scope| {
            let facility = scope.spawn(|| clinical.primary_facility());
            let patients = scope.spawn(|| clinical.patients(&pids));
            let encounters = scope.spawn(|| clinical.encounters(&pids));
            (
                joined(facility, "facility"),
                joined(patients, "patients"),
                joined(encounters, "encounters"),
            )
        });

        let mut batch = Batch {
            facility: facility?,
            ..Batch::default()
        };
        for patient in patients? {
            batch.patients.entry(patient.pid.clone()).or_insert(patient);
        }
        for encounter in encounters? {
            if requested.contains(&(encounter.pid.as_str(), encounter.encounter.as_str())) {
                batch.encounters.insert(
                    (encounter.pid.clone(), encounter.encounter.clone()),
                    encounter,
                );
            }
        }

        let encounter_ids = unique(batch.encounters.values().map(|e| e.encounter.clone()));
        let provider_ids = unique(
            batch
                .encounters
                .values()
                .filter_map(|e| e.provider_id.clone()),
        );
        debug!(
            patients = batch.patients.len(),
            encounters = encounter_ids.len(),
            providers = provider_ids.len(),
            "phase one complete"
        );

        let (billing, prescriptions, providers) = thread::scope(|scope| {
            let billing = scope.spawn(|| clinical.billing_lines(&encounter_ids));
            let prescriptions = scope.spawn(|| clinical.prescriptions(&encounter_ids));
            let providers = scope.spawn(|| clinical.providers(&provider_ids));
            (
                joined(billing, "billing"),
                joined(prescriptions, "prescriptions"),
                joined(providers, "providers"),
            )
        });

        for line in billing? {
            batch
                .billing
                .entry((line.pid.clone(), line.encounter.clone()))
                .or_default()
                .push(line);
        }
        for prescription in prescriptions? {
            batch
                .prescriptions
                .entry((prescription.pid.clone(), prescription.encounter.clone()))
                .or_default()
                .push(prescription);
        }
        for provider in providers? {
            batch.providers.insert(provider.id.clone(), provider);
        }
        Ok(batch)
    }
}

fn joined<T>(handle: ScopedJoinHandle<'_, SourceResult<T>>, what: &str) -> Result<T> {
    match handle.join() {
        Ok(result) => Ok(result?),
        Err(_) => Err(GenerateError::Source(SourceError::backend(format!(
            "{what} fetch panicked"
        )))),
    }
}

fn unique(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    values.filter(|v| seen.insert(v.clone())).collect()
}

fn default_code(affirmative: bool) -> String {
    default_yes_no_rows()
        .into_iter()
        .find(|row: &YesNoRow| row.affirmative == affirmative)
        .map(|row| row.code)
        .unwrap_or_default()
}

fn build_user(
    batch: &Batch,
    codes: &DisabilityCodes,
    patient: &Patient,
    selection: &Selection,
    consecutive: u32,
) -> User {
    let mut services = Services::default();
    let mut unable_to_work = false;

    for encounter_id in &selection.encounter_ids {
        let key = (patient.pid.clone(), encounter_id.clone());
        let Some(encounter) = batch.encounters.get(&key) else {
            warn!(
                patient = %patient.pid,
                encounter = %encounter_id,
                "selected encounter not found for this patient, skipping"
            );
            continue;
        };
        let lines = batch
            .billing
            .get(&key)
            .map_or(&[][..], Vec::as_slice);
        let prescriptions = batch
            .prescriptions
            .get(&key)
            .map_or(&[][..], Vec::as_slice);
        let provider = encounter
            .provider_id
            .as_ref()
            .and_then(|id| batch.providers.get(id));
        let context = EncounterContext {
            provider_code: batch.facility.as_ref().and_then(|f| f.provider_code.clone()),
            encounter,
            provider,
            diagnoses: lines
                .iter()
                .filter(|line| line.is_diagnosis())
                .map(|line| line.code.clone())
                .collect(),
        };

        unable_to_work |= lines.iter().any(|line| {
            line.is_unable_to_work_option() && line.code.eq_ignore_ascii_case(&codes.yes)
        });

        let next = services.consultations.len() as u32 + 1;
        services
            .consultations
            .push(context.consultation(lines, next));
        for line in lines.iter().filter(|line| line.is_procedure()) {
            let next = services.procedures.len() as u32 + 1;
            services.procedures.push(context.procedure(line, next));
        }
        for prescription in prescriptions {
            let next = services.medications.len() as u32 + 1;
            services
                .medications
                .push(context.medication(prescription, next));
        }
    }

    User {
        document_type: patient.document_type.clone(),
        document_number: patient.document_number.clone(),
        user_type: patient.user_type.clone(),
        birth_date: patient.birth_date.as_deref().map(date_only),
        sex: patient.sex.as_deref().map(sex_code),
        country_of_residence: patient.country.clone(),
        municipality_of_residence: patient.municipality.clone(),
        territorial_zone: patient.zone.clone(),
        disability: Some(if unable_to_work {
            codes.yes.clone()
        } else {
            codes.no.clone()
        }),
        consecutive,
        country_of_origin: patient.country_of_origin.clone(),
        services,
    }
}

/// Per-encounter values shared by every record built from it.
struct EncounterContext<'a> {
    provider_code: Option<String>,
    encounter: &'a Encounter,
    provider: Option<&'a Provider>,
    diagnoses: Vec<String>,
}

impl EncounterContext<'_> {
    fn principal_diagnosis(&self) -> Option<String> {
        self.diagnoses.first().cloned()
    }

    fn related_diagnosis(&self, index: usize) -> Option<String> {
        if index >= RELATED_DIAGNOSES {
            return None;
        }
        self.diagnoses.get(index + 1).cloned()
    }

    fn professional(&self) -> (Option<String>, Option<String>) {
        self.provider.map_or((None, None), |p| {
            (p.document_type.clone(), p.document_number.clone())
        })
    }

    fn started_at(&self) -> Option<String> {
        self.encounter.date.as_deref().map(date_time)
    }

    fn consultation(&self, lines: &[BillingLine], consecutive: u32) -> Consultation {
        let consultation_line = lines.iter().find(|line| line.is_consultation());
        let (document_type, document_number) = self.professional();
        Consultation {
            provider_code: self.provider_code.clone(),
            started_at: self.started_at(),
            authorization_number: None,
            consultation_code: consultation_line.map(|line| line.code.clone()),
            modality: Some(defaults::MODALITY.to_string()),
            service_group: Some(defaults::SERVICE_GROUP.to_string()),
            service_code: Some(defaults::SERVICE_CODE),
            purpose: Some(defaults::PURPOSE.to_string()),
            cause: Some(defaults::CAUSE.to_string()),
            principal_diagnosis: self.principal_diagnosis(),
            related_diagnosis_1: self.related_diagnosis(0),
            related_diagnosis_2: self.related_diagnosis(1),
            related_diagnosis_3: self.related_diagnosis(2),
            principal_diagnosis_type: Some(defaults::PRINCIPAL_DIAGNOSIS_TYPE.to_string()),
            professional_document_type: document_type,
            professional_document_number: document_number,
            service_value: consultation_line.map_or(0.0, |line| line.fee),
            collection_concept: Some(defaults::COLLECTION_CONCEPT.to_string()),
            copay_value: 0.0,
            copay_invoice_number: None,
            consecutive,
        }
    }

    fn procedure(&self, line: &BillingLine, consecutive: u32) -> Procedure {
        let (document_type, document_number) = self.professional();
        Procedure {
            provider_code: self.provider_code.clone(),
            started_at: line.date.as_deref().map(date_time).or_else(|| self.started_at()),
            mipres_id: None,
            authorization_number: None,
            procedure_code: Some(line.code.clone()),
            entry_route: Some(defaults::ENTRY_ROUTE.to_string()),
            modality: Some(defaults::MODALITY.to_string()),
            service_group: Some(defaults::SERVICE_GROUP.to_string()),
            service_code: Some(defaults::SERVICE_CODE),
            purpose: Some(defaults::PURPOSE.to_string()),
            professional_document_type: document_type,
            professional_document_number: document_number,
            principal_diagnosis: self.principal_diagnosis(),
            related_diagnosis: self.related_diagnosis(0),
            complication: None,
            service_value: line.fee,
            collection_concept: Some(defaults::COLLECTION_CONCEPT.to_string()),
            copay_value: 0.0,
            copay_invoice_number: None,
            consecutive,
        }
    }

    fn medication(&self, prescription: &Prescription, consecutive: u32) -> Medication {
        let (document_type, document_number) = self.professional();
        let treatment_days = match (&prescription.start_date, &prescription.end_date) {
            (Some(start), Some(end)) => days_between(start, end),
            _ => None,
        };
        Medication {
            provider_code: self.provider_code.clone(),
            authorization_number: None,
            mipres_id: None,
            dispensed_at: prescription
                .start_date
                .as_deref()
                .map(date_time)
                .or_else(|| self.started_at()),
            principal_diagnosis: self.principal_diagnosis(),
            related_diagnosis: self.related_diagnosis(0),
            medication_type: Some(defaults::MEDICATION_TYPE.to_string()),
            technology_code: prescription
                .drug_code
                .clone()
                .or_else(|| prescription.drug.clone()),
            technology_name: prescription.drug.clone(),
            concentration: prescription.strength.clone(),
            unit_of_measure: prescription.unit.clone(),
            pharmaceutical_form: prescription.form.clone(),
            min_dispensing_unit: prescription.unit.clone(),
            quantity: prescription.quantity,
            treatment_days,
            professional_document_type: document_type,
            professional_document_number: document_number,
            unit_value: prescription.unit_price,
            service_value: prescription.unit_price * prescription.quantity,
            collection_concept: Some(defaults::COLLECTION_CONCEPT.to_string()),
            copay_value: 0.0,
            copay_invoice_number: None,
            consecutive,
        }
    }
}

/// `YYYY-MM-DD HH:MM`, or the input unchanged when it does not parse.
fn date_time(raw: &str) -> String {
    parse_datetime(raw).map_or_else(
        || raw.to_string(),
        |parsed| parsed.format("%Y-%m-%d %H:%M").to_string(),
    )
}

fn date_only(raw: &str) -> String {
    raw.get(..10).unwrap_or(raw).to_string()
}

/// EMR sex labels to RIPS codes. Values already in code form pass through.
fn sex_code(raw: &str) -> String {
    match raw.trim().to_ascii_lowercase().as_str() {
        "male" | "h" => "H".to_string(),
        "female" | "m" => "M".to_string(),
        "unknown" | "i" => "I".to_string(),
        _ => raw.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sex_labels_map_to_codes() {
        assert_eq!(sex_code("Male"), "H");
        assert_eq!(sex_code("Female"), "M");
        assert_eq!(sex_code("M"), "M");
        assert_eq!(sex_code("X"), "X");
    }

    #[test]
    fn selections_accept_numeric_ids() {
        let parsed: Vec<Selection> =
            serde_json::from_str(r#"[{"patientId": 1, "encounterIds": [100, "101"]}]"#).unwrap();
        assert_eq!(parsed, vec![Selection::new("1", &["100", "101"])]);

        let bare: Vec<Selection> = serde_json::from_str(r#"[{"patientId": 7}]"#).unwrap();
        assert_eq!(bare, vec![Selection::new("7", &[])]);

        let nested = serde_json::from_str::<Vec<Selection>>(r#"[{"patientId": {"id": 1}}]"#);
        assert!(nested.is_err());
    }

    #[test]
    fn datetimes_are_normalized() {
        assert_eq!(date_time("2024-03-05 08:30:15"), "2024-03-05 08:30");
        assert_eq!(date_time("2024-03-05"), "2024-03-05 00:00");
        assert_eq!(date_time("yesterday"), "yesterday");
        assert_eq!(date_only("1980-05-10 00:00:00"), "1980-05-10");
    }

    #[test]
    fn selections_describe_compactly() {
        let selections = vec![Selection::new("1", &["10", "11"]), Selection::new("2", &[])];
        assert_eq!(describe_selections(&selections), "1:10|11, 2:");
    }
}
