//! Tests for the selection pipeline through the generation service.

mod common;

use rips_generate::{GenerateError, ReferenceTableStore, Selection, YesNoRow};
use rips_model::Transaction;

use common::{CountingSource, FailingSource, clinic, harness};

fn selections() -> Vec<Selection> {
    vec![
        Selection::new("1", &["100", "101"]),
        Selection::new("2", &["200"]),
    ]
}

fn transaction_of(output: &rips_generate::GenerationOutput) -> Transaction {
    output.document.to_transaction().unwrap()
}

#[test]
fn well_formed_selection_validates_cleanly() {
    let h = harness(clinic());
    let output = h.service.generate_from_selection(&selections()).unwrap();
    assert!(output.findings.is_empty(), "{:#?}", output.findings);
    assert_eq!(output.filename, format!("RIPS_{}.json", output.id));

    let transaction = transaction_of(&output);
    assert_eq!(transaction.obligated_party_id.as_deref(), Some("900123456"));
    assert_eq!(transaction.note_type.as_deref(), Some("RS"));
    assert_eq!(transaction.invoice_number, None);
    assert_eq!(transaction.users.len(), 2);
    assert_eq!(transaction.users[1].consecutive, 2);
}

#[test]
fn one_consultation_per_encounter_with_diagnosis_precedence() {
    let h = harness(clinic());
    let output = h.service.generate_from_selection(&selections()).unwrap();
    let user = &transaction_of(&output).users[0];

    let consultations = &user.services.consultations;
    assert_eq!(consultations.len(), 2);
    let first = &consultations[0];
    assert_eq!(first.principal_diagnosis.as_deref(), Some("J00X"));
    assert_eq!(first.related_diagnosis_1.as_deref(), Some("R509"));
    assert_eq!(first.related_diagnosis_2.as_deref(), Some("R05X"));
    assert_eq!(first.related_diagnosis_3.as_deref(), Some("R51X"));
    assert_eq!(first.consultation_code.as_deref(), Some("890201"));
    assert_eq!(first.started_at.as_deref(), Some("2024-11-05 08:30"));
    assert_eq!(first.service_value, 45000.0);
    assert_eq!(first.cause.as_deref(), Some("38"));
    assert_eq!(first.purpose.as_deref(), Some("44"));
    assert_eq!(first.service_code, Some(334));
    assert_eq!(first.professional_document_number.as_deref(), Some("52123456"));
    assert_eq!(consultations[1].principal_diagnosis.as_deref(), Some("K297"));
    assert_eq!(consultations[1].related_diagnosis_1, None);
    assert_eq!(consultations[1].consecutive, 2);
}

#[test]
fn procedures_and_medications_follow_lines_and_prescriptions() {
    let h = harness(clinic());
    let output = h.service.generate_from_selection(&selections()).unwrap();
    let transaction = transaction_of(&output);

    let first = &transaction.users[0].services;
    assert_eq!(first.procedures.len(), 1);
    assert_eq!(first.procedures[0].procedure_code.as_deref(), Some("903841"));
    assert_eq!(first.procedures[0].entry_route.as_deref(), Some("02"));
    assert_eq!(first.medications.len(), 1);
    let medication = &first.medications[0];
    assert_eq!(medication.treatment_days, Some(5));
    assert_eq!(medication.technology_code.as_deref(), Some("19943544-1"));
    assert_eq!(medication.service_value, 1800.0);

    let second = &transaction.users[1].services;
    assert_eq!(second.procedures[0].procedure_code.as_deref(), Some("902210"));
    assert_eq!(second.medications[0].treatment_days, Some(7));
}

#[test]
fn disability_flag_comes_from_seeded_reference_table() {
    let h = harness(clinic());
    assert!(h.reference.yes_no_rows().unwrap().is_empty());

    let output = h.service.generate_from_selection(&selections()).unwrap();
    let transaction = transaction_of(&output);
    assert_eq!(transaction.users[0].disability.as_deref(), Some("SI"));
    assert_eq!(transaction.users[1].disability.as_deref(), Some("NO"));
    assert_eq!(h.reference.yes_no_rows().unwrap().len(), 2);

    h.service.generate_from_selection(&selections()).unwrap();
    assert_eq!(h.reference.yes_no_rows().unwrap().len(), 2);
}

#[test]
fn disability_codes_are_data_driven() {
    let h = harness(clinic());
    h.reference
        .insert_yes_no_rows(&[YesNoRow::new("NO", "No", false), YesNoRow::new("SI", "Si", true)])
        .unwrap();
    let output = h
        .service
        .generate_from_selection(&[Selection::new("2", &["200"])])
        .unwrap();
    assert_eq!(transaction_of(&output).users[0].disability.as_deref(), Some("NO"));
}

#[test]
fn unselected_encounters_and_unknown_patients_are_skipped() {
    let h = harness(clinic());
    let output = h
        .service
        .generate_from_selection(&[
            Selection::new("9", &["900"]),
            Selection::new("2", &["200", "300", "999"]),
        ])
        .unwrap();
    let transaction = transaction_of(&output);
    assert_eq!(transaction.users.len(), 1);
    assert_eq!(transaction.users[0].consecutive, 1);
    // encounter 300 exists and belongs to patient 2, so it is reported too
    assert_eq!(transaction.users[0].services.consultations.len(), 2);
}

#[test]
fn empty_selection_yields_no_users() {
    let h = harness(clinic());
    let output = h.service.generate_from_selection(&[]).unwrap();
    assert_eq!(output.document.user_count(), 0);
}

#[test]
fn clinical_tables_are_fetched_once_per_batch() {
    let source = CountingSource::new(clinic());
    let counter = source.counter();
    let h = harness(source);
    h.service.generate_from_selection(&selections()).unwrap();

    let counts = counter.lock().unwrap().clone();
    for table in [
        "facility",
        "patient_data",
        "form_encounter",
        "billing",
        "prescriptions",
        "users",
    ] {
        assert_eq!(counts.get(table), Some(&1), "{table}");
    }
}

#[test]
fn collaborator_failure_aborts_without_partial_document() {
    let h = harness(FailingSource::new(clinic(), "prescriptions"));
    let err = h
        .service
        .generate_from_selection(&selections())
        .unwrap_err();
    match err {
        GenerateError::SelectionFailed {
            selections,
            message,
        } => {
            assert_eq!(selections, "1:100|101, 2:200");
            assert!(message.contains("prescriptions"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(h.sequence.entries().is_empty());
}

#[test]
fn sequence_ids_increase_across_strategies() {
    let h = harness(clinic());
    let first = h.service.generate_from_selection(&selections()).unwrap();
    let second = h.service.generate_from_selection(&selections()).unwrap();
    assert_eq!(first.document, second.document);
    assert_eq!((first.id, second.id), (1, 2));
}

#[test]
fn encounter_only_reaches_the_patient_that_owns_it() {
    let h = harness(clinic());
    let output = h
        .service
        .generate_from_selection(&[
            Selection::new("1", &["200"]),
            Selection::new("2", &["200"]),
        ])
        .unwrap();
    let transaction = transaction_of(&output);
    assert_eq!(transaction.users.len(), 2);

    let stranger = &transaction.users[0].services;
    assert!(stranger.consultations.is_empty());
    assert!(stranger.procedures.is_empty());
    assert!(stranger.medications.is_empty());

    let owner = &transaction.users[1].services;
    assert_eq!(owner.consultations.len(), 1);
    assert_eq!(owner.procedures[0].procedure_code.as_deref(), Some("902210"));
    assert_eq!(owner.medications.len(), 1);
}

#[test]
fn numeric_selection_ids_generate_like_strings() {
    let numeric: Vec<Selection> = serde_json::from_str(
        r#"[{"patientId": 1, "encounterIds": [100, 101]}, {"patientId": 2, "encounterIds": [200]}]"#,
    )
    .unwrap();
    assert_eq!(numeric, selections());

    let h = harness(clinic());
    let output = h.service.generate_from_selection(&numeric).unwrap();
    assert!(output.findings.is_empty(), "{:#?}", output.findings);
    assert_eq!(transaction_of(&output).users[0].services.consultations.len(), 2);
}
