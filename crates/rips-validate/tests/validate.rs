//! Tests for the validation engine over whole documents.

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use serde_json::{Value, json};

use rips_model::{RipsDocument, Severity, ValidationError};
use rips_validate::codes::age_band;
use rips_validate::{STRUCTURE_RULE, ValidationOptions, validate_with};

fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

fn options() -> ValidationOptions {
    ValidationOptions {
        reference_date: reference_date(),
    }
}

/// A birth date whose age on the reference date is exactly `age`, kept a
/// month clear of the birthday so the 365.25-day year cannot round it down.
fn birth_for_age(age: u64) -> String {
    let days = (age as f64 * 365.25).ceil() as u64 + 30;
    reference_date()
        .checked_sub_days(Days::new(days))
        .unwrap()
        .format("%Y-%m-%d")
        .to_string()
}

fn consultation() -> Value {
    json!({
        "codPrestador": "050010000101",
        "fechaInicioAtencion": "2024-12-01 08:30",
        "numAutorizacion": null,
        "codConsulta": "890201",
        "modalidadGrupoServicioTecSal": "01",
        "grupoServicios": "01",
        "codServicio": 334,
        "finalidadTecnologiaSalud": "44",
        "causaMotivoAtencion": "38",
        "codDiagnosticoPrincipal": "J00X",
        "codDiagnosticoRelacionado1": null,
        "codDiagnosticoRelacionado2": null,
        "codDiagnosticoRelacionado3": null,
        "tipoDiagnosticoPrincipal": "01",
        "tipoDocumentoIdentificacion": "CC",
        "numDocumentoIdentificacion": "79123456",
        "vrServicio": 50000,
        "conceptoRecaudo": "05",
        "valorPagoModerador": 0,
        "numFEVPagoModerador": null,
        "consecutivo": 1
    })
}

fn procedure() -> Value {
    json!({
        "codPrestador": "050010000101",
        "fechaInicioAtencion": "2024-12-01 09:00",
        "idMIPRES": null,
        "numAutorizacion": null,
        "codProcedimiento": "903841",
        "viaIngresoServicioSalud": "02",
        "modalidadGrupoServicioTecSal": "01",
        "grupoServicios": "01",
        "codServicio": 334,
        "finalidadTecnologiaSalud": "44",
        "tipoDocumentoIdentificacion": "CC",
        "numDocumentoIdentificacion": "79123456",
        "codDiagnosticoPrincipal": "J00X",
        "codDiagnosticoRelacionado": null,
        "codComplicacion": null,
        "vrServicio": 12000,
        "conceptoRecaudo": "05",
        "valorPagoModerador": 0,
        "numFEVPagoModerador": null,
        "consecutivo": 1
    })
}

fn medication() -> Value {
    json!({
        "codPrestador": "050010000101",
        "numAutorizacion": null,
        "idMIPRES": null,
        "fechaDispensAdmon": "2024-12-01 10:15",
        "codDiagnosticoPrincipal": "J00X",
        "codDiagnosticoRelacionado": null,
        "tipoMedicamento": "01",
        "codTecnologiaSalud": "19943544-1",
        "nomTecnologiaSalud": "ACETAMINOFEN",
        "concentracionMedicamento": 500,
        "unidadMedida": 168,
        "formaFarmaceutica": "TABLETA",
        "unidadMinDispensa": 1,
        "cantidadMedicamento": 12,
        "diasTratamiento": 3,
        "tipoDocumentoIdentificacion": "CC",
        "numDocumentoIdentificacion": "79123456",
        "vrUnitMedicamento": 150,
        "vrServicio": 1800,
        "conceptoRecaudo": "05",
        "valorPagoModerador": 0,
        "numFEVPagoModerador": null,
        "consecutivo": 1
    })
}

fn user(consecutive: u64) -> Value {
    json!({
        "tipoDocumentoIdentificacion": "CC",
        "numDocumentoIdentificacion": "79123456",
        "tipoUsuario": "01",
        "fechaNacimiento": birth_for_age(40),
        "codSexo": "M",
        "codPaisResidencia": "170",
        "codMunicipioResidencia": "05001",
        "codZonaTerritorialResidencia": "01",
        "incapacidad": "NO",
        "consecutivo": consecutive,
        "codPaisOrigen": "170",
        "servicios": {
            "consultas": [consultation()],
            "procedimientos": [procedure()],
            "urgencias": [],
            "hospitalizacion": [],
            "recienNacidos": [],
            "medicamentos": [medication()],
            "otrosServicios": []
        }
    })
}

fn document_with(users: Vec<Value>) -> Value {
    json!({
        "transaccion": {
            "numDocumentoIdObligado": "900123456",
            "numFactura": null,
            "tipoNota": "RS",
            "numNota": null,
            "usuarios": users
        }
    })
}

fn run(root: Value) -> Vec<ValidationError> {
    validate_with(&RipsDocument::from_value(root), &options())
}

fn rules_of(findings: &[ValidationError]) -> Vec<&str> {
    findings.iter().map(|finding| finding.rule.as_str()).collect()
}

/// Validate a single-user document after `edit` has adjusted the user.
fn run_user(edit: impl FnOnce(&mut Value)) -> Vec<ValidationError> {
    let mut user = user(1);
    edit(&mut user);
    run(document_with(vec![user]))
}

fn age_findings(document_type: &str, number: &str, age: u64) -> Vec<ValidationError> {
    run_user(|user| {
        user["tipoDocumentoIdentificacion"] = json!(document_type);
        user["numDocumentoIdentificacion"] = json!(number);
        user["fechaNacimiento"] = json!(birth_for_age(age));
    })
    .into_iter()
    .filter(|finding| finding.rule == "USR-AGE")
    .collect()
}

#[test]
fn well_formed_document_has_no_findings() {
    let findings = run(document_with(vec![user(1), user(2)]));
    assert!(findings.is_empty(), "unexpected findings: {findings:?}");
}

#[test]
fn structural_gate_reports_single_finding() {
    let findings = run(json!({"transaccion": {"usuarios": "nope"}}));
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].rule, STRUCTURE_RULE);

    let findings = run(json!({}));
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].scope, "document");
}

#[test]
fn adult_card_requires_eighteen() {
    assert_eq!(age_findings("CC", "79123456", 17).len(), 1);
    assert!(age_findings("CC", "79123456", 18).is_empty());
}

#[test]
fn identity_card_tolerates_eighteen() {
    assert_eq!(age_findings("TI", "1020304050", 6).len(), 1);
    assert!(age_findings("TI", "1020304050", 18).is_empty());
    assert_eq!(age_findings("TI", "1020304050", 19).len(), 1);
}

#[test]
fn civil_registration_tolerates_seven() {
    assert!(age_findings("RC", "1020304050", 7).is_empty());
    assert_eq!(age_findings("RC", "1020304050", 8).len(), 1);
}

#[test]
fn missing_birth_date_reports_once_and_skips_age() {
    let findings = run_user(|user| user["fechaNacimiento"] = Value::Null);
    assert_eq!(rules_of(&findings), vec!["USR-BIRTH-DATE"]);
}

#[test]
fn municipality_rules_for_domestic_residents() {
    let findings = run_user(|user| user["codMunicipioResidencia"] = Value::Null);
    assert_eq!(findings.len(), 1);
    assert!(findings[0].message.starts_with("Municipality required"));

    assert!(run_user(|user| user["codMunicipioResidencia"] = json!("05001")).is_empty());

    let findings = run_user(|user| user["codMunicipioResidencia"] = json!("5001"));
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].rule, "USR-MUNICIPALITY");
}

#[test]
fn municipality_not_required_abroad() {
    let findings = run_user(|user| {
        user["codPaisResidencia"] = json!("840");
        user["codMunicipioResidencia"] = Value::Null;
    });
    assert!(findings.is_empty(), "{findings:?}");
}

#[test]
fn provider_code_must_be_twelve_characters() {
    for (code, expect_error) in [
        ("05001000010", true),
        ("050010000101", false),
        ("0500100001011", true),
    ] {
        let findings = run_user(|user| {
            user["servicios"]["consultas"][0]["codPrestador"] = json!(code);
        });
        assert_eq!(!findings.is_empty(), expect_error, "code {code}");
        if expect_error {
            assert_eq!(findings[0].scope, "transaccion.usuarios[0].servicios.consultas[0]");
            assert!(findings[0].message.contains("must be exactly 12 characters"));
        }
    }
}

#[test]
fn missing_note_type_without_invoice_is_a_warning() {
    let mut root = document_with(vec![user(1)]);
    root["transaccion"]["tipoNota"] = Value::Null;
    let findings = run(root);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Warning);

    let mut root = document_with(vec![user(1)]);
    root["transaccion"]["tipoNota"] = Value::Null;
    root["transaccion"]["numFactura"] = json!("FE-1001");
    assert!(run(root).is_empty());
}

#[test]
fn numeric_invoice_number_is_rejected() {
    let mut root = document_with(vec![]);
    root["transaccion"]["numFactura"] = json!(1001);
    assert_eq!(rules_of(&run(root)), vec!["TX-INVOICE-TYPE"]);
}

#[test]
fn record_checks_do_not_short_circuit() {
    let findings = run_user(|user| {
        user["tipoUsuario"] = json!("99");
        user["codSexo"] = json!("X");
        user["incapacidad"] = json!("MAYBE");
    });
    assert_eq!(rules_of(&findings), vec!["USR-TYPE", "USR-SEX", "USR-DISABILITY"]);
}

#[test]
fn findings_follow_document_order() {
    let mut first = user(1);
    first["servicios"]["medicamentos"][0]["diasTratamiento"] = json!(1000);
    first["servicios"]["consultas"][0]["vrServicio"] = json!(-5);
    let mut second = user(2);
    second["codSexo"] = Value::Null;
    second["servicios"]["procedimientos"][0]["viaIngresoServicioSalud"] = json!("09");

    let findings = run(document_with(vec![first, second]));
    let scopes: Vec<&str> = findings.iter().map(|f| f.scope.as_str()).collect();
    assert_eq!(
        scopes,
        vec![
            "transaccion.usuarios[0].servicios.consultas[0]",
            "transaccion.usuarios[0].servicios.medicamentos[0]",
            "transaccion.usuarios[1]",
            "transaccion.usuarios[1].servicios.procedimientos[0]",
        ]
    );
    assert_eq!(
        rules_of(&findings),
        vec!["SRV-VALUE", "MED-TREATMENT-DAYS", "USR-SEX", "PRO-ENTRY-ROUTE"]
    );
}

#[test]
fn consecutive_must_follow_position() {
    let findings = run(document_with(vec![user(1), user(3)]));
    assert_eq!(rules_of(&findings), vec!["USR-CONSECUTIVE"]);
    assert_eq!(findings[0].scope, "transaccion.usuarios[1]");
}

#[test]
fn document_number_policy_by_type() {
    let findings = run_user(|user| user["numDocumentoIdentificacion"] = json!("79A23456"));
    assert_eq!(rules_of(&findings), vec!["USR-DOC-NUMBER-NUMERIC"]);

    let findings = run_user(|user| user["numDocumentoIdentificacion"] = json!("12"));
    assert_eq!(rules_of(&findings), vec!["USR-DOC-NUMBER-LENGTH"]);
}

#[test]
fn validation_does_not_mutate_document() {
    let document = RipsDocument::from_value(document_with(vec![user(1)]));
    let before = document.clone();
    let _ = validate_with(&document, &options());
    assert_eq!(document, before);
}

proptest! {
    #[test]
    fn age_finding_matches_band(
        document_type in prop::sample::select(vec!["CC", "TI", "RC", "CN", "AS", "MS"]),
        age in 0u64..100,
    ) {
        let band = age_band(document_type).unwrap();
        let findings = age_findings(document_type, "1020304050", age);
        prop_assert_eq!(findings.is_empty(), band.accepts(age as i64));
    }
}
