//! User-level rules.

use crate::codes::{
    DISABILITY_FLAGS, DOCUMENT_TYPES, DOMESTIC_COUNTRY, MUNICIPALITY_CODE_LENGTH,
    NUMERIC_DOCUMENT_TYPES, SEX_CODES, TERRITORIAL_ZONES, USER_TYPES, age_band,
    document_number_length,
};
use crate::record::{Record, age_in_years};

use super::{Check, Rule, RuleEnv, Verdict, fail};

const DOCUMENT_TYPE: &str = "tipoDocumentoIdentificacion";
const DOCUMENT_NUMBER: &str = "numDocumentoIdentificacion";
const BIRTH_DATE: &str = "fechaNacimiento";

pub static USER_RULES: &[Rule] = &[
    Rule::error(
        "USR-DOC-TYPE",
        DOCUMENT_TYPE,
        "Document type",
        Check::OneOf(DOCUMENT_TYPES),
    ),
    Rule::error(
        "USR-DOC-NUMBER",
        DOCUMENT_NUMBER,
        "Document number",
        Check::Required,
    ),
    Rule::error(
        "USR-DOC-NUMBER-NUMERIC",
        DOCUMENT_NUMBER,
        "Document number",
        Check::Custom(document_number_numeric),
    ),
    Rule::error(
        "USR-DOC-NUMBER-LENGTH",
        DOCUMENT_NUMBER,
        "Document number",
        Check::Custom(document_number_length_for_type),
    ),
    Rule::error("USR-BIRTH-DATE", BIRTH_DATE, "Birth date", Check::Date),
    Rule::error(
        "USR-AGE",
        BIRTH_DATE,
        "Age",
        Check::Custom(age_matches_document_type),
    ),
    Rule::error("USR-TYPE", "tipoUsuario", "User type", Check::OneOf(USER_TYPES)),
    Rule::error("USR-SEX", "codSexo", "Sex code", Check::OneOf(SEX_CODES)),
    Rule::error(
        "USR-COUNTRY",
        "codPaisResidencia",
        "Country of residence",
        Check::Required,
    ),
    Rule::error(
        "USR-MUNICIPALITY",
        "codMunicipioResidencia",
        "Municipality",
        Check::Custom(domestic_municipality),
    ),
    Rule::error(
        "USR-ZONE",
        "codZonaTerritorialResidencia",
        "Territorial zone",
        Check::Custom(territorial_zone),
    ),
    Rule::error(
        "USR-DISABILITY",
        "incapacidad",
        "Disability flag",
        Check::OneOf(DISABILITY_FLAGS),
    ),
    Rule::error("USR-CONSECUTIVE", "consecutivo", "User consecutive", Check::Sequence),
];

fn document_number_numeric(record: &Record<'_>, _env: &RuleEnv) -> Verdict {
    let (Some(document_type), Some(number)) =
        (record.text(DOCUMENT_TYPE), record.text(DOCUMENT_NUMBER))
    else {
        return Verdict::Pass;
    };
    if !NUMERIC_DOCUMENT_TYPES.contains(&document_type.as_str()) {
        return Verdict::Pass;
    }
    if number.chars().all(|c| c.is_ascii_digit()) {
        Verdict::Pass
    } else {
        fail(format!(
            "Document number must contain only digits for document type {document_type}"
        ))
    }
}

fn document_number_length_for_type(record: &Record<'_>, _env: &RuleEnv) -> Verdict {
    let (Some(document_type), Some(number)) =
        (record.text(DOCUMENT_TYPE), record.text(DOCUMENT_NUMBER))
    else {
        return Verdict::Pass;
    };
    let Some((min, max)) = document_number_length(&document_type) else {
        return Verdict::Pass;
    };
    let length = number.chars().count();
    if (min..=max).contains(&length) {
        Verdict::Pass
    } else {
        fail(format!(
            "Document number for type {document_type} must be between {min} and {max} characters"
        ))
    }
}

/// Age bands only apply when both the document type and the birth date are
/// usable; the other rules already report those fields.
fn age_matches_document_type(record: &Record<'_>, env: &RuleEnv) -> Verdict {
    let Some(document_type) = record.text(DOCUMENT_TYPE) else {
        return Verdict::Pass;
    };
    let Some(band) = age_band(&document_type) else {
        return Verdict::Pass;
    };
    let Some(birth) = record.date(BIRTH_DATE) else {
        return Verdict::Pass;
    };
    let age = age_in_years(birth, env.reference_date);
    if band.accepts(age) {
        Verdict::Pass
    } else {
        fail(format!(
            "Age {age} is not allowed for document type {document_type} ({})",
            band.name
        ))
    }
}

fn domestic_municipality(record: &Record<'_>, _env: &RuleEnv) -> Verdict {
    if record.text("codPaisResidencia").as_deref() != Some(DOMESTIC_COUNTRY) {
        return Verdict::Pass;
    }
    match record.text("codMunicipioResidencia") {
        None => fail("Municipality required for residents of the domestic country"),
        Some(code) if code.chars().count() == MUNICIPALITY_CODE_LENGTH => Verdict::Pass,
        Some(_) => fail(format!(
            "Municipality code must be exactly {MUNICIPALITY_CODE_LENGTH} characters"
        )),
    }
}

fn territorial_zone(record: &Record<'_>, _env: &RuleEnv) -> Verdict {
    match record.text("codZonaTerritorialResidencia") {
        None => Verdict::Pass,
        Some(zone) if TERRITORIAL_ZONES.contains(&zone.as_str()) => Verdict::Pass,
        Some(zone) => fail(format!(
            "Territorial zone '{zone}' is not one of: {}",
            TERRITORIAL_ZONES.join(", ")
        )),
    }
}
