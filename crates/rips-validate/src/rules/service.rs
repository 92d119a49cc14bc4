//! Rules for the three populated service kinds.
//!
//! The tables share their leading provider and date checks but differ in the
//! identifying code, the categorical fields they carry and the money fields.

use crate::codes::{
    COLLECTION_CONCEPTS, CONSULTATION_CAUSES, DIAGNOSIS_TYPES, ENTRY_ROUTES, MAX_TREATMENT_DAYS,
    MEDICATION_TYPES, MODALITIES, PROVIDER_CODE_LENGTH, SERVICE_GROUPS,
};

use super::{Check, Rule};

const PROVIDER: Rule = Rule::error(
    "SRV-PROVIDER",
    "codPrestador",
    "Provider code",
    Check::ExactLength(PROVIDER_CODE_LENGTH),
);
const MODALITY: Rule = Rule::error(
    "SRV-MODALITY",
    "modalidadGrupoServicioTecSal",
    "Modality",
    Check::OneOf(MODALITIES),
);
const SERVICE_GROUP: Rule = Rule::error(
    "SRV-GROUP",
    "grupoServicios",
    "Service group",
    Check::OneOf(SERVICE_GROUPS),
);
const COLLECTION_CONCEPT: Rule = Rule::error(
    "SRV-CONCEPT",
    "conceptoRecaudo",
    "Collection concept",
    Check::OneOf(COLLECTION_CONCEPTS),
);
const SERVICE_VALUE: Rule = Rule::error(
    "SRV-VALUE",
    "vrServicio",
    "Service value",
    Check::NonNegative,
);
const MODERATOR_PAYMENT: Rule = Rule::error(
    "SRV-MODERATOR",
    "valorPagoModerador",
    "Moderator payment",
    Check::NonNegative,
);
const CONSECUTIVE: Rule = Rule::error(
    "SRV-CONSECUTIVE",
    "consecutivo",
    "Service consecutive",
    Check::Sequence,
);

pub static CONSULTATION_RULES: &[Rule] = &[
    PROVIDER,
    Rule::error(
        "CON-DATE",
        "fechaInicioAtencion",
        "Attention start date",
        Check::DateTime,
    ),
    Rule::error("CON-CODE", "codConsulta", "Consultation code", Check::Required),
    MODALITY,
    SERVICE_GROUP,
    Rule::error(
        "CON-CAUSE",
        "causaMotivoAtencion",
        "Attention cause",
        Check::OneOf(CONSULTATION_CAUSES),
    ),
    Rule::error(
        "CON-DIAGNOSIS",
        "codDiagnosticoPrincipal",
        "Principal diagnosis",
        Check::Required,
    ),
    Rule::error(
        "CON-DIAGNOSIS-TYPE",
        "tipoDiagnosticoPrincipal",
        "Principal diagnosis type",
        Check::OneOf(DIAGNOSIS_TYPES),
    ),
    COLLECTION_CONCEPT,
    SERVICE_VALUE,
    MODERATOR_PAYMENT,
    CONSECUTIVE,
];

pub static PROCEDURE_RULES: &[Rule] = &[
    PROVIDER,
    Rule::error(
        "PRO-DATE",
        "fechaInicioAtencion",
        "Attention start date",
        Check::DateTime,
    ),
    Rule::error(
        "PRO-CODE",
        "codProcedimiento",
        "Procedure code",
        Check::Required,
    ),
    Rule::error(
        "PRO-ENTRY-ROUTE",
        "viaIngresoServicioSalud",
        "Entry route",
        Check::OneOf(ENTRY_ROUTES),
    ),
    MODALITY,
    SERVICE_GROUP,
    COLLECTION_CONCEPT,
    SERVICE_VALUE,
    MODERATOR_PAYMENT,
    CONSECUTIVE,
];

pub static MEDICATION_RULES: &[Rule] = &[
    PROVIDER,
    Rule::error(
        "MED-DATE",
        "fechaDispensAdmon",
        "Dispensing date",
        Check::DateTime,
    ),
    Rule::error(
        "MED-CODE",
        "codTecnologiaSalud",
        "Health technology code",
        Check::Required,
    ),
    Rule::error(
        "MED-TYPE",
        "tipoMedicamento",
        "Medication type",
        Check::OneOf(MEDICATION_TYPES),
    ),
    COLLECTION_CONCEPT,
    Rule::error(
        "MED-UNIT-VALUE",
        "vrUnitMedicamento",
        "Unit value",
        Check::NonNegative,
    ),
    SERVICE_VALUE,
    MODERATOR_PAYMENT,
    Rule::error(
        "MED-TREATMENT-DAYS",
        "diasTratamiento",
        "Treatment days",
        Check::IntegerBetween(0, MAX_TREATMENT_DAYS),
    ),
    CONSECUTIVE,
];
