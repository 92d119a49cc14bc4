//! The generated RIPS document.
//!
//! Two representations exist. The typed structs below are what the selection
//! pipeline fills in; [`RipsDocument`] is the immutable JSON tree both
//! generation strategies hand to validation and to the output writer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

pub const TRANSACTION_KEY: &str = "transaccion";
pub const USERS_KEY: &str = "usuarios";
pub const SERVICES_KEY: &str = "servicios";
pub const CONSULTATIONS_KEY: &str = "consultas";
pub const PROCEDURES_KEY: &str = "procedimientos";
pub const MEDICATIONS_KEY: &str = "medicamentos";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "numDocumentoIdObligado")]
    pub obligated_party_id: Option<String>,
    #[serde(rename = "numFactura")]
    pub invoice_number: Option<String>,
    #[serde(rename = "tipoNota")]
    pub note_type: Option<String>,
    #[serde(rename = "numNota")]
    pub note_number: Option<String>,
    #[serde(rename = "usuarios")]
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "tipoDocumentoIdentificacion")]
    pub document_type: Option<String>,
    #[serde(rename = "numDocumentoIdentificacion")]
    pub document_number: Option<String>,
    #[serde(rename = "tipoUsuario")]
    pub user_type: Option<String>,
    /// `YYYY-MM-DD`.
    #[serde(rename = "fechaNacimiento")]
    pub birth_date: Option<String>,
    #[serde(rename = "codSexo")]
    pub sex: Option<String>,
    #[serde(rename = "codPaisResidencia")]
    pub country_of_residence: Option<String>,
    #[serde(rename = "codMunicipioResidencia")]
    pub municipality_of_residence: Option<String>,
    #[serde(rename = "codZonaTerritorialResidencia")]
    pub territorial_zone: Option<String>,
    #[serde(rename = "incapacidad")]
    pub disability: Option<String>,
    #[serde(rename = "consecutivo")]
    pub consecutive: u32,
    #[serde(rename = "codPaisOrigen")]
    pub country_of_origin: Option<String>,
    #[serde(rename = "servicios")]
    pub services: Services,
}

/// Per-user service sequences. Emergency, hospitalization, newborn and
/// other-service records are never produced and stay empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Services {
    #[serde(rename = "consultas")]
    pub consultations: Vec<Consultation>,
    #[serde(rename = "procedimientos")]
    pub procedures: Vec<Procedure>,
    #[serde(rename = "urgencias")]
    pub emergencies: Vec<Value>,
    #[serde(rename = "hospitalizacion")]
    pub hospitalizations: Vec<Value>,
    #[serde(rename = "recienNacidos")]
    pub newborns: Vec<Value>,
    #[serde(rename = "medicamentos")]
    pub medications: Vec<Medication>,
    #[serde(rename = "otrosServicios")]
    pub other_services: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    #[serde(rename = "codPrestador")]
    pub provider_code: Option<String>,
    /// `YYYY-MM-DD HH:MM`.
    #[serde(rename = "fechaInicioAtencion")]
    pub started_at: Option<String>,
    #[serde(rename = "numAutorizacion")]
    pub authorization_number: Option<String>,
    #[serde(rename = "codConsulta")]
    pub consultation_code: Option<String>,
    #[serde(rename = "modalidadGrupoServicioTecSal")]
    pub modality: Option<String>,
    #[serde(rename = "grupoServicios")]
    pub service_group: Option<String>,
    #[serde(rename = "codServicio")]
    pub service_code: Option<u32>,
    #[serde(rename = "finalidadTecnologiaSalud")]
    pub purpose: Option<String>,
    #[serde(rename = "causaMotivoAtencion")]
    pub cause: Option<String>,
    #[serde(rename = "codDiagnosticoPrincipal")]
    pub principal_diagnosis: Option<String>,
    #[serde(rename = "codDiagnosticoRelacionado1")]
    pub related_diagnosis_1: Option<String>,
    #[serde(rename = "codDiagnosticoRelacionado2")]
    pub related_diagnosis_2: Option<String>,
    #[serde(rename = "codDiagnosticoRelacionado3")]
    pub related_diagnosis_3: Option<String>,
    #[serde(rename = "tipoDiagnosticoPrincipal")]
    pub principal_diagnosis_type: Option<String>,
    #[serde(rename = "tipoDocumentoIdentificacion")]
    pub professional_document_type: Option<String>,
    #[serde(rename = "numDocumentoIdentificacion")]
    pub professional_document_number: Option<String>,
    #[serde(rename = "vrServicio")]
    pub service_value: f64,
    #[serde(rename = "conceptoRecaudo")]
    pub collection_concept: Option<String>,
    #[serde(rename = "valorPagoModerador")]
    pub copay_value: f64,
    #[serde(rename = "numFEVPagoModerador")]
    pub copay_invoice_number: Option<String>,
    #[serde(rename = "consecutivo")]
    pub consecutive: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    #[serde(rename = "codPrestador")]
    pub provider_code: Option<String>,
    #[serde(rename = "fechaInicioAtencion")]
    pub started_at: Option<String>,
    #[serde(rename = "idMIPRES")]
    pub mipres_id: Option<String>,
    #[serde(rename = "numAutorizacion")]
    pub authorization_number: Option<String>,
    #[serde(rename = "codProcedimiento")]
    pub procedure_code: Option<String>,
    #[serde(rename = "viaIngresoServicioSalud")]
    pub entry_route: Option<String>,
    #[serde(rename = "modalidadGrupoServicioTecSal")]
    pub modality: Option<String>,
    #[serde(rename = "grupoServicios")]
    pub service_group: Option<String>,
    #[serde(rename = "codServicio")]
    pub service_code: Option<u32>,
    #[serde(rename = "finalidadTecnologiaSalud")]
    pub purpose: Option<String>,
    #[serde(rename = "tipoDocumentoIdentificacion")]
    pub professional_document_type: Option<String>,
    #[serde(rename = "numDocumentoIdentificacion")]
    pub professional_document_number: Option<String>,
    #[serde(rename = "codDiagnosticoPrincipal")]
    pub principal_diagnosis: Option<String>,
    #[serde(rename = "codDiagnosticoRelacionado")]
    pub related_diagnosis: Option<String>,
    #[serde(rename = "codComplicacion")]
    pub complication: Option<String>,
    #[serde(rename = "vrServicio")]
    pub service_value: f64,
    #[serde(rename = "conceptoRecaudo")]
    pub collection_concept: Option<String>,
    #[serde(rename = "valorPagoModerador")]
    pub copay_value: f64,
    #[serde(rename = "numFEVPagoModerador")]
    pub copay_invoice_number: Option<String>,
    #[serde(rename = "consecutivo")]
    pub consecutive: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    #[serde(rename = "codPrestador")]
    pub provider_code: Option<String>,
    #[serde(rename = "numAutorizacion")]
    pub authorization_number: Option<String>,
    #[serde(rename = "idMIPRES")]
    pub mipres_id: Option<String>,
    #[serde(rename = "fechaDispensAdmon")]
    pub dispensed_at: Option<String>,
    #[serde(rename = "codDiagnosticoPrincipal")]
    pub principal_diagnosis: Option<String>,
    #[serde(rename = "codDiagnosticoRelacionado")]
    pub related_diagnosis: Option<String>,
    #[serde(rename = "tipoMedicamento")]
    pub medication_type: Option<String>,
    #[serde(rename = "codTecnologiaSalud")]
    pub technology_code: Option<String>,
    #[serde(rename = "nomTecnologiaSalud")]
    pub technology_name: Option<String>,
    #[serde(rename = "concentracionMedicamento")]
    pub concentration: Option<String>,
    #[serde(rename = "unidadMedida")]
    pub unit_of_measure: Option<String>,
    #[serde(rename = "formaFarmaceutica")]
    pub pharmaceutical_form: Option<String>,
    #[serde(rename = "unidadMinDispensa")]
    pub min_dispensing_unit: Option<String>,
    #[serde(rename = "cantidadMedicamento")]
    pub quantity: f64,
    #[serde(rename = "diasTratamiento")]
    pub treatment_days: Option<i64>,
    #[serde(rename = "tipoDocumentoIdentificacion")]
    pub professional_document_type: Option<String>,
    #[serde(rename = "numDocumentoIdentificacion")]
    pub professional_document_number: Option<String>,
    #[serde(rename = "vrUnitMedicamento")]
    pub unit_value: f64,
    #[serde(rename = "vrServicio")]
    pub service_value: f64,
    #[serde(rename = "conceptoRecaudo")]
    pub collection_concept: Option<String>,
    #[serde(rename = "valorPagoModerador")]
    pub copay_value: f64,
    #[serde(rename = "numFEVPagoModerador")]
    pub copay_invoice_number: Option<String>,
    #[serde(rename = "consecutivo")]
    pub consecutive: u32,
}

/// Immutable generated document: `{ "transaccion": { ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RipsDocument(Value);

impl RipsDocument {
    pub fn from_value(root: Value) -> Self {
        Self(root)
    }

    pub fn from_transaction(transaction: &Transaction) -> Result<Self> {
        let mut root = serde_json::Map::new();
        root.insert(
            TRANSACTION_KEY.to_string(),
            serde_json::to_value(transaction)?,
        );
        Ok(Self(Value::Object(root)))
    }

    pub fn root(&self) -> &Value {
        &self.0
    }

    /// The transaction object, when present and an object.
    pub fn transaction(&self) -> Option<&serde_json::Map<String, Value>> {
        self.0.get(TRANSACTION_KEY)?.as_object()
    }

    /// The user array, when present and an array.
    pub fn users(&self) -> Option<&Vec<Value>> {
        self.transaction()?.get(USERS_KEY)?.as_array()
    }

    pub fn user_count(&self) -> usize {
        self.users().map_or(0, Vec::len)
    }

    /// Typed view of the transaction, when the tree has the expected shape.
    pub fn to_transaction(&self) -> Result<Transaction> {
        let value = self.0.get(TRANSACTION_KEY).cloned().unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.0)?)
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}
