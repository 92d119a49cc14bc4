//! Declarative document shape.
//!
//! The schema is a tagged tree walked by structural recursion. Object and
//! array children keep their declaration order, which is also the key order
//! of the generated JSON.

use serde::{Deserialize, Serialize};

use crate::path::SchemaPath;

/// How a leaf obtains its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafKind {
    /// Resolved through the mapping binding at this path.
    Value,
    /// A `consecutivo` leaf: the 1-based ordinal of the enclosing array row.
    Sequence,
}

/// A named child of an object-like node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub node: SchemaNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "children", rename_all = "snake_case")]
pub enum SchemaNode {
    Root(Vec<SchemaField>),
    Object(Vec<SchemaField>),
    /// Repeats its children once per row of the bound list source.
    Array(Vec<SchemaField>),
    Leaf(LeafKind),
}

impl SchemaNode {
    pub fn children(&self) -> &[SchemaField] {
        match self {
            Self::Root(children) | Self::Object(children) | Self::Array(children) => children,
            Self::Leaf(_) => &[],
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    pub fn child(&self, name: &str) -> Option<&SchemaNode> {
        self.children()
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.node)
    }

    /// Find the node addressed by `path`, starting at this node.
    pub fn find(&self, path: &SchemaPath) -> Option<&SchemaNode> {
        let mut node = self;
        for segment in path.segments() {
            node = node.child(segment)?;
        }
        Some(node)
    }

    /// Every node below this one, paired with its path, in declaration order.
    pub fn nodes(&self) -> Vec<(SchemaPath, &SchemaNode)> {
        let mut out = Vec::new();
        collect_nodes(self, &SchemaPath::root(), &mut out);
        out
    }

    pub fn leaf_paths(&self) -> Vec<SchemaPath> {
        self.nodes()
            .into_iter()
            .filter(|(_, node)| node.is_leaf())
            .map(|(path, _)| path)
            .collect()
    }

    pub fn array_paths(&self) -> Vec<SchemaPath> {
        self.nodes()
            .into_iter()
            .filter(|(_, node)| node.is_array())
            .map(|(path, _)| path)
            .collect()
    }
}

fn collect_nodes<'a>(
    node: &'a SchemaNode,
    path: &SchemaPath,
    out: &mut Vec<(SchemaPath, &'a SchemaNode)>,
) {
    for field in node.children() {
        let child_path = path.child(&field.name);
        out.push((child_path.clone(), &field.node));
        collect_nodes(&field.node, &child_path, out);
    }
}

fn field(name: &str, node: SchemaNode) -> SchemaField {
    SchemaField {
        name: name.to_string(),
        node,
    }
}

fn leaves(names: &[&str]) -> Vec<SchemaField> {
    names
        .iter()
        .map(|name| {
            let kind = if *name == "consecutivo" {
                LeafKind::Sequence
            } else {
                LeafKind::Value
            };
            field(name, SchemaNode::Leaf(kind))
        })
        .collect()
}

pub const TRANSACTION_FIELDS: &[&str] = &[
    "numDocumentoIdObligado",
    "numFactura",
    "tipoNota",
    "numNota",
];

pub const USER_FIELDS: &[&str] = &[
    "tipoDocumentoIdentificacion",
    "numDocumentoIdentificacion",
    "tipoUsuario",
    "fechaNacimiento",
    "codSexo",
    "codPaisResidencia",
    "codMunicipioResidencia",
    "codZonaTerritorialResidencia",
    "incapacidad",
    "consecutivo",
    "codPaisOrigen",
];

pub const CONSULTATION_FIELDS: &[&str] = &[
    "codPrestador",
    "fechaInicioAtencion",
    "numAutorizacion",
    "codConsulta",
    "modalidadGrupoServicioTecSal",
    "grupoServicios",
    "codServicio",
    "finalidadTecnologiaSalud",
    "causaMotivoAtencion",
    "codDiagnosticoPrincipal",
    "codDiagnosticoRelacionado1",
    "codDiagnosticoRelacionado2",
    "codDiagnosticoRelacionado3",
    "tipoDiagnosticoPrincipal",
    "tipoDocumentoIdentificacion",
    "numDocumentoIdentificacion",
    "vrServicio",
    "conceptoRecaudo",
    "valorPagoModerador",
    "numFEVPagoModerador",
    "consecutivo",
];

pub const PROCEDURE_FIELDS: &[&str] = &[
    "codPrestador",
    "fechaInicioAtencion",
    "idMIPRES",
    "numAutorizacion",
    "codProcedimiento",
    "viaIngresoServicioSalud",
    "modalidadGrupoServicioTecSal",
    "grupoServicios",
    "codServicio",
    "finalidadTecnologiaSalud",
    "tipoDocumentoIdentificacion",
    "numDocumentoIdentificacion",
    "codDiagnosticoPrincipal",
    "codDiagnosticoRelacionado",
    "codComplicacion",
    "vrServicio",
    "conceptoRecaudo",
    "valorPagoModerador",
    "numFEVPagoModerador",
    "consecutivo",
];

pub const MEDICATION_FIELDS: &[&str] = &[
    "codPrestador",
    "numAutorizacion",
    "idMIPRES",
    "fechaDispensAdmon",
    "codDiagnosticoPrincipal",
    "codDiagnosticoRelacionado",
    "tipoMedicamento",
    "codTecnologiaSalud",
    "nomTecnologiaSalud",
    "concentracionMedicamento",
    "unidadMedida",
    "formaFarmaceutica",
    "unidadMinDispensa",
    "cantidadMedicamento",
    "diasTratamiento",
    "tipoDocumentoIdentificacion",
    "numDocumentoIdentificacion",
    "vrUnitMedicamento",
    "vrServicio",
    "conceptoRecaudo",
    "valorPagoModerador",
    "numFEVPagoModerador",
    "consecutivo",
];

/// Service kinds that are declared but never populated.
pub const PLACEHOLDER_SERVICES: &[&str] = &["urgencias", "hospitalizacion", "recienNacidos"];

/// Build the RIPS transaction schema.
///
/// ```text
/// transaccion
/// └── usuarios[]
///     └── servicios
///         ├── consultas[]
///         ├── procedimientos[]
///         ├── urgencias[] / hospitalizacion[] / recienNacidos[]
///         ├── medicamentos[]
///         └── otrosServicios[]
/// ```
pub fn rips_schema() -> SchemaNode {
    let mut services = vec![
        field("consultas", SchemaNode::Array(leaves(CONSULTATION_FIELDS))),
        field("procedimientos", SchemaNode::Array(leaves(PROCEDURE_FIELDS))),
    ];
    for name in PLACEHOLDER_SERVICES {
        services.push(field(name, SchemaNode::Array(Vec::new())));
    }
    services.push(field(
        "medicamentos",
        SchemaNode::Array(leaves(MEDICATION_FIELDS)),
    ));
    services.push(field("otrosServicios", SchemaNode::Array(Vec::new())));

    let mut user = leaves(USER_FIELDS);
    user.push(field("servicios", SchemaNode::Object(services)));

    let mut transaction = leaves(TRANSACTION_FIELDS);
    transaction.push(field("usuarios", SchemaNode::Array(user)));

    SchemaNode::Root(vec![field("transaccion", SchemaNode::Object(transaction))])
}
