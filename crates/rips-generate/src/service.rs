//! Generation entry points.
//!
//! Both strategies end the same way: allocate a sequence id, validate the
//! document, and return the document together with its findings. Findings
//! never block the output.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, info_span, warn};

use rips_model::{
    MappingConfig, RipsDocument, ValidationError, error_count, rips_schema, warning_count,
};
use rips_validate::{ValidationOptions, validate_with};

use crate::clinical::{ClinicalSource, EmrTables};
use crate::direct::{DirectPipeline, Selection};
use crate::error::{GenerateError, Result};
use crate::interpreter::{Interpreter, InterpreterOptions};
use crate::join::GlobalParams;
use crate::source::{
    AuditEntry, DataSource, MappingStore, ReferenceTableStore, SequenceAllocator, Strategy,
};

/// A generated document, its sequence id and its findings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationOutput {
    pub id: u64,
    pub filename: String,
    pub document: RipsDocument,
    pub findings: Vec<ValidationError>,
}

impl GenerationOutput {
    pub fn error_count(&self) -> usize {
        error_count(&self.findings)
    }

    pub fn warning_count(&self) -> usize {
        warning_count(&self.findings)
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}

/// Output filename for a sequence id.
pub fn output_filename(id: u64) -> String {
    format!("RIPS_{id}.json")
}

pub struct GenerationService {
    data: Arc<dyn DataSource>,
    clinical: Arc<dyn ClinicalSource>,
    mappings: Arc<dyn MappingStore>,
    sequence: Arc<dyn SequenceAllocator>,
    reference: Arc<dyn ReferenceTableStore>,
    options: InterpreterOptions,
    validation: Option<ValidationOptions>,
}

impl GenerationService {
    /// A service whose selection pipeline reads EMR tables from `data`.
    pub fn new(
        data: Arc<dyn DataSource>,
        mappings: Arc<dyn MappingStore>,
        sequence: Arc<dyn SequenceAllocator>,
        reference: Arc<dyn ReferenceTableStore>,
    ) -> Self {
        let clinical: Arc<dyn ClinicalSource> = Arc::new(EmrTables::new(Arc::clone(&data)));
        Self {
            data,
            clinical,
            mappings,
            sequence,
            reference,
            options: InterpreterOptions::default(),
            validation: None,
        }
    }

    #[must_use]
    pub fn with_clinical(mut self, clinical: Arc<dyn ClinicalSource>) -> Self {
        self.clinical = clinical;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: InterpreterOptions) -> Self {
        self.options = options;
        self
    }

    /// Fix the validation reference date instead of using today.
    #[must_use]
    pub fn with_validation(mut self, validation: ValidationOptions) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn options(&self) -> &InterpreterOptions {
        &self.options
    }

    /// Generate from a stored mapping configuration.
    pub fn generate_from_mapping(
        &self,
        mapping_id: u64,
        params: &GlobalParams,
    ) -> Result<GenerationOutput> {
        let span = info_span!("generate", strategy = Strategy::Mapping.as_str(), mapping_id);
        let _guard = span.enter();

        let stored = self
            .mappings
            .get(mapping_id)?
            .ok_or(GenerateError::MappingNotFound { id: mapping_id })?;
        let mapping = MappingConfig::from_json(&stored.mapping).map_err(|source| {
            GenerateError::MalformedMapping {
                id: mapping_id,
                source,
            }
        })?;

        let schema = rips_schema();
        for violation in mapping.check_against(&schema) {
            warn!(%violation, "binding does not fit the schema");
        }
        info!(
            name = %stored.name,
            bindings = mapping.len(),
            join = self.options.join.name(),
            "interpreting mapping"
        );

        let document = Interpreter::new(self.data.as_ref(), &mapping, params, &self.options)
            .run(&schema);
        self.finish(document, Strategy::Mapping, Some(mapping_id))
    }

    /// Generate from explicit patient/encounter selections.
    pub fn generate_from_selection(&self, selections: &[Selection]) -> Result<GenerationOutput> {
        let span = info_span!(
            "generate",
            strategy = Strategy::Selection.as_str(),
            selections = selections.len()
        );
        let _guard = span.enter();

        let transaction =
            DirectPipeline::new(self.clinical.as_ref(), self.reference.as_ref()).build(selections)?;
        let document = RipsDocument::from_transaction(&transaction)?;
        self.finish(document, Strategy::Selection, None)
    }

    fn finish(
        &self,
        document: RipsDocument,
        strategy: Strategy,
        mapping_id: Option<u64>,
    ) -> Result<GenerationOutput> {
        let entry = AuditEntry::new(strategy, mapping_id, document.user_count());
        let id = self
            .sequence
            .allocate(&entry)
            .map_err(GenerateError::Sequence)?;

        let options = self.validation.unwrap_or_default();
        let findings = validate_with(&document, &options);
        let output = GenerationOutput {
            id,
            filename: output_filename(id),
            document,
            findings,
        };
        info!(
            id,
            users = output.document.user_count(),
            errors = output.error_count(),
            warnings = output.warning_count(),
            "generation complete"
        );
        Ok(output)
    }
}
