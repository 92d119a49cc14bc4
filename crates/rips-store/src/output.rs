//! Writing generated documents and their findings.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use rips_generate::GenerationOutput;
use rips_model::ValidationError;

use crate::error::Result;
use crate::io::write_json;

/// Where [`write_output`] put the two files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub document: PathBuf,
    pub findings: PathBuf,
}

/// Contents of the `.validation.json` companion file.
#[derive(Debug, Serialize)]
struct FindingsReport<'a> {
    id: u64,
    document: &'a str,
    errors: usize,
    warnings: usize,
    findings: &'a [ValidationError],
}

/// Companion file name for a document file name (`RIPS_7.json` ->
/// `RIPS_7.validation.json`).
pub fn findings_filename(document_filename: &str) -> String {
    let stem = document_filename
        .strip_suffix(".json")
        .unwrap_or(document_filename);
    format!("{stem}.validation.json")
}

/// Write the document root and its findings into `dir`.
pub fn write_output(dir: &Path, output: &GenerationOutput) -> Result<OutputPaths> {
    let document = dir.join(&output.filename);
    write_json(&document, output.document.root())?;

    let findings = dir.join(findings_filename(&output.filename));
    let report = FindingsReport {
        id: output.id,
        document: &output.filename,
        errors: output.error_count(),
        warnings: output.warning_count(),
        findings: &output.findings,
    };
    write_json(&findings, &report)?;

    info!(
        id = output.id,
        errors = report.errors,
        warnings = report.warnings,
        "Wrote {}",
        document.display()
    );
    Ok(OutputPaths { document, findings })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn companion_name_replaces_json_suffix() {
        assert_eq!(findings_filename("RIPS_7.json"), "RIPS_7.validation.json");
        assert_eq!(findings_filename("custom"), "custom.validation.json");
    }
}
