use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info, info_span, warn};

use rips_cli::config::{LoadedConfig, RipsConfig};
use rips_cli::logging::redact_value;
use rips_generate::{GenerationOutput, GenerationService, GlobalParams, MappingStore, Selection};
use rips_model::{MappingConfig, RipsDocument, ValidationError, rips_schema};
use rips_store::{OutputPaths, RipsStore, load_dataset, write_output};
use rips_validate::{ValidationOptions, validate_with};

use crate::cli::{Cli, GenerateArgs, MappingsCommand, RunArgs, SelectArgs, ValidateArgs};
use crate::summary::{print_mappings, print_schema};

/// Configuration and store resolved from the global flags.
pub struct Workspace {
    pub config: RipsConfig,
    pub store: RipsStore,
    pub output_dir: PathBuf,
}

impl Workspace {
    pub fn open(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("resolve working directory")?;
        let LoadedConfig { config, source } = RipsConfig::load(cli.config.as_deref(), &cwd)?;
        let store_dir = cli.store_dir.clone().unwrap_or_else(|| config.store_dir.clone());
        let output_dir = cli
            .output_dir
            .clone()
            .unwrap_or_else(|| config.output_dir.clone());
        debug!(
            config = ?source,
            store = %store_dir.display(),
            output = %output_dir.display(),
            "resolved workspace"
        );

        let store = RipsStore::open(&store_dir)
            .with_context(|| format!("open store {}", store_dir.display()))?;
        Ok(Self {
            config,
            store,
            output_dir,
        })
    }

    fn service(&self, run: &RunArgs) -> Result<GenerationService> {
        let data = load_dataset(&run.dataset)
            .with_context(|| format!("load dataset {}", run.dataset.display()))?;
        let service = GenerationService::new(
            Arc::new(data),
            self.store.mappings(),
            self.store.audit(),
            self.store.reference(),
        )
        .with_options(self.config.interpreter_options());
        Ok(match run.reference_date {
            Some(reference_date) => service.with_validation(ValidationOptions { reference_date }),
            None => service,
        })
    }

    fn finish(&self, output: GenerationOutput, dry_run: bool) -> Result<GenerateReport> {
        let paths = if dry_run {
            info!(id = output.id, "dry run, skipping output files");
            None
        } else {
            let paths = write_output(&self.output_dir, &output)
                .with_context(|| format!("write {}", output.filename))?;
            Some(paths)
        };
        Ok(GenerateReport { output, paths })
    }
}

pub struct GenerateReport {
    pub output: GenerationOutput,
    pub paths: Option<OutputPaths>,
}

pub fn run_generate(workspace: &Workspace, args: &GenerateArgs) -> Result<GenerateReport> {
    let params = match (args.from, args.to) {
        (Some(start), Some(end)) if end < start => {
            bail!("reporting period ends ({end}) before it starts ({start})")
        }
        (Some(start), Some(end)) => GlobalParams::between(start, end),
        _ => GlobalParams::default(),
    };

    let service = workspace.service(&args.run)?;
    let output = service
        .generate_from_mapping(args.mapping, &params)
        .with_context(|| format!("generate from mapping {}", args.mapping))?;
    workspace.finish(output, args.run.dry_run)
}

pub fn run_select(workspace: &Workspace, args: &SelectArgs) -> Result<GenerateReport> {
    let selections = match &args.selections {
        Some(path) => read_selections(path)?,
        None => args.patients.clone(),
    };
    let span = info_span!("select", selections = selections.len());
    let _guard = span.enter();
    for selection in &selections {
        debug!(
            patient = redact_value(&selection.patient_id),
            encounters = selection.encounter_ids.len(),
            "selected"
        );
    }

    let service = workspace.service(&args.run)?;
    let output = service
        .generate_from_selection(&selections)
        .context("generate from selections")?;
    workspace.finish(output, args.run.dry_run)
}

fn read_selections(path: &Path) -> Result<Vec<Selection>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("read selections {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parse selections {}", path.display()))
}

pub fn run_validate(args: &ValidateArgs) -> Result<Vec<ValidationError>> {
    let content = fs::read_to_string(&args.document)
        .with_context(|| format!("read document {}", args.document.display()))?;
    let root: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("parse document {}", args.document.display()))?;
    let document = RipsDocument::from_value(root);

    let options = args
        .reference_date
        .map(|reference_date| ValidationOptions { reference_date })
        .unwrap_or_default();
    let findings = validate_with(&document, &options);
    info!(
        users = document.user_count(),
        findings = findings.len(),
        "validated {}",
        args.document.display()
    );
    Ok(findings)
}

pub fn run_schema() -> Result<()> {
    print_schema(&rips_schema());
    Ok(())
}

pub fn run_mappings(workspace: &Workspace, command: &MappingsCommand) -> Result<()> {
    let mappings = workspace.store.mappings();
    match command {
        MappingsCommand::List => {
            let stored = mappings.list().context("list mappings")?;
            if stored.is_empty() {
                println!("No stored mappings in {}", workspace.store.root().display());
            } else {
                print_mappings(&stored);
            }
        }
        MappingsCommand::Show { id } => {
            let stored = mappings
                .get(*id)
                .context("read mapping")?
                .ok_or_else(|| anyhow!("no mapping with id {id}"))?;
            println!("# {} (id {})", stored.name, stored.id);
            match serde_json::from_str::<serde_json::Value>(&stored.mapping) {
                Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                Err(error) => {
                    warn!(id, %error, "stored mapping is not valid JSON");
                    println!("{}", stored.mapping);
                }
            }
        }
        MappingsCommand::Import {
            path,
            name,
            replace,
        } => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("read mapping {}", path.display()))?;
            let mapping = MappingConfig::from_json(&content)
                .with_context(|| format!("{} is not a mapping configuration", path.display()))?;
            let violations = mapping.check_against(&rips_schema());
            for violation in &violations {
                warn!(%violation, "binding does not fit the schema");
            }

            let name = name.clone().unwrap_or_else(|| file_stem(path));
            let stored = match replace {
                Some(id) => mappings
                    .update(*id, &name, &content)
                    .context("update mapping")?
                    .ok_or_else(|| anyhow!("no mapping with id {id}"))?,
                None => mappings.create(&name, &content).context("store mapping")?,
            };
            println!(
                "Stored mapping {} ({}): {} bindings, {} schema violations",
                stored.id,
                stored.name,
                mapping.len(),
                violations.len()
            );
        }
        MappingsCommand::Delete { id } => {
            if !mappings.delete(*id).context("delete mapping")? {
                bail!("no mapping with id {id}");
            }
            println!("Deleted mapping {id}");
        }
    }
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("mapping")
        .to_string()
}
