//! Shared fixtures: an EMR-shaped dataset and collaborator doubles.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde_json::{Value, json};

use rips_generate::{
    ColumnInfo, GenerationService, MemoryDataSource, MemoryMappingStore, MemoryReferenceTables,
    MemorySequence, Predicate, ReferenceLookup, RowSource, SchemaIntrospector, SourceError,
    SourceResult,
};
use rips_model::Row;
use rips_validate::ValidationOptions;

pub fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

pub fn rows(values: Value) -> Vec<Row> {
    serde_json::from_value(values).unwrap()
}

pub fn clinic() -> MemoryDataSource {
    MemoryDataSource::new()
        .with_table(
            "facility",
            rows(json!([{
                "id": 1,
                "name": "Clinica Central",
                "federal_ein": "900123456",
                "facility_code": "050010000101",
                "primary_business_entity": 1
            }])),
        )
        .with_table(
            "patient_data",
            rows(json!([
                {
                    "pid": 1, "pubpid": "79123456", "document_type": "CC", "user_type": "01",
                    "DOB": "1980-05-10", "sex": "Female", "country_code": "170",
                    "municipality_code": "05001", "zone_code": "01",
                    "origin_country_code": "170", "date": "2020-01-15 00:00:00"
                },
                {
                    "pid": 2, "pubpid": "1020304050", "document_type": "TI", "user_type": "01",
                    "DOB": "2014-03-01", "sex": "Male", "country_code": "170",
                    "municipality_code": "11001", "zone_code": "01",
                    "origin_country_code": "170", "date": "2021-06-01 00:00:00"
                }
            ])),
        )
        .with_table(
            "form_encounter",
            rows(json!([
                {"encounter": 100, "pid": 1, "date": "2024-11-05 08:30:00", "provider_id": 7},
                {"encounter": 101, "pid": 1, "date": "2024-11-20 10:00:00", "provider_id": 7},
                {"encounter": 200, "pid": 2, "date": "2024-12-02 14:15:00", "provider_id": 8},
                {"encounter": 300, "pid": 2, "date": "2023-01-01 09:00:00", "provider_id": 8}
            ])),
        )
        .with_table("billing", billing_rows())
        .with_table(
            "prescriptions",
            rows(json!([
                {
                    "id": 1, "patient_id": 1, "encounter": 100, "drug": "ACETAMINOFEN 500MG",
                    "rxnorm_drugcode": "19943544-1", "start_date": "2024-11-05",
                    "end_date": "2024-11-09 12:00:00", "quantity": 12, "price": 150,
                    "size": "500", "unit": "mg", "form": "TABLETA"
                },
                {
                    "id": 2, "patient_id": 2, "encounter": 200, "drug": "AMOXICILINA 500MG",
                    "rxnorm_drugcode": "20012345-2", "start_date": "2024-12-02",
                    "end_date": "2024-12-09", "quantity": 21, "price": 300,
                    "size": "500", "unit": "mg", "form": "CAPSULA"
                }
            ])),
        )
        .with_table(
            "users",
            rows(json!([
                {"id": 7, "federaltaxid": "52123456", "document_type": "CC"},
                {"id": 8, "federaltaxid": "80123456", "document_type": "CC"}
            ])),
        )
        .with_table(
            "list_options",
            rows(json!([
                {"option_id": "Female", "notes": "M"},
                {"option_id": "Male", "notes": "H"}
            ])),
        )
}

fn billing_rows() -> Vec<Row> {
    let line = |encounter: u64, pid: u64, code_type: &str, code: &str, fee: u64| {
        json!({
            "encounter": encounter, "pid": pid, "code_type": code_type, "code": code,
            "fee": fee, "date": "2024-11-05 09:00:00", "activity": 1
        })
    };
    rows(json!([
        line(100, 1, "CONSULTA", "890201", 45000),
        line(100, 1, "ICD10", "J00X", 0),
        line(100, 1, "ICD10", "R509", 0),
        line(100, 1, "ICD10", "R05X", 0),
        line(100, 1, "ICD10", "R51X", 0),
        line(100, 1, "ICD10", "Z000", 0),
        line(100, 1, "CUPS", "903841", 12000),
        line(100, 1, "INCAPACIDAD", "SI", 0),
        line(101, 1, "CONSULTA", "890301", 50000),
        line(101, 1, "ICD10", "K297", 0),
        line(200, 2, "CONSULTA", "890201", 45000),
        line(200, 2, "ICD10", "J029", 0),
        line(200, 2, "CPT4", "902210", 8000),
        line(200, 2, "INCAPACIDAD", "NO", 0)
    ]))
}

/// Collaborators for a service over `data`.
pub struct Harness {
    pub mappings: Arc<MemoryMappingStore>,
    pub sequence: Arc<MemorySequence>,
    pub reference: Arc<MemoryReferenceTables>,
    pub service: GenerationService,
}

pub fn harness<S>(data: S) -> Harness
where
    S: SchemaIntrospector + RowSource + ReferenceLookup + 'static,
{
    let mappings = Arc::new(MemoryMappingStore::new());
    let sequence = Arc::new(MemorySequence::new());
    let reference = Arc::new(MemoryReferenceTables::new());
    let service = GenerationService::new(
        Arc::new(data),
        mappings.clone(),
        sequence.clone(),
        reference.clone(),
    )
    .with_validation(ValidationOptions {
        reference_date: reference_date(),
    });
    Harness {
        mappings,
        sequence,
        reference,
        service,
    }
}

/// Delegates to a memory source, counting row fetches per table.
#[derive(Debug, Clone)]
pub struct CountingSource {
    inner: MemoryDataSource,
    fetches: Arc<Mutex<BTreeMap<String, usize>>>,
}

impl CountingSource {
    pub fn new(inner: MemoryDataSource) -> Self {
        Self {
            inner,
            fetches: Arc::default(),
        }
    }

    pub fn counter(&self) -> Arc<Mutex<BTreeMap<String, usize>>> {
        Arc::clone(&self.fetches)
    }
}

impl SchemaIntrospector for CountingSource {
    fn columns_of(&self, table: &str) -> SourceResult<Vec<ColumnInfo>> {
        self.inner.columns_of(table)
    }
}

impl RowSource for CountingSource {
    fn fetch_rows(&self, table: &str, predicates: &[Predicate]) -> SourceResult<Vec<Row>> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default() += 1;
        self.inner.fetch_rows(table, predicates)
    }
}

impl ReferenceLookup for CountingSource {
    fn find_one(&self, table: &str, column: &str, value: &str) -> SourceResult<Option<Row>> {
        self.inner.find_one(table, column, value)
    }
}

/// Delegates to a memory source but fails every call touching `broken`.
#[derive(Debug, Clone)]
pub struct FailingSource {
    inner: MemoryDataSource,
    broken: String,
}

impl FailingSource {
    pub fn new(inner: MemoryDataSource, broken: &str) -> Self {
        Self {
            inner,
            broken: broken.to_string(),
        }
    }

    fn check(&self, table: &str) -> SourceResult<()> {
        if table == self.broken {
            Err(SourceError::backend(format!("connection lost reading {table}")))
        } else {
            Ok(())
        }
    }
}

impl SchemaIntrospector for FailingSource {
    fn columns_of(&self, table: &str) -> SourceResult<Vec<ColumnInfo>> {
        self.inner.columns_of(table)
    }
}

impl RowSource for FailingSource {
    fn fetch_rows(&self, table: &str, predicates: &[Predicate]) -> SourceResult<Vec<Row>> {
        self.check(table)?;
        self.inner.fetch_rows(table, predicates)
    }
}

impl ReferenceLookup for FailingSource {
    fn find_one(&self, table: &str, column: &str, value: &str) -> SourceResult<Option<Row>> {
        self.check(table)?;
        self.inner.find_one(table, column, value)
    }
}
