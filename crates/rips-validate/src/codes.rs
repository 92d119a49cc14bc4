//! Code sets and policy tables used by the rules.

/// Identification document types accepted for users.
pub const DOCUMENT_TYPES: &[&str] = &[
    "CC", "CE", "CD", "PA", "SC", "PE", "RC", "TI", "CN", "AS", "MS", "DE", "PT", "SI",
];

/// Document types whose number must be all digits.
pub const NUMERIC_DOCUMENT_TYPES: &[&str] = &["CC", "TI"];

/// Per-type (min, max) length of the document number.
pub const DOCUMENT_NUMBER_LENGTHS: &[(&str, usize, usize)] = &[
    ("CC", 3, 10),
    ("CE", 1, 6),
    ("CD", 1, 16),
    ("PA", 1, 16),
    ("SC", 1, 16),
    ("PE", 1, 15),
    ("RC", 1, 11),
    ("TI", 1, 11),
    ("CN", 1, 9),
    ("AS", 1, 10),
    ("MS", 1, 12),
    ("DE", 1, 20),
    ("PT", 1, 20),
    ("SI", 1, 20),
];

pub const USER_TYPES: &[&str] = &[
    "01", "02", "03", "04", "05", "06", "07", "08", "09", "10", "11", "12",
];

pub const SEX_CODES: &[&str] = &["H", "M", "I"];

pub const TERRITORIAL_ZONES: &[&str] = &["01", "02"];

pub const DOMESTIC_COUNTRY: &str = "170";

pub const MUNICIPALITY_CODE_LENGTH: usize = 5;

pub const DISABILITY_FLAGS: &[&str] = &["SI", "NO"];

/// Note type expected when a transaction carries no invoice.
pub const NO_INVOICE_NOTE_TYPE: &str = "RS";

pub const PROVIDER_CODE_LENGTH: usize = 12;

pub const MODALITIES: &[&str] = &["01", "02", "03", "04", "06", "07", "08", "09"];

pub const SERVICE_GROUPS: &[&str] = &["01", "02", "03", "04", "05"];

pub const CONSULTATION_CAUSES: &[&str] = &[
    "21", "22", "23", "24", "25", "26", "27", "28", "29", "30", "31", "32", "33", "34", "35", "36",
    "37", "38", "39", "40", "41", "42", "43", "44", "45", "46", "47", "48", "49",
];

pub const DIAGNOSIS_TYPES: &[&str] = &["01", "02", "03"];

pub const ENTRY_ROUTES: &[&str] = &["01", "02", "03", "04"];

pub const COLLECTION_CONCEPTS: &[&str] = &["01", "02", "03", "04", "05"];

pub const MEDICATION_TYPES: &[&str] = &["01", "02", "03", "04"];

pub const MAX_TREATMENT_DAYS: i64 = 999;

pub const OBLIGATED_ID_LENGTH: (usize, usize) = (4, 12);

pub fn document_number_length(document_type: &str) -> Option<(usize, usize)> {
    DOCUMENT_NUMBER_LENGTHS
        .iter()
        .find(|(code, _, _)| *code == document_type)
        .map(|(_, min, max)| (*min, *max))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Inclusive(i64),
    Exclusive(i64),
}

/// Allowed age range for one document type.
///
/// `tolerated` is an extra age accepted even though it falls outside the
/// nominal bounds (registrations that are renewed late).
#[derive(Debug, Clone, Copy)]
pub struct AgeBand {
    pub document_type: &'static str,
    pub name: &'static str,
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
    pub tolerated: Option<i64>,
}

impl AgeBand {
    pub fn accepts(&self, age: i64) -> bool {
        if self.tolerated == Some(age) {
            return true;
        }
        let above = match self.lower {
            Some(Bound::Inclusive(min)) => age >= min,
            Some(Bound::Exclusive(min)) => age > min,
            None => true,
        };
        let below = match self.upper {
            Some(Bound::Inclusive(max)) => age <= max,
            Some(Bound::Exclusive(max)) => age < max,
            None => true,
        };
        above && below
    }
}

pub const AGE_BANDS: &[AgeBand] = &[
    AgeBand {
        document_type: "CC",
        name: "adult",
        lower: Some(Bound::Inclusive(18)),
        upper: None,
        tolerated: None,
    },
    AgeBand {
        document_type: "TI",
        name: "minor with identity card",
        lower: Some(Bound::Inclusive(7)),
        upper: Some(Bound::Exclusive(18)),
        tolerated: Some(18),
    },
    AgeBand {
        document_type: "RC",
        name: "civil registration",
        lower: None,
        upper: Some(Bound::Exclusive(7)),
        tolerated: Some(7),
    },
    AgeBand {
        document_type: "CN",
        name: "birth certificate",
        lower: None,
        upper: Some(Bound::Inclusive(3)),
        tolerated: None,
    },
    AgeBand {
        document_type: "AS",
        name: "adult without identification",
        lower: Some(Bound::Exclusive(18)),
        upper: None,
        tolerated: None,
    },
    AgeBand {
        document_type: "MS",
        name: "minor without identification",
        lower: None,
        upper: Some(Bound::Inclusive(18)),
        tolerated: None,
    },
];

pub fn age_band(document_type: &str) -> Option<&'static AgeBand> {
    AGE_BANDS
        .iter()
        .find(|band| band.document_type == document_type)
}
