//! Transaction-level rules.

use crate::codes::{NO_INVOICE_NOTE_TYPE, OBLIGATED_ID_LENGTH};
use crate::record::Record;

use super::{Check, Rule, RuleEnv, Verdict, fail};

pub static TRANSACTION_RULES: &[Rule] = &[
    Rule::error(
        "TX-OBLIGATED-ID",
        "numDocumentoIdObligado",
        "Obligated party id",
        Check::LengthBetween(OBLIGATED_ID_LENGTH.0, OBLIGATED_ID_LENGTH.1),
    ),
    Rule::error(
        "TX-INVOICE-TYPE",
        "numFactura",
        "Invoice number",
        Check::StringOrNull,
    ),
    Rule::warning(
        "TX-NOTE-WITHOUT-INVOICE",
        "tipoNota",
        "Note type",
        Check::Custom(note_type_without_invoice),
    ),
];

/// A transaction without an invoice is expected to be reported as `RS`.
fn note_type_without_invoice(record: &Record<'_>, _env: &RuleEnv) -> Verdict {
    if record.text("numFactura").is_some() {
        return Verdict::Pass;
    }
    match record.text("tipoNota") {
        Some(note) if note == NO_INVOICE_NOTE_TYPE => Verdict::Pass,
        _ => fail(format!(
            "Note type should be '{NO_INVOICE_NOTE_TYPE}' when there is no invoice number"
        )),
    }
}
