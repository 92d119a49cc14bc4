use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};
use serde_json::Value;

use rips_generate::{GenerationOutput, StoredMapping};
use rips_model::{LeafKind, SchemaNode, Severity, ValidationError, error_count, warning_count};
use rips_store::OutputPaths;

pub fn print_generation(output: &GenerationOutput, paths: Option<&OutputPaths>) {
    println!("Document: {} (id {})", output.filename, output.id);
    match paths {
        Some(paths) => {
            println!("Output: {}", paths.document.display());
            println!("Findings: {}", paths.findings.display());
        }
        None => println!("Output: not written (dry run)"),
    }
    println!("Users: {}", output.document.user_count());
    print_findings(&output.findings);
}

pub fn print_findings(findings: &[ValidationError]) {
    let mut totals = Table::new();
    totals.set_header(vec![header_cell("Errors"), header_cell("Warnings")]);
    apply_table_style(&mut totals);
    totals.add_row(vec![
        count_cell(error_count(findings), Color::Red),
        count_cell(warning_count(findings), Color::Yellow),
    ]);
    println!("{totals}");

    if findings.is_empty() {
        return;
    }

    let mut ordered: Vec<&ValidationError> = findings.iter().collect();
    // stable: document order is kept within each severity
    ordered.sort_by_key(|finding| std::cmp::Reverse(severity_rank(finding.severity)));

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Severity"),
        header_cell("Rule"),
        header_cell("Scope"),
        header_cell("Field"),
        header_cell("Value"),
        header_cell("Message"),
    ]);
    apply_findings_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Center);
    for finding in ordered {
        table.add_row(vec![
            severity_cell(finding.severity),
            Cell::new(&finding.rule),
            Cell::new(&finding.scope).fg(Color::Blue),
            Cell::new(&finding.field),
            value_cell(&finding.value),
            Cell::new(&finding.message),
        ]);
    }
    println!();
    println!("Findings:");
    println!("{table}");
}

pub fn print_mappings(mappings: &[StoredMapping]) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Id"), header_cell("Name"), header_cell("Size")]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for mapping in mappings {
        table.add_row(vec![
            Cell::new(mapping.id).add_attribute(Attribute::Bold),
            Cell::new(&mapping.name),
            dim_cell(format!("{} B", mapping.mapping.len())),
        ]);
    }
    println!("{table}");
}

pub fn print_schema(schema: &SchemaNode) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Path"), header_cell("Kind")]);
    apply_table_style(&mut table);
    for (path, node) in schema.nodes() {
        let kind = match node {
            SchemaNode::Root(_) | SchemaNode::Object(_) => Cell::new("object"),
            SchemaNode::Array(_) => Cell::new("array").fg(Color::Cyan),
            SchemaNode::Leaf(LeafKind::Sequence) => Cell::new("sequence").fg(Color::Green),
            SchemaNode::Leaf(LeafKind::Value) => dim_cell("value"),
        };
        table.add_row(vec![Cell::new(path.to_string()), kind]);
    }
    println!("{table}");
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_findings_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(180);
    table.set_constraints(vec![
        ColumnConstraint::UpperBoundary(Width::Fixed(9)),
        ColumnConstraint::UpperBoundary(Width::Fixed(26)),
        ColumnConstraint::UpperBoundary(Width::Percentage(30)),
        ColumnConstraint::UpperBoundary(Width::Fixed(30)),
        ColumnConstraint::UpperBoundary(Width::Fixed(16)),
        ColumnConstraint::UpperBoundary(Width::Percentage(40)),
    ]);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn severity_rank(severity: Severity) -> u8 {
    match severity {
        Severity::Error => 2,
        Severity::Warning => 1,
    }
}

fn severity_cell(severity: Severity) -> Cell {
    match severity {
        Severity::Error => Cell::new("ERROR")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        Severity::Warning => Cell::new("WARN").fg(Color::Yellow),
    }
}

fn value_cell(value: &Value) -> Cell {
    match value {
        Value::Null => dim_cell("-"),
        Value::String(text) => Cell::new(text),
        other => Cell::new(other.to_string()),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
