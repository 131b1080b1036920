pub mod result;
pub mod sections;
pub mod text;
pub mod values;

use crate::error::LiquidaError;
use crate::layouts::catalog::Catalog;
use crate::layouts::schema::{Aggregate, Coercion, Scope};
use crate::layouts::{CompiledField, CompiledLayout, CompiledTable, LayoutRegistry};
use crate::model::{ClassifiedDocument, SourceDocument};
use regex::Captures;
use result::{ExtractedField, ExtractionResult, FieldSet, FieldValue};
use rust_decimal::Decimal;
use sections::Sections;
use text::{fold, squash};

/// Run the rule set of the document's layout variant.
///
/// Every declared field gets an entry: not found is `missing`, a value that
/// fails its coercion is `invalid`. Only a variant without rules fails.
pub fn extract(
    doc: &ClassifiedDocument,
    registry: &LayoutRegistry,
    catalog: &Catalog,
) -> Result<ExtractionResult, LiquidaError> {
    let layout = match registry.get(doc.variant()) {
        Some(layout) if layout.def().has_rules() => layout,
        _ => {
            tracing::error!(
                variant = %doc.variant(),
                file = %doc.name(),
                "no extraction rules for layout variant"
            );
            return Err(LiquidaError::ExtractionRuleMissing {
                variant: doc.variant().to_string(),
            });
        }
    };

    let source = doc.source();
    let all_lines: Vec<&str> = source.lines().collect();
    let sections = Sections::resolve(&layout.sections, &all_lines);

    let mut result = ExtractionResult::new(doc.id(), doc.variant());
    for field in &layout.fields {
        let lines = scope_lines(&field.scope, source, &sections);
        result
            .fields
            .insert(field.name.clone(), extract_field(field, &lines, catalog));
    }
    for table in &layout.tables {
        let rows = extract_table(table, source, &sections, catalog);
        result.tables.insert(table.def.name.clone(), rows);
    }

    log_summary(layout, &result);
    Ok(result)
}

fn log_summary(layout: &CompiledLayout, result: &ExtractionResult) {
    let valid = result.fields.iter().filter(|(_, f)| f.is_valid()).count();
    tracing::debug!(
        variant = %layout.variant(),
        fields = result.fields.len(),
        valid,
        tables = result.tables.len(),
        "fields extracted"
    );
}

fn scope_lines<'a>(scope: &Scope, doc: &'a SourceDocument, sections: &'a Sections) -> Vec<&'a str> {
    match scope {
        Scope::Document => doc.lines().collect(),
        Scope::Page(n) => doc
            .pages()
            .iter()
            .filter(|p| p.page_number == *n)
            .flat_map(|p| p.lines.iter().map(String::as_str))
            .collect(),
        Scope::Section(name) => sections
            .get(name)
            .map(|lines| lines.iter().map(String::as_str).collect())
            .unwrap_or_default(),
    }
}

/// One regex match: the captured text and an optional unit.
struct Candidate {
    raw: String,
    unit: Option<String>,
}

fn extract_field(field: &CompiledField, lines: &[&str], catalog: &Catalog) -> ExtractedField {
    let mut candidates = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        for caps in field.pattern.captures_iter(line) {
            let Some(value) = caps.name("value").or_else(|| caps.get(1)) else {
                continue;
            };
            let mut raw = value.as_str().trim().to_string();
            if field.continue_lines {
                append_continuation(&mut raw, &lines[i + 1..]);
            }
            candidates.push(Candidate {
                raw,
                unit: caps.name("unit").map(|u| u.as_str().to_string()),
            });
        }
    }

    if candidates.is_empty() {
        return match &field.default {
            Some(default) => coerce(default, None, &field.coerce, catalog),
            None => ExtractedField::missing(),
        };
    }

    match field.aggregate {
        Aggregate::First => coerce_candidate(&candidates[0], &field.coerce, catalog),
        Aggregate::Last => {
            coerce_candidate(&candidates[candidates.len() - 1], &field.coerce, catalog)
        }
        Aggregate::Max => {
            let coerced: Vec<ExtractedField> = candidates
                .iter()
                .map(|c| coerce_candidate(c, &field.coerce, catalog))
                .collect();
            let best = coerced
                .iter()
                .filter(|f| f.is_valid())
                .max_by_key(|f| numeric(f).map(|n| n.abs()).unwrap_or_default());
            match best {
                Some(best) => best.clone(),
                None => coerced[0].clone(),
            }
        }
        Aggregate::Sum => sum_candidates(&candidates, &field.coerce, catalog),
    }
}

/// Multi-line values (long names, addresses) continue on the following lines
/// until a blank line or another `label:` line.
fn append_continuation(raw: &mut String, following: &[&str]) {
    for line in following {
        let line = line.trim();
        if line.is_empty() || line.contains(':') {
            break;
        }
        raw.push(' ');
        raw.push_str(line);
    }
}

fn sum_candidates(candidates: &[Candidate], coercion: &Coercion, catalog: &Catalog) -> ExtractedField {
    let coerced: Vec<ExtractedField> = candidates
        .iter()
        .map(|c| coerce_candidate(c, coercion, catalog))
        .collect();
    let valid: Vec<&ExtractedField> = coerced.iter().filter(|f| f.is_valid()).collect();
    if valid.is_empty() {
        return coerced[0].clone();
    }

    let total: Decimal = valid.iter().filter_map(|f| numeric(f)).sum();
    let raw = valid
        .iter()
        .filter_map(|f| f.raw.as_deref())
        .collect::<Vec<_>>()
        .join(" + ");

    match valid[0].value.as_ref() {
        Some(FieldValue::Quantity { unit, .. }) => {
            let mixed = valid.iter().any(|f| {
                !matches!(&f.value, Some(FieldValue::Quantity { unit: u, .. }) if u == unit)
            });
            if mixed {
                ExtractedField::invalid(raw, "cannot add quantities in different units")
            } else {
                ExtractedField::valid(
                    raw,
                    FieldValue::Quantity {
                        amount: total,
                        unit: unit.clone(),
                    },
                )
            }
        }
        _ => ExtractedField::valid(raw, FieldValue::Number(total)),
    }
}

fn numeric(field: &ExtractedField) -> Option<Decimal> {
    match field.value.as_ref()? {
        FieldValue::Number(n) => Some(*n),
        FieldValue::Quantity { amount, .. } => Some(*amount),
        _ => None,
    }
}

fn coerce_candidate(candidate: &Candidate, coercion: &Coercion, catalog: &Catalog) -> ExtractedField {
    coerce(&candidate.raw, candidate.unit.as_deref(), coercion, catalog)
}

/// Apply one coercion to a raw match.
pub fn coerce(raw: &str, unit: Option<&str>, coercion: &Coercion, catalog: &Catalog) -> ExtractedField {
    let raw = raw.trim();
    let value = match coercion {
        Coercion::Text => values::parse_text(raw).map(FieldValue::Text),
        Coercion::Identifier => values::parse_identifier(raw).map(FieldValue::Identifier),
        Coercion::Cuit => values::parse_cuit(raw).map(FieldValue::Identifier),
        Coercion::Number => values::parse_decimal(raw).map(FieldValue::Number),
        Coercion::Date => values::parse_date(raw).map(FieldValue::Date),
        Coercion::Quantity => coerce_quantity(raw, unit, catalog),
        Coercion::Lookup(table) => catalog
            .lookup(table, &squash(raw))
            .map(FieldValue::Code)
            .ok_or_else(|| format!("'{}' is not listed in the {table} table", squash(raw))),
    };

    match value {
        Ok(value) => ExtractedField::valid(raw, value),
        Err(reason) => ExtractedField::invalid(raw, reason),
    }
}

/// Quantities without a unit are kilograms.
fn coerce_quantity(raw: &str, unit: Option<&str>, catalog: &Catalog) -> Result<FieldValue, String> {
    let amount = values::parse_decimal(raw)?;
    let unit = match unit.map(str::trim).filter(|u| !u.is_empty()) {
        Some(u) => catalog
            .unit(u)
            .map(|def| def.unit.clone())
            .ok_or_else(|| format!("unknown unit '{u}'"))?,
        None => "kg".to_string(),
    };
    Ok(FieldValue::Quantity { amount, unit })
}

fn extract_table(
    table: &CompiledTable,
    doc: &SourceDocument,
    sections: &Sections,
    catalog: &Catalog,
) -> Vec<FieldSet> {
    match &table.row_pattern {
        Some(pattern) => {
            let lines = scope_lines(&table.def.scope, doc, sections);
            let mut rows = Vec::new();
            for line in lines {
                if table.skip.iter().any(|s| s.is_match(line)) {
                    continue;
                }
                for caps in pattern.captures_iter(line) {
                    rows.push(row_from_captures(table, &caps, catalog));
                }
            }
            rows
        }
        None => rows_from_regions(table, doc, catalog),
    }
}

fn row_from_captures(table: &CompiledTable, caps: &Captures<'_>, catalog: &Catalog) -> FieldSet {
    let mut row = FieldSet::new();
    for column in &table.def.columns {
        let cell = match caps.name(&column.name) {
            Some(m) if !m.as_str().trim().is_empty() => {
                coerce(m.as_str(), None, &column.coerce, catalog)
            }
            _ => ExtractedField::missing(),
        };
        row.insert(column.name.clone(), cell);
    }
    row
}

/// Rows of every loader-detected region whose header carries all the
/// `region_header` keywords, in page order.
fn rows_from_regions(table: &CompiledTable, doc: &SourceDocument, catalog: &Catalog) -> Vec<FieldSet> {
    let keywords: Vec<String> = table.def.region_header.iter().map(|k| fold(k)).collect();
    let mut rows = Vec::new();

    for page in doc.pages() {
        if let Scope::Page(n) = table.def.scope {
            if page.page_number != n {
                continue;
            }
        }
        for region in &page.tables {
            let header = region.folded_header();
            let joined = header.join(" ");
            if !keywords.iter().all(|k| joined.contains(k.as_str())) {
                continue;
            }

            let positions: Vec<Option<usize>> = table
                .def
                .columns
                .iter()
                .map(|c| {
                    let key = fold(c.header.as_deref().unwrap_or(&c.name));
                    header.iter().position(|h| h.contains(key.as_str()))
                })
                .collect();

            for r in 0..region.rows.len() {
                let joined_row = region.rows[r]
                    .iter()
                    .map(|c| c.text.as_str())
                    .collect::<Vec<_>>()
                    .join("  ");
                if table.skip.iter().any(|s| s.is_match(&joined_row)) {
                    continue;
                }

                let mut row = FieldSet::new();
                for (column, position) in table.def.columns.iter().zip(&positions) {
                    let cell = match position.and_then(|p| region.cell_text(r, p)) {
                        Some(text) => coerce(&text, None, &column.coerce, catalog),
                        None => ExtractedField::missing(),
                    };
                    row.insert(column.name.clone(), cell);
                }
                rows.push(row);
            }
        }
    }

    rows
}
