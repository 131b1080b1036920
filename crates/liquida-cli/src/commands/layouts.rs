use liquida_core::error::LiquidaError;
use liquida_core::layouts::schema::LayoutDef;
use liquida_core::layouts::{builtin, CompiledLayout};
use liquida_core::model::DocumentKind;
use liquida_core::normalize::{cpn, expense, sale};
use std::path::Path;

pub fn list() -> Result<(), LiquidaError> {
    println!("Built-in layouts (by signature priority):\n");
    let mut layouts = builtin::layouts()?;
    layouts.sort_by_key(|l| l.signature.priority);
    for layout in &layouts {
        println!(
            "  {:<22} {:<24} priority {}",
            layout.variant,
            layout.kind.to_string(),
            layout.signature.priority
        );
        if let Some(ref desc) = layout.description {
            println!("  {:<22} {}", "", desc);
        }
        println!();
    }
    Ok(())
}

/// Canonical fields a record of this kind cannot do without.
fn required_fields(kind: DocumentKind) -> &'static [&'static str] {
    match kind {
        DocumentKind::PrimaryLiquidation | DocumentKind::SecondaryLiquidation => sale::REQUIRED,
        DocumentKind::Cpn => cpn::REQUIRED,
        DocumentKind::ExpenseVoucher => expense::REQUIRED,
    }
}

pub fn explain(variant: &str) -> Result<(), LiquidaError> {
    let layout = builtin::load(variant)?;

    println!("{} ({})\n", layout.variant, layout.kind);
    if let Some(ref desc) = layout.description {
        println!("{desc}\n");
    }

    let sig = &layout.signature;
    println!("Recognised when the first page (accents and case ignored):");
    if !sig.all.is_empty() {
        println!("  contains all of:  {}", quoted(&sig.all));
    }
    if !sig.any.is_empty() {
        println!("  contains one of:  {}", quoted(&sig.any));
    }
    if !sig.none.is_empty() {
        println!("  contains none of: {}", quoted(&sig.none));
    }
    println!("  priority {} (lower is tried first)\n", sig.priority);

    if !layout.sections.is_empty() {
        println!("Sections:");
        for s in &layout.sections {
            let end = s.end.as_deref().unwrap_or("<end>");
            print!("  {:<14} /{}/ .. /{}/", s.name, s.start, end);
            if let Some(ref parent) = s.within {
                print!("  within {parent}");
            }
            if let Some(ref column) = s.column {
                print!("  column of /{}/", column.heading);
            }
            println!();
        }
        println!();
    }

    let required = required_fields(layout.kind);
    let width = layout.fields.iter().map(|f| f.name.len()).max().unwrap_or(10);
    println!("Fields (* required for a {} record):", layout.kind);
    for f in &layout.fields {
        let marker = if required.contains(&f.name.as_str()) { "*" } else { " " };
        print!(
            "  {marker} {:<width$}  {:<18} {:<6} in {}",
            f.name,
            f.coerce.to_string(),
            format!("{:?}", f.aggregate).to_lowercase(),
            f.scope
        );
        if let Some(ref default) = f.default {
            print!("  default '{default}'");
        }
        println!();
    }
    println!();

    for t in &layout.tables {
        let columns: Vec<String> = t
            .columns
            .iter()
            .map(|c| format!("{} ({})", c.name, c.coerce))
            .collect();
        let mode = if t.row_pattern.is_some() {
            "one row per matching line".to_string()
        } else {
            format!("region under header {}", quoted(&t.region_header))
        };
        println!("Table '{}' in {}: {}", t.name, t.scope, mode);
        println!("  columns: {}", columns.join(", "));
    }

    Ok(())
}

fn quoted(markers: &[String]) -> String {
    markers
        .iter()
        .map(|m| format!("\"{m}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn schema() -> Result<(), LiquidaError> {
    print!(
        r#"JSON Layout Schema
==================

A layout file teaches liquida one issuer's document format: how to
recognise it on the first page, and where each canonical field sits.
Custom layouts are loaded with `--layouts DIR` and replace a built-in
layout with the same variant name.

Top-level fields:
  variant       (string, required)  Unique layout name
  kind          (string, required)  primary_liquidation, secondary_liquidation,
                                    cpn or expense_voucher
  description   (string, optional)
  signature     (object, required)  How to recognise the document (below)
  sections      (array, optional)   Named line ranges fields can be scoped to
  fields        (array, optional)   Field rules
  tables        (array, optional)   Table rules

signature:
  priority      (number, required)  Unique; lower is tried first
  all / any / none
                (arrays, optional)  Plain markers matched against the first
                                    page, ignoring accents and case
  min_pages / max_pages (optional)

sections:
  name, start (regex, inclusive), end (regex, exclusive, optional),
  within (parent section, optional),
  column {{ "heading": regex }} keeps one side of a two-column box

fields:
  name          Canonical field name (see `liquida layouts explain`)
  pattern       Regex applied per line; named group `value` or group 1,
                named group `unit` for quantities
  scope         "document" (default), {{ "page": n }} or {{ "section": name }}
  aggregate     first (default), last, max or sum
  coerce        text (default), identifier, cuit, number, quantity, date
                or lookup:<grains|units|currencies>
  continue_lines  Append following lines without a label
  default       Used when nothing matched

tables:
  name, scope, columns [{{ "name", "header", "coerce" }}], and either
  row_pattern (regex with one named group per column, plus `skip`
  regexes) or region_header (keywords of a detected table header)

Example:
{{
  "variant": "acopio_x_liquidacion",
  "kind": "primary_liquidation",
  "signature": {{ "priority": 15, "all": ["ACOPIO X", "LIQUIDACION"] }},
  "fields": [
    {{ "name": "coe", "pattern": "C\\.O\\.E\\.?\\s*:?\\s*(\\d{{12}})", "coerce": "identifier" }},
    {{ "name": "fecha", "pattern": "Fecha:\\s*(\\d{{2}}/\\d{{2}}/\\d{{4}})", "coerce": "date" }},
    {{ "name": "cantidad", "pattern": "(?P<value>[\\d.,]+)\\s*(?P<unit>Kg|Qq)", "coerce": "quantity" }}
  ]
}}

Note: numbers use the Argentine convention ("1.234,56"); a lone separator
is read as the decimal one.
"#
    );
    Ok(())
}

pub fn validate(file: &Path) -> Result<(), LiquidaError> {
    let layout: LayoutDef = liquida_core::layouts::load_layout(file)?;
    let variant = layout.variant.clone();
    let kind = layout.kind;
    let compiled = CompiledLayout::compile(layout)?;
    let def = compiled.def();

    println!("Layout '{variant}' ({kind}) is valid.");
    println!("  Sections: {}", def.sections.len());
    println!("  Fields: {}", def.fields.len());
    println!("  Tables: {}", def.tables.len());

    let mut warnings = Vec::new();
    if !def.has_rules() {
        warnings.push(
            "no fields or tables: documents will classify but never extract".to_string(),
        );
    }
    for name in required_fields(kind) {
        if !def.fields.iter().any(|f| f.name == *name) {
            warnings.push(format!("required field '{name}' has no rule"));
        }
    }

    if !warnings.is_empty() {
        println!("\nWarnings:");
        for w in &warnings {
            println!("  - {w}");
        }
    }

    Ok(())
}
