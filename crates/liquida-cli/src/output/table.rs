use liquida_core::error::LiquidaError;
use liquida_core::model::{ClassifiedDocument, NormalizedDocument};
use liquida_core::parsing::result::{ExtractedField, ExtractionResult, Validity};
use liquida_core::BatchResult;
use rust_decimal::Decimal;

const PREVIEW_HEADERS: [&str; 11] = [
    "Archivo",
    "CUIT",
    "Grano",
    "Campaña",
    "Kg",
    "Precio/kg",
    "Neto",
    "Alíc.",
    "IVA",
    "Retenciones",
    "Total",
];

/// Sales preview followed by CPN and expense counts and the skipped files.
pub fn print_batch(result: &BatchResult) {
    let rows: Vec<Vec<String>> = result
        .sales
        .iter()
        .map(|sale| {
            vec![
                sale.source_name.clone(),
                sale.buyer.cuit.clone(),
                sale.grain.name.clone(),
                sale.campaign.clone().unwrap_or_default(),
                amount(sale.weight_kg),
                amount(sale.price_per_kg),
                amount(sale.net),
                format!("{}%", sale.vat_rate.normalize()),
                amount(sale.vat),
                amount(sale.withholdings.iva + sale.withholdings.ganancias),
                amount(sale.total),
            ]
        })
        .collect();

    println!("=== Ventas ({}) ===\n", result.sales.len());
    if rows.is_empty() {
        println!("  (none)");
    } else {
        print_grid(&PREVIEW_HEADERS, &rows);
    }
    println!();

    println!("=== CPN ({}) ===\n", result.cpn.len());
    for cpn in result.cpn.iter() {
        println!(
            "  {}  {}  {} kg  {} lot(s)  [{}]",
            cpn.comprobante(),
            cpn.grain.name,
            amount(cpn.weight_kg),
            cpn.delivered.len(),
            cpn.source_name
        );
    }
    println!();

    println!("=== Gastos ({}) ===\n", result.expenses.len());
    for expense in result.expenses.iter() {
        let net: Decimal = expense.lines.iter().map(|l| l.net).sum();
        let link = match &expense.link {
            Some(link) => format!("-> COE {}", link.coe),
            None => "(sin liquidación)".to_string(),
        };
        println!(
            "  {}-{}  {}  neto {}  perc. IVA {}  {}  [{}]",
            expense.punto_venta,
            expense.numero,
            expense.provider.razon_social.trim(),
            amount(net),
            amount(expense.vat_perception),
            link,
            expense.source_name
        );
    }
    println!();

    if !result.skipped.is_empty() {
        println!("Skipped {} file(s):", result.skipped.len());
        for skipped in &result.skipped {
            println!("  {}: {}", skipped.filename, skipped.reason);
        }
    }
}

/// Every extracted field with its validity, then the table rows and the
/// normalizer's verdict.
pub fn format_extraction(
    doc: &ClassifiedDocument,
    result: &ExtractionResult,
    normalized: &Result<NormalizedDocument, LiquidaError>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("File:    {}\n", doc.name()));
    out.push_str(&format!("Kind:    {}\n", doc.kind()));
    out.push_str(&format!("Layout:  {}\n", doc.variant()));
    out.push_str(&format!("Pages:   {}\n\n", doc.source().page_count()));

    let width = result
        .fields
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(10);
    for (name, field) in result.fields.iter() {
        out.push_str(&format!("  {:<width$}  {}\n", name, describe(field)));
    }

    for (name, rows) in &result.tables {
        out.push_str(&format!("\nTable '{}': {} row(s)\n", name, rows.len()));
        for (i, row) in rows.iter().enumerate() {
            let cells: Vec<String> = row
                .iter()
                .map(|(col, field)| format!("{col}={}", short(field)))
                .collect();
            out.push_str(&format!("  {:>3}. {}\n", i + 1, cells.join("  ")));
        }
    }

    out.push('\n');
    match normalized {
        Ok(doc) => {
            let mut produced = Vec::new();
            if doc.sale.is_some() {
                produced.push("venta");
            }
            if doc.cpn.is_some() {
                produced.push("CPN");
            }
            if doc.expense.is_some() {
                produced.push("gastos");
            }
            out.push_str(&format!("Records: {}\n", produced.join(", ")));
        }
        Err(e) => out.push_str(&format!("Records: none ({e})\n")),
    }
    out
}

fn describe(field: &ExtractedField) -> String {
    match &field.validity {
        Validity::Valid => short(field),
        Validity::Missing => "-- missing".to_string(),
        Validity::Invalid(reason) => format!(
            "!! invalid: {reason} (raw '{}')",
            field.raw.as_deref().unwrap_or("")
        ),
    }
}

fn short(field: &ExtractedField) -> String {
    match (&field.value, &field.validity) {
        (Some(value), Validity::Valid) => value.to_string(),
        (_, Validity::Missing) => "-".to_string(),
        _ => format!("!{}", field.raw.as_deref().unwrap_or("")),
    }
}

fn amount(d: Decimal) -> String {
    d.round_dp(2).normalize().to_string()
}

fn print_grid(headers: &[&str], rows: &[Vec<String>]) {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: Vec<&str>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c:<w$}"))
            .collect();
        println!("  {}", padded.join("  ").trim_end());
    };

    line(headers.to_vec());
    println!(
        "  {}",
        "-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1))
    );
    for row in rows {
        line(row.iter().map(String::as_str).collect());
    }
}
