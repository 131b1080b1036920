use super::units::vat_of;
use super::{amount_or_zero, optional_text, party, Required};
use crate::error::LiquidaError;
use crate::model::{ClassifiedDocument, DeductionLine, ExpenseRecord, SaleRecord};
use crate::parsing::result::ExtractionResult;

/// Canonical fields an expense voucher needs, besides at least one
/// deduction line or a VAT perception.
pub const REQUIRED: &[&str] = &[
    "punto_venta",
    "numero",
    "fecha",
    "emisor_razon_social",
    "emisor_cuit",
];

/// Deductions billed inside a liquidation, charged by the buyer. `None` when
/// the liquidation bills nothing.
pub fn expense_from_liquidation(sale: &SaleRecord, result: &ExtractionResult) -> Option<ExpenseRecord> {
    let lines = deduction_lines(result);
    let vat_perception = amount_or_zero(&result.fields, "percepcion_iva");
    if lines.is_empty() && vat_perception.is_zero() {
        return None;
    }

    Some(ExpenseRecord {
        source_id: sale.source_id.clone(),
        source_name: sale.source_name.clone(),
        settlement_coe: Some(sale.coe.clone()),
        punto_venta: sale.punto_venta.clone(),
        numero: sale.numero.clone(),
        fecha: sale.fecha,
        provider: sale.buyer.clone(),
        lines,
        vat_perception,
        link: None,
    })
}

pub fn expense_record(
    doc: &ClassifiedDocument,
    result: &ExtractionResult,
) -> Result<ExpenseRecord, LiquidaError> {
    let fields = &result.fields;
    let mut required = Required::new(fields);

    let punto_venta = required.text("punto_venta");
    let numero = required.text("numero");
    let fecha = required.date("fecha");
    let razon_social = required.text("emisor_razon_social");
    let cuit = required.text("emisor_cuit");

    let lines = deduction_lines(result);
    let vat_perception = amount_or_zero(fields, "percepcion_iva");
    if lines.is_empty() && vat_perception.is_zero() {
        required.reject("deducciones");
    }
    if !required.is_complete() {
        return Err(required.into_error());
    }

    let (Some(punto_venta), Some(numero), Some(fecha), Some(razon_social), Some(cuit)) =
        (punto_venta, numero, fecha, razon_social, cuit)
    else {
        return Err(required.into_error());
    };

    Ok(ExpenseRecord {
        source_id: doc.id().to_string(),
        source_name: doc.name().to_string(),
        settlement_coe: optional_text(fields, "coe_referencia"),
        punto_venta,
        numero,
        fecha,
        provider: party(fields, "emisor", razon_social, cuit),
        lines,
        vat_perception,
        link: None,
    })
}

/// Rows of the `deducciones` table with a concept and a base amount. A row
/// without a rate is exempt; missing VAT and total are derived.
pub fn deduction_lines(result: &ExtractionResult) -> Vec<DeductionLine> {
    result
        .table("deducciones")
        .iter()
        .filter_map(|row| {
            let concept = row.text("concepto")?.to_string();
            let net = row.number("base")?.abs();
            let vat_rate = row.number("alicuota").map(|r| r.abs()).unwrap_or_default();
            let vat = row
                .number("iva")
                .map(|v| v.abs())
                .unwrap_or_else(|| vat_of(net, vat_rate));
            let total = row.number("total").map(|t| t.abs()).unwrap_or(net + vat);
            Some(DeductionLine {
                concept,
                net,
                vat_rate,
                vat,
                total,
            })
        })
        .collect()
}
