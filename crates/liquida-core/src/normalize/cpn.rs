use super::units::{price_per_kilogram, to_kilograms};
use super::{optional_text, party, split_coe, Required};
use crate::error::LiquidaError;
use crate::layouts::catalog::Catalog;
use crate::model::{ClassifiedDocument, CpnRecord, DeliveredLot, SaleRecord};
use crate::parsing::result::ExtractionResult;

/// Canonical fields a grain-receipt certificate needs.
pub const REQUIRED: &[&str] = &["coe", "fecha", "acopio_razon_social", "grano", "cantidad"];

/// The CPN side of a liquidation: the buyer is the acopio that received the
/// grain, and the figures are the sale's.
pub fn cpn_from_liquidation(sale: &SaleRecord, result: &ExtractionResult) -> CpnRecord {
    CpnRecord {
        source_id: sale.source_id.clone(),
        source_name: sale.source_name.clone(),
        coe: sale.coe.clone(),
        punto_venta: sale.punto_venta.clone(),
        numero: sale.numero.clone(),
        fecha: sale.fecha,
        acopio: sale.buyer.clone(),
        grain: sale.grain.clone(),
        campaign: sale.campaign.clone(),
        weight_kg: sale.weight_kg,
        price_per_kg: Some(sale.price_per_kg),
        localidad: optional_text(&result.fields, "localidad"),
        delivered: delivered_lots(result),
    }
}

pub fn cpn_record(
    doc: &ClassifiedDocument,
    result: &ExtractionResult,
    catalog: &Catalog,
) -> Result<CpnRecord, LiquidaError> {
    let fields = &result.fields;
    let mut required = Required::new(fields);

    let coe = required.text("coe");
    let fecha = required.date("fecha");
    let razon_social = required.text("acopio_razon_social");
    let grano = required.text("grano");
    let cantidad = required.quantity("cantidad");

    let coe_parts = coe.as_deref().and_then(split_coe);
    if coe.is_some() && coe_parts.is_none() {
        required.reject("coe");
    }
    let grain = grano.as_deref().and_then(|g| catalog.grain(g));
    if grano.is_some() && grain.is_none() {
        required.reject("grano");
    }
    let weight_kg = cantidad
        .as_ref()
        .and_then(|(amount, unit)| to_kilograms(*amount, unit, catalog));
    if cantidad.is_some() && weight_kg.is_none() {
        required.reject("cantidad");
    }

    let (Some(coe), Some((punto_venta, numero)), Some(fecha), Some(razon_social), Some(grain), Some(weight_kg)) =
        (coe, coe_parts, fecha, razon_social, grain, weight_kg)
    else {
        return Err(required.into_error());
    };

    let price_per_kg = match (fields.number("precio"), &cantidad) {
        (Some(price), Some((_, unit))) => price_per_kilogram(price.abs(), unit, catalog),
        _ => None,
    };
    let cuit = optional_text(fields, "acopio_cuit").unwrap_or_default();

    Ok(CpnRecord {
        source_id: doc.id().to_string(),
        source_name: doc.name().to_string(),
        coe,
        punto_venta,
        numero,
        fecha,
        acopio: party(fields, "acopio", razon_social, cuit),
        grain,
        campaign: optional_text(fields, "campana"),
        weight_kg,
        price_per_kg,
        localidad: optional_text(fields, "localidad"),
        delivered: delivered_lots(result),
    })
}

/// Rows of the `mercaderia` table. A row without a comprobante number is
/// not a lot. The section's procedencia applies to every lot.
pub fn delivered_lots(result: &ExtractionResult) -> Vec<DeliveredLot> {
    let procedencia = optional_text(&result.fields, "procedencia");
    result
        .table("mercaderia")
        .iter()
        .filter_map(|row| {
            Some(DeliveredLot {
                comprobante: row.text("comprobante")?.to_string(),
                grado: row.text("grado").map(str::to_string),
                factor: row.number("factor"),
                protein: row.number("proteina"),
                weight_kg: row.number("peso"),
                procedencia: procedencia.clone(),
            })
        })
        .collect()
}
