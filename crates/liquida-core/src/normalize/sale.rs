use super::units::{currency, price_per_kilogram, to_kilograms, vat_of};
use super::{amount_or_zero, optional_text, party, split_coe, Required};
use crate::error::LiquidaError;
use crate::layouts::catalog::Catalog;
use crate::model::{ClassifiedDocument, DocumentKind, SaleRecord, SaleVoucher, Withholdings};
use crate::parsing::result::ExtractionResult;

/// Canonical fields a liquidation needs to become a sale.
pub const REQUIRED: &[&str] = &[
    "coe",
    "fecha",
    "comprador_razon_social",
    "comprador_cuit",
    "grano",
    "cantidad",
    "precio",
    "neto",
];

pub fn sale_record(
    doc: &ClassifiedDocument,
    result: &ExtractionResult,
    catalog: &Catalog,
) -> Result<SaleRecord, LiquidaError> {
    let fields = &result.fields;
    let mut required = Required::new(fields);

    let coe = required.text("coe");
    let fecha = required.date("fecha");
    let razon_social = required.text("comprador_razon_social");
    let cuit = required.text("comprador_cuit");
    let grano = required.text("grano");
    let cantidad = required.quantity("cantidad");
    let precio = required.number("precio");
    let neto = required.number("neto");

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
    let price_per_kg = match (precio, &cantidad) {
        (Some(price), Some((_, unit))) => price_per_kilogram(price, unit, catalog),
        _ => None,
    };

    let (
        Some(coe),
        Some((punto_venta, numero)),
        Some(fecha),
        Some(razon_social),
        Some(cuit),
        Some(grain),
        Some(weight_kg),
        Some(price_per_kg),
        Some(net),
    ) = (
        coe,
        coe_parts,
        fecha,
        razon_social,
        cuit,
        grain,
        weight_kg,
        price_per_kg,
        neto,
    )
    else {
        return Err(required.into_error());
    };

    let net = net.abs();
    let vat_rate = fields
        .number("alicuota")
        .map(|r| r.abs())
        .unwrap_or_else(|| catalog.default_vat_rate());
    let vat = fields
        .number("iva")
        .map(|v| v.abs())
        .unwrap_or_else(|| vat_of(net, vat_rate));
    let total = fields
        .number("total")
        .map(|t| t.abs())
        .unwrap_or(net + vat);

    let seller = optional_text(fields, "vendedor_razon_social").map(|name| {
        let cuit = optional_text(fields, "vendedor_cuit").unwrap_or_default();
        party(fields, "vendedor", name, cuit)
    });

    Ok(SaleRecord {
        source_id: doc.id().to_string(),
        source_name: doc.name().to_string(),
        coe,
        punto_venta,
        numero,
        fecha,
        voucher: match doc.kind() {
            DocumentKind::SecondaryLiquidation => SaleVoucher::F2,
            _ => SaleVoucher::F1,
        },
        letra: "A".to_string(),
        buyer: party(fields, "comprador", razon_social, cuit),
        seller,
        grain,
        campaign: optional_text(fields, "campana"),
        weight_kg,
        price_per_kg,
        currency: currency(fields.text("moneda")),
        net,
        vat_rate,
        vat,
        total,
        withholdings: Withholdings {
            iva: amount_or_zero(fields, "ret_iva"),
            ganancias: amount_or_zero(fields, "ret_ganancias"),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layouts::builtin;
    use crate::model::{Currency, TaxCondition};
    use crate::normalize::test_support::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn complete() -> ExtractionResult {
        let mut r = result("afip_primaria");
        text(&mut r, "coe", "330229912534");
        date(&mut r, "fecha", NaiveDate::from_ymd_opt(2025, 11, 20).unwrap());
        text(&mut r, "comprador_razon_social", "ACOPIO DEL SUR SA");
        text(&mut r, "comprador_cuit", "30712345671");
        text(&mut r, "comprador_iva", "Responsable Inscripto");
        code(&mut r, "grano", "Soja");
        quantity(&mut r, "cantidad", dec!(120.5), "qq");
        number(&mut r, "precio", dec!(25850));
        number(&mut r, "neto", dec!(3114925));
        r
    }

    fn sale(r: &ExtractionResult, kind: DocumentKind) -> Result<SaleRecord, LiquidaError> {
        let catalog = builtin::catalog().unwrap();
        sale_record(&doc(kind, "afip_primaria"), r, &catalog)
    }

    #[test]
    fn test_complete_sale_with_derived_amounts() {
        let s = sale(&complete(), DocumentKind::PrimaryLiquidation).unwrap();
        assert_eq!(s.punto_venta, "3302");
        assert_eq!(s.numero, "29912534");
        assert_eq!(s.voucher, SaleVoucher::F1);
        assert_eq!(s.grain.code, 123);
        assert_eq!(s.weight_kg, dec!(12050));
        assert_eq!(s.price_per_kg, dec!(258.50));
        assert_eq!(s.vat_rate, dec!(10.5));
        assert_eq!(s.vat, dec!(327067.13));
        assert_eq!(s.total, dec!(3441992.13));
        assert_eq!(s.currency, Currency::Ars);
        assert_eq!(s.withholdings, Withholdings::default());
        assert_eq!(s.buyer.tax_condition, Some(TaxCondition::ResponsableInscripto));
        assert!(s.seller.is_none());
    }

    #[test]
    fn test_secondary_is_f2() {
        let s = sale(&complete(), DocumentKind::SecondaryLiquidation).unwrap();
        assert_eq!(s.voucher, SaleVoucher::F2);
    }

    #[test]
    fn test_each_missing_field_is_named_alone() {
        for name in REQUIRED {
            let mut r = complete();
            r.fields.insert(*name, crate::parsing::result::ExtractedField::missing());
            match sale(&r, DocumentKind::PrimaryLiquidation) {
                Err(LiquidaError::IncompleteRecord { missing }) => {
                    assert_eq!(missing, vec![name.to_string()], "removing {name}")
                }
                other => panic!("removing {name}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_several_missing_fields_are_all_named() {
        let mut r = result("afip_primaria");
        text(&mut r, "coe", "330229912534");
        let err = sale(&r, DocumentKind::PrimaryLiquidation).unwrap_err();
        match err {
            LiquidaError::IncompleteRecord { missing } => assert_eq!(missing.len(), REQUIRED.len() - 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_grain_and_short_coe_are_rejected() {
        let mut r = complete();
        code(&mut r, "grano", "Cebada");
        text(&mut r, "coe", "1234");
        match sale(&r, DocumentKind::PrimaryLiquidation) {
            Err(LiquidaError::IncompleteRecord { missing }) => {
                assert_eq!(missing, vec!["coe", "grano"])
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_printed_amounts_win_over_derived() {
        let mut r = complete();
        number(&mut r, "alicuota", dec!(21));
        number(&mut r, "iva", dec!(654134.25));
        number(&mut r, "total", dec!(3769059.25));
        number(&mut r, "ret_iva", dec!(-261653.70));
        code(&mut r, "moneda", "USD");
        text(&mut r, "vendedor_razon_social", "PEREZ JUAN");
        let s = sale(&r, DocumentKind::PrimaryLiquidation).unwrap();
        assert_eq!(s.vat_rate, dec!(21));
        assert_eq!(s.vat, dec!(654134.25));
        assert_eq!(s.total, dec!(3769059.25));
        assert_eq!(s.withholdings.iva, dec!(261653.70));
        assert_eq!(s.currency, Currency::Usd);
        let seller = s.seller.unwrap();
        assert_eq!(seller.razon_social, "PEREZ JUAN");
        assert_eq!(seller.cuit, "");
    }
}
