use super::{Cell, Sheet};
use crate::aggregate::ledger::Ledger;
use crate::model::CpnRecord;

pub const SUMMARY_SHEET: &str = "CPNs";
pub const DETAIL_SHEET: &str = "Mercadería Entregada";

pub const SUMMARY_HEADERS: [&str; 9] = [
    "FECHA",
    "COE",
    "COMPROBANTE",
    "ACOPIO",
    "TIPO DE GRANO",
    "CAMPAÑA",
    "CANTIDAD DE KILOS",
    "PRECIO",
    "LOCALIDAD",
];

pub const DETAIL_HEADERS: [&str; 8] = [
    "FECHA",
    "COMPROBANTE",
    "ME - Nro comprobante",
    "ME - Grado",
    "ME - Factor",
    "ME - Contenido proteico",
    "ME - Procedencia",
    "ME - Peso (kg)",
];

/// Summary sheet with one row per certificate and detail sheet with one row
/// per delivered lot, joined by `COMPROBANTE`.
pub fn project(cpns: &Ledger<CpnRecord>) -> (Sheet, Sheet) {
    let mut summary = Sheet::new(SUMMARY_SHEET, &SUMMARY_HEADERS);
    let mut detail = Sheet::new(DETAIL_SHEET, &DETAIL_HEADERS);

    for cpn in cpns.iter() {
        let comprobante = cpn.comprobante();
        summary.push(vec![
            Cell::date(cpn.fecha),
            Cell::text(&cpn.coe),
            Cell::text(&comprobante),
            Cell::text(cpn.acopio.razon_social.trim()),
            Cell::text(&cpn.grain.name),
            Cell::opt_text(cpn.campaign.as_deref()),
            Cell::from(cpn.weight_kg),
            Cell::opt_decimal(cpn.price_per_kg),
            Cell::opt_text(cpn.localidad.as_deref()),
        ]);

        for lot in &cpn.delivered {
            detail.push(vec![
                Cell::date(cpn.fecha),
                Cell::text(&comprobante),
                Cell::text(&lot.comprobante),
                Cell::opt_text(lot.grado.as_deref()),
                Cell::opt_decimal(lot.factor),
                Cell::opt_decimal(lot.protein),
                Cell::opt_text(lot.procedencia.as_deref()),
                Cell::opt_decimal(lot.weight_kg),
            ]);
        }
    }

    (summary, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeliveredLot, Grain, Party};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn lot(nro: &str, peso: rust_decimal::Decimal) -> DeliveredLot {
        DeliveredLot {
            comprobante: nro.into(),
            grado: Some("G2".into()),
            factor: Some(dec!(99.5)),
            protein: None,
            weight_kg: Some(peso),
            procedencia: Some("Videla".into()),
        }
    }

    #[test]
    fn test_summary_and_detail_share_comprobante() {
        let mut ledger = Ledger::new();
        ledger.upsert(CpnRecord {
            source_id: "a".into(),
            source_name: "a.pdf".into(),
            coe: "330229912534".into(),
            punto_venta: "3302".into(),
            numero: "29912534".into(),
            fecha: NaiveDate::from_ymd_opt(2025, 11, 20).unwrap(),
            acopio: Party {
                razon_social: "ACOPIO DEL SUR SA ".into(),
                ..Party::default()
            },
            grain: Grain {
                name: "Soja".into(),
                code: 123,
            },
            campaign: Some("2024-2025".into()),
            weight_kg: dec!(12050),
            price_per_kg: Some(dec!(258.50)),
            localidad: Some("VIDELA".into()),
            delivered: vec![lot("30012345678", dec!(6000)), lot("30012345679", dec!(6050))],
        });

        let (summary, detail) = project(&ledger);
        assert_eq!(
            summary.rows,
            vec![vec![
                Cell::text("20/11/2025"),
                Cell::text("330229912534"),
                Cell::text("3302-29912534"),
                Cell::text("ACOPIO DEL SUR SA"),
                Cell::text("Soja"),
                Cell::text("2024-2025"),
                Cell::from(dec!(12050)),
                Cell::from(dec!(258.50)),
                Cell::text("VIDELA"),
            ]]
        );
        assert_eq!(detail.name, "Mercadería Entregada");
        assert_eq!(detail.rows.len(), 2);
        assert_eq!(detail.cell(1, "COMPROBANTE"), Some(&Cell::text("3302-29912534")));
        assert_eq!(detail.cell(1, "ME - Nro comprobante"), Some(&Cell::text("30012345679")));
        assert_eq!(detail.cell(1, "ME - Contenido proteico"), Some(&Cell::Empty));
        assert_eq!(detail.cell(1, "ME - Peso (kg)"), Some(&Cell::from(dec!(6050))));
    }
}
