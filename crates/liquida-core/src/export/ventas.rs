use super::{Cell, Sheet};
use crate::aggregate::ledger::Ledger;
use crate::model::SaleRecord;
use rust_decimal::Decimal;

pub const SHEET: &str = "Ventas";

/// HWVta1 column layout.
pub const HEADERS: [&str; 23] = [
    "Fecha dd/mm/aaaa",
    "Cpbte",
    "Tipo",
    "Suc.",
    "Número",
    "Razón Social o Denominación Cliente ",
    "Tipo Doc.",
    "CUIT",
    "Domicilio",
    "C.P.",
    "Pcia",
    "Cond Fisc",
    "Cód. Neto",
    "Neto Gravado",
    "Alíc.",
    "IVA Liquidado",
    "IVA Débito",
    "Cód. NG/EX",
    "Conceptos NG/EX",
    "Cód. P/R",
    "Perc./Ret.",
    "Pcia P/R",
    "Total",
];

/// `Tipo Doc.` for a CUIT.
pub const TIPO_DOC_CUIT: i64 = 80;
pub const RETENCION_IVA: &str = "RA07";
pub const RETENCION_GANANCIAS: &str = "RA05";

/// One invoice row per sale, followed by an `RV` row for each withholding
/// that is not zero.
pub fn project(sales: &Ledger<SaleRecord>) -> Sheet {
    let mut sheet = Sheet::new(SHEET, &HEADERS);
    for sale in sales.iter() {
        sheet.push(invoice_row(sale));
        for (code, amount) in [
            (RETENCION_IVA, sale.withholdings.iva),
            (RETENCION_GANANCIAS, sale.withholdings.ganancias),
        ] {
            if !amount.is_zero() {
                sheet.push(withholding_row(sale, code, amount));
            }
        }
    }
    sheet
}

/// Columns up to `Cond Fisc`, shared by both row kinds.
fn identity(sale: &SaleRecord, cpbte: &str) -> Vec<Cell> {
    vec![
        Cell::date(sale.fecha),
        Cell::text(cpbte),
        Cell::text(&sale.letra),
        Cell::text(&sale.punto_venta),
        Cell::text(&sale.numero),
        Cell::text(sale.buyer.razon_social.trim()),
        Cell::Integer(TIPO_DOC_CUIT),
        Cell::text(&sale.buyer.cuit),
        Cell::opt_text(sale.buyer.domicilio.as_deref()),
        Cell::Empty,
        Cell::Empty,
        Cell::opt_text(Some(sale.buyer.cond_fisc())),
    ]
}

fn invoice_row(sale: &SaleRecord) -> Vec<Cell> {
    let mut row = identity(sale, &sale.voucher.to_string());
    row.extend([
        Cell::Integer(i64::from(sale.grain.code)),
        Cell::from(sale.net),
        Cell::from(sale.vat_rate),
        Cell::from(sale.vat),
        Cell::from(sale.vat),
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::from(sale.total),
    ]);
    row
}

fn withholding_row(sale: &SaleRecord, code: &str, amount: Decimal) -> Vec<Cell> {
    let mut row = identity(sale, "RV");
    row.extend([
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::text(code),
        Cell::from(amount),
        Cell::Empty,
        Cell::from(amount),
    ]);
    row
}
