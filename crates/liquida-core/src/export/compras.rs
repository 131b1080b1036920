use super::{Cell, Sheet};
use crate::aggregate::ledger::Ledger;
use crate::model::ExpenseRecord;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

pub const SHEET: &str = "Gastos";

/// HWCpra1 column layout.
pub const HEADERS: [&str; 23] = [
    "Fecha Emisión ",
    "Fecha Recepción",
    "Cpbte",
    "Suc.",
    "Número",
    "Razón Social/Denominación Proveedor",
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
    "IVA Crédito",
    "Cód. NG/EX",
    "Conceptos NG/EX",
    "Cód. P/R",
    "Perc./Ret.",
    "Pcia P/R",
    "Total",
];

pub const CPBTE: &str = "ND";
pub const PERCEPCION_IVA: &str = "P007";
const COD_NETO_21: i64 = 202;
const COD_NETO_OTHER: i64 = 203;
const COD_EXENTO: i64 = 203;
const TIPO_DOC_CUIT: i64 = 80;

/// Deduction lines grouped by VAT rate, one row per rate in ascending
/// order. The exempt total rides on the first row; a voucher with only
/// exempt lines gets a single row. A VAT perception adds a `P007` row.
pub fn project(expenses: &Ledger<ExpenseRecord>) -> Sheet {
    let mut sheet = Sheet::new(SHEET, &HEADERS);
    for expense in expenses.iter() {
        let (by_rate, exempt) = group_by_rate(expense);

        if by_rate.is_empty() {
            if !exempt.is_zero() {
                sheet.push(rate_row(expense, None, Decimal::ZERO, Decimal::ZERO, exempt));
            }
        } else {
            for (i, (rate, (net, vat))) in by_rate.into_iter().enumerate() {
                let exempt_here = if i == 0 { exempt } else { Decimal::ZERO };
                sheet.push(rate_row(expense, Some(rate), net, vat, exempt_here));
            }
        }

        if !expense.vat_perception.is_zero() {
            sheet.push(perception_row(expense));
        }
    }
    sheet
}

/// Net and VAT per rate, plus the exempt total. An exempt line counts with
/// its total, or its net when no total was printed.
fn group_by_rate(expense: &ExpenseRecord) -> (BTreeMap<Decimal, (Decimal, Decimal)>, Decimal) {
    let mut by_rate: BTreeMap<Decimal, (Decimal, Decimal)> = BTreeMap::new();
    let mut exempt = Decimal::ZERO;
    for line in &expense.lines {
        if line.is_exempt() {
            exempt += if line.total.is_zero() { line.net } else { line.total };
        } else {
            let entry = by_rate.entry(line.vat_rate.normalize()).or_default();
            entry.0 += line.net;
            entry.1 += line.vat;
        }
    }
    (by_rate, exempt)
}

fn identity(expense: &ExpenseRecord) -> Vec<Cell> {
    let provider = &expense.provider;
    vec![
        Cell::date(expense.fecha),
        Cell::date(expense.fecha),
        Cell::text(CPBTE),
        Cell::text(&expense.punto_venta),
        Cell::text(&expense.numero),
        Cell::text(provider.razon_social.trim()),
        Cell::Integer(TIPO_DOC_CUIT),
        Cell::text(&provider.cuit),
        Cell::opt_text(provider.domicilio.as_deref()),
        Cell::Empty,
        Cell::Empty,
        Cell::opt_text(Some(provider.cond_fisc())),
    ]
}

fn rate_row(
    expense: &ExpenseRecord,
    rate: Option<Decimal>,
    net: Decimal,
    vat: Decimal,
    exempt: Decimal,
) -> Vec<Cell> {
    let cod_neto = match rate {
        Some(r) if r == Decimal::from(21) => COD_NETO_21,
        _ => COD_NETO_OTHER,
    };
    let (cod_exento, exento) = if exempt.is_zero() {
        (Cell::Empty, Cell::Empty)
    } else {
        (Cell::Integer(COD_EXENTO), Cell::from(exempt))
    };

    let mut row = identity(expense);
    row.extend([
        Cell::Integer(cod_neto),
        Cell::from(net),
        Cell::opt_decimal(rate),
        Cell::from(vat),
        Cell::from(vat),
        cod_exento,
        exento,
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::from(net + vat + exempt),
    ]);
    row
}

fn perception_row(expense: &ExpenseRecord) -> Vec<Cell> {
    let mut row = identity(expense);
    row.extend([
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::text(PERCEPCION_IVA),
        Cell::from(expense.vat_perception),
        Cell::Empty,
        Cell::from(expense.vat_perception),
    ]);
    row
}
