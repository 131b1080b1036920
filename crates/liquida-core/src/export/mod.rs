pub mod compras;
pub mod cpn;
pub mod ventas;

use crate::aggregate::BatchResult;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// One spreadsheet cell. Amounts stay decimal; identifiers such as CUIT,
/// Suc. and Número are text so leading zeros survive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Text(String),
    Integer(i64),
    Decimal(Decimal),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Cell {
        Cell::Text(s.into())
    }

    /// Empty for `None` and for blank text.
    pub fn opt_text(s: Option<&str>) -> Cell {
        match s.map(str::trim) {
            Some(s) if !s.is_empty() => Cell::Text(s.to_string()),
            _ => Cell::Empty,
        }
    }

    pub fn date(d: NaiveDate) -> Cell {
        Cell::Text(d.format("%d/%m/%Y").to_string())
    }

    pub fn opt_decimal(d: Option<Decimal>) -> Cell {
        d.map(Cell::Decimal).unwrap_or(Cell::Empty)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl From<Decimal> for Cell {
    fn from(d: Decimal) -> Self {
        Cell::Decimal(d)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Integer(n) => write!(f, "{n}"),
            Cell::Decimal(d) => write!(f, "{d}"),
        }
    }
}

/// A named row-set in fixed column order, ready for the spreadsheet writer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: &str, headers: &[&str]) -> Self {
        Sheet {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.headers.len(), "row width of sheet {}", self.name);
        self.rows.push(row);
    }

    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Cell of `row` under `header`.
    pub fn cell(&self, row: usize, header: &str) -> Option<&Cell> {
        self.rows.get(row)?.get(self.column(header)?)
    }
}

/// The four sheets handed to the spreadsheet writer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exports {
    /// HWVta1.
    pub ventas: Sheet,
    pub cpns: Sheet,
    pub mercaderia: Sheet,
    /// HWCpra1.
    pub gastos: Sheet,
}

/// Project the batch ledgers onto their target layouts. Records keep their
/// ledger order.
pub fn project(batch: &BatchResult) -> Exports {
    let (cpns, mercaderia) = cpn::project(&batch.cpn);
    Exports {
        ventas: ventas::project(&batch.sales),
        cpns,
        mercaderia,
        gastos: compras::project(&batch.expenses),
    }
}
