use crate::model::{CpnRecord, ExpenseRecord, SaleRecord};
use serde::Serialize;

/// A record that knows its de-duplication key within its source document.
pub trait LineItem {
    fn source_id(&self) -> &str;
    fn line_key(&self) -> String;
}

impl LineItem for SaleRecord {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn line_key(&self) -> String {
        format!("venta:{}", self.coe)
    }
}

impl LineItem for CpnRecord {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn line_key(&self) -> String {
        format!("cpn:{}", self.coe)
    }
}

impl LineItem for ExpenseRecord {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn line_key(&self) -> String {
        format!("gastos:{}-{}", self.punto_venta, self.numero)
    }
}

/// Records of one type in arrival order. At most one record per
/// `(source_id, line_key)`; a repeat replaces the earlier record in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Ledger<T> {
    records: Vec<T>,
}

impl<T> Default for Ledger<T> {
    fn default() -> Self {
        Ledger {
            records: Vec::new(),
        }
    }
}

impl<T: LineItem> Ledger<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the record replaced an existing one.
    pub fn upsert(&mut self, record: T) -> bool {
        let key = record.line_key();
        match self
            .records
            .iter_mut()
            .find(|r| r.source_id() == record.source_id() && r.line_key() == key)
        {
            Some(existing) => {
                *existing = record;
                false
            }
            None => {
                self.records.push(record);
                true
            }
        }
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.records.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
