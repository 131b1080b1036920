pub mod cpn;
pub mod expense;
pub mod sale;
pub mod units;

use crate::error::LiquidaError;
use crate::layouts::catalog::Catalog;
use crate::model::{ClassifiedDocument, DocumentKind, NormalizedDocument, Party, TaxCondition};
use crate::parsing::result::{ExtractionResult, FieldSet};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Turn one extraction result into canonical records.
///
/// A liquidation yields a sale, a CPN and, when it bills deductions or a VAT
/// perception, an expense. A CPN or an expense voucher yields one record.
/// Handing over a result that belongs to another document is a contract
/// violation, not a per-document error.
pub fn normalize(
    doc: &ClassifiedDocument,
    result: &ExtractionResult,
    catalog: &Catalog,
) -> Result<NormalizedDocument, LiquidaError> {
    if result.variant != doc.variant() || result.document_id != doc.id() {
        return Err(LiquidaError::ContractViolation(format!(
            "extraction result for {} ({}) handed to the normalizer for {} ({})",
            result.document_id,
            result.variant,
            doc.id(),
            doc.variant()
        )));
    }

    let normalized = match doc.kind() {
        DocumentKind::PrimaryLiquidation | DocumentKind::SecondaryLiquidation => {
            let sale = sale::sale_record(doc, result, catalog)?;
            let cpn = cpn::cpn_from_liquidation(&sale, result);
            let expense = expense::expense_from_liquidation(&sale, result);
            NormalizedDocument {
                sale: Some(sale),
                cpn: Some(cpn),
                expense,
            }
        }
        DocumentKind::Cpn => NormalizedDocument {
            cpn: Some(cpn::cpn_record(doc, result, catalog)?),
            ..Default::default()
        },
        DocumentKind::ExpenseVoucher => NormalizedDocument {
            expense: Some(expense::expense_record(doc, result)?),
            ..Default::default()
        },
    };

    tracing::debug!(
        document = %doc.name(),
        sale = normalized.sale.is_some(),
        cpn = normalized.cpn.is_some(),
        expense = normalized.expense.is_some(),
        "normalized"
    );
    Ok(normalized)
}

/// Reads canonical fields and remembers every required one that is missing
/// or invalid, so a record fails with the full list at once.
pub(crate) struct Required<'a> {
    fields: &'a FieldSet,
    missing: Vec<String>,
}

impl<'a> Required<'a> {
    pub(crate) fn new(fields: &'a FieldSet) -> Self {
        Required {
            fields,
            missing: Vec::new(),
        }
    }

    fn note<T>(&mut self, name: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.missing.push(name.to_string());
        }
        value
    }

    pub(crate) fn text(&mut self, name: &str) -> Option<String> {
        let value = self.fields.text(name).map(str::to_string);
        self.note(name, value)
    }

    pub(crate) fn number(&mut self, name: &str) -> Option<Decimal> {
        let value = self.fields.number(name);
        self.note(name, value)
    }

    pub(crate) fn date(&mut self, name: &str) -> Option<NaiveDate> {
        let value = self.fields.date(name);
        self.note(name, value)
    }

    pub(crate) fn quantity(&mut self, name: &str) -> Option<(Decimal, String)> {
        let value = self.fields.quantity(name).map(|(a, u)| (a, u.to_string()));
        self.note(name, value)
    }

    /// Record a required field that was found but cannot be used.
    pub(crate) fn reject(&mut self, name: &str) {
        if !self.missing.iter().any(|m| m == name) {
            self.missing.push(name.to_string());
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub(crate) fn into_error(self) -> LiquidaError {
        LiquidaError::IncompleteRecord {
            missing: self.missing,
        }
    }
}

pub(crate) fn optional_text(fields: &FieldSet, name: &str) -> Option<String> {
    fields.text(name).map(str::to_string)
}

/// Optional amounts default to zero and are stored unsigned.
pub(crate) fn amount_or_zero(fields: &FieldSet, name: &str) -> Decimal {
    fields.number(name).map(|n| n.abs()).unwrap_or_default()
}

/// Party box fields share a prefix: `<prefix>_razon_social`, `<prefix>_cuit`,
/// `<prefix>_domicilio`, `<prefix>_localidad`, `<prefix>_iva`.
pub(crate) fn party(fields: &FieldSet, prefix: &str, razon_social: String, cuit: String) -> Party {
    Party {
        razon_social,
        cuit,
        domicilio: optional_text(fields, &format!("{prefix}_domicilio")),
        localidad: optional_text(fields, &format!("{prefix}_localidad")),
        tax_condition: fields
            .text(&format!("{prefix}_iva"))
            .and_then(TaxCondition::from_str_loose),
    }
}

/// Punto de venta and número are the first four and the next eight digits
/// of the COE.
pub(crate) fn split_coe(coe: &str) -> Option<(String, String)> {
    if !coe.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((coe.get(0..4)?.to_string(), coe.get(4..12)?.to_string()))
}
