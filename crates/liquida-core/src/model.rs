use crate::extraction::PageContent;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A loaded document before classification. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct SourceDocument {
    id: String,
    name: String,
    pages: Vec<PageContent>,
}

impl SourceDocument {
    pub fn new(id: String, name: String, pages: Vec<PageContent>) -> Self {
        SourceDocument { id, name, pages }
    }

    /// Content digest of the original buffer.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pages(&self) -> &[PageContent] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn first_page_text(&self) -> String {
        self.pages.first().map(PageContent::text).unwrap_or_default()
    }

    /// All lines of all pages, in order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.pages
            .iter()
            .flat_map(|p| p.lines.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    PrimaryLiquidation,
    SecondaryLiquidation,
    Cpn,
    ExpenseVoucher,
}

impl DocumentKind {
    pub fn is_liquidation(self) -> bool {
        matches!(
            self,
            DocumentKind::PrimaryLiquidation | DocumentKind::SecondaryLiquidation
        )
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::PrimaryLiquidation => write!(f, "liquidación primaria"),
            DocumentKind::SecondaryLiquidation => write!(f, "liquidación secundaria"),
            DocumentKind::Cpn => write!(f, "CPN"),
            DocumentKind::ExpenseVoucher => write!(f, "comprobante de gastos"),
        }
    }
}

/// A document whose kind and layout variant have been decided.
///
/// Only the classifier builds these, so classification happens exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedDocument {
    #[serde(flatten)]
    source: SourceDocument,
    kind: DocumentKind,
    variant: String,
}

impl ClassifiedDocument {
    pub(crate) fn new(source: SourceDocument, kind: DocumentKind, variant: String) -> Self {
        ClassifiedDocument {
            source,
            kind,
            variant,
        }
    }

    pub fn source(&self) -> &SourceDocument {
        &self.source
    }

    pub fn id(&self) -> &str {
        self.source.id()
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }
}

/// IVA condition as printed in a party box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxCondition {
    ResponsableInscripto,
    Exento,
    ConsumidorFinal,
    Other(String),
}

impl TaxCondition {
    pub fn from_str_loose(s: &str) -> Option<TaxCondition> {
        let folded = crate::parsing::text::fold(s);
        if folded.is_empty() {
            return None;
        }
        let words: Vec<&str> = folded
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let cond = if folded.contains("RESP") || words.contains(&"RI") {
            TaxCondition::ResponsableInscripto
        } else if folded.contains("EXENT") || words.contains(&"EX") {
            TaxCondition::Exento
        } else if folded.contains("CONSUMIDOR") || words.contains(&"CF") {
            TaxCondition::ConsumidorFinal
        } else {
            TaxCondition::Other(s.trim().to_string())
        };
        Some(cond)
    }

    /// Code for the `Cond Fisc` column.
    pub fn code(&self) -> &str {
        match self {
            TaxCondition::ResponsableInscripto => "RI",
            TaxCondition::Exento => "EX",
            TaxCondition::ConsumidorFinal => "CF",
            TaxCondition::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Party {
    pub razon_social: String,
    pub cuit: String,
    pub domicilio: Option<String>,
    pub localidad: Option<String>,
    pub tax_condition: Option<TaxCondition>,
}

impl Party {
    pub fn cond_fisc(&self) -> &str {
        self.tax_condition.as_ref().map(|c| c.code()).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grain {
    pub name: String,
    /// `Cód. Neto` used on the sales export.
    pub code: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Ars,
    Usd,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Ars => write!(f, "ARS"),
            Currency::Usd => write!(f, "USD"),
        }
    }
}

/// Sales voucher type: F1 for primary settlements, F2 for secondary ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleVoucher {
    F1,
    F2,
}

impl fmt::Display for SaleVoucher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaleVoucher::F1 => write!(f, "F1"),
            SaleVoucher::F2 => write!(f, "F2"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withholdings {
    pub iva: Decimal,
    pub ganancias: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub source_id: String,
    pub source_name: String,
    pub coe: String,
    pub punto_venta: String,
    pub numero: String,
    pub fecha: NaiveDate,
    pub voucher: SaleVoucher,
    pub letra: String,
    pub buyer: Party,
    pub seller: Option<Party>,
    pub grain: Grain,
    pub campaign: Option<String>,
    pub weight_kg: Decimal,
    pub price_per_kg: Decimal,
    pub currency: Currency,
    pub net: Decimal,
    pub vat_rate: Decimal,
    pub vat: Decimal,
    pub total: Decimal,
    pub withholdings: Withholdings,
}

/// One row of the delivered-merchandise ("mercadería entregada") block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveredLot {
    pub comprobante: String,
    pub grado: Option<String>,
    pub factor: Option<Decimal>,
    pub protein: Option<Decimal>,
    pub weight_kg: Option<Decimal>,
    pub procedencia: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpnRecord {
    pub source_id: String,
    pub source_name: String,
    pub coe: String,
    pub punto_venta: String,
    pub numero: String,
    pub fecha: NaiveDate,
    pub acopio: Party,
    pub grain: Grain,
    pub campaign: Option<String>,
    pub weight_kg: Decimal,
    pub price_per_kg: Option<Decimal>,
    pub localidad: Option<String>,
    pub delivered: Vec<DeliveredLot>,
}

impl CpnRecord {
    /// `COMPROBANTE` identifier shared by the summary and detail sheets.
    pub fn comprobante(&self) -> String {
        format!("{}-{}", self.punto_venta, self.numero)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductionLine {
    pub concept: String,
    pub net: Decimal,
    /// Zero for exempt concepts.
    pub vat_rate: Decimal,
    pub vat: Decimal,
    pub total: Decimal,
}

impl DeductionLine {
    pub fn is_exempt(&self) -> bool {
        self.vat_rate.is_zero()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkedLedger {
    Sales,
    Cpn,
}

/// Pointer from an expense to the settlement it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementLink {
    pub ledger: LinkedLedger,
    pub source_id: String,
    pub coe: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub source_id: String,
    pub source_name: String,
    /// COE of the settlement these charges belong to, when printed.
    pub settlement_coe: Option<String>,
    pub punto_venta: String,
    pub numero: String,
    pub fecha: NaiveDate,
    pub provider: Party,
    pub lines: Vec<DeductionLine>,
    pub vat_perception: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<SettlementLink>,
}

/// Records produced from one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedDocument {
    pub sale: Option<SaleRecord>,
    pub cpn: Option<CpnRecord>,
    pub expense: Option<ExpenseRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_condition_codes() {
        let ri = TaxCondition::from_str_loose("IVA Responsable Inscripto").unwrap();
        assert_eq!(ri.code(), "RI");
        assert_eq!(TaxCondition::from_str_loose("EX").unwrap().code(), "EX");
        assert_eq!(
            TaxCondition::from_str_loose("Consumidor Final").unwrap().code(),
            "CF"
        );
        assert_eq!(
            TaxCondition::from_str_loose("Monotributo").unwrap().code(),
            "Monotributo"
        );
        assert!(TaxCondition::from_str_loose("  ").is_none());
    }

    #[test]
    fn test_exento_is_not_read_as_responsable() {
        assert_eq!(
            TaxCondition::from_str_loose("Exento").unwrap(),
            TaxCondition::Exento
        );
    }

    #[test]
    fn test_comprobante_joins_pv_and_numero() {
        let cpn = CpnRecord {
            source_id: "x".into(),
            source_name: "x.pdf".into(),
            coe: "330229912534".into(),
            punto_venta: "3302".into(),
            numero: "29912534".into(),
            fecha: NaiveDate::from_ymd_opt(2025, 11, 20).unwrap(),
            acopio: Party::default(),
            grain: Grain {
                name: "Soja".into(),
                code: 123,
            },
            campaign: None,
            weight_kg: Decimal::ZERO,
            price_per_kg: None,
            localidad: None,
            delivered: vec![],
        };
        assert_eq!(cpn.comprobante(), "3302-29912534");
    }
}
