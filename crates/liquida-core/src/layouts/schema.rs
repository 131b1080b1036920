use crate::model::DocumentKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One issuer/format-specific layout: how to recognise it and how to read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutDef {
    pub variant: String,
    pub kind: DocumentKind,
    #[serde(default)]
    pub description: Option<String>,
    pub signature: SignatureDef,
    #[serde(default)]
    pub sections: Vec<SectionDef>,
    #[serde(default)]
    pub fields: Vec<FieldRuleDef>,
    #[serde(default)]
    pub tables: Vec<TableRuleDef>,
}

impl LayoutDef {
    /// A layout may carry only a signature; such a layout classifies
    /// documents but cannot extract them.
    pub fn has_rules(&self) -> bool {
        !self.fields.is_empty() || !self.tables.is_empty()
    }
}

/// Markers are plain substrings compared against the accent- and
/// case-folded text of the first page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureDef {
    /// Ascending; the first matching signature wins.
    pub priority: u32,
    #[serde(default)]
    pub all: Vec<String>,
    #[serde(default)]
    pub any: Vec<String>,
    #[serde(default)]
    pub none: Vec<String>,
    #[serde(default)]
    pub min_pages: Option<usize>,
    #[serde(default)]
    pub max_pages: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDef {
    pub name: String,
    /// Regex for the first line of the section (inclusive).
    pub start: String,
    /// Regex for the line that ends the section (exclusive). Runs to the end
    /// of the enclosing text when absent or not found.
    #[serde(default)]
    pub end: Option<String>,
    /// Earlier section to search in instead of the whole document.
    #[serde(default)]
    pub within: Option<String>,
    #[serde(default)]
    pub column: Option<ColumnDef>,
}

/// Restrict a section to one column of a two-column box. The heading line
/// is the first line matching `heading` that has at least two column
/// segments; the side holding the heading is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    pub heading: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[default]
    Document,
    Page(usize),
    Section(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Document => write!(f, "document"),
            Scope::Page(n) => write!(f, "page {n}"),
            Scope::Section(s) => write!(f, "section '{s}'"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    #[default]
    First,
    Last,
    /// Largest absolute value among the valid matches.
    Max,
    Sum,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Coercion {
    #[default]
    Text,
    Identifier,
    Cuit,
    Number,
    Quantity,
    Date,
    Lookup(String),
}

impl Coercion {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Coercion::Number | Coercion::Quantity)
    }
}

impl TryFrom<String> for Coercion {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "text" => Ok(Coercion::Text),
            "identifier" => Ok(Coercion::Identifier),
            "cuit" => Ok(Coercion::Cuit),
            "number" => Ok(Coercion::Number),
            "quantity" => Ok(Coercion::Quantity),
            "date" => Ok(Coercion::Date),
            other => match other.strip_prefix("lookup:") {
                Some(table) if !table.is_empty() => Ok(Coercion::Lookup(table.to_string())),
                _ => Err(format!(
                    "unknown coercion '{other}' (expected text, identifier, cuit, number, quantity, date or lookup:<table>)"
                )),
            },
        }
    }
}

impl From<Coercion> for String {
    fn from(c: Coercion) -> String {
        c.to_string()
    }
}

impl fmt::Display for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coercion::Text => write!(f, "text"),
            Coercion::Identifier => write!(f, "identifier"),
            Coercion::Cuit => write!(f, "cuit"),
            Coercion::Number => write!(f, "number"),
            Coercion::Quantity => write!(f, "quantity"),
            Coercion::Date => write!(f, "date"),
            Coercion::Lookup(table) => write!(f, "lookup:{table}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRuleDef {
    /// Canonical field name.
    pub name: String,
    /// Regex applied line by line. The value is the named group `value` or
    /// the first capture group; a named group `unit` feeds quantities.
    pub pattern: String,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub aggregate: Aggregate,
    #[serde(default)]
    pub coerce: Coercion,
    /// Append following lines without a `label:` to the match
    /// (multi-line names and addresses).
    #[serde(default)]
    pub continue_lines: bool,
    /// Used when nothing matched. Coerced like a match.
    #[serde(default)]
    pub default: Option<String>,
}

/// A table rule reads rows either with a regex per line (`row_pattern`) or
/// from a loader-detected table region chosen by header keywords
/// (`region_header`). Exactly one of the two must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRuleDef {
    pub name: String,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub row_pattern: Option<String>,
    /// Lines matching any of these regexes are never rows.
    #[serde(default)]
    pub skip: Vec<String>,
    #[serde(default)]
    pub region_header: Vec<String>,
    pub columns: Vec<TableColumnDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableColumnDef {
    /// Named group in `row_pattern`, or the cell name in region mode.
    pub name: String,
    /// Region mode: keyword of the header cell this column sits under.
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub coerce: Coercion,
}

/// Fixed conversion tables shared by all layouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDef {
    pub grains: Vec<GrainDef>,
    pub units: Vec<UnitDef>,
    pub currencies: Vec<CurrencyDef>,
    /// VAT rate applied when a liquidation prints none.
    pub default_vat_rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrainDef {
    pub name: String,
    pub code: u32,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitDef {
    pub unit: String,
    /// Kilograms per unit.
    pub kilograms: Decimal,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyDef {
    pub currency: crate::model::Currency,
    pub symbols: Vec<String>,
}
