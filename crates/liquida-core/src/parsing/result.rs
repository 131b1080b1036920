use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A coerced value. Still untyped from the record's point of view: the
/// normalizer decides what each canonical field means.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Identifier(String),
    Number(Decimal),
    Quantity { amount: Decimal, unit: String },
    Date(NaiveDate),
    /// Canonical key resolved through a catalog lookup table.
    Code(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) | FieldValue::Identifier(s) | FieldValue::Code(s) => {
                write!(f, "{s}")
            }
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Quantity { amount, unit } => write!(f, "{amount} {unit}"),
            FieldValue::Date(d) => write!(f, "{}", d.format("%d/%m/%Y")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Validity {
    Valid,
    Missing,
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedField {
    /// Text as matched in the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
    pub validity: Validity,
}

impl ExtractedField {
    pub fn valid(raw: impl Into<String>, value: FieldValue) -> Self {
        ExtractedField {
            raw: Some(raw.into()),
            value: Some(value),
            validity: Validity::Valid,
        }
    }

    pub fn missing() -> Self {
        ExtractedField {
            raw: None,
            value: None,
            validity: Validity::Missing,
        }
    }

    pub fn invalid(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        ExtractedField {
            raw: Some(raw.into()),
            value: None,
            validity: Validity::Invalid(reason.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validity == Validity::Valid
    }
}

/// Named fields with typed accessors. Used both for document-level fields
/// and for the cells of one table row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldSet(BTreeMap<String, ExtractedField>);

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, field: ExtractedField) {
        self.0.insert(name.into(), field);
    }

    pub fn get(&self, name: &str) -> Option<&ExtractedField> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ExtractedField)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_valid(&self, name: &str) -> bool {
        self.get(name).is_some_and(ExtractedField::is_valid)
    }

    fn value(&self, name: &str) -> Option<&FieldValue> {
        self.get(name)
            .filter(|f| f.is_valid())
            .and_then(|f| f.value.as_ref())
    }

    /// Any string-like value: text, identifier or lookup code.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.value(name)? {
            FieldValue::Text(s) | FieldValue::Identifier(s) | FieldValue::Code(s) => Some(s),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<Decimal> {
        match self.value(name)? {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Quantity { amount, .. } => Some(*amount),
            _ => None,
        }
    }

    pub fn quantity(&self, name: &str) -> Option<(Decimal, &str)> {
        match self.value(name)? {
            FieldValue::Quantity { amount, unit } => Some((*amount, unit.as_str())),
            _ => None,
        }
    }

    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        match self.value(name)? {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// Everything the field extractor found in one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub document_id: String,
    pub variant: String,
    pub fields: FieldSet,
    pub tables: BTreeMap<String, Vec<FieldSet>>,
}

impl ExtractionResult {
    pub fn new(document_id: impl Into<String>, variant: impl Into<String>) -> Self {
        ExtractionResult {
            document_id: document_id.into(),
            variant: variant.into(),
            fields: FieldSet::new(),
            tables: BTreeMap::new(),
        }
    }

    pub fn table(&self, name: &str) -> &[FieldSet] {
        self.tables.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}
