use crate::error::LiquidaError;
use crate::layouts::schema::{CatalogDef, GrainDef, UnitDef};
use crate::model::{Currency, Grain};
use crate::parsing::text::fold;
use rust_decimal::Decimal;
use std::collections::HashSet;

/// Lookup tables a layout can reference with `lookup:<table>`.
pub const LOOKUP_TABLES: &[&str] = &["grains", "units", "currencies"];

/// The conversion table: grains with their sales codes, weight units and
/// currency symbols.
#[derive(Debug, Clone)]
pub struct Catalog {
    def: CatalogDef,
}

impl Catalog {
    pub fn new(def: CatalogDef) -> Result<Self, LiquidaError> {
        validate_catalog(&def)?;
        Ok(Catalog { def })
    }

    pub fn parse_str(json: &str) -> Result<Self, LiquidaError> {
        let def: CatalogDef = serde_json::from_str(json)?;
        Self::new(def)
    }

    pub fn def(&self) -> &CatalogDef {
        &self.def
    }

    pub fn default_vat_rate(&self) -> Decimal {
        self.def.default_vat_rate
    }

    pub fn grain(&self, raw: &str) -> Option<Grain> {
        let key = fold(raw);
        self.def
            .grains
            .iter()
            .find(|g| matches_name(&key, &g.name, &g.aliases))
            .map(|g: &GrainDef| Grain {
                name: g.name.clone(),
                code: g.code,
            })
    }

    pub fn unit(&self, raw: &str) -> Option<&UnitDef> {
        let key = fold(raw.trim_end_matches('.'));
        self.def
            .units
            .iter()
            .find(|u| matches_name(&key, &u.unit, &u.aliases))
    }

    pub fn currency(&self, raw: &str) -> Option<Currency> {
        let key = fold(raw);
        self.def
            .currencies
            .iter()
            .find(|c| c.symbols.iter().any(|s| fold(s) == key))
            .map(|c| c.currency)
    }

    /// Resolve `raw` through one of the [`LOOKUP_TABLES`] to its canonical key.
    pub fn lookup(&self, table: &str, raw: &str) -> Option<String> {
        match table {
            "grains" => self.grain(raw).map(|g| g.name),
            "units" => self.unit(raw).map(|u| u.unit.clone()),
            "currencies" => self.currency(raw).map(|c| c.to_string()),
            _ => None,
        }
    }
}

fn matches_name(key: &str, name: &str, aliases: &[String]) -> bool {
    fold(name) == key || aliases.iter().any(|a| fold(a) == key)
}

fn validate_catalog(def: &CatalogDef) -> Result<(), LiquidaError> {
    if def.grains.is_empty() {
        return Err(LiquidaError::CatalogInvalid("grains must not be empty".into()));
    }
    if def.units.is_empty() {
        return Err(LiquidaError::CatalogInvalid("units must not be empty".into()));
    }

    let mut seen_codes = HashSet::new();
    let mut seen_names = HashSet::new();
    for grain in &def.grains {
        if !seen_codes.insert(grain.code) {
            return Err(LiquidaError::CatalogInvalid(format!(
                "grain code {} is used twice",
                grain.code
            )));
        }
        for name in std::iter::once(&grain.name).chain(&grain.aliases) {
            if !seen_names.insert(fold(name)) {
                return Err(LiquidaError::CatalogInvalid(format!(
                    "grain name or alias '{name}' is used twice"
                )));
            }
        }
    }

    let mut seen_units = HashSet::new();
    for unit in &def.units {
        if unit.kilograms <= Decimal::ZERO {
            return Err(LiquidaError::CatalogInvalid(format!(
                "unit '{}' must weigh more than 0 kg",
                unit.unit
            )));
        }
        for name in std::iter::once(&unit.unit).chain(&unit.aliases) {
            if !seen_units.insert(fold(name)) {
                return Err(LiquidaError::CatalogInvalid(format!(
                    "unit name or alias '{name}' is used twice"
                )));
            }
        }
    }

    if def.default_vat_rate < Decimal::ZERO {
        return Err(LiquidaError::CatalogInvalid(
            "default_vat_rate must not be negative".into(),
        ));
    }

    Ok(())
}
