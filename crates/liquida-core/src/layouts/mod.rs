pub mod builtin;
pub mod catalog;
pub mod schema;

use crate::error::LiquidaError;
use crate::parsing::text::fold;
use regex::Regex;
use schema::{Aggregate, Coercion, LayoutDef, Scope, TableRuleDef};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Load a layout from a JSON file.
pub fn load_layout(path: &Path) -> Result<LayoutDef, LiquidaError> {
    let content = std::fs::read_to_string(path).map_err(|e| LiquidaError::LayoutLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_layout(&content, path)
}

/// Parse a layout from a JSON string.
pub fn parse_layout(json: &str, source: &Path) -> Result<LayoutDef, LiquidaError> {
    let layout: LayoutDef = serde_json::from_str(json).map_err(|e| LiquidaError::LayoutLoad {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })?;
    validate_layout(&layout)?;
    Ok(layout)
}

/// Parse a layout from a JSON string (no file path context).
pub fn parse_layout_str(json: &str) -> Result<LayoutDef, LiquidaError> {
    let layout: LayoutDef = serde_json::from_str(json)?;
    validate_layout(&layout)?;
    Ok(layout)
}

/// Load every `*.json` layout in a directory, in file name order.
pub fn load_layout_dir(dir: &Path) -> Result<Vec<LayoutDef>, LiquidaError> {
    let entries = std::fs::read_dir(dir).map_err(|e| LiquidaError::LayoutLoad {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .map(|ext| ext.eq_ignore_ascii_case("json"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    paths.iter().map(|p| load_layout(p)).collect()
}

/// Validate that a layout is well-formed: every regex compiles, every
/// reference resolves and every table has exactly one row source.
pub fn validate_layout(layout: &LayoutDef) -> Result<(), LiquidaError> {
    CompiledLayout::compile(layout.clone()).map(|_| ())
}

#[derive(Debug)]
pub struct CompiledSection {
    pub name: String,
    pub start: Regex,
    pub end: Option<Regex>,
    pub within: Option<String>,
    pub heading: Option<Regex>,
}

#[derive(Debug)]
pub struct CompiledField {
    pub name: String,
    pub pattern: Regex,
    pub scope: Scope,
    pub aggregate: Aggregate,
    pub coerce: Coercion,
    pub continue_lines: bool,
    pub default: Option<String>,
}

#[derive(Debug)]
pub struct CompiledTable {
    pub def: TableRuleDef,
    pub row_pattern: Option<Regex>,
    pub skip: Vec<Regex>,
}

#[derive(Debug)]
struct FoldedSignature {
    all: Vec<String>,
    any: Vec<String>,
    none: Vec<String>,
}

/// A validated layout with its patterns compiled.
#[derive(Debug)]
pub struct CompiledLayout {
    def: LayoutDef,
    signature: FoldedSignature,
    pub sections: Vec<CompiledSection>,
    pub fields: Vec<CompiledField>,
    pub tables: Vec<CompiledTable>,
}

impl CompiledLayout {
    pub fn compile(def: LayoutDef) -> Result<Self, LiquidaError> {
        let variant = def.variant.clone();
        let invalid = |msg: String| LiquidaError::LayoutInvalid(format!("{variant}: {msg}"));

        if def.variant.trim().is_empty() {
            return Err(LiquidaError::LayoutInvalid(
                "variant name must not be empty".into(),
            ));
        }

        let sig = &def.signature;
        if sig.all.is_empty() && sig.any.is_empty() {
            return Err(invalid(
                "signature needs at least one 'all' or 'any' marker".into(),
            ));
        }
        if let (Some(min), Some(max)) = (sig.min_pages, sig.max_pages) {
            if min > max {
                return Err(invalid(format!("min_pages {min} exceeds max_pages {max}")));
            }
        }
        let fold_all = |markers: &[String]| markers.iter().map(|m| fold(m)).collect::<Vec<_>>();
        let signature = FoldedSignature {
            all: fold_all(&sig.all),
            any: fold_all(&sig.any),
            none: fold_all(&sig.none),
        };

        let mut section_names = HashSet::new();
        let mut sections = Vec::new();
        for s in &def.sections {
            if let Some(parent) = &s.within {
                if !section_names.contains(parent.as_str()) {
                    return Err(invalid(format!(
                        "section '{}' is within '{parent}', which is not declared before it",
                        s.name
                    )));
                }
            }
            if !section_names.insert(s.name.as_str()) {
                return Err(invalid(format!("section '{}' is declared twice", s.name)));
            }
            sections.push(CompiledSection {
                name: s.name.clone(),
                start: compile_regex(&s.start, &variant)?,
                end: s.end.as_deref().map(|e| compile_regex(e, &variant)).transpose()?,
                within: s.within.clone(),
                heading: s
                    .column
                    .as_ref()
                    .map(|c| compile_regex(&c.heading, &variant))
                    .transpose()?,
            });
        }

        let check_scope = |scope: &Scope, owner: &str| -> Result<(), LiquidaError> {
            match scope {
                Scope::Section(name) if !section_names.contains(name.as_str()) => Err(invalid(
                    format!("{owner} refers to unknown section '{name}'"),
                )),
                Scope::Page(0) => Err(invalid(format!("{owner}: pages are numbered from 1"))),
                _ => Ok(()),
            }
        };

        let mut field_names = HashSet::new();
        let mut fields = Vec::new();
        for f in &def.fields {
            if !field_names.insert(f.name.as_str()) {
                return Err(invalid(format!("field '{}' is declared twice", f.name)));
            }
            check_scope(&f.scope, &format!("field '{}'", f.name))?;
            check_coercion(&f.coerce).map_err(&invalid)?;
            if matches!(f.aggregate, Aggregate::Max | Aggregate::Sum) && !f.coerce.is_numeric() {
                return Err(invalid(format!(
                    "field '{}' aggregates with {:?} but is coerced as {}",
                    f.name, f.aggregate, f.coerce
                )));
            }
            let pattern = compile_regex(&f.pattern, &variant)?;
            if pattern.captures_len() < 2 {
                return Err(invalid(format!(
                    "field '{}' pattern has no capture group",
                    f.name
                )));
            }
            fields.push(CompiledField {
                name: f.name.clone(),
                pattern,
                scope: f.scope.clone(),
                aggregate: f.aggregate,
                coerce: f.coerce.clone(),
                continue_lines: f.continue_lines,
                default: f.default.clone(),
            });
        }

        let mut table_names = HashSet::new();
        let mut tables = Vec::new();
        for t in &def.tables {
            if !table_names.insert(t.name.as_str()) {
                return Err(invalid(format!("table '{}' is declared twice", t.name)));
            }
            check_scope(&t.scope, &format!("table '{}'", t.name))?;
            if t.columns.is_empty() {
                return Err(invalid(format!("table '{}' has no columns", t.name)));
            }
            for c in &t.columns {
                check_coercion(&c.coerce).map_err(&invalid)?;
            }

            let row_pattern = match (&t.row_pattern, t.region_header.is_empty()) {
                (Some(p), true) => {
                    let re = compile_regex(p, &variant)?;
                    let groups: HashSet<&str> = re.capture_names().flatten().collect();
                    if let Some(c) = t.columns.iter().find(|c| !groups.contains(c.name.as_str())) {
                        return Err(invalid(format!(
                            "table '{}' column '{}' is not a named group of row_pattern",
                            t.name, c.name
                        )));
                    }
                    Some(re)
                }
                (None, false) => {
                    if matches!(t.scope, Scope::Section(_)) {
                        return Err(invalid(format!(
                            "table '{}' reads loader regions, which cannot be scoped to a section",
                            t.name
                        )));
                    }
                    if let Some(c) = t.columns.iter().find(|c| c.header.is_none()) {
                        return Err(invalid(format!(
                            "table '{}' column '{}' needs a header keyword",
                            t.name, c.name
                        )));
                    }
                    None
                }
                _ => {
                    return Err(invalid(format!(
                        "table '{}' needs exactly one of row_pattern or region_header",
                        t.name
                    )))
                }
            };

            let skip = t
                .skip
                .iter()
                .map(|s| compile_regex(s, &variant))
                .collect::<Result<Vec<_>, _>>()?;

            tables.push(CompiledTable {
                def: t.clone(),
                row_pattern,
                skip,
            });
        }

        Ok(CompiledLayout {
            def,
            signature,
            sections,
            fields,
            tables,
        })
    }

    pub fn def(&self) -> &LayoutDef {
        &self.def
    }

    pub fn variant(&self) -> &str {
        &self.def.variant
    }

    pub fn priority(&self) -> u32 {
        self.def.signature.priority
    }

    /// Does this layout's signature accept a document with the given folded
    /// first-page text and page count?
    pub fn signature_matches(&self, folded_first_page: &str, page_count: usize) -> bool {
        let sig = &self.def.signature;
        if sig.min_pages.is_some_and(|min| page_count < min)
            || sig.max_pages.is_some_and(|max| page_count > max)
        {
            return false;
        }
        let folded = &self.signature;
        folded.all.iter().all(|m| folded_first_page.contains(m.as_str()))
            && (folded.any.is_empty()
                || folded.any.iter().any(|m| folded_first_page.contains(m.as_str())))
            && !folded.none.iter().any(|m| folded_first_page.contains(m.as_str()))
    }
}

fn compile_regex(pattern: &str, variant: &str) -> Result<Regex, LiquidaError> {
    Regex::new(pattern).map_err(|e| {
        LiquidaError::LayoutInvalid(format!("{variant}: invalid pattern '{pattern}': {e}"))
    })
}

fn check_coercion(coerce: &Coercion) -> Result<(), String> {
    match coerce {
        Coercion::Lookup(table) if !catalog::LOOKUP_TABLES.contains(&table.as_str()) => Err(
            format!(
                "unknown lookup table '{table}' (available: {})",
                catalog::LOOKUP_TABLES.join(", ")
            ),
        ),
        _ => Ok(()),
    }
}

/// All known layouts, ordered by signature priority.
#[derive(Debug)]
pub struct LayoutRegistry {
    layouts: Vec<CompiledLayout>,
}

impl LayoutRegistry {
    /// Build a registry. Variant names and priorities must be unique.
    pub fn new(defs: Vec<LayoutDef>) -> Result<Self, LiquidaError> {
        let mut variants = HashSet::new();
        let mut priorities: HashMap<u32, String> = HashMap::new();
        let mut layouts = Vec::with_capacity(defs.len());

        for def in defs {
            if !variants.insert(def.variant.clone()) {
                return Err(LiquidaError::LayoutInvalid(format!(
                    "variant '{}' is defined twice",
                    def.variant
                )));
            }
            if let Some(other) = priorities.insert(def.signature.priority, def.variant.clone()) {
                return Err(LiquidaError::LayoutInvalid(format!(
                    "variants '{other}' and '{}' share priority {}",
                    def.variant, def.signature.priority
                )));
            }
            layouts.push(CompiledLayout::compile(def)?);
        }

        layouts.sort_by_key(|l| l.priority());
        Ok(LayoutRegistry { layouts })
    }

    /// Built-in layouts only.
    pub fn builtin() -> Result<Self, LiquidaError> {
        Self::new(builtin::layouts()?)
    }

    /// Built-in layouts merged with every layout found in `dirs`. A custom
    /// layout replaces the built-in one with the same variant name.
    pub fn load(dirs: &[PathBuf]) -> Result<Self, LiquidaError> {
        let mut defs = builtin::layouts()?;
        for dir in dirs {
            for custom in load_layout_dir(dir)? {
                tracing::debug!(variant = %custom.variant, dir = %dir.display(), "loaded custom layout");
                merge_layout(&mut defs, custom);
            }
        }
        Self::new(defs)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledLayout> {
        self.layouts.iter()
    }

    pub fn get(&self, variant: &str) -> Option<&CompiledLayout> {
        self.layouts.iter().find(|l| l.variant() == variant)
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

fn merge_layout(defs: &mut Vec<LayoutDef>, custom: LayoutDef) {
    match defs.iter_mut().find(|d| d.variant == custom.variant) {
        Some(existing) => *existing = custom,
        None => defs.push(custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(variant: &str, priority: u32) -> String {
        format!(
            r#"{{
                "variant": "{variant}",
                "kind": "cpn",
                "signature": {{ "priority": {priority}, "all": ["CERTIFICADO"] }},
                "fields": [ {{ "name": "coe", "pattern": "C\\.O\\.E\\.?\\s*:\\s*(\\d+)", "coerce": "identifier" }} ]
            }}"#
        )
    }

    #[test]
    fn test_parse_valid_layout() {
        let layout = parse_layout_str(&minimal("cpn_test", 5)).unwrap();
        assert_eq!(layout.variant, "cpn_test");
        assert_eq!(layout.fields.len(), 1);
        assert_eq!(layout.fields[0].coerce, Coercion::Identifier);
    }

    #[test]
    fn test_unknown_coercion_rejected() {
        let json = r#"{
            "variant": "x", "kind": "cpn",
            "signature": { "priority": 1, "all": ["X"] },
            "fields": [ { "name": "a", "pattern": "(a)", "coerce": "roman" } ]
        }"#;
        assert!(parse_layout_str(json).is_err());
    }

    #[test]
    fn test_unknown_lookup_table_rejected() {
        let json = r#"{
            "variant": "x", "kind": "cpn",
            "signature": { "priority": 1, "all": ["X"] },
            "fields": [ { "name": "a", "pattern": "(a)", "coerce": "lookup:planets" } ]
        }"#;
        assert!(matches!(
            parse_layout_str(json),
            Err(LiquidaError::LayoutInvalid(_))
        ));
    }

    #[test]
    fn test_bad_regex_rejected() {
        let json = r#"{
            "variant": "x", "kind": "cpn",
            "signature": { "priority": 1, "all": ["X"] },
            "fields": [ { "name": "a", "pattern": "(unclosed" } ]
        }"#;
        assert!(parse_layout_str(json).is_err());
    }

    #[test]
    fn test_pattern_without_group_rejected() {
        let json = r#"{
            "variant": "x", "kind": "cpn",
            "signature": { "priority": 1, "all": ["X"] },
            "fields": [ { "name": "a", "pattern": "abc" } ]
        }"#;
        assert!(parse_layout_str(json).is_err());
    }

    #[test]
    fn test_sum_on_text_rejected() {
        let json = r#"{
            "variant": "x", "kind": "cpn",
            "signature": { "priority": 1, "all": ["X"] },
            "fields": [ { "name": "a", "pattern": "(a)", "aggregate": "sum" } ]
        }"#;
        assert!(parse_layout_str(json).is_err());
    }

    #[test]
    fn test_unknown_section_rejected() {
        let json = r#"{
            "variant": "x", "kind": "cpn",
            "signature": { "priority": 1, "all": ["X"] },
            "fields": [ { "name": "a", "pattern": "(a)", "scope": { "section": "nowhere" } } ]
        }"#;
        assert!(parse_layout_str(json).is_err());
    }

    #[test]
    fn test_table_needs_exactly_one_source() {
        let json = r#"{
            "variant": "x", "kind": "cpn",
            "signature": { "priority": 1, "all": ["X"] },
            "tables": [ { "name": "t", "columns": [ { "name": "a" } ] } ]
        }"#;
        assert!(parse_layout_str(json).is_err());
    }

    #[test]
    fn test_table_column_must_be_named_group() {
        let json = r#"{
            "variant": "x", "kind": "cpn",
            "signature": { "priority": 1, "all": ["X"] },
            "tables": [ {
                "name": "t",
                "row_pattern": "(?P<a>\\d+)",
                "columns": [ { "name": "a" }, { "name": "b" } ]
            } ]
        }"#;
        assert!(parse_layout_str(json).is_err());
    }

    #[test]
    fn test_duplicate_priority_rejected() {
        let a = parse_layout_str(&minimal("a", 5)).unwrap();
        let b = parse_layout_str(&minimal("b", 5)).unwrap();
        let err = LayoutRegistry::new(vec![a, b]).unwrap_err();
        assert!(err.to_string().contains("priority 5"));
    }

    #[test]
    fn test_duplicate_variant_rejected() {
        let a = parse_layout_str(&minimal("a", 5)).unwrap();
        let b = parse_layout_str(&minimal("a", 6)).unwrap();
        assert!(LayoutRegistry::new(vec![a, b]).is_err());
    }

    #[test]
    fn test_registry_sorted_by_priority() {
        let a = parse_layout_str(&minimal("late", 50)).unwrap();
        let b = parse_layout_str(&minimal("early", 5)).unwrap();
        let registry = LayoutRegistry::new(vec![a, b]).unwrap();
        let order: Vec<&str> = registry.iter().map(|l| l.variant()).collect();
        assert_eq!(order, vec!["early", "late"]);
    }

    #[test]
    fn test_custom_layout_replaces_builtin() {
        let mut defs = builtin::layouts().unwrap();
        let count = defs.len();
        let mut custom = defs[0].clone();
        custom.description = Some("custom".into());
        merge_layout(&mut defs, custom);
        assert_eq!(defs.len(), count);
        assert_eq!(defs[0].description.as_deref(), Some("custom"));
    }

    #[test]
    fn test_load_layout_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), minimal("b_layout", 501)).unwrap();
        std::fs::write(dir.path().join("a.json"), minimal("a_layout", 500)).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let defs = load_layout_dir(dir.path()).unwrap();
        let names: Vec<&str> = defs.iter().map(|d| d.variant.as_str()).collect();
        assert_eq!(names, vec!["a_layout", "b_layout"]);

        let registry = LayoutRegistry::load(&[dir.path().to_path_buf()]).unwrap();
        assert!(registry.get("a_layout").is_some());
        assert!(registry.get("afip_primaria").is_some());
    }

    #[test]
    fn test_signature_matching() {
        let registry = LayoutRegistry::new(vec![parse_layout_str(&minimal("c", 1)).unwrap()]).unwrap();
        let layout = registry.get("c").unwrap();
        assert!(layout.signature_matches("CERTIFICADO DE DEPOSITO", 1));
        assert!(!layout.signature_matches("LIQUIDACION", 1));
    }
}
