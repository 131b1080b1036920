use crate::error::LiquidaError;
use crate::layouts::catalog::Catalog;
use crate::layouts::parse_layout_str;
use crate::layouts::schema::LayoutDef;

const AFIP_PRIMARIA_JSON: &str = include_str!("../../../../rules/layouts/afip-primaria.json");
const AFIP_SECUNDARIA_JSON: &str = include_str!("../../../../rules/layouts/afip-secundaria.json");
const LIQUIDACION_GENERICA_JSON: &str =
    include_str!("../../../../rules/layouts/liquidacion-generica.json");
const CPN_CERTIFICADO_JSON: &str = include_str!("../../../../rules/layouts/cpn-certificado.json");
const NOTA_DEBITO_JSON: &str = include_str!("../../../../rules/layouts/nota-debito.json");
const CATALOG_JSON: &str = include_str!("../../../../rules/catalog.json");

/// Built-in layout variants, in file order.
pub const VARIANTS: &[&str] = &[
    "afip_primaria",
    "afip_secundaria",
    "liquidacion_generica",
    "cpn_certificado",
    "nota_debito",
];

fn source(variant: &str) -> Option<&'static str> {
    match variant {
        "afip_primaria" => Some(AFIP_PRIMARIA_JSON),
        "afip_secundaria" => Some(AFIP_SECUNDARIA_JSON),
        "liquidacion_generica" => Some(LIQUIDACION_GENERICA_JSON),
        "cpn_certificado" => Some(CPN_CERTIFICADO_JSON),
        "nota_debito" => Some(NOTA_DEBITO_JSON),
        _ => None,
    }
}

/// Load one built-in layout by variant name.
pub fn load(variant: &str) -> Result<LayoutDef, LiquidaError> {
    let json = source(variant).ok_or_else(|| {
        LiquidaError::LayoutInvalid(format!(
            "unknown built-in layout '{}'. Available: {}",
            variant,
            VARIANTS.join(", ")
        ))
    })?;
    parse_layout_str(json)
}

/// All built-in layouts.
pub fn layouts() -> Result<Vec<LayoutDef>, LiquidaError> {
    VARIANTS.iter().map(|v| load(v)).collect()
}

/// The built-in conversion table.
pub fn catalog() -> Result<Catalog, LiquidaError> {
    Catalog::parse_str(CATALOG_JSON)
}
