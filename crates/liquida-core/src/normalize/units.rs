use crate::layouts::catalog::Catalog;
use crate::model::Currency;
use rust_decimal::{Decimal, RoundingStrategy};

/// Weight in kilograms of `amount` expressed in `unit`.
pub fn to_kilograms(amount: Decimal, unit: &str, catalog: &Catalog) -> Option<Decimal> {
    let def = catalog.unit(unit)?;
    Some(amount * def.kilograms)
}

/// Price per kilogram of a price quoted per `unit`.
pub fn price_per_kilogram(price: Decimal, unit: &str, catalog: &Catalog) -> Option<Decimal> {
    let def = catalog.unit(unit)?;
    Some(price / def.kilograms)
}

/// Currency from a `lookup:currencies` key. Pesos unless stated otherwise.
pub fn currency(code: Option<&str>) -> Currency {
    match code {
        Some("USD") => Currency::Usd,
        _ => Currency::Ars,
    }
}

/// VAT of `net` at `rate` percent, rounded to cents.
pub fn vat_of(net: Decimal, rate: Decimal) -> Decimal {
    (net * rate / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
