use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::parsing::text::{fold, squash};

/// Parse an amount as printed on settlement documents.
///
/// Handles formats like:
/// - "1.234.567,89" and "129,250.00" (the last separator is the decimal one)
/// - "27,14" and "0.00" (a lone separator is the decimal one)
/// - "1.234.567" (a repeated separator is a thousands one)
/// - "$ 1.000", "U$S 25,50", "10,5 %"
/// - "-1.000,00", "(1.000,00)", "1.000,00-" (negatives)
pub fn parse_decimal(raw: &str) -> Result<Decimal, String> {
    let mut s = raw.trim().to_string();
    if s.is_empty() {
        return Err("empty number".into());
    }

    for marker in ["U$S", "US$", "u$s", "us$", "USD", "ARS", "$", "%"] {
        s = s.replace(marker, "");
    }
    let mut s = s.trim().to_string();

    let mut negative = false;
    if s.starts_with('(') && s.ends_with(')') {
        negative = true;
        s = s[1..s.len() - 1].trim().to_string();
    }

    if let Some(rest) = s.strip_prefix('-') {
        negative = !negative;
        s = rest.trim().to_string();
    } else if let Some(rest) = s.strip_suffix('-') {
        negative = !negative;
        s = rest.trim().to_string();
    }

    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() || !compact.chars().any(|c| c.is_ascii_digit()) {
        return Err(format!("'{}' has no digits", raw.trim()));
    }
    if let Some(bad) = compact
        .chars()
        .find(|c| !c.is_ascii_digit() && *c != '.' && *c != ',')
    {
        return Err(format!("unexpected '{bad}' in number '{}'", raw.trim()));
    }

    let normalized = normalize_separators(&compact);
    let value = Decimal::from_str(&normalized)
        .map_err(|e| format!("invalid number '{}': {e}", raw.trim()))?;

    Ok(if negative { -value } else { value })
}

fn normalize_separators(s: &str) -> String {
    let commas = s.matches(',').count();
    let dots = s.matches('.').count();

    match (commas, dots) {
        (0, 0) => s.to_string(),
        (_, 0) if commas > 1 => s.replace(',', ""),
        (_, 0) => s.replace(',', "."),
        (0, _) if dots > 1 => s.replace('.', ""),
        (0, _) => s.to_string(),
        _ => {
            let last_comma = s.rfind(',').unwrap_or(0);
            let last_dot = s.rfind('.').unwrap_or(0);
            if last_dot > last_comma {
                s.replace(',', "")
            } else {
                s.replace('.', "").replace(',', ".")
            }
        }
    }
}

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})\s*[/.\-]\s*(\d{1,2})\s*[/.\-]\s*(\d{4}|\d{2})$")
        .expect("valid numeric date pattern")
});

static LONG_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})\s+DE\s+([A-Z]+)\s+(?:DE|DEL)\s+(\d{4})$").expect("valid long date pattern")
});

static SHORT_MONTH_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[\s\-/]+([A-Z]{3,})\.?[\s\-/]+(\d{4})$")
        .expect("valid month-name date pattern")
});

/// Parse a date in any of the formats settlement documents use.
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let folded = fold(raw);
    if folded.is_empty() {
        return Err("empty date".into());
    }

    let (day, month, year) = if let Some(c) = NUMERIC_DATE.captures(&folded) {
        let year: i32 = c[3].parse().map_err(|_| format!("bad year in '{raw}'"))?;
        let year = if c[3].len() == 2 { 2000 + year } else { year };
        let month: u32 = c[2].parse().map_err(|_| format!("bad month in '{raw}'"))?;
        (c[1].to_string(), month, year)
    } else if let Some(c) = LONG_DATE
        .captures(&folded)
        .or_else(|| SHORT_MONTH_DATE.captures(&folded))
    {
        let month = month_number(&c[2]).ok_or_else(|| format!("unknown month in '{raw}'"))?;
        let year: i32 = c[3].parse().map_err(|_| format!("bad year in '{raw}'"))?;
        (c[1].to_string(), month, year)
    } else {
        return Err(format!("unrecognized date '{}'", raw.trim()));
    };

    let day: u32 = day.parse().map_err(|_| format!("bad day in '{raw}'"))?;
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| format!("'{}' is not a calendar date", raw.trim()))
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect();
    let month = match prefix.as_str() {
        "ENE" | "JAN" => 1,
        "FEB" => 2,
        "MAR" => 3,
        "ABR" | "APR" => 4,
        "MAY" => 5,
        "JUN" => 6,
        "JUL" => 7,
        "AGO" | "AUG" => 8,
        "SEP" | "SET" => 9,
        "OCT" => 10,
        "NOV" => 11,
        "DIC" | "DEC" => 12,
        _ => return None,
    };
    Some(month)
}

static CUIT_PARTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([0-9]{2})[^0-9]?([0-9]{8})[^0-9]?([0-9])\b").expect("valid CUIT pattern")
});

/// Extract an 11-digit CUIT, with or without hyphens, and verify its check digit.
pub fn parse_cuit(raw: &str) -> Result<String, String> {
    let digits = match CUIT_PARTS.captures(raw) {
        Some(c) => format!("{}{}{}", &c[1], &c[2], &c[3]),
        None => {
            let all: String = raw.chars().filter(char::is_ascii_digit).collect();
            if all.len() != 11 {
                return Err(format!("'{}' is not an 11-digit CUIT", raw.trim()));
            }
            all
        }
    };

    if cuit_check_digit(&digits[..10]) != digits[10..].parse::<u32>().ok() {
        return Err(format!("CUIT {digits} has a wrong check digit"));
    }
    Ok(digits)
}

fn cuit_check_digit(first_ten: &str) -> Option<u32> {
    const WEIGHTS: [u32; 10] = [5, 4, 3, 2, 7, 6, 5, 4, 3, 2];
    let sum: u32 = first_ten
        .chars()
        .zip(WEIGHTS)
        .map(|(c, w)| c.to_digit(10).unwrap_or(0) * w)
        .sum();
    match 11 - sum % 11 {
        11 => Some(0),
        10 => None,
        d => Some(d),
    }
}

/// Document numbers, codes, grades: whitespace removed, restricted charset.
pub fn parse_identifier(raw: &str) -> Result<String, String> {
    let id: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if id.is_empty() {
        return Err("empty identifier".into());
    }
    if let Some(bad) = id
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '.' | '/'))
    {
        return Err(format!("unexpected '{bad}' in identifier '{id}'"));
    }
    Ok(id)
}

pub fn parse_text(raw: &str) -> Result<String, String> {
    let text = squash(raw);
    if text.is_empty() {
        Err("empty text".into())
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_argentine_thousands_and_comma_decimal() {
        assert_eq!(parse_decimal("1.234.567,89").unwrap(), dec!(1234567.89));
    }

    #[test]
    fn test_us_thousands_and_dot_decimal() {
        assert_eq!(parse_decimal("129,250.00").unwrap(), dec!(129250.00));
    }

    #[test]
    fn test_lone_separator_is_decimal() {
        assert_eq!(parse_decimal("27,14").unwrap(), dec!(27.14));
        assert_eq!(parse_decimal("0.00").unwrap(), dec!(0.00));
        assert_eq!(parse_decimal("10,5").unwrap(), dec!(10.5));
    }

    #[test]
    fn test_repeated_separator_is_thousands() {
        assert_eq!(parse_decimal("1.234.567").unwrap(), dec!(1234567));
        assert_eq!(parse_decimal("1,234,567").unwrap(), dec!(1234567));
    }

    #[test]
    fn test_currency_and_percent_markers() {
        assert_eq!(parse_decimal("$ 1.000,50").unwrap(), dec!(1000.50));
        assert_eq!(parse_decimal("U$S 25,50").unwrap(), dec!(25.50));
        assert_eq!(parse_decimal("10,5 %").unwrap(), dec!(10.5));
    }

    #[test]
    fn test_negative_forms() {
        assert_eq!(parse_decimal("-1.000,00").unwrap(), dec!(-1000.00));
        assert_eq!(parse_decimal("(1.000,00)").unwrap(), dec!(-1000.00));
        assert_eq!(parse_decimal("1.000,00-").unwrap(), dec!(-1000.00));
        assert_eq!(parse_decimal("$ -250,00").unwrap(), dec!(-250.00));
        assert_eq!(parse_decimal("$ (1.000,00)").unwrap(), dec!(-1000.00));
        assert_eq!(parse_decimal("($ 1.000,00)").unwrap(), dec!(-1000.00));
        assert_eq!(parse_decimal("U$S ( 25,50 )").unwrap(), dec!(-25.50));
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(parse_decimal("").is_err());
        assert!(parse_decimal("$").is_err());
        assert!(parse_decimal("abc").is_err());
        assert!(parse_decimal("12a4").is_err());
    }

    #[test]
    fn test_numeric_dates() {
        let d = NaiveDate::from_ymd_opt(2025, 11, 20).unwrap();
        assert_eq!(parse_date("20/11/2025").unwrap(), d);
        assert_eq!(parse_date("20-11-2025").unwrap(), d);
        assert_eq!(parse_date("20.11.2025").unwrap(), d);
        assert_eq!(parse_date("20/11/25").unwrap(), d);
    }

    #[test]
    fn test_named_month_dates() {
        let d = NaiveDate::from_ymd_opt(2025, 11, 20).unwrap();
        assert_eq!(parse_date("20 de noviembre de 2025").unwrap(), d);
        assert_eq!(parse_date("20-nov-2025").unwrap(), d);
        assert_eq!(parse_date("20 Nov 2025").unwrap(), d);
        assert_eq!(
            parse_date("3 de Setiembre de 2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 3).unwrap()
        );
    }

    #[test]
    fn test_invalid_dates() {
        assert!(parse_date("31/02/2025").is_err());
        assert!(parse_date("20 de brumario de 2025").is_err());
        assert!(parse_date("mañana").is_err());
    }

    #[test]
    fn test_cuit_with_and_without_hyphens() {
        assert_eq!(parse_cuit("20-12345678-6").unwrap(), "20123456786");
        assert_eq!(parse_cuit("30712345671").unwrap(), "30712345671");
        assert_eq!(parse_cuit("C.U.I.T.: 30-71234567-1").unwrap(), "30712345671");
    }

    #[test]
    fn test_cuit_check_digit() {
        assert!(parse_cuit("20-12345678-5").is_err());
        assert!(parse_cuit("123").is_err());
    }

    #[test]
    fn test_cuit_rejects_non_ascii_digits() {
        let err = parse_cuit("C.U.I.T.: ３０-７１２３４５６７-１").unwrap_err();
        assert!(err.contains("11-digit"), "{err}");
        assert!(parse_cuit("２０１２３４５６７８６").is_err());
    }

    #[test]
    fn test_identifier() {
        assert_eq!(parse_identifier(" 3302 29912534 ").unwrap(), "330229912534");
        assert_eq!(parse_identifier("G2").unwrap(), "G2");
        assert!(parse_identifier("  ").is_err());
        assert!(parse_identifier("a$b").is_err());
    }

    #[test]
    fn test_text() {
        assert_eq!(parse_text("  ACOPIO   DEL SUR  ").unwrap(), "ACOPIO DEL SUR");
        assert!(parse_text("   ").is_err());
    }
}
