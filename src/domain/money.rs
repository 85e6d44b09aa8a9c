//! Money parsing and boundary adapters.
//!
//! Upstream payloads are not consistent about numeric shape: the carrier may
//! send `Valor` as `"25,50"`, `"25.50"` or a bare number, and clients send
//! prices and quantities as either strings or numbers. Both shapes are coerced
//! into one normalized type here, at the boundary, so business logic never
//! branches on field shape.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency tag for every priced line in the system.
pub const CURRENCY: &str = "BRL";

/// Parses a decimal that may use a comma or a dot as separator.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    raw.trim().replace(',', ".").parse::<Decimal>().ok()
}

/// A price as received on the wire: string or number.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceField {
    Text(String),
    Number(serde_json::Number),
}

impl PriceField {
    /// Carrier-formatted string form (numbers coerced to text).
    pub fn as_raw_string(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
        }
    }

    /// Normalized non-negative decimal; `None` when unparsable or negative.
    pub fn to_decimal(&self) -> Option<Decimal> {
        let value = parse_decimal(&self.as_raw_string())?;
        (value >= Decimal::ZERO).then_some(value)
    }
}

/// An integer as received on the wire: number or numeric string.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntField {
    Number(i64),
    Text(String),
}

impl IntField {
    pub fn as_raw_string(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_decimal_parses() {
        assert_eq!(parse_decimal("25,50").unwrap(), Decimal::new(2550, 2));
        assert_eq!(parse_decimal("48.80").unwrap(), Decimal::new(4880, 2));
    }

    #[test]
    fn garbage_does_not_parse() {
        assert!(parse_decimal("grátis").is_none());
        assert!(parse_decimal("").is_none());
    }

    #[test]
    fn price_field_coerces_numbers_to_text() {
        let n: PriceField = serde_json::from_str("40.5").unwrap();
        assert_eq!(n.to_decimal().unwrap(), Decimal::new(405, 1));
        let s: PriceField = serde_json::from_str("\"35,00\"").unwrap();
        assert_eq!(s.to_decimal().unwrap(), Decimal::new(3500, 2));
    }

    #[test]
    fn negative_price_is_invalid() {
        let p = PriceField::Text("-1,00".into());
        assert!(p.to_decimal().is_none());
    }

    #[test]
    fn int_field_accepts_both_shapes() {
        let n: IntField = serde_json::from_str("3").unwrap();
        let s: IntField = serde_json::from_str("\"3\"").unwrap();
        assert_eq!(n.to_i64(), Some(3));
        assert_eq!(s.to_i64(), Some(3));
        assert_eq!(IntField::Text("x".into()).to_i64(), None);
    }
}
