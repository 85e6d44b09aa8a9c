//! Shipping quote resolution.
//!
//! The resolver makes exactly one carrier call per request and never lets a
//! carrier outage block a sale: an error, timeout or empty result switches to
//! the fixed contingency table. Contingency quotes are shape-identical to
//! live ones but carry `source: fallback` so telemetry and clients can tell
//! them apart.

pub mod correios;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AppError;
use correios::{CarrierArgs, CarrierClient, RawQuote, SERVICE_PAC, SERVICE_SEDEX};

// Package defaults applied when the caller omits dimensions: a small boxed
// item of 300g, 16x2x11cm, nothing declared.
const DEFAULT_WEIGHT_KG: f64 = 0.3;
const DEFAULT_LENGTH_CM: f64 = 16.0;
const DEFAULT_HEIGHT_CM: f64 = 2.0;
const DEFAULT_WIDTH_CM: f64 = 11.0;
const BOX_FORMAT: u8 = 1;

#[derive(Clone, Debug, Deserialize)]
pub struct QuoteRequest {
    #[serde(rename = "cepDestino")]
    pub destination_cep: Option<String>,
    #[serde(rename = "pesoKg")]
    pub weight_kg: Option<f64>,
    #[serde(rename = "compCm")]
    pub length_cm: Option<f64>,
    #[serde(rename = "altCm")]
    pub height_cm: Option<f64>,
    #[serde(rename = "largCm")]
    pub width_cm: Option<f64>,
    #[serde(rename = "valorDeclarado")]
    pub declared_value: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSource {
    #[default]
    Live,
    Fallback,
}

/// A priced, timed delivery option, live or contingency.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShippingQuote {
    #[serde(rename = "Codigo")]
    pub service_code: String,
    /// Carrier-formatted price string; may use a comma as decimal separator.
    #[serde(rename = "Valor")]
    pub price: String,
    #[serde(rename = "PrazoEntrega")]
    pub eta_days: String,
    #[serde(rename = "MsgErro", default)]
    pub error_msg: String,
    #[serde(default)]
    pub source: QuoteSource,
}

/// Normalizes a postal code by stripping non-digits; must leave 8 digits.
pub fn normalize_cep(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    (digits.len() == 8).then_some(digits)
}

/// The fixed contingency table: a cheap slower option and a pricier faster
/// one, used whenever the live lookup yields nothing usable.
pub fn fallback_quotes() -> Vec<ShippingQuote> {
    vec![
        ShippingQuote {
            service_code: "00001".into(),
            price: "35,00".into(),
            eta_days: "7".into(),
            error_msg: String::new(),
            source: QuoteSource::Fallback,
        },
        ShippingQuote {
            service_code: "00002".into(),
            price: "50,00".into(),
            eta_days: "3".into(),
            error_msg: String::new(),
            source: QuoteSource::Fallback,
        },
    ]
}

pub struct ShippingResolver {
    carrier: Arc<dyn CarrierClient>,
    origin_cep: String,
}

impl ShippingResolver {
    pub fn new(carrier: Arc<dyn CarrierClient>, origin_cep: impl Into<String>) -> Self {
        Self { carrier, origin_cep: origin_cep.into() }
    }

    /// Resolves ranked shipping options for a destination.
    ///
    /// A missing or malformed destination CEP is a client error; everything
    /// the carrier can get wrong is absorbed by the contingency table.
    pub async fn resolve(&self, req: &QuoteRequest) -> Result<Vec<ShippingQuote>, AppError> {
        let destination = req
            .destination_cep
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("CEP de destino é obrigatório.".into()))?;
        let destination = normalize_cep(destination)
            .ok_or_else(|| AppError::BadRequest("CEP de destino inválido.".into()))?;

        let args = CarrierArgs {
            origin_cep: self.origin_cep.clone(),
            destination_cep: destination,
            weight_kg: req.weight_kg.unwrap_or(DEFAULT_WEIGHT_KG).to_string(),
            format: BOX_FORMAT,
            length_cm: req.length_cm.unwrap_or(DEFAULT_LENGTH_CM).to_string(),
            height_cm: req.height_cm.unwrap_or(DEFAULT_HEIGHT_CM).to_string(),
            width_cm: req.width_cm.unwrap_or(DEFAULT_WIDTH_CM).to_string(),
            services: vec![SERVICE_SEDEX.to_string(), SERVICE_PAC.to_string()],
            declared_value: req.declared_value.unwrap_or(0.0).to_string(),
            own_hands: "N".into(),
            return_receipt: "N".into(),
        };

        match self.carrier.price_and_deadline(&args).await {
            Ok(raw) => {
                let usable: Vec<ShippingQuote> =
                    raw.into_iter().filter_map(normalize_quote).collect();
                if usable.is_empty() {
                    tracing::warn!("carrier returned no usable quotes, using contingency rates");
                    Ok(fallback_quotes())
                } else {
                    Ok(usable)
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "carrier lookup failed, using contingency rates");
                Ok(fallback_quotes())
            }
        }
    }
}

/// Keeps a raw quote only when it has no error flag and a positive, parseable
/// price; the price string is preserved in carrier format.
fn normalize_quote(raw: RawQuote) -> Option<ShippingQuote> {
    if !raw.error_msg.trim().is_empty() {
        return None;
    }
    raw.price.to_decimal().filter(|p| p > &rust_decimal::Decimal::ZERO)?;
    Some(ShippingQuote {
        service_code: raw.service_code,
        price: raw.price.as_raw_string(),
        eta_days: raw
            .eta_days
            .to_i64()
            .map(|n| n.to_string())
            .unwrap_or_else(|| raw.eta_days.as_raw_string()),
        error_msg: String::new(),
        source: QuoteSource::Live,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use super::correios::CarrierError;

    use crate::domain::money::{IntField, PriceField};

    struct FailingCarrier;

    #[async_trait]
    impl CarrierClient for FailingCarrier {
        async fn price_and_deadline(
            &self,
            _args: &CarrierArgs,
        ) -> Result<Vec<RawQuote>, CarrierError> {
            // Same shape reqwest produces on a connect failure.
            Err(CarrierError::Http(
                reqwest::Client::new()
                    .get("http://127.0.0.1:1")
                    .send()
                    .await
                    .expect_err("must fail"),
            ))
        }
    }

    struct FixedCarrier(Vec<RawQuote>);

    #[async_trait]
    impl CarrierClient for FixedCarrier {
        async fn price_and_deadline(
            &self,
            _args: &CarrierArgs,
        ) -> Result<Vec<RawQuote>, CarrierError> {
            Ok(self.0.clone())
        }
    }

    fn request(cep: &str) -> QuoteRequest {
        QuoteRequest {
            destination_cep: Some(cep.to_string()),
            weight_kg: None,
            length_cm: None,
            height_cm: None,
            width_cm: None,
            declared_value: None,
        }
    }

    #[test]
    fn cep_normalization_strips_punctuation() {
        assert_eq!(normalize_cep("13049-117").as_deref(), Some("13049117"));
        assert_eq!(normalize_cep(" 13049117 ").as_deref(), Some("13049117"));
        assert!(normalize_cep("1234").is_none());
        assert!(normalize_cep("abcdefgh").is_none());
    }

    #[tokio::test]
    async fn missing_cep_is_a_client_error() {
        let resolver = ShippingResolver::new(Arc::new(FailingCarrier), "13049117");
        let req = QuoteRequest { destination_cep: None, ..request("") };
        assert!(matches!(resolver.resolve(&req).await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn carrier_failure_yields_the_two_contingency_quotes() {
        let resolver = ShippingResolver::new(Arc::new(FailingCarrier), "13049117");
        let quotes = resolver.resolve(&request("01310-100")).await.unwrap();
        assert_eq!(quotes.len(), 2);
        assert!(quotes.iter().all(|q| q.error_msg.is_empty()));
        assert!(quotes.iter().all(|q| q.source == QuoteSource::Fallback));
        assert_eq!(quotes[0].price, "35,00");
        assert_eq!(quotes[1].price, "50,00");
    }

    #[tokio::test]
    async fn flagged_and_zero_priced_quotes_are_discarded() {
        let carrier = FixedCarrier(vec![
            RawQuote {
                service_code: SERVICE_SEDEX.into(),
                price: PriceField::Text("48,80".into()),
                eta_days: IntField::Text("5".into()),
                error_msg: String::new(),
            },
            RawQuote {
                service_code: SERVICE_PAC.into(),
                price: PriceField::Text("0,00".into()),
                eta_days: IntField::Text("9".into()),
                error_msg: String::new(),
            },
            RawQuote {
                service_code: "04162".into(),
                price: PriceField::Text("12,00".into()),
                eta_days: IntField::Text("4".into()),
                error_msg: "CEP de destino não atendido".into(),
            },
        ]);
        let resolver = ShippingResolver::new(Arc::new(carrier), "13049117");
        let quotes = resolver.resolve(&request("01310100")).await.unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].service_code, SERVICE_SEDEX);
        assert_eq!(quotes[0].source, QuoteSource::Live);
    }

    #[tokio::test]
    async fn all_quotes_flagged_falls_back() {
        let carrier = FixedCarrier(vec![RawQuote {
            service_code: SERVICE_SEDEX.into(),
            price: PriceField::Text("".into()),
            eta_days: IntField::Text("0".into()),
            error_msg: "indisponível".into(),
        }]);
        let resolver = ShippingResolver::new(Arc::new(carrier), "13049117");
        let quotes = resolver.resolve(&request("01310100")).await.unwrap();
        assert_eq!(quotes.len(), 2);
        assert!(quotes.iter().all(|q| q.source == QuoteSource::Fallback));
    }

    #[tokio::test]
    async fn numeric_price_is_coerced_to_text() {
        let carrier = FixedCarrier(vec![RawQuote {
            service_code: SERVICE_PAC.into(),
            price: PriceField::Number(serde_json::Number::from_f64(25.5).unwrap()),
            eta_days: IntField::Number(8),
            error_msg: String::new(),
        }]);
        let resolver = ShippingResolver::new(Arc::new(carrier), "13049117");
        let quotes = resolver.resolve(&request("01310100")).await.unwrap();
        assert_eq!(quotes[0].price, "25.5");
        assert_eq!(quotes[0].eta_days, "8");
    }
}
