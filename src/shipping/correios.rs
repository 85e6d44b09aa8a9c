//! Carrier price/deadline lookup client.
//!
//! Wire names follow the carrier's legacy webservice contract (`sCepOrigem`,
//! `nVlPeso`, ...). The response rows are duck-typed upstream (`Valor` comes
//! back as a string or a number depending on the snapshot), so they land in
//! [`RawQuote`] and are normalized by the resolver before anything else sees
//! them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::domain::money::{IntField, PriceField};

/// SEDEX retail service code.
pub const SERVICE_SEDEX: &str = "04014";
/// PAC retail service code.
pub const SERVICE_PAC: &str = "04510";

const BASE_URL: &str = "https://ws.correios.com.br/calculador/precoprazo";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, Serialize)]
pub struct CarrierArgs {
    #[serde(rename = "sCepOrigem")]
    pub origin_cep: String,
    #[serde(rename = "sCepDestino")]
    pub destination_cep: String,
    #[serde(rename = "nVlPeso")]
    pub weight_kg: String,
    #[serde(rename = "nCdFormato")]
    pub format: u8,
    #[serde(rename = "nVlComprimento")]
    pub length_cm: String,
    #[serde(rename = "nVlAltura")]
    pub height_cm: String,
    #[serde(rename = "nVlLargura")]
    pub width_cm: String,
    #[serde(rename = "nCdServico")]
    pub services: Vec<String>,
    #[serde(rename = "nVlValorDeclarado")]
    pub declared_value: String,
    #[serde(rename = "bMaoPropria")]
    pub own_hands: String,
    #[serde(rename = "bAvisoRecebimento")]
    pub return_receipt: String,
}

/// One quote exactly as the carrier sent it.
#[derive(Clone, Debug, Deserialize)]
pub struct RawQuote {
    #[serde(rename = "Codigo")]
    pub service_code: String,
    #[serde(rename = "Valor")]
    pub price: PriceField,
    #[serde(rename = "PrazoEntrega")]
    pub eta_days: IntField,
    #[serde(rename = "MsgErro", default)]
    pub error_msg: String,
}

#[derive(Debug, Error)]
pub enum CarrierError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Seam for the upstream carrier, stubbed in tests.
#[async_trait]
pub trait CarrierClient: Send + Sync {
    async fn price_and_deadline(&self, args: &CarrierArgs) -> Result<Vec<RawQuote>, CarrierError>;
}

pub struct CorreiosClient {
    http: reqwest::Client,
    base_url: String,
}

impl CorreiosClient {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { http, base_url: base_url.into() }
    }
}

impl Default for CorreiosClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CarrierClient for CorreiosClient {
    async fn price_and_deadline(&self, args: &CarrierArgs) -> Result<Vec<RawQuote>, CarrierError> {
        let quotes = self
            .http
            .post(&self.base_url)
            .json(args)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<RawQuote>>()
            .await?;
        Ok(quotes)
    }
}
