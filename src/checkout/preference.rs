//! Payment preference construction and the hosted-checkout gateway client.
//!
//! The preference is built once per checkout attempt and the gateway is
//! called exactly once; a failure surfaces the gateway-reported status rather
//! than rebuilding or retrying.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::checkout::OrderRequest;
use crate::domain::money::CURRENCY;
use crate::error::AppError;

const BASE_URL: &str = "https://api.mercadopago.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Fixed line-item id for the synthetic shipping line.
const SHIPPING_ITEM_ID: &str = "frete";
const SHIPPING_ITEM_TITLE: &str = "Frete";

// Callback page paths, suffixed onto the configured frontend base URL.
const SUCCESS_PATH: &str = "/compra-sucesso";
const FAILURE_PATH: &str = "/compra-falha";
const PENDING_PATH: &str = "/compra-pendente";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PreferenceItem {
    pub id: String,
    pub title: String,
    pub quantity: i64,
    pub currency_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct PayerIdentification {
    #[serde(rename = "type")]
    pub kind: String,
    pub number: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PayerAddress {
    pub zip_code: String,
    pub street_name: String,
    pub street_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub federal_unit: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Payer {
    pub name: String,
    pub identification: PayerIdentification,
    pub address: PayerAddress,
}

#[derive(Clone, Debug, Serialize)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PreferenceBody {
    pub items: Vec<PreferenceItem>,
    pub payer: Payer,
    pub back_urls: BackUrls,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_url: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PreferenceResponse {
    pub id: Option<String>,
    pub init_point: Option<String>,
    pub sandbox_init_point: Option<String>,
}

impl PreferenceResponse {
    /// Sandbox redirect when present, production otherwise. Neither present
    /// is a hard failure of the whole checkout attempt.
    pub fn checkout_url(&self) -> Option<&str> {
        self.sandbox_init_point.as_deref().or(self.init_point.as_deref())
    }
}

fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Maps a normalized order into the gateway's preference shape: one item per
/// cart line plus exactly one synthetic shipping line at quantity 1.
pub fn build(order: &OrderRequest, base_url: &str, webhook_url: Option<&str>) -> PreferenceBody {
    let mut items: Vec<PreferenceItem> = order
        .lines
        .iter()
        .map(|line| PreferenceItem {
            id: line.product_id.clone(),
            title: line.name.clone(),
            quantity: i64::from(line.quantity),
            currency_id: CURRENCY.to_string(),
            unit_price: line.unit_price,
        })
        .collect();
    items.push(PreferenceItem {
        id: SHIPPING_ITEM_ID.to_string(),
        title: SHIPPING_ITEM_TITLE.to_string(),
        quantity: 1,
        currency_id: CURRENCY.to_string(),
        unit_price: order.shipping_price,
    });

    let base_url = base_url.trim_end_matches('/');
    PreferenceBody {
        items,
        payer: Payer {
            name: order.customer_name.clone(),
            identification: PayerIdentification {
                kind: "CPF".to_string(),
                number: digits_only(&order.address.tax_id),
            },
            address: PayerAddress {
                zip_code: digits_only(&order.address.postal_code),
                street_name: order.address.street.clone(),
                street_number: order.address.number.clone(),
                neighborhood: order.address.neighborhood.clone(),
                city_name: order.address.city.clone(),
                federal_unit: order.address.state.as_deref().map(str::to_uppercase),
            },
        },
        back_urls: BackUrls {
            success: format!("{base_url}{SUCCESS_PATH}"),
            failure: format!("{base_url}{FAILURE_PATH}"),
            pending: format!("{base_url}{PENDING_PATH}"),
        },
        notification_url: webhook_url.map(str::to_string),
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway answered with an error status and message.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Api { status, message } => Self::Gateway { status, message },
            // A transport failure with no status (timeout, refused
            // connection) is still the gateway's side: 502, not 500.
            GatewayError::Http(err) => Self::Gateway {
                status: err.status().map(|s| s.as_u16()).unwrap_or(502),
                message: "Falha ao criar preferência de pagamento".into(),
            },
        }
    }
}

/// Hosted-checkout collaborator, stubbed in tests.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_preference(
        &self,
        body: &PreferenceBody,
    ) -> Result<PreferenceResponse, GatewayError>;
}

pub struct MercadoPagoClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl MercadoPagoClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, BASE_URL)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { http, token: token.into(), base_url: base_url.into() }
    }
}

#[derive(Deserialize)]
struct GatewayErrorBody {
    message: Option<String>,
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    async fn create_preference(
        &self,
        body: &PreferenceBody,
    ) -> Result<PreferenceResponse, GatewayError> {
        let response = self
            .http
            .post(format!("{}/checkout/preferences", self.base_url))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<GatewayErrorBody>()
                .await
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| "Falha ao criar preferência de pagamento".to_string());
            return Err(GatewayError::Api { status: status.as_u16(), message });
        }
        Ok(response.json::<PreferenceResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::{CustomerAddress, OrderLine};

    fn order() -> OrderRequest {
        let lines = vec![OrderLine {
            product_id: "1".into(),
            name: "Bolo".into(),
            quantity: 2,
            unit_price: Decimal::new(4000, 2),
        }];
        let subtotal: Decimal = lines.iter().map(OrderLine::total).sum();
        OrderRequest {
            subtotal,
            total: subtotal + Decimal::new(4880, 2),
            lines,
            shipping_service: "04014".into(),
            shipping_price: Decimal::new(4880, 2),
            address: CustomerAddress {
                tax_id: "123.456.789-09".into(),
                postal_code: "13049-117".into(),
                street: "Rua das Flores".into(),
                number: "100".into(),
                neighborhood: None,
                city: Some("Campinas".into()),
                state: Some("sp".into()),
            },
            customer_id: 7,
            customer_name: "Maria".into(),
        }
    }

    #[test]
    fn cart_lines_map_to_items_plus_one_shipping_line() {
        let body = build(&order(), "https://loja.example", None);
        assert_eq!(body.items.len(), 2);
        assert_eq!(body.items[0].title, "Bolo");
        assert_eq!(body.items[0].quantity, 2);
        assert_eq!(body.items[0].unit_price, Decimal::new(4000, 2));
        assert_eq!(body.items[1].title, "Frete");
        assert_eq!(body.items[1].quantity, 1);
        assert_eq!(body.items[1].unit_price, Decimal::new(4880, 2));
        assert!(body.items.iter().all(|i| i.currency_id == "BRL"));
    }

    #[test]
    fn payer_uses_identity_name_and_stripped_documents() {
        let body = build(&order(), "https://loja.example", None);
        assert_eq!(body.payer.name, "Maria");
        assert_eq!(body.payer.identification.number, "12345678909");
        assert_eq!(body.payer.address.zip_code, "13049117");
        assert_eq!(body.payer.address.federal_unit.as_deref(), Some("SP"));
        // Absent optional fields are omitted, never sent as empty strings.
        assert!(body.payer.address.neighborhood.is_none());
        let json = serde_json::to_value(&body).unwrap();
        assert!(json["payer"]["address"].get("neighborhood").is_none());
    }

    #[test]
    fn back_urls_are_fixed_suffixes_of_the_base() {
        let body = build(&order(), "https://loja.example/", Some("https://hooks.example/mp"));
        assert_eq!(body.back_urls.success, "https://loja.example/compra-sucesso");
        assert_eq!(body.back_urls.failure, "https://loja.example/compra-falha");
        assert_eq!(body.back_urls.pending, "https://loja.example/compra-pendente");
        assert_eq!(body.notification_url.as_deref(), Some("https://hooks.example/mp"));
    }

    #[test]
    fn sandbox_redirect_wins_over_production() {
        let resp = PreferenceResponse {
            id: Some("pref-1".into()),
            init_point: Some("https://mp/prod".into()),
            sandbox_init_point: Some("https://mp/sandbox".into()),
        };
        assert_eq!(resp.checkout_url(), Some("https://mp/sandbox"));
        let none = PreferenceResponse::default();
        assert_eq!(none.checkout_url(), None);
    }

    #[test]
    fn api_error_keeps_the_gateway_status() {
        let err: AppError =
            GatewayError::Api { status: 400, message: "invalid payer".into() }.into();
        assert!(matches!(err, AppError::Gateway { status: 400, .. }));
    }

    #[tokio::test]
    async fn transport_error_without_status_maps_to_502() {
        // Connection refused carries no HTTP status.
        let refused = reqwest::Client::new()
            .post("http://127.0.0.1:1/checkout/preferences")
            .send()
            .await
            .expect_err("port 1 must refuse");
        let err: AppError = GatewayError::Http(refused).into();
        assert!(matches!(err, AppError::Gateway { status: 502, .. }));
    }
}
