//! Environment-driven configuration.

use anyhow::Context;

/// Runtime configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Payment gateway access token. When absent the checkout route answers
    /// with a configuration error instead of refusing to boot.
    pub gateway_token: Option<String>,
    /// Webhook URL for asynchronous payment-status notifications.
    pub gateway_webhook_url: Option<String>,
    /// Base URL the payment callback pages hang off of.
    pub frontend_url: String,
    /// Fixed origin postal code for carrier lookups.
    pub shipping_origin_cep: String,
    pub nats_url: Option<String>,
    /// Image-hosting upload endpoint and preset; uploads fail when unset.
    pub image_host_url: Option<String>,
    pub image_host_preset: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL is required")?,
            port: std::env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(3000),
            jwt_secret: std::env::var("JWT_SECRET").context("JWT_SECRET is required")?,
            gateway_token: std::env::var("MERCADOPAGO_TOKEN").ok(),
            gateway_webhook_url: std::env::var("MERCADOPAGO_WEBHOOK_URL").ok(),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            shipping_origin_cep: std::env::var("SHIPPING_ORIGIN_CEP")
                .unwrap_or_else(|_| "13049117".to_string()),
            nats_url: std::env::var("NATS_URL").ok(),
            image_host_url: std::env::var("IMAGE_HOST_URL").ok(),
            image_host_preset: std::env::var("IMAGE_HOST_PRESET").ok(),
        })
    }
}
