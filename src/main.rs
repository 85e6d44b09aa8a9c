//! Doceria storefront API server.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use doceria_api::checkout::preference::{MercadoPagoClient, PaymentGateway};
use doceria_api::domain::cart::PgCartStore;
use doceria_api::media::HttpImageHost;
use doceria_api::shipping::{correios::CorreiosClient, ShippingResolver};
use doceria_api::{handlers, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, events disabled");
                None
            }
        },
        None => None,
    };

    if config.gateway_token.is_none() {
        tracing::error!("MERCADOPAGO_TOKEN is not set; checkout is disabled");
    }

    let state = AppState {
        cart: Arc::new(PgCartStore::new(db.clone())),
        shipping: Arc::new(ShippingResolver::new(
            Arc::new(CorreiosClient::new()),
            config.shipping_origin_cep.clone(),
        )),
        gateway: config
            .gateway_token
            .clone()
            .map(|token| Arc::new(MercadoPagoClient::new(token)) as Arc<dyn PaymentGateway>),
        images: Arc::new(HttpImageHost::new(
            config.image_host_url.clone(),
            config.image_host_preset.clone(),
        )),
        nats,
        db,
        config: config.clone(),
    };

    let app = handlers::router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("doceria-api listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
