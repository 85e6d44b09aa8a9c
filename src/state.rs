//! Shared application state.
//!
//! Every external collaborator is an explicit, injected handle — no ambient
//! singletons. Handlers clone the state; the expensive pieces are behind
//! `Arc`s or are pools already.

use std::sync::Arc;

use sqlx::PgPool;

use crate::checkout::preference::PaymentGateway;
use crate::config::Config;
use crate::domain::cart::CartStore;
use crate::media::ImageHost;
use crate::shipping::ShippingResolver;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub cart: Arc<dyn CartStore>,
    pub shipping: Arc<ShippingResolver>,
    /// `None` when no gateway token is configured; checkout reports a
    /// configuration error instead of the service refusing to boot.
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    pub images: Arc<dyn ImageHost>,
    pub nats: Option<async_nats::Client>,
}
