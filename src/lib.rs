//! Doceria storefront API
//!
//! Public catalog and blog, customer/admin authentication, device-resident
//! carts, shipping quotes with a contingency fallback, and a checkout flow
//! that produces a hosted-payment redirect.
//!
//! ## Layout
//! - [`domain`]: cart aggregate, money parsing, order events
//! - [`shipping`]: carrier lookup and the quote resolver
//! - [`checkout`]: order assembly, validation and the payment preference
//! - [`handlers`]: HTTP surface (axum)
//! - [`media`]: image-hosting collaborator seam

pub mod auth;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod media;
pub mod shipping;
pub mod state;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
