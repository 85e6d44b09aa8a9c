//! HTTP surface.

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod customers;
pub mod posts;
pub mod products;
pub mod shipping;

use axum::{
    routing::{get, patch, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "API da Doceria está funcionando! Acesse /api/produtos." }))
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "healthy", "service": "doceria-api"})) }),
        )
        .route("/api/produtos", get(products::list_products).post(products::create_product))
        .route(
            "/api/produtos/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/api/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/api/posts/:id",
            get(posts::get_post).put(posts::update_post).delete(posts::delete_post),
        )
        .route("/api/auth/register", post(admin::register_admin))
        .route("/api/auth/login", post(admin::login_admin))
        .route("/api/clientes/register", post(customers::register_customer))
        .route("/api/clientes/login", post(customers::login_customer))
        .route("/api/clientes", get(customers::list_customers))
        .route(
            "/api/cart/:device",
            get(cart::get_cart).post(cart::add_to_cart).delete(cart::clear_cart),
        )
        .route(
            "/api/cart/:device/:product_id",
            patch(cart::update_cart_item).delete(cart::remove_cart_item),
        )
        .route("/api/frete", post(shipping::quote_shipping))
        .route("/api/checkout", post(checkout::create_checkout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// First human-readable message out of a validator error set.
pub(crate) fn validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(ToString::to_string))
        .unwrap_or_else(|| "Dados inválidos.".to_string())
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}
