//! Checkout endpoint: the order-assembly pipeline end to end.
//!
//! One logical task per attempt with at most two sequential external calls —
//! the shipping price is already resolved and chosen by the client, so here
//! it is validate, persist the pending order, then exactly one gateway call.
//! There is no partial or resumable state: the attempt completes with a
//! redirect URL or fails atomically.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthIdentity;
use crate::checkout::{assemble, preference, CheckoutItem, ChosenQuote, CustomerAddressInput, OrderRequest};
use crate::domain::events::{self, OrderEvent};
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutPayload {
    #[serde(rename = "cartItems")]
    pub cart_items: Option<serde_json::Value>,
    pub frete: Option<serde_json::Value>,
    #[serde(rename = "dadosCliente")]
    pub customer: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    #[serde(rename = "checkoutUrl")]
    pub checkout_url: String,
}

pub async fn create_checkout(
    State(s): State<AppState>,
    identity: AuthIdentity,
    Json(payload): Json<CheckoutPayload>,
) -> Result<Json<CheckoutResponse>> {
    let Some(gateway) = s.gateway.clone() else {
        return Err(AppError::Internal("Configuração de pagamento indisponível.".into()));
    };

    // Boundary adaptation: coerce the duck-typed payload into normalized
    // inputs before validation; shape problems get the same client errors as
    // semantic ones.
    let items: Vec<CheckoutItem> = match payload.cart_items {
        Some(serde_json::Value::Array(raw)) => raw
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| AppError::BadRequest("Carrinho inválido ou vazio.".into()))?,
        _ => return Err(AppError::BadRequest("Carrinho inválido ou vazio.".into())),
    };
    let quote: Option<ChosenQuote> = payload
        .frete
        .map(serde_json::from_value)
        .transpose()
        .map_err(|_| AppError::BadRequest("Opção de frete inválida.".into()))?;
    let customer: Option<CustomerAddressInput> = payload
        .customer
        .map(serde_json::from_value)
        .transpose()
        .map_err(|_| {
            AppError::BadRequest(
                "Dados do cliente incompletos (CPF, CEP, Logradouro, Número são obrigatórios.)"
                    .into(),
            )
        })?;

    let order = assemble(&items, quote.as_ref(), customer.as_ref(), &identity)?;

    // The pending order is written before any money moves; a gateway failure
    // leaves an inert pending_payment row.
    let (order_id, order_number) = persist_pending_order(&s, &order).await?;

    let body = preference::build(
        &order,
        &s.config.frontend_url,
        s.config.gateway_webhook_url.as_deref(),
    );
    let response = gateway.create_preference(&body).await?;

    let checkout_url = response
        .checkout_url()
        .ok_or_else(|| {
            tracing::error!(%order_id, "gateway returned no redirect URL");
            AppError::Internal("Não foi possível obter a URL de pagamento.".into())
        })?
        .to_string();

    if let Some(preference_id) = &response.id {
        if let Err(e) = sqlx::query("UPDATE orders SET preference_id = $2 WHERE id = $1")
            .bind(order_id)
            .bind(preference_id)
            .execute(&s.db)
            .await
        {
            tracing::warn!(error = %e, %order_id, "failed to attach preference id");
        }
    }

    events::publish(
        s.nats.as_ref(),
        &OrderEvent::CheckoutCreated {
            order_id,
            order_number,
            customer_id: order.customer_id,
            total: order.total,
            preference_id: response.id.clone(),
        },
    )
    .await;

    Ok(Json(CheckoutResponse { checkout_url }))
}

async fn persist_pending_order(s: &AppState, order: &OrderRequest) -> Result<(Uuid, String)> {
    let order_id = Uuid::new_v4();
    let order_number = format!("ORD-{:08}", rand::random::<u32>());

    let mut tx = s.db.begin().await?;
    sqlx::query(
        "INSERT INTO orders (id, order_number, customer_id, customer_name, status, subtotal, \
         shipping_total, total, shipping_service, tax_id, postal_code, street, street_number, \
         neighborhood, city, state) \
         VALUES ($1, $2, $3, $4, 'pending_payment', $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
    )
    .bind(order_id)
    .bind(&order_number)
    .bind(order.customer_id)
    .bind(&order.customer_name)
    .bind(order.subtotal)
    .bind(order.shipping_price)
    .bind(order.total)
    .bind(&order.shipping_service)
    .bind(&order.address.tax_id)
    .bind(&order.address.postal_code)
    .bind(&order.address.street)
    .bind(&order.address.number)
    .bind(&order.address.neighborhood)
    .bind(&order.address.city)
    .bind(&order.address.state)
    .execute(&mut *tx)
    .await?;

    for line in &order.lines {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, name, quantity, unit_price, total) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(order_id)
        .bind(&line.product_id)
        .bind(&line.name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.total())
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok((order_id, order_number))
}
