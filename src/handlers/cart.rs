//! Cart persistence surface: one aggregate per device key.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::domain::cart::{Cart, CartLine};
use crate::domain::money::{IntField, PriceField};
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddLineRequest {
    #[serde(rename = "id")]
    pub product_id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "preco")]
    pub price: PriceField,
    #[serde(rename = "quantidade")]
    pub quantity: Option<IntField>,
}

#[derive(Debug, Deserialize)]
pub struct QuantityDelta {
    pub delta: i32,
}

/// Absent means one; present must be a positive, non-truncating quantity.
fn parse_quantity(raw: Option<&IntField>) -> Result<i32> {
    let Some(raw) = raw else { return Ok(1) };
    raw.to_i64()
        .and_then(|q| i32::try_from(q).ok())
        .filter(|q| *q > 0)
        .ok_or_else(|| AppError::BadRequest("Quantidade inválida.".into()))
}

pub async fn get_cart(
    State(s): State<AppState>,
    Path(device): Path<String>,
) -> Result<Json<Vec<CartLine>>> {
    let cart = Cart::from_lines(s.cart.load(&device).await?);
    Ok(Json(cart.snapshot()))
}

pub async fn add_to_cart(
    State(s): State<AppState>,
    Path(device): Path<String>,
    Json(req): Json<AddLineRequest>,
) -> Result<(StatusCode, Json<Vec<CartLine>>)> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Nome do produto é obrigatório.".into()));
    }
    let price = req
        .price
        .to_decimal()
        .ok_or_else(|| AppError::BadRequest("Preço inválido.".into()))?;
    let qty = parse_quantity(req.quantity.as_ref())?;

    let mut cart = Cart::from_lines(s.cart.load(&device).await?);
    cart.add_line(req.product_id, &req.name, price, qty);
    s.cart.save(&device, cart.lines()).await?;
    Ok((StatusCode::CREATED, Json(cart.snapshot())))
}

pub async fn update_cart_item(
    State(s): State<AppState>,
    Path((device, product_id)): Path<(String, i64)>,
    Json(req): Json<QuantityDelta>,
) -> Result<Json<Vec<CartLine>>> {
    let mut cart = Cart::from_lines(s.cart.load(&device).await?);
    cart.change_quantity(product_id, req.delta);
    s.cart.save(&device, cart.lines()).await?;
    Ok(Json(cart.snapshot()))
}

pub async fn remove_cart_item(
    State(s): State<AppState>,
    Path((device, product_id)): Path<(String, i64)>,
) -> Result<Json<Vec<CartLine>>> {
    let mut cart = Cart::from_lines(s.cart.load(&device).await?);
    cart.remove_line(product_id);
    s.cart.save(&device, cart.lines()).await?;
    Ok(Json(cart.snapshot()))
}

pub async fn clear_cart(
    State(s): State<AppState>,
    Path(device): Path<String>,
) -> Result<StatusCode> {
    s.cart.save(&device, &[]).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_quantity_defaults_to_one() {
        assert_eq!(parse_quantity(None).unwrap(), 1);
        assert_eq!(parse_quantity(Some(&IntField::Text("3".into()))).unwrap(), 3);
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let err = parse_quantity(Some(&IntField::Number(0)));
        assert!(matches!(err, Err(AppError::BadRequest(_))));
        let err = parse_quantity(Some(&IntField::Number(-2)));
        assert!(matches!(err, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn quantity_beyond_i32_is_rejected_not_truncated() {
        let err = parse_quantity(Some(&IntField::Number(4_294_967_298)));
        assert!(matches!(err, Err(AppError::BadRequest(_))));
    }
}
