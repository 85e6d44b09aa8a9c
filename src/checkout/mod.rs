//! Order assembly and validation.
//!
//! Everything here runs before any external call: a checkout attempt is
//! either assembled into one consistent, priced [`OrderRequest`] or rejected
//! with a client error. Validation short-circuits in a fixed order — cart,
//! chosen quote, address, identity — and a single malformed cart line aborts
//! the whole assembly; there are no partial orders.

pub mod preference;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::auth::AuthIdentity;
use crate::domain::money::{IntField, PriceField};
use crate::error::AppError;

/// A cart line as the client sent it; normalized during assembly.
#[derive(Clone, Debug, Deserialize)]
pub struct CheckoutItem {
    pub id: Option<IntField>,
    #[serde(rename = "nome")]
    pub name: Option<String>,
    #[serde(rename = "preco")]
    pub unit_price: Option<PriceField>,
    #[serde(rename = "quantidade")]
    pub quantity: Option<IntField>,
}

/// The shipping option the client picked, still carrier-formatted.
#[derive(Clone, Debug, Deserialize)]
pub struct ChosenQuote {
    #[serde(rename = "Codigo")]
    pub service_code: Option<String>,
    #[serde(rename = "Valor")]
    pub price: Option<PriceField>,
    #[serde(rename = "PrazoEntrega")]
    pub eta_days: Option<IntField>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CustomerAddressInput {
    pub cpf: Option<String>,
    pub cep: Option<String>,
    #[serde(rename = "logradouro")]
    pub street: Option<String>,
    #[serde(rename = "numero")]
    pub number: Option<IntField>,
    #[serde(rename = "bairro")]
    pub neighborhood: Option<String>,
    #[serde(rename = "cidade")]
    pub city: Option<String>,
    #[serde(rename = "estado")]
    pub state: Option<String>,
}

/// Validated address; optional parts are `None` rather than empty strings so
/// they are never forwarded as placeholders.
#[derive(Clone, Debug, PartialEq)]
pub struct CustomerAddress {
    pub tax_id: String,
    pub postal_code: String,
    pub street: String,
    pub number: String,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderLine {
    pub product_id: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderLine {
    pub fn total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// One consistent, priced order; request-scoped and never mutated after
/// construction.
#[derive(Clone, Debug)]
pub struct OrderRequest {
    pub lines: Vec<OrderLine>,
    pub shipping_service: String,
    pub shipping_price: Decimal,
    pub address: CustomerAddress,
    pub customer_id: i64,
    pub customer_name: String,
    pub subtotal: Decimal,
    pub total: Decimal,
}

fn required(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Combines a cart snapshot, the chosen quote, the customer address and the
/// authenticated identity into one normalized order, or rejects it.
pub fn assemble(
    items: &[CheckoutItem],
    quote: Option<&ChosenQuote>,
    address: Option<&CustomerAddressInput>,
    identity: &AuthIdentity,
) -> Result<OrderRequest, AppError> {
    if items.is_empty() {
        return Err(AppError::BadRequest("Carrinho inválido ou vazio.".into()));
    }

    let quote = quote.ok_or_else(|| AppError::BadRequest("Opção de frete inválida.".into()))?;
    let shipping_price = quote
        .price
        .as_ref()
        .and_then(PriceField::to_decimal)
        .ok_or_else(|| AppError::BadRequest("Opção de frete inválida.".into()))?;
    let shipping_service = quote
        .service_code
        .clone()
        .unwrap_or_else(|| "frete".to_string());

    let input = address.ok_or_else(|| {
        AppError::BadRequest(
            "Dados do cliente incompletos (CPF, CEP, Logradouro, Número são obrigatórios.)".into(),
        )
    })?;
    let address = validate_address(input)?;

    // An id without a display name signals a malformed token payload, which
    // is distinct from "not logged in" (rejected earlier at the boundary).
    if identity.name.trim().is_empty() {
        return Err(AppError::Unauthorized("Usuário não autenticado corretamente.".into()));
    }

    let lines = items.iter().map(validate_line).collect::<Result<Vec<_>, _>>()?;

    let subtotal: Decimal = lines.iter().map(OrderLine::total).sum();
    Ok(OrderRequest {
        total: subtotal + shipping_price,
        subtotal,
        lines,
        shipping_service,
        shipping_price,
        address,
        customer_id: identity.id,
        customer_name: identity.name.clone(),
    })
}

fn validate_address(input: &CustomerAddressInput) -> Result<CustomerAddress, AppError> {
    let missing = || {
        AppError::BadRequest(
            "Dados do cliente incompletos (CPF, CEP, Logradouro, Número são obrigatórios.)".into(),
        )
    };
    Ok(CustomerAddress {
        tax_id: required(input.cpf.as_deref()).ok_or_else(missing)?,
        postal_code: required(input.cep.as_deref()).ok_or_else(missing)?,
        street: required(input.street.as_deref()).ok_or_else(missing)?,
        number: input
            .number
            .as_ref()
            .map(IntField::as_raw_string)
            .and_then(|n| required(Some(n.as_str())))
            .ok_or_else(missing)?,
        neighborhood: required(input.neighborhood.as_deref()),
        city: required(input.city.as_deref()),
        state: required(input.state.as_deref()),
    })
}

fn validate_line(item: &CheckoutItem) -> Result<OrderLine, AppError> {
    let invalid = |item: &CheckoutItem| {
        AppError::BadRequest(format!(
            "Item inválido no carrinho: {}",
            item.name.as_deref().unwrap_or("(sem nome)")
        ))
    };
    let name = required(item.name.as_deref()).ok_or_else(|| invalid(item))?;
    // Range-checked: quantities outside i32 would otherwise truncate when
    // the order line is persisted.
    let quantity = item
        .quantity
        .as_ref()
        .and_then(IntField::to_i64)
        .and_then(|q| i32::try_from(q).ok())
        .filter(|q| *q > 0)
        .ok_or_else(|| invalid(item))?;
    let unit_price = item
        .unit_price
        .as_ref()
        .and_then(PriceField::to_decimal)
        .ok_or_else(|| invalid(item))?;
    let product_id = item
        .id
        .as_ref()
        .map(IntField::as_raw_string)
        .unwrap_or_else(|| name.clone());
    Ok(OrderLine { product_id, name, quantity, unit_price })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn identity() -> AuthIdentity {
        AuthIdentity { id: 7, name: "Maria".into(), role: Role::Customer }
    }

    fn item(name: &str, price: &str, qty: i64) -> CheckoutItem {
        CheckoutItem {
            id: Some(IntField::Number(1)),
            name: Some(name.to_string()),
            unit_price: Some(PriceField::Text(price.to_string())),
            quantity: Some(IntField::Number(qty)),
        }
    }

    fn quote(valor: &str) -> ChosenQuote {
        ChosenQuote {
            service_code: Some("04014".into()),
            price: Some(PriceField::Text(valor.to_string())),
            eta_days: Some(IntField::Text("5".into())),
        }
    }

    fn address() -> CustomerAddressInput {
        CustomerAddressInput {
            cpf: Some("123.456.789-09".into()),
            cep: Some("13049-117".into()),
            street: Some("Rua das Flores".into()),
            number: Some(IntField::Number(100)),
            neighborhood: None,
            city: Some("Campinas".into()),
            state: Some("sp".into()),
        }
    }

    #[test]
    fn empty_cart_is_rejected_first() {
        let err = assemble(&[], Some(&quote("10,00")), Some(&address()), &identity());
        assert!(matches!(err, Err(AppError::BadRequest(m)) if m.contains("Carrinho")));
    }

    #[test]
    fn unparsable_shipping_price_is_rejected() {
        let items = [item("Bolo", "40.00", 1)];
        let err = assemble(&items, Some(&quote("caro")), Some(&address()), &identity());
        assert!(matches!(err, Err(AppError::BadRequest(m)) if m.contains("frete")));
    }

    #[test]
    fn missing_tax_id_is_a_distinct_client_error() {
        let items = [item("Bolo", "40.00", 1)];
        let mut addr = address();
        addr.cpf = None;
        let err = assemble(&items, Some(&quote("10,00")), Some(&addr), &identity());
        assert!(matches!(err, Err(AppError::BadRequest(m)) if m.contains("CPF")));
    }

    #[test]
    fn blank_display_name_means_malformed_token() {
        let items = [item("Bolo", "40.00", 1)];
        let who = AuthIdentity { id: 7, name: "  ".into(), role: Role::Customer };
        let err = assemble(&items, Some(&quote("10,00")), Some(&address()), &who);
        assert!(matches!(err, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn zero_quantity_line_aborts_the_whole_assembly() {
        let items = [item("Bolo", "40.00", 1), item("Torta", "25.00", 0)];
        let err = assemble(&items, Some(&quote("10,00")), Some(&address()), &identity());
        assert!(matches!(err, Err(AppError::BadRequest(m)) if m.contains("Torta")));
    }

    #[test]
    fn quantity_beyond_i32_is_rejected_not_truncated() {
        // 2^32 + 2 would silently collapse to 2 under a narrowing cast.
        let items = [item("Bolo", "40.00", 4_294_967_298)];
        let err = assemble(&items, Some(&quote("10,00")), Some(&address()), &identity());
        assert!(matches!(err, Err(AppError::BadRequest(m)) if m.contains("Bolo")));
    }

    #[test]
    fn total_mixes_locales_safely() {
        let items = [item("Bolo", "40.00", 2)];
        let order =
            assemble(&items, Some(&quote("48,80")), Some(&address()), &identity()).unwrap();
        assert_eq!(order.subtotal, Decimal::new(8000, 2));
        assert_eq!(order.shipping_price, Decimal::new(4880, 2));
        assert_eq!(order.total, Decimal::new(12880, 2));
    }

    #[test]
    fn optional_address_fields_are_none_not_empty() {
        let items = [item("Bolo", "40.00", 1)];
        let mut addr = address();
        addr.neighborhood = Some("   ".into());
        let order = assemble(&items, Some(&quote("10,00")), Some(&addr), &identity()).unwrap();
        assert_eq!(order.address.neighborhood, None);
        assert_eq!(order.address.city.as_deref(), Some("Campinas"));
    }
}
