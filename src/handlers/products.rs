//! Product catalog: public reads, admin-only writes with image upload.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;

use crate::auth::AuthIdentity;
use crate::domain::money::parse_decimal;
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "preco")]
    pub price: Decimal,
    #[serde(rename = "categoria")]
    pub category: Option<String>,
    #[serde(rename = "imagem_url")]
    pub image_url: String,
    #[serde(skip)]
    pub image_public_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

const SELECT: &str = "SELECT id, name, description, price, category, image_url, \
                      image_public_id, created_at FROM products";

pub async fn list_products(State(s): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = sqlx::query_as::<_, Product>(&format!("{SELECT} ORDER BY id DESC"))
        .fetch_all(&s.db)
        .await?;
    Ok(Json(products))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<i64>) -> Result<Json<Product>> {
    sqlx::query_as::<_, Product>(&format!("{SELECT} WHERE id = $1"))
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Produto não encontrado.".into()))
}

/// Multipart fields for create/update: `nome`, `descricao`, `preco`,
/// `categoria` and the `imagem` file.
#[derive(Default)]
struct ProductForm {
    name: Option<String>,
    description: Option<String>,
    price: Option<String>,
    category: Option<String>,
    existing_image_url: Option<String>,
    image: Option<(String, Vec<u8>)>,
}

async fn read_form(mut multipart: Multipart) -> Result<ProductForm> {
    let mut form = ProductForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::BadRequest("Requisição multipart inválida.".into()))?
    {
        let bad = || AppError::BadRequest("Requisição multipart inválida.".into());
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "nome" => form.name = Some(field.text().await.map_err(|_| bad())?),
            "descricao" => form.description = Some(field.text().await.map_err(|_| bad())?),
            "preco" => form.price = Some(field.text().await.map_err(|_| bad())?),
            "categoria" => form.category = Some(field.text().await.map_err(|_| bad())?),
            "imagem_url_existente" => {
                form.existing_image_url = Some(field.text().await.map_err(|_| bad())?);
            }
            "imagem" => {
                let filename = field.file_name().unwrap_or("imagem").to_string();
                let bytes = field.bytes().await.map_err(|_| bad())?;
                form.image = Some((filename, bytes.to_vec()));
            }
            _ => {}
        }
    }
    Ok(form)
}

fn validated_price(raw: Option<&str>) -> Result<Decimal> {
    let raw = raw.ok_or_else(|| {
        AppError::BadRequest("Nome, descrição e preço são obrigatórios.".into())
    })?;
    parse_decimal(raw)
        .filter(|p| *p >= Decimal::ZERO)
        .ok_or_else(|| AppError::BadRequest("Preço inválido.".into()))
}

pub async fn create_product(
    State(s): State<AppState>,
    identity: AuthIdentity,
    multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    identity.require_admin()?;
    let form = read_form(multipart).await?;

    let (name, description) = match (&form.name, &form.description) {
        (Some(n), Some(d)) if !n.trim().is_empty() && !d.trim().is_empty() => (n, d),
        _ => return Err(AppError::BadRequest("Nome, descrição e preço são obrigatórios.".into())),
    };
    let price = validated_price(form.price.as_deref())?;
    let (filename, bytes) = form
        .image
        .ok_or_else(|| AppError::BadRequest("Imagem do produto é obrigatória.".into()))?;

    let hosted = s.images.upload(&filename, bytes).await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO products (name, description, price, category, image_url, image_public_id) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(name)
    .bind(description)
    .bind(price)
    .bind(&form.category)
    .bind(&hosted.url)
    .bind(&hosted.public_id)
    .fetch_one(&s.db)
    .await?;

    Ok((StatusCode::CREATED, Json(json!({"message": "Produto criado com sucesso!", "id": id}))))
}

pub async fn update_product(
    State(s): State<AppState>,
    identity: AuthIdentity,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>> {
    identity.require_admin()?;
    let form = read_form(multipart).await?;

    let current = sqlx::query_as::<_, Product>(&format!("{SELECT} WHERE id = $1"))
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Produto não encontrado.".into()))?;

    let (name, description) = match (&form.name, &form.description) {
        (Some(n), Some(d)) if !n.trim().is_empty() && !d.trim().is_empty() => (n, d),
        _ => return Err(AppError::BadRequest("Nome, descrição e preço são obrigatórios.".into())),
    };
    let price = validated_price(form.price.as_deref())?;

    // A new upload replaces the hosted image; otherwise the existing URL is
    // kept as sent by the client (or left untouched).
    let (image_url, image_public_id) = match form.image {
        Some((filename, bytes)) => {
            let hosted = s.images.upload(&filename, bytes).await?;
            if let Some(old) = &current.image_public_id {
                if let Err(e) = s.images.delete(old).await {
                    tracing::warn!(error = %e, public_id = %old, "failed to delete replaced image");
                }
            }
            (hosted.url, Some(hosted.public_id))
        }
        None => (
            form.existing_image_url.unwrap_or(current.image_url),
            current.image_public_id,
        ),
    };

    sqlx::query(
        "UPDATE products SET name = $2, description = $3, price = $4, category = $5, \
         image_url = $6, image_public_id = $7, updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(price)
    .bind(&form.category)
    .bind(&image_url)
    .bind(&image_public_id)
    .execute(&s.db)
    .await?;

    Ok(Json(json!({"message": "Produto atualizado com sucesso!"})))
}

pub async fn delete_product(
    State(s): State<AppState>,
    identity: AuthIdentity,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    identity.require_admin()?;

    let current = sqlx::query_as::<_, Product>(&format!("{SELECT} WHERE id = $1"))
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Produto não encontrado.".into()))?;

    sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&s.db).await?;

    if let Some(public_id) = &current.image_public_id {
        if let Err(e) = s.images.delete(public_id).await {
            tracing::warn!(error = %e, public_id = %public_id, "failed to delete hosted image");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}
