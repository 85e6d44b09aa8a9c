//! Customer accounts: public register/login, admin-only listing.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::auth::{self, AuthIdentity, Role};
use crate::error::{AppError, Result};
use crate::handlers::{is_unique_violation, validation_message};
use crate::state::AppState;

const CUSTOMER_TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, message = "Nome, email e senha são obrigatórios."))]
    pub name: String,
    #[validate(email(message = "Formato de e-mail inválido."))]
    pub email: String,
    #[serde(rename = "senha")]
    #[validate(length(min = 6, message = "A senha deve ter pelo menos 6 caracteres."))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    #[serde(rename = "senha")]
    pub password: String,
}

#[derive(sqlx::FromRow)]
struct CredentialsRow {
    id: i64,
    name: String,
    password_hash: String,
}

pub async fn register_customer(
    State(s): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    req.validate().map_err(|e| AppError::BadRequest(validation_message(&e)))?;
    let hash = auth::hash_password(&req.password)?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO customers (name, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&req.name)
    .bind(&req.email)
    .bind(&hash)
    .fetch_one(&s.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Este e-mail já está cadastrado.".into())
        } else {
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(json!({"message": "Cliente registrado com sucesso!", "id": id}))))
}

pub async fn login_customer(
    State(s): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("Email e senha são obrigatórios.".into()));
    }

    let row = sqlx::query_as::<_, CredentialsRow>(
        "SELECT id, name, password_hash FROM customers WHERE email = $1",
    )
    .bind(&req.email)
    .fetch_optional(&s.db)
    .await?
    .ok_or_else(|| AppError::Unauthorized("Credenciais inválidas.".into()))?;

    if !auth::verify_password(&req.password, &row.password_hash) {
        return Err(AppError::Unauthorized("Credenciais inválidas.".into()));
    }

    let token = auth::issue_token(
        &s.config.jwt_secret,
        row.id,
        &row.name,
        Role::Customer,
        CUSTOMER_TOKEN_TTL_HOURS,
    )?;
    Ok(Json(json!({"message": "Login de cliente bem-sucedido!", "token": token})))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CustomerSummary {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "data_cadastro")]
    pub created_at: DateTime<Utc>,
}

pub async fn list_customers(
    State(s): State<AppState>,
    identity: AuthIdentity,
) -> Result<Json<Vec<CustomerSummary>>> {
    identity.require_admin()?;
    let customers = sqlx::query_as::<_, CustomerSummary>(
        "SELECT id, name, email, created_at FROM customers ORDER BY created_at DESC",
    )
    .fetch_all(&s.db)
    .await?;
    Ok(Json(customers))
}
