//! Admin accounts and login.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{self, Role};
use crate::error::{AppError, Result};
use crate::handlers::is_unique_violation;
use crate::state::AppState;

const ADMIN_TOKEN_TTL_HOURS: i64 = 1;

#[derive(Debug, Deserialize)]
pub struct AdminRegisterRequest {
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "senha")]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
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

pub async fn register_admin(
    State(s): State<AppState>,
    Json(req): Json<AdminRegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("Nome, email e senha são obrigatórios.".into()));
    }
    let hash = auth::hash_password(&req.password)?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO admins (name, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
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

    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Usuário admin registrado com sucesso!", "id": id})),
    ))
}

pub async fn login_admin(
    State(s): State<AppState>,
    Json(req): Json<AdminLoginRequest>,
) -> Result<Json<serde_json::Value>> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("Email e senha são obrigatórios.".into()));
    }

    let row = sqlx::query_as::<_, CredentialsRow>(
        "SELECT id, name, password_hash FROM admins WHERE email = $1",
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
        Role::Admin,
        ADMIN_TOKEN_TTL_HOURS,
    )?;
    Ok(Json(json!({"message": "Login de admin bem-sucedido!", "token": token})))
}
