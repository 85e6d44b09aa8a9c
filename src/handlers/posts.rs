//! Blog posts: public reads, admin-only writes; image is optional.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::auth::AuthIdentity;
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "conteudo")]
    pub content: String,
    #[serde(rename = "imagem_url")]
    pub image_url: Option<String>,
    #[serde(skip)]
    pub image_public_id: Option<String>,
    #[serde(rename = "data_publicacao")]
    pub published_at: DateTime<Utc>,
}

const SELECT: &str =
    "SELECT id, title, content, image_url, image_public_id, published_at FROM posts";

pub async fn list_posts(State(s): State<AppState>) -> Result<Json<Vec<Post>>> {
    let posts = sqlx::query_as::<_, Post>(&format!("{SELECT} ORDER BY published_at DESC"))
        .fetch_all(&s.db)
        .await?;
    Ok(Json(posts))
}

pub async fn get_post(State(s): State<AppState>, Path(id): Path<i64>) -> Result<Json<Post>> {
    sqlx::query_as::<_, Post>(&format!("{SELECT} WHERE id = $1"))
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Post não encontrado.".into()))
}

#[derive(Default)]
struct PostForm {
    title: Option<String>,
    content: Option<String>,
    existing_image_url: Option<String>,
    image: Option<(String, Vec<u8>)>,
}

async fn read_form(mut multipart: Multipart) -> Result<PostForm> {
    let mut form = PostForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::BadRequest("Requisição multipart inválida.".into()))?
    {
        let bad = || AppError::BadRequest("Requisição multipart inválida.".into());
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "titulo" => form.title = Some(field.text().await.map_err(|_| bad())?),
            "conteudo" => form.content = Some(field.text().await.map_err(|_| bad())?),
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

// Returns owned values so callers can keep moving fields out of the form.
fn required_fields(form: &PostForm) -> Result<(String, String)> {
    match (&form.title, &form.content) {
        (Some(t), Some(c)) if !t.trim().is_empty() && !c.trim().is_empty() => {
            Ok((t.clone(), c.clone()))
        }
        _ => Err(AppError::BadRequest("Título e conteúdo são obrigatórios.".into())),
    }
}

pub async fn create_post(
    State(s): State<AppState>,
    identity: AuthIdentity,
    multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    identity.require_admin()?;
    let form = read_form(multipart).await?;
    let (title, content) = required_fields(&form)?;

    let hosted = match form.image {
        Some((filename, bytes)) => Some(s.images.upload(&filename, bytes).await?),
        None => None,
    };

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO posts (title, content, image_url, image_public_id) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(title)
    .bind(content)
    .bind(hosted.as_ref().map(|h| &h.url))
    .bind(hosted.as_ref().map(|h| &h.public_id))
    .fetch_one(&s.db)
    .await?;

    Ok((StatusCode::CREATED, Json(json!({"message": "Post criado com sucesso!", "id": id}))))
}

pub async fn update_post(
    State(s): State<AppState>,
    identity: AuthIdentity,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>> {
    identity.require_admin()?;
    let form = read_form(multipart).await?;

    let current = sqlx::query_as::<_, Post>(&format!("{SELECT} WHERE id = $1"))
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Post não encontrado.".into()))?;

    let (title, content) = required_fields(&form)?;

    let (image_url, image_public_id) = match form.image {
        Some((filename, bytes)) => {
            let hosted = s.images.upload(&filename, bytes).await?;
            if let Some(old) = &current.image_public_id {
                if let Err(e) = s.images.delete(old).await {
                    tracing::warn!(error = %e, public_id = %old, "failed to delete replaced image");
                }
            }
            (Some(hosted.url), Some(hosted.public_id))
        }
        None => (
            form.existing_image_url.or(current.image_url),
            current.image_public_id,
        ),
    };

    sqlx::query(
        "UPDATE posts SET title = $2, content = $3, image_url = $4, image_public_id = $5, \
         updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .bind(title)
    .bind(content)
    .bind(&image_url)
    .bind(&image_public_id)
    .execute(&s.db)
    .await?;

    Ok(Json(json!({"message": "Post atualizado com sucesso!"})))
}

pub async fn delete_post(
    State(s): State<AppState>,
    identity: AuthIdentity,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    identity.require_admin()?;

    let current = sqlx::query_as::<_, Post>(&format!("{SELECT} WHERE id = $1"))
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Post não encontrado.".into()))?;

    sqlx::query("DELETE FROM posts WHERE id = $1").bind(id).execute(&s.db).await?;

    if let Some(public_id) = &current.image_public_id {
        if let Err(e) = s.images.delete(public_id).await {
            tracing::warn!(error = %e, public_id = %public_id, "failed to delete hosted image");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_title_or_content_is_rejected() {
        let form = PostForm {
            title: Some("   ".into()),
            content: Some("texto".into()),
            ..PostForm::default()
        };
        assert!(matches!(required_fields(&form), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn required_fields_outlive_the_form() {
        let mut form = PostForm {
            title: Some("Bolo de cenoura".into()),
            content: Some("Receita da casa.".into()),
            image: Some(("foto.png".into(), vec![1, 2, 3])),
            ..PostForm::default()
        };
        let (title, content) = required_fields(&form).unwrap();
        // The returned pair must stay valid while fields are moved out.
        let image = form.image.take();
        assert!(image.is_some());
        assert_eq!(title, "Bolo de cenoura");
        assert_eq!(content, "Receita da casa.");
    }
}
