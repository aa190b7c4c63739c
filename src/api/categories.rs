//! Category admin CRUD.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::products::slugify;
use super::AppState;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub async fn list(State(s): State<AppState>) -> Result<Json<Vec<Category>>, AppError> {
    let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
        .fetch_all(&s.db)
        .await?;
    Ok(Json(categories))
}

#[derive(Debug, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

pub async fn create(
    State(s): State<AppState>,
    Json(r): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    if r.name.trim().is_empty() {
        return Err(AppError::BadRequest("category name is required".into()));
    }
    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (id, name, slug, description, image_url, created_at)
         VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&r.name)
    .bind(slugify(&r.name))
    .bind(&r.description)
    .bind(&r.image_url)
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<CategoryInput>,
) -> Result<Json<Category>, AppError> {
    let category = sqlx::query_as::<_, Category>(
        "UPDATE categories SET name = $2, slug = $3, description = $4, image_url = $5
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&r.name)
    .bind(slugify(&r.name))
    .bind(&r.description)
    .bind(&r.image_url)
    .fetch_optional(&s.db)
    .await?
    .ok_or(AppError::NotFound("category"))?;
    Ok(Json(category))
}

pub async fn delete(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("category"));
    }
    Ok(StatusCode::NO_CONTENT)
}
