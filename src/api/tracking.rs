//! Marketing/analytics tracking code management.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TrackingCode {
    pub id: Uuid,
    pub name: String,
    pub code_type: String,
    pub code_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

pub async fn list(State(s): State<AppState>) -> Result<Json<Vec<TrackingCode>>, AppError> {
    let codes = sqlx::query_as::<_, TrackingCode>(
        "SELECT * FROM tracking_codes ORDER BY created_at DESC",
    )
    .fetch_all(&s.db)
    .await?;
    Ok(Json(codes))
}

/// Active codes only; this is what the storefront embeds.
pub async fn list_active(State(s): State<AppState>) -> Result<Json<Vec<TrackingCode>>, AppError> {
    let codes = sqlx::query_as::<_, TrackingCode>(
        "SELECT * FROM tracking_codes WHERE is_active ORDER BY created_at DESC",
    )
    .fetch_all(&s.db)
    .await?;
    Ok(Json(codes))
}

#[derive(Debug, Deserialize)]
pub struct TrackingInput {
    pub name: String,
    pub code_type: String,
    pub code_id: String,
    pub is_active: Option<bool>,
}

pub async fn create(
    State(s): State<AppState>,
    Json(r): Json<TrackingInput>,
) -> Result<(StatusCode, Json<TrackingCode>), AppError> {
    if r.name.trim().is_empty() || r.code_id.trim().is_empty() {
        return Err(AppError::BadRequest(
            "tracking code name and id are required".into(),
        ));
    }
    let code = sqlx::query_as::<_, TrackingCode>(
        "INSERT INTO tracking_codes (id, name, code_type, code_id, is_active, created_at)
         VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&r.name)
    .bind(&r.code_type)
    .bind(&r.code_id)
    .bind(r.is_active.unwrap_or(true))
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(code)))
}

pub async fn update(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<TrackingInput>,
) -> Result<Json<TrackingCode>, AppError> {
    let code = sqlx::query_as::<_, TrackingCode>(
        "UPDATE tracking_codes SET name = $2, code_type = $3, code_id = $4,
            is_active = COALESCE($5, is_active)
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&r.name)
    .bind(&r.code_type)
    .bind(&r.code_id)
    .bind(r.is_active)
    .fetch_optional(&s.db)
    .await?
    .ok_or(AppError::NotFound("tracking code"))?;
    Ok(Json(code))
}

pub async fn delete(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM tracking_codes WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("tracking code"));
    }
    Ok(StatusCode::NO_CONTENT)
}
