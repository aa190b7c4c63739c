//! User administration: profile listing and role assignment.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::error::AppError;

const ROLES: [&str; 2] = ["user", "admin"];

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

pub async fn list(State(s): State<AppState>) -> Result<Json<Vec<UserView>>, AppError> {
    let users = sqlx::query_as::<_, UserView>(
        "SELECT p.id, p.email, p.full_name, COALESCE(r.role, 'user') AS role, p.created_at
         FROM profiles p LEFT JOIN user_roles r ON r.user_id = p.id
         ORDER BY p.created_at DESC",
    )
    .fetch_all(&s.db)
    .await?;
    Ok(Json(users))
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

pub async fn set_role(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<RoleRequest>,
) -> Result<Json<UserView>, AppError> {
    if !ROLES.contains(&r.role.as_str()) {
        return Err(AppError::BadRequest(format!("unknown role {:?}", r.role)));
    }
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM profiles WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("user"));
    }
    sqlx::query(
        "INSERT INTO user_roles (user_id, role) VALUES ($1, $2)
         ON CONFLICT (user_id) DO UPDATE SET role = EXCLUDED.role",
    )
    .bind(id)
    .bind(&r.role)
    .execute(&s.db)
    .await?;
    let user = sqlx::query_as::<_, UserView>(
        "SELECT p.id, p.email, p.full_name, COALESCE(r.role, 'user') AS role, p.created_at
         FROM profiles p LEFT JOIN user_roles r ON r.user_id = p.id WHERE p.id = $1",
    )
    .bind(id)
    .fetch_optional(&s.db)
    .await?
    .ok_or(AppError::NotFound("user"))?;
    tracing::info!(user_id = %id, role = %r.role, "user role updated");
    Ok(Json(user))
}
