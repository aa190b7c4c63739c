//! Order back-office endpoints: listing, detail with items, status updates.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::domain::order::OrderStatus;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub courier: String,
    pub courier_service: String,
    pub shipping_cost: i64,
    pub subtotal: i64,
    pub total_amount: i64,
    pub status: String,
    pub notes: Option<String>,
    pub invoice_id: Option<String>,
    pub invoice_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub subtotal: i64,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct OrderPage {
    pub data: Vec<OrderRow>,
    pub total: i64,
    pub page: u32,
}

pub async fn list(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<OrderPage>, AppError> {
    if let Some(status) = &p.status {
        if OrderStatus::parse(status).is_none() {
            return Err(AppError::BadRequest(format!("unknown status {status:?}")));
        }
    }
    let page = p.page.unwrap_or(1).max(1);
    let per_page = p.per_page.unwrap_or(20).min(100);

    let orders = sqlx::query_as::<_, OrderRow>(
        "SELECT * FROM orders WHERE ($1::text IS NULL OR status = $1)
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(&p.status)
    .bind(i64::from(per_page))
    .bind(super::products::page_offset(page, per_page))
    .fetch_all(&s.db)
    .await?;

    let total: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM orders WHERE ($1::text IS NULL OR status = $1)")
            .bind(&p.status)
            .fetch_one(&s.db)
            .await?;

    Ok(Json(OrderPage {
        data: orders,
        total: total.0,
        page,
    }))
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderRow,
    pub items: Vec<OrderItemRow>,
}

pub async fn get(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetail>, AppError> {
    let order = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(AppError::NotFound("order"))?;
    let items = sqlx::query_as::<_, OrderItemRow>(
        "SELECT id, product_id, name, unit_price, quantity, subtotal
         FROM order_items WHERE order_id = $1 ORDER BY name",
    )
    .bind(id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(OrderDetail { order, items }))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

pub async fn update_status(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<StatusRequest>,
) -> Result<Json<OrderRow>, AppError> {
    let status = OrderStatus::parse(&r.status)
        .ok_or_else(|| AppError::BadRequest(format!("unknown status {:?}", r.status)))?;
    let order = sqlx::query_as::<_, OrderRow>(
        "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(&s.db)
    .await?
    .ok_or(AppError::NotFound("order"))?;
    tracing::info!(order_id = %id, status = status.as_str(), "order status updated");
    Ok(Json(order))
}
