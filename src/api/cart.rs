//! Session cart endpoints.
//!
//! Cart lines are stored per session token in `cart_items`, snapshotting the
//! product's name/price/weight/image at add time. Rows are hydrated through
//! the [`Cart`] aggregate so totals and quantity rules come from one place.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::AppState;
use crate::domain::cart::{Cart, CartLine};
use crate::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    product_id: Uuid,
    name: String,
    unit_price: i64,
    quantity: i32,
    weight_g: i32,
    image_url: Option<String>,
}

pub(super) async fn load_cart(db: &PgPool, session: &str) -> Result<Cart, AppError> {
    let rows = sqlx::query_as::<_, CartRow>(
        "SELECT product_id, name, unit_price, quantity, weight_g, image_url
         FROM cart_items WHERE session_id = $1 ORDER BY created_at",
    )
    .bind(session)
    .fetch_all(db)
    .await?;
    Ok(Cart::from_lines(
        rows.into_iter()
            .map(|r| CartLine {
                product_id: r.product_id,
                name: r.name,
                unit_price: r.unit_price,
                quantity: r.quantity.max(1) as u32,
                weight_g: r.weight_g,
                image_url: r.image_url,
            })
            .collect(),
    ))
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub lines: Vec<CartLine>,
    pub total_price: i64,
    pub total_weight_g: i64,
}

fn respond(cart: Cart, default_weight_g: i32) -> CartResponse {
    CartResponse {
        total_price: cart.total_price(),
        total_weight_g: cart.total_weight_g(default_weight_g),
        lines: cart.lines().to_vec(),
    }
}

pub async fn get(
    State(s): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<CartResponse>, AppError> {
    let cart = load_cart(&s.db, &session).await?;
    Ok(Json(respond(cart, s.config.default_item_weight_g)))
}

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub product_id: Uuid,
}

/// Adds one unit of a product, merging into an existing line. The snapshot
/// columns are taken from the catalog at insert time and left untouched on
/// merge.
pub async fn add(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(r): Json<AddRequest>,
) -> Result<(StatusCode, Json<CartResponse>), AppError> {
    let inserted = sqlx::query(
        "INSERT INTO cart_items (id, session_id, product_id, name, unit_price, quantity, weight_g, image_url, created_at)
         SELECT $1, $2, p.id, p.name, p.price, 1, p.weight_g, p.image_url, NOW()
         FROM products p WHERE p.id = $3 AND p.in_stock
         ON CONFLICT (session_id, product_id)
         DO UPDATE SET quantity = cart_items.quantity + 1",
    )
    .bind(Uuid::now_v7())
    .bind(&session)
    .bind(r.product_id)
    .execute(&s.db)
    .await?;
    if inserted.rows_affected() == 0 {
        return Err(AppError::NotFound("product"));
    }
    let cart = load_cart(&s.db, &session).await?;
    Ok((
        StatusCode::CREATED,
        Json(respond(cart, s.config.default_item_weight_g)),
    ))
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: i32,
}

/// Sets a line's quantity to an absolute value; zero or less removes it.
pub async fn set_quantity(
    State(s): State<AppState>,
    Path((session, product_id)): Path<(String, Uuid)>,
    Json(r): Json<QuantityRequest>,
) -> Result<Json<CartResponse>, AppError> {
    if r.quantity <= 0 {
        sqlx::query("DELETE FROM cart_items WHERE session_id = $1 AND product_id = $2")
            .bind(&session)
            .bind(product_id)
            .execute(&s.db)
            .await?;
    } else {
        let updated = sqlx::query(
            "UPDATE cart_items SET quantity = $3 WHERE session_id = $1 AND product_id = $2",
        )
        .bind(&session)
        .bind(product_id)
        .bind(r.quantity)
        .execute(&s.db)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("cart line"));
        }
    }
    let cart = load_cart(&s.db, &session).await?;
    Ok(Json(respond(cart, s.config.default_item_weight_g)))
}

pub async fn remove(
    State(s): State<AppState>,
    Path((session, product_id)): Path<(String, Uuid)>,
) -> Result<Json<CartResponse>, AppError> {
    sqlx::query("DELETE FROM cart_items WHERE session_id = $1 AND product_id = $2")
        .bind(&session)
        .bind(product_id)
        .execute(&s.db)
        .await?;
    let cart = load_cart(&s.db, &session).await?;
    Ok(Json(respond(cart, s.config.default_item_weight_g)))
}

pub async fn clear(
    State(s): State<AppState>,
    Path(session): Path<String>,
) -> Result<StatusCode, AppError> {
    sqlx::query("DELETE FROM cart_items WHERE session_id = $1")
        .bind(&session)
        .execute(&s.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
