//! Catalog endpoints: storefront listing with filters, plus admin CRUD.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: i64,
    pub product_type: String,
    pub origin: String,
    pub roast_level: String,
    pub grind_type: String,
    pub weight_g: i32,
    pub tasting_notes: Vec<String>,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub in_stock: bool,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub origin: Option<String>,
    pub roast: Option<String>,
    pub grind: Option<String>,
    pub product_type: Option<String>,
    pub search: Option<String>,
    pub include_out_of_stock: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

/// Storefront listing: in-stock products, featured first, with the original
/// storefront's origin/roast/grind/type filters and free-text search.
pub async fn list(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Product>>, AppError> {
    let page = p.page.unwrap_or(1).max(1);
    let per_page = p.per_page.unwrap_or(20).min(100);
    let search = p.search.map(|q| format!("%{}%", q.to_lowercase()));
    let in_stock_only = !p.include_out_of_stock.unwrap_or(false);

    let filter_sql = "($1::text IS NULL OR origin = $1)
           AND ($2::text IS NULL OR roast_level = $2)
           AND ($3::text IS NULL OR grind_type = $3)
           AND ($4::text IS NULL OR product_type = $4)
           AND ($5::text IS NULL OR LOWER(name) LIKE $5 OR LOWER(description) LIKE $5)
           AND (NOT $6 OR in_stock)";

    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT * FROM products WHERE {filter_sql}
         ORDER BY featured DESC, created_at DESC LIMIT $7 OFFSET $8"
    ))
    .bind(&p.origin)
    .bind(&p.roast)
    .bind(&p.grind)
    .bind(&p.product_type)
    .bind(&search)
    .bind(in_stock_only)
    .bind(i64::from(per_page))
    .bind(page_offset(page, per_page))
    .fetch_all(&s.db)
    .await?;

    let total: (i64,) =
        sqlx::query_as(&format!("SELECT COUNT(*) FROM products WHERE {filter_sql}"))
            .bind(&p.origin)
            .bind(&p.roast)
            .bind(&p.grind)
            .bind(&p.product_type)
            .bind(&search)
            .bind(in_stock_only)
            .fetch_one(&s.db)
            .await?;

    Ok(Json(PaginatedResponse {
        data: products,
        total: total.0,
        page,
    }))
}

pub async fn get_by_id(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("product"))
}

pub async fn get_by_slug(
    State(s): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Product>, AppError> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE slug = $1")
        .bind(&slug)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("product"))
}

#[derive(Debug, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: i64,
    pub product_type: Option<String>,
    pub origin: Option<String>,
    pub roast_level: Option<String>,
    pub grind_type: Option<String>,
    pub weight_g: Option<i32>,
    pub tasting_notes: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
}

pub async fn create(
    State(s): State<AppState>,
    Json(r): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    if r.name.trim().is_empty() {
        return Err(AppError::BadRequest("product name is required".into()));
    }
    let slug = r.slug.unwrap_or_else(|| slugify(&r.name));
    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, name, slug, description, price, product_type, origin,
            roast_level, grind_type, weight_g, tasting_notes, image_url, category_id,
            in_stock, featured, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, NOW(), NOW())
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&r.name)
    .bind(&slug)
    .bind(r.description.unwrap_or_default())
    .bind(r.price)
    .bind(r.product_type.unwrap_or_else(|| "roasted_coffee".into()))
    .bind(r.origin.unwrap_or_default())
    .bind(r.roast_level.unwrap_or_else(|| "medium".into()))
    .bind(r.grind_type.unwrap_or_else(|| "whole-bean".into()))
    .bind(r.weight_g.unwrap_or(0))
    .bind(r.tasting_notes.unwrap_or_default())
    .bind(&r.image_url)
    .bind(r.category_id)
    .bind(r.in_stock.unwrap_or(true))
    .bind(r.featured.unwrap_or(false))
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<ProductInput>,
) -> Result<Json<Product>, AppError> {
    let product = sqlx::query_as::<_, Product>(
        "UPDATE products SET name = $2, slug = COALESCE($3, slug), description = COALESCE($4, description),
            price = $5, product_type = COALESCE($6, product_type), origin = COALESCE($7, origin),
            roast_level = COALESCE($8, roast_level), grind_type = COALESCE($9, grind_type),
            weight_g = COALESCE($10, weight_g), tasting_notes = COALESCE($11, tasting_notes),
            image_url = $12, category_id = $13, in_stock = COALESCE($14, in_stock),
            featured = COALESCE($15, featured), updated_at = NOW()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&r.name)
    .bind(&r.slug)
    .bind(&r.description)
    .bind(r.price)
    .bind(&r.product_type)
    .bind(&r.origin)
    .bind(&r.roast_level)
    .bind(&r.grind_type)
    .bind(r.weight_g)
    .bind(&r.tasting_notes)
    .bind(&r.image_url)
    .bind(r.category_id)
    .bind(r.in_stock)
    .bind(r.featured)
    .fetch_optional(&s.db)
    .await?
    .ok_or(AppError::NotFound("product"))?;
    Ok(Json(product))
}

pub async fn delete(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("product"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Computed in `i64` so an absurd `page` from the query string cannot
/// overflow `u32` arithmetic.
pub(super) fn page_offset(page: u32, per_page: u32) -> i64 {
    (i64::from(page) - 1) * i64::from(per_page)
}

pub(super) fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_non_alphanumerics() {
        assert_eq!(slugify("Toraja Sapan 200g"), "toraja-sapan-200g");
        assert_eq!(slugify("  Drip Bag -- Box!  "), "drip-bag-box");
    }

    #[test]
    fn page_offset_survives_extreme_page_numbers() {
        assert_eq!(page_offset(1, 20), 0);
        assert_eq!(page_offset(3, 20), 40);
        assert_eq!(page_offset(u32::MAX, 100), (i64::from(u32::MAX) - 1) * 100);
    }
}
