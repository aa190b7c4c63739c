//! HTTP surface: storefront, checkout, and admin back-office routes.

pub mod cart;
pub mod categories;
pub mod checkout;
pub mod locations;
pub mod orders;
pub mod products;
pub mod tracking;
pub mod users;

use std::collections::HashMap;
use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use sqlx::PgPool;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::domain::checkout::CheckoutSession;
use crate::payment::InvoiceClient;
use crate::shipping::RateClient;

/// Checkout sessions are in-process state keyed by the same opaque session
/// token as the cart. The lock is never held across awaits; see
/// [`crate::api::checkout`].
pub type SessionMap = Arc<Mutex<HashMap<String, CheckoutSession>>>;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub rates: Arc<RateClient>,
    pub invoices: Arc<InvoiceClient>,
    pub sessions: SessionMap,
}

impl AppState {
    pub fn new(
        db: PgPool,
        config: Arc<AppConfig>,
        rates: RateClient,
        invoices: InvoiceClient,
    ) -> Self {
        Self {
            db,
            config,
            rates: Arc::new(rates),
            invoices: Arc::new(invoices),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async {
                Json(serde_json::json!({"status": "healthy", "service": "kopi-storefront"}))
            }),
        )
        // Storefront catalog
        .route(
            "/api/v1/products",
            get(products::list).post(products::create),
        )
        .route(
            "/api/v1/products/:id",
            get(products::get_by_id)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/api/v1/products/slug/:slug", get(products::get_by_slug))
        .route(
            "/api/v1/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/api/v1/categories/:id",
            put(categories::update).delete(categories::delete),
        )
        // Cart
        .route(
            "/api/v1/cart/:session",
            get(cart::get).post(cart::add).delete(cart::clear),
        )
        .route(
            "/api/v1/cart/:session/items/:product_id",
            put(cart::set_quantity).delete(cart::remove),
        )
        // Location lookups and rate quotes
        .route("/api/v1/shipping/provinces", get(locations::provinces))
        .route(
            "/api/v1/shipping/cities/:province_id",
            get(locations::cities),
        )
        .route(
            "/api/v1/shipping/districts/:city_id",
            get(locations::districts),
        )
        .route(
            "/api/v1/shipping/subdistricts",
            get(locations::subdistricts),
        )
        .route("/api/v1/shipping/rates", post(locations::rates))
        // Checkout flow
        .route(
            "/api/v1/checkout/:session",
            post(checkout::start).get(checkout::state),
        )
        .route(
            "/api/v1/checkout/:session/contact",
            put(checkout::update_contact),
        )
        .route(
            "/api/v1/checkout/:session/location",
            put(checkout::select_location),
        )
        .route(
            "/api/v1/checkout/:session/subdistrict",
            get(checkout::match_subdistricts).put(checkout::choose_subdistrict),
        )
        .route("/api/v1/checkout/:session/rates", post(checkout::refresh_rates))
        .route(
            "/api/v1/checkout/:session/option",
            put(checkout::select_option),
        )
        .route("/api/v1/checkout/:session/next", post(checkout::next_stage))
        .route("/api/v1/checkout/:session/back", post(checkout::back_stage))
        .route("/api/v1/checkout/:session/submit", post(checkout::submit))
        // Back office
        .route("/api/v1/orders", get(orders::list))
        .route("/api/v1/orders/:id", get(orders::get))
        .route("/api/v1/orders/:id/status", put(orders::update_status))
        .route(
            "/api/v1/tracking-codes",
            get(tracking::list).post(tracking::create),
        )
        .route("/api/v1/tracking-codes/active", get(tracking::list_active))
        .route(
            "/api/v1/tracking-codes/:id",
            put(tracking::update).delete(tracking::delete),
        )
        .route("/api/v1/users", get(users::list))
        .route("/api/v1/users/:id/role", put(users::set_role))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
