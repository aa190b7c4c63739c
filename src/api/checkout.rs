//! Checkout session endpoints.
//!
//! Session state lives in the in-process [`super::SessionMap`]. Handlers never
//! hold the session lock across an await: they snapshot what a fetch needs
//! (including the cascade generation), perform the I/O, then re-acquire and
//! apply — stale results are discarded by the generation check. The submit
//! handler sets the in-flight flag under the lock before any order/invoice
//! I/O, so a second click cannot create a second order.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cart::load_cart;
use super::AppState;
use crate::domain::cascade::{Cascade, Level, Place, SubdistrictCandidate};
use crate::domain::checkout::{CheckoutError, CheckoutSession, ContactForm, Stage};
use crate::domain::order::{OrderDraft, OrderItemDraft, OrderStatus};
use crate::error::AppError;
use crate::payment::{InvoiceItem, InvoiceRequest};
use crate::shipping::{resolve_rates, ShippingOption};

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub stage: Stage,
    pub contact: ContactForm,
    pub cascade: Cascade,
    pub quotes: Vec<ShippingOption>,
    pub selected_option: Option<ShippingOption>,
    pub submitting: bool,
}

impl SessionView {
    fn of(session: &CheckoutSession) -> Self {
        Self {
            stage: session.stage(),
            contact: session.contact.clone(),
            cascade: session.cascade.clone(),
            quotes: session.quotes().to_vec(),
            selected_option: session.selected_option().cloned(),
            submitting: session.is_submitting(),
        }
    }
}

/// Starts a checkout for the session's cart. A fresh session answers 201; an
/// existing one is resumed as-is with 200.
pub async fn start(
    State(s): State<AppState>,
    Path(session): Path<String>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let cart = load_cart(&s.db, &session).await?;
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart.into());
    }
    let mut sessions = s.sessions.lock().await;
    let (status, entry) = open_session(&mut sessions, session);
    Ok((status, Json(SessionView::of(entry))))
}

fn open_session(
    sessions: &mut HashMap<String, CheckoutSession>,
    session: String,
) -> (StatusCode, &mut CheckoutSession) {
    match sessions.entry(session) {
        Entry::Occupied(e) => (StatusCode::OK, e.into_mut()),
        Entry::Vacant(e) => (StatusCode::CREATED, e.insert(CheckoutSession::new())),
    }
}

pub async fn state(
    State(s): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let sessions = s.sessions.lock().await;
    let entry = sessions
        .get(&session)
        .ok_or(AppError::NotFound("checkout session"))?;
    Ok(Json(SessionView::of(entry)))
}

/// Merges contact/address fields into the session. Validation happens at the
/// stage transition, so partial input is always accepted and never lost.
pub async fn update_contact(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(contact): Json<ContactForm>,
) -> Result<Json<SessionView>, AppError> {
    let mut sessions = s.sessions.lock().await;
    let entry = sessions
        .get_mut(&session)
        .ok_or(AppError::NotFound("checkout session"))?;
    entry.contact = contact;
    Ok(Json(SessionView::of(entry)))
}

#[derive(Debug, Deserialize)]
pub struct SelectLocation {
    pub level: Level,
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    /// Options for the next closed-select level, when there is one.
    pub options: Vec<Place>,
    /// Subdistrict candidates, when the district was just selected.
    pub candidates: Vec<SubdistrictCandidate>,
    /// The child fetch failed; the lists are empty and reselecting the
    /// parent retries.
    pub fetch_failed: bool,
}

/// Selects a province, city, or district. Clears everything below the level
/// and fetches the child level's options; a result that comes back after the
/// parent changed again is discarded.
pub async fn select_location(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(r): Json<SelectLocation>,
) -> Result<Json<LocationResponse>, AppError> {
    if r.level == Level::Subdistrict {
        return Err(AppError::BadRequest(
            "subdistricts are chosen via the type-ahead endpoint".into(),
        ));
    }

    let generation = {
        let mut sessions = s.sessions.lock().await;
        let entry = sessions
            .get_mut(&session)
            .ok_or(AppError::NotFound("checkout session"))?;
        entry.cascade.select(
            r.level,
            Place {
                id: r.id,
                name: r.name.clone(),
            },
        )
    };

    // Fetch the child level without holding the lock.
    let mut options = Vec::new();
    let mut candidates = Vec::new();
    let mut fetch_failed = false;
    let child = r.level.child();
    match child {
        Some(Level::City) => match s.rates.cities(r.id).await {
            Ok(places) => options = places,
            Err(err) => {
                tracing::warn!(error = %err, "city lookup failed");
                fetch_failed = true;
            }
        },
        Some(Level::District) => match s.rates.districts(r.id).await {
            Ok(places) => options = places,
            Err(err) => {
                tracing::warn!(error = %err, "district lookup failed");
                fetch_failed = true;
            }
        },
        Some(Level::Subdistrict) => match s.rates.subdistricts(&r.name).await {
            Ok(found) => candidates = found,
            Err(err) => {
                tracing::warn!(error = %err, "subdistrict lookup failed");
                fetch_failed = true;
            }
        },
        _ => {}
    }

    let mut sessions = s.sessions.lock().await;
    let entry = sessions
        .get_mut(&session)
        .ok_or(AppError::NotFound("checkout session"))?;
    let applied = match child {
        Some(Level::Subdistrict) => entry
            .cascade
            .apply_candidates(generation, candidates.clone()),
        Some(level) => entry
            .cascade
            .apply_options(level, generation, options.clone()),
        None => false,
    };
    if !applied {
        // A newer selection superseded this fetch; report nothing.
        options.clear();
        candidates.clear();
    }
    Ok(Json(LocationResponse {
        options,
        candidates,
        fetch_failed,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TypeaheadQuery {
    pub query: String,
}

/// Type-ahead over the fetched subdistrict candidates.
pub async fn match_subdistricts(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Query(q): Query<TypeaheadQuery>,
) -> Result<Json<Vec<SubdistrictCandidate>>, AppError> {
    let sessions = s.sessions.lock().await;
    let entry = sessions
        .get(&session)
        .ok_or(AppError::NotFound("checkout session"))?;
    Ok(Json(
        entry.cascade.matches(&q.query).into_iter().cloned().collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ChooseSubdistrict {
    pub id: i64,
}

/// Confirms a subdistrict candidate; its postal code is auto-filled into the
/// cascade.
pub async fn choose_subdistrict(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(r): Json<ChooseSubdistrict>,
) -> Result<Json<SessionView>, AppError> {
    let mut sessions = s.sessions.lock().await;
    let entry = sessions
        .get_mut(&session)
        .ok_or(AppError::NotFound("checkout session"))?;
    let candidate = entry
        .cascade
        .candidates()
        .iter()
        .find(|c| c.id == r.id)
        .cloned()
        .ok_or_else(|| AppError::BadRequest("unknown subdistrict candidate".into()))?;
    entry.cascade.choose_subdistrict(&candidate);
    Ok(Json(SessionView::of(entry)))
}

#[derive(Debug, Serialize)]
pub struct RatesView {
    pub options: Vec<ShippingOption>,
    pub available: bool,
}

/// Recomputes shipping quotes for the session's destination and cart weight.
/// Quotes fetched for an outdated destination are discarded.
pub async fn refresh_rates(
    State(s): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<RatesView>, AppError> {
    let (destination, generation) = {
        let sessions = s.sessions.lock().await;
        let entry = sessions
            .get(&session)
            .ok_or(AppError::NotFound("checkout session"))?;
        let destination = entry.cascade.destination_id().ok_or_else(|| {
            AppError::BadRequest("destination is not resolved yet".into())
        })?;
        (destination, entry.cascade.generation())
    };

    let cart = load_cart(&s.db, &session).await?;
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart.into());
    }
    let weight_g = cart.total_weight_g(s.config.default_item_weight_g);
    let options = resolve_rates(
        &s.rates,
        &s.config.couriers,
        s.config.origin_district_id,
        destination,
        weight_g,
    )
    .await;

    let mut sessions = s.sessions.lock().await;
    let entry = sessions
        .get_mut(&session)
        .ok_or(AppError::NotFound("checkout session"))?;
    if entry.cascade.generation() == generation {
        entry.set_quotes(options.clone());
    }
    let available = !options.is_empty();
    Ok(Json(RatesView { options, available }))
}

#[derive(Debug, Deserialize)]
pub struct SelectOption {
    pub courier: String,
    pub service: String,
}

pub async fn select_option(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(r): Json<SelectOption>,
) -> Result<Json<SessionView>, AppError> {
    let mut sessions = s.sessions.lock().await;
    let entry = sessions
        .get_mut(&session)
        .ok_or(AppError::NotFound("checkout session"))?;
    entry.select_option(&r.courier, &r.service)?;
    Ok(Json(SessionView::of(entry)))
}

pub async fn next_stage(
    State(s): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let cart = load_cart(&s.db, &session).await?;
    let mut sessions = s.sessions.lock().await;
    let entry = sessions
        .get_mut(&session)
        .ok_or(AppError::NotFound("checkout session"))?;
    entry.advance(cart.is_empty())?;
    Ok(Json(SessionView::of(entry)))
}

#[derive(Debug, Deserialize)]
pub struct BackRequest {
    pub to: Stage,
}

pub async fn back_stage(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(r): Json<BackRequest>,
) -> Result<Json<SessionView>, AppError> {
    let mut sessions = s.sessions.lock().await;
    let entry = sessions
        .get_mut(&session)
        .ok_or(AppError::NotFound("checkout session"))?;
    entry.back(r.to)?;
    Ok(Json(SessionView::of(entry)))
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub order_id: Uuid,
    pub order_number: String,
    pub total_amount: i64,
    pub invoice_id: String,
    pub invoice_url: String,
}

/// Final confirmation: persists the order and its items in one transaction,
/// requests the hosted invoice, and on success clears the cart and tears the
/// session down. On failure the order stays `pending`, the session keeps all
/// entered data, and the error is surfaced as retryable.
pub async fn submit(
    State(s): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<SubmitResponse>, AppError> {
    let cart = load_cart(&s.db, &session).await?;
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart.into());
    }

    let (contact, cascade, option) = {
        let mut sessions = s.sessions.lock().await;
        let entry = sessions
            .get_mut(&session)
            .ok_or(AppError::NotFound("checkout session"))?;
        let option = entry
            .selected_option()
            .cloned()
            .ok_or(CheckoutError::NoShippingOption)?;
        entry.begin_submit()?;
        (entry.contact.clone(), entry.cascade.clone(), option)
    };

    let result = place_order(&s, &session, &cart, &contact, &cascade, &option).await;

    let mut sessions = s.sessions.lock().await;
    match result {
        Ok(response) => {
            sessions.remove(&session);
            Ok(Json(response))
        }
        Err(err) => {
            if let Some(entry) = sessions.get_mut(&session) {
                entry.abort_submit();
            }
            Err(err)
        }
    }
}

async fn place_order(
    s: &AppState,
    session: &str,
    cart: &crate::domain::cart::Cart,
    contact: &ContactForm,
    cascade: &Cascade,
    option: &ShippingOption,
) -> Result<SubmitResponse, AppError> {
    let (draft, items) = OrderDraft::from_checkout(cart, contact, cascade, option);
    insert_order(&s.db, &draft, &items).await?;
    tracing::info!(
        order_id = %draft.id,
        order_number = %draft.order_number,
        total = draft.total_amount,
        "order created"
    );

    let invoice = s
        .invoices
        .create_invoice(&InvoiceRequest {
            order_id: draft.id.to_string(),
            amount: draft.total_amount,
            customer_name: draft.customer_name.clone(),
            customer_email: draft.customer_email.clone(),
            customer_phone: Some(draft.customer_phone.clone()),
            items: items
                .iter()
                .map(|i| InvoiceItem {
                    name: i.name.clone(),
                    quantity: i.quantity,
                    price: i.unit_price,
                })
                .collect(),
        })
        .await?;

    sqlx::query(
        "UPDATE orders SET status = $2, invoice_id = $3, invoice_url = $4, updated_at = NOW()
         WHERE id = $1",
    )
    .bind(draft.id)
    .bind(OrderStatus::AwaitingPayment.as_str())
    .bind(&invoice.id)
    .bind(&invoice.invoice_url)
    .execute(&s.db)
    .await?;

    sqlx::query("DELETE FROM cart_items WHERE session_id = $1")
        .bind(session)
        .execute(&s.db)
        .await?;

    Ok(SubmitResponse {
        order_id: draft.id,
        order_number: draft.order_number,
        total_amount: draft.total_amount,
        invoice_id: invoice.id,
        invoice_url: invoice.invoice_url,
    })
}

/// Header and item rows go in one transaction; an orphaned header cannot
/// occur.
async fn insert_order(
    db: &sqlx::PgPool,
    draft: &OrderDraft,
    items: &[OrderItemDraft],
) -> Result<(), AppError> {
    let mut tx = db.begin().await?;
    sqlx::query(
        "INSERT INTO orders (id, order_number, customer_name, customer_email, customer_phone,
            shipping_address, courier, courier_service, shipping_cost, subtotal, total_amount,
            status, notes, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW(), NOW())",
    )
    .bind(draft.id)
    .bind(&draft.order_number)
    .bind(&draft.customer_name)
    .bind(&draft.customer_email)
    .bind(&draft.customer_phone)
    .bind(&draft.shipping_address)
    .bind(&draft.courier)
    .bind(&draft.courier_service)
    .bind(draft.shipping_cost)
    .bind(draft.subtotal)
    .bind(draft.total_amount)
    .bind(draft.status.as_str())
    .bind(&draft.notes)
    .execute(&mut *tx)
    .await?;

    for item in items {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, name, unit_price, quantity, subtotal)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(item.id)
        .bind(item.order_id)
        .bind(item.product_id)
        .bind(&item.name)
        .bind(item.unit_price)
        .bind(item.quantity)
        .bind(item.subtotal)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reopening_a_session_resumes_instead_of_creating() {
        let mut sessions = HashMap::new();
        let (first, entry) = open_session(&mut sessions, "sess-1".into());
        assert_eq!(first, StatusCode::CREATED);
        entry.advance(false).unwrap();

        let (second, entry) = open_session(&mut sessions, "sess-1".into());
        assert_eq!(second, StatusCode::OK);
        // The resumed session keeps its progress.
        assert_eq!(entry.stage(), Stage::Shipping);
        assert_eq!(sessions.len(), 1);
    }
}
