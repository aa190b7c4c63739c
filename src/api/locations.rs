//! Location lookups and standalone rate quotes, proxied to the rate provider.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::cascade::{Place, SubdistrictCandidate};
use crate::error::AppError;
use crate::shipping::{resolve_rates, ShippingOption};

pub async fn provinces(State(s): State<AppState>) -> Result<Json<Vec<Place>>, AppError> {
    Ok(Json(s.rates.provinces().await?))
}

pub async fn cities(
    State(s): State<AppState>,
    Path(province_id): Path<i64>,
) -> Result<Json<Vec<Place>>, AppError> {
    Ok(Json(s.rates.cities(province_id).await?))
}

pub async fn districts(
    State(s): State<AppState>,
    Path(city_id): Path<i64>,
) -> Result<Json<Vec<Place>>, AppError> {
    Ok(Json(s.rates.districts(city_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SubdistrictQuery {
    pub search: String,
}

pub async fn subdistricts(
    State(s): State<AppState>,
    Query(q): Query<SubdistrictQuery>,
) -> Result<Json<Vec<SubdistrictCandidate>>, AppError> {
    Ok(Json(s.rates.subdistricts(&q.search).await?))
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub destination_id: i64,
    pub weight_g: i64,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub options: Vec<ShippingOption>,
    /// `false` renders the explicit "no service available" state.
    pub available: bool,
}

pub async fn rates(
    State(s): State<AppState>,
    Json(r): Json<RateRequest>,
) -> Result<Json<RateResponse>, AppError> {
    if r.weight_g <= 0 {
        return Err(AppError::BadRequest("parcel weight must be positive".into()));
    }
    let options = resolve_rates(
        &s.rates,
        &s.config.couriers,
        s.config.origin_district_id,
        r.destination_id,
        r.weight_g,
    )
    .await;
    let available = !options.is_empty();
    Ok(Json(RateResponse { options, available }))
}
