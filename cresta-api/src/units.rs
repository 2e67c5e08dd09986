use crate::{error::AppError, state::AppState};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use cresta_registry::{Unit, UnitStatus, UnitType};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitResponse {
    pub id: Uuid,
    pub code: String,
    pub unit_type: UnitType,
    pub floor: i32,
    pub price_minor: i64,
    pub currency: String,
    pub area_sqm: f64,
    pub orientation: String,
    pub status: UnitStatus,
}

impl From<Unit> for UnitResponse {
    fn from(unit: Unit) -> Self {
        Self {
            id: unit.id,
            code: unit.code,
            unit_type: unit.unit_type,
            floor: unit.floor,
            price_minor: unit.price_minor,
            currency: unit.currency,
            area_sqm: unit.area_sqm,
            orientation: unit.orientation,
            status: unit.status,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/units", get(list_units))
        .route("/units/{id}", get(get_unit))
}

/// Catalog browse. Public: availability is sales material.
async fn list_units(State(state): State<AppState>) -> Json<Vec<UnitResponse>> {
    // settle overdue holds first so nobody browses a stale "held"
    state.holds.sweep();
    Json(state.registry.list().into_iter().map(Into::into).collect())
}

async fn get_unit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UnitResponse>, AppError> {
    state.holds.evaluate_unit(id);
    let unit = state
        .registry
        .get(&id)
        .ok_or_else(|| AppError::NotFoundError(format!("Unit not found: {}", id)))?;
    Ok(Json(unit.into()))
}
