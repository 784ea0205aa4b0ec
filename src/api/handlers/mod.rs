use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::{AppState, CallerId};
use crate::error::LeaseError;
use crate::models::*;

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Translate an engine error into a response.
///
/// Entities owned by someone else are reported exactly like missing ones.
/// Storage failures are logged in full and returned as a generic message.
fn lease_error(e: LeaseError) -> (StatusCode, String) {
    match e {
        LeaseError::NotFound { entity, id } | LeaseError::Forbidden { entity, id } => {
            tracing::warn!("{}", e);
            (
                StatusCode::NOT_FOUND,
                format!("{} not found: {}", entity, id),
            )
        }
        LeaseError::Validation(_) => {
            tracing::warn!("{}", e);
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        LeaseError::Conflict(_) => {
            tracing::warn!("{}", e);
            (StatusCode::CONFLICT, e.to_string())
        }
        LeaseError::Storage(_) => {
            tracing::error!("Internal error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Properties
// ============================================================

pub async fn create_property(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Json(input): Json<CreatePropertyInput>,
) -> ApiResult<(StatusCode, Json<Property>)> {
    state
        .db
        .create_property(caller, input)
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(lease_error)
}

pub async fn get_property(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Property>> {
    state.engine.property(caller, id).map(Json).map_err(lease_error)
}

pub async fn list_property_leases(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Lease>>> {
    state
        .engine
        .property_leases(caller, id)
        .map(Json)
        .map_err(lease_error)
}

// ============================================================
// People
// ============================================================

pub async fn create_person(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Json(input): Json<InlinePerson>,
) -> ApiResult<(StatusCode, Json<Person>)> {
    state
        .engine
        .create_person(caller, input)
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(lease_error)
}

pub async fn get_person(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Person>> {
    state.engine.person(caller, id).map(Json).map_err(lease_error)
}

pub async fn delete_person(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .engine
        .delete_person(caller, id)
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(lease_error)
}

// ============================================================
// Leases
// ============================================================

pub async fn create_lease(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Json(input): Json<CreateLeaseInput>,
) -> ApiResult<(StatusCode, Json<LeaseDetails>)> {
    state
        .engine
        .create_lease(caller, input)
        .map(|l| (StatusCode::CREATED, Json(l)))
        .map_err(lease_error)
}

pub async fn get_lease(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LeaseDetails>> {
    state.engine.get_lease(caller, id).map(Json).map_err(lease_error)
}

pub async fn update_lease(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateLeaseInput>,
) -> ApiResult<Json<LeaseDetails>> {
    state
        .engine
        .update_lease(caller, id, input)
        .map(Json)
        .map_err(lease_error)
}

pub async fn delete_lease(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .engine
        .delete_lease(caller, id)
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(lease_error)
}

pub async fn audit_lease(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LeaseDetails>> {
    state
        .engine
        .audit_lease(caller, id)
        .map(Json)
        .map_err(lease_error)
}

// ============================================================
// Membership
// ============================================================

pub async fn add_lessee(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
    Json(spec): Json<LesseeSpec>,
) -> ApiResult<Json<LeaseDetails>> {
    state
        .engine
        .add_lessee(caller, id, spec)
        .map(Json)
        .map_err(lease_error)
}

/// Void the lease and recreate it without the given lessee.
pub async fn remove_lessee(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
    Json(input): Json<RemoveLesseeInput>,
) -> ApiResult<(StatusCode, Json<LeaseReplacement>)> {
    let new_lease_id = state
        .engine
        .remove_lessee_via_void_recreate(caller, id, input)
        .map_err(lease_error)?;

    Ok((
        StatusCode::CREATED,
        Json(LeaseReplacement {
            voided_lease_id: id,
            new_lease_id,
        }),
    ))
}

pub async fn add_occupant(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
    Json(spec): Json<OccupantSpec>,
) -> ApiResult<Json<LeaseDetails>> {
    state
        .engine
        .add_occupant(caller, id, spec)
        .map(Json)
        .map_err(lease_error)
}

pub async fn remove_occupant(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path((id, occupant_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<LeaseDetails>> {
    state
        .engine
        .remove_occupant(caller, id, occupant_id)
        .map(Json)
        .map_err(lease_error)
}

pub async fn add_pet(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
    Json(input): Json<AddPetInput>,
) -> ApiResult<Json<LeaseDetails>> {
    state
        .engine
        .add_pet(caller, id, input)
        .map(Json)
        .map_err(lease_error)
}

pub async fn remove_pet(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path((id, pet_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<LeaseDetails>> {
    state
        .engine
        .remove_pet(caller, id, pet_id)
        .map(Json)
        .map_err(lease_error)
}
