//! Customer endpoints.
//!
//! `POST /api/customers` is create-or-fetch: an email already on file
//! returns the stored record with 200 instead of 201.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tally_core::{Customer, CustomerPatch, CustomerProfile};
use tracing::info;

use crate::auth::Session;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub async fn list(State(state): State<AppState>, _session: Session) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.db.customers().list().await?))
}

pub async fn get(
    State(state): State<AppState>,
    _session: Session,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    let customer = state
        .db
        .customers()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer", &id))?;

    Ok(Json(customer))
}

pub async fn create(
    State(state): State<AppState>,
    Session(session): Session,
    payload: Result<Json<CustomerProfile>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let Json(profile) = payload?;
    let (customer, created) = state.db.customers().create_or_fetch(&profile).await?;

    let status = if created {
        info!(user = %session.display_name(), id = %customer.id, "Customer created");
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(customer)))
}

pub async fn update(
    State(state): State<AppState>,
    Session(session): Session,
    Path(id): Path<String>,
    payload: Result<Json<CustomerPatch>, JsonRejection>,
) -> ApiResult<Json<Customer>> {
    let Json(patch) = payload?;
    let customer = state.db.customers().update(&id, &patch).await?;

    info!(user = %session.display_name(), id = %id, "Customer updated");
    Ok(Json(customer))
}

pub async fn delete(
    State(state): State<AppState>,
    Session(session): Session,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.customers().delete(&id).await?;

    info!(user = %session.display_name(), id = %id, "Customer deleted");
    Ok(StatusCode::NO_CONTENT)
}
