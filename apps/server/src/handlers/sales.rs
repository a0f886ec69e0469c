//! # Sales Endpoints
//!
//! ```text
//! POST /api/sales
//!   { "customer": { "name", "email", "phone" } | { "customerId" },
//!     "items": [ { "productId", "quantity" }, ... ],
//!     "totalAmountCents": 12345,
//!     "date": "2024-03-15" }            ← optional, defaults to today
//!        │
//!        ▼
//!   SaleRepository::commit_sale (one transaction)
//!        │
//!        ├── 201 SaleDetail
//!        ├── 400 VALIDATION_ERROR   empty cart, bad quantity, total mismatch
//!        ├── 404 NOT_FOUND          unknown product or customer
//!        ├── 409 INSUFFICIENT_STOCK / CONFLICT
//!        └── 503 PERSISTENCE_ERROR  database busy, retry
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tally_core::{DateRange, NewSale, Sale, SaleDetail, SaleEdit, ValidationError};
use tracing::info;

use crate::auth::Session;
use crate::error::ApiResult;
use crate::AppState;

/// `GET /api/sales?from=YYYY-MM-DD&to=YYYY-MM-DD`, both bounds inclusive.
pub async fn list(
    State(state): State<AppState>,
    _session: Session,
    range: Result<Query<DateRange>, QueryRejection>,
) -> ApiResult<Json<Vec<Sale>>> {
    let Query(range) = range?;

    if let (Some(from), Some(to)) = (range.from, range.to) {
        if from > to {
            return Err(ValidationError::invalid_format("from", "must not be after `to`").into());
        }
    }

    Ok(Json(state.db.sales().list(&range).await?))
}

pub async fn get(
    State(state): State<AppState>,
    _session: Session,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleDetail>> {
    Ok(Json(state.db.sales().get_detail(&id).await?))
}

pub async fn commit(
    State(state): State<AppState>,
    Session(session): Session,
    payload: Result<Json<NewSale>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SaleDetail>)> {
    let Json(request) = payload?;
    let detail = state.db.sales().commit_sale(&request, state.total_policy).await?;

    info!(
        user = %session.display_name(),
        sale_id = %detail.sale.id,
        total_amount_cents = detail.sale.total_amount_cents,
        "Sale recorded"
    );
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn update(
    State(state): State<AppState>,
    Session(session): Session,
    Path(id): Path<String>,
    payload: Result<Json<SaleEdit>, JsonRejection>,
) -> ApiResult<Json<Sale>> {
    let Json(edit) = payload?;
    let sale = state.db.sales().update_details(&id, &edit).await?;

    info!(user = %session.display_name(), sale_id = %id, "Sale edited");
    Ok(Json(sale))
}
