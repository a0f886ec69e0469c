//! Product catalog endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tally_core::{NewProduct, Product, ProductPatch};
use tracing::info;

use crate::auth::Session;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub async fn list(State(state): State<AppState>, _session: Session) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.products().list().await?))
}

pub async fn get(
    State(state): State<AppState>,
    _session: Session,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    let product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;

    Ok(Json(product))
}

pub async fn create(
    State(state): State<AppState>,
    Session(session): Session,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let Json(new) = payload?;
    let product = state.db.products().insert(&new).await?;

    info!(user = %session.display_name(), id = %product.id, name = %product.name, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update(
    State(state): State<AppState>,
    Session(session): Session,
    Path(id): Path<String>,
    payload: Result<Json<ProductPatch>, JsonRejection>,
) -> ApiResult<Json<Product>> {
    let Json(patch) = payload?;
    let product = state.db.products().update(&id, &patch).await?;

    info!(user = %session.display_name(), id = %id, stock = product.stock, "Product updated");
    Ok(Json(product))
}

pub async fn delete(
    State(state): State<AppState>,
    Session(session): Session,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.products().delete(&id).await?;

    info!(user = %session.display_name(), id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
