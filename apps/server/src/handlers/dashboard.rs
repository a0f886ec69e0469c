//! Dashboard endpoint.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tally_core::{compute_dashboard, Dashboard, DateRange, Granularity};
use tracing::debug;

use crate::auth::Session;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub granularity: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub dashboard: Dashboard,
    pub total_customers: i64,
}

/// `GET /api/dashboard?granularity=weekly|monthly|yearly`
pub async fn get(
    State(state): State<AppState>,
    _session: Session,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> ApiResult<Json<DashboardResponse>> {
    let Query(query) = query?;

    let granularity = match query.granularity.as_deref() {
        Some(value) => value.parse::<Granularity>()?,
        None => Granularity::default(),
    };

    let sales = state.db.sales().list(&DateRange::default()).await?;
    let products = state.db.products().list().await?;
    let total_customers = state.db.customers().count().await?;

    debug!(%granularity, sales = sales.len(), products = products.len(), "Computing dashboard");

    let dashboard = compute_dashboard(&sales, &products, granularity, Local::now().date_naive());

    Ok(Json(DashboardResponse {
        dashboard,
        total_customers,
    }))
}
