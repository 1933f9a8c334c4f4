/// `GET /admin/user/dashboard?startDate=&endDate=`
///
/// Counts users registered within the range against all users.

use axum::extract::State;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tenantry_shared::{
    dashboard::{parse_date, start_and_end_date, DashboardSummary},
    models::user::User,
    pagination::filter::FilterSet,
};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiQuery,
    response::ApiResponse,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Parses an optional date parameter; blank means absent
fn optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => parse_date(value)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest("request.error.invalidQuery".into())),
    }
}

pub async fn user_dashboard(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DashboardQuery>,
) -> ApiResult<ApiResponse<DashboardSummary>> {
    let start = optional_date(query.start_date.as_deref())?;
    let end = optional_date(query.end_date.as_deref())?;
    let range = start_and_end_date(start, end, Utc::now().date_naive());

    let total = User::count(&state.db, &FilterSet::new(), None).await?;
    let count = User::count_created_between(&state.db, range.start_date, range.end_date).await?;

    Ok(ApiResponse::ok(
        "user.dashboard",
        DashboardSummary::new(total, count, range),
    ))
}
