//! Company metrics and user portfolio read endpoints.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;

use pulseboard_core::DateRange;
use pulseboard_engine::ResolveError;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct RangeQuery {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

/// Resolve the requested range: both bounds, or neither (trailing
/// default window ending yesterday).
fn parse_range(
    query: &RangeQuery,
    default_days: u32,
    request_id: &str,
) -> Result<DateRange, ApiError> {
    match (query.start, query.end) {
        (Some(start), Some(end)) => DateRange::new(start, end).map_err(|e| {
            ApiError::new(request_id.to_string(), "validation_error", e.to_string())
        }),
        (None, None) => {
            let yesterday = Utc::now().date_naive() - Duration::days(1);
            Ok(DateRange::trailing_days(yesterday, default_days))
        }
        _ => Err(ApiError::new(
            request_id.to_string(),
            "validation_error",
            "start and end must be provided together",
        )),
    }
}

fn map_resolve_error(request_id: String, error: &ResolveError) -> ApiError {
    match error {
        ResolveError::NotConnected(_) => ApiError::new(
            request_id,
            "not_connected",
            "company has no provider integrations configured",
        ),
        ResolveError::NoCompanies(_) => {
            ApiError::new(request_id, "not_connected", "user has no companies")
        }
        ResolveError::NoData { .. } => ApiError::new(
            request_id,
            "no_data",
            "no data available for the requested range",
        ),
        ResolveError::Store(e) => {
            tracing::error!(error = %e, "resolution failed on storage");
            ApiError::new(request_id, "internal_error", "resolution failed")
        }
    }
}

pub(super) async fn get_company_metrics(
    State(state): State<AppState>,
    Path(company_id): Path<i64>,
    Query(query): Query<RangeQuery>,
    Extension(req_id): Extension<RequestId>,
) -> Response {
    let range = match parse_range(&query, state.default_range_days, &req_id.0) {
        Ok(range) => range,
        Err(e) => return e.into_response(),
    };

    match state.resolver.resolve(company_id, range).await {
        Ok(bundle) => Json(ApiResponse {
            data: bundle,
            meta: ResponseMeta::new(req_id.0),
        })
        .into_response(),
        Err(e) => map_resolve_error(req_id.0, &e).into_response(),
    }
}

pub(super) async fn get_user_portfolio(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<RangeQuery>,
    Extension(req_id): Extension<RequestId>,
) -> Response {
    let range = match parse_range(&query, state.default_range_days, &req_id.0) {
        Ok(range) => range,
        Err(e) => return e.into_response(),
    };

    match state.resolver.resolve_portfolio(user_id, range).await {
        Ok(portfolio) => Json(ApiResponse {
            data: portfolio,
            meta: ResponseMeta::new(req_id.0),
        })
        .into_response(),
        Err(e) => map_resolve_error(req_id.0, &e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_range_requires_both_bounds_together() {
        let query = RangeQuery {
            start: Some(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()),
            end: None,
        };
        let err = parse_range(&query, 30, "req-1").expect_err("half-open range");
        assert_eq!(err.error.code, "validation_error");
    }

    #[test]
    fn parse_range_defaults_to_trailing_window() {
        let query = RangeQuery {
            start: None,
            end: None,
        };
        let range = parse_range(&query, 30, "req-1").expect("default range");
        assert_eq!(range.days(), 30);
        assert_eq!(range.end, Utc::now().date_naive() - Duration::days(1));
    }

    #[test]
    fn parse_range_rejects_inverted_bounds() {
        let query = RangeQuery {
            start: Some(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()),
            end: Some(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()),
        };
        let err = parse_range(&query, 30, "req-1").expect_err("inverted range");
        assert_eq!(err.error.code, "validation_error");
    }
}
