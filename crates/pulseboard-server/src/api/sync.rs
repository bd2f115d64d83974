//! Sync trigger and run history endpoints.
//!
//! The trigger is the entry point an external cron caller hits; it
//! authenticates with the shared sync secret, never with bearer keys,
//! and returns 202 immediately while the run proceeds in the background.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use pulseboard_engine::SyncScope;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize, Default)]
pub(super) struct TriggerBody {
    /// Scope the run to these companies, e.g. after a mapping change.
    company_ids: Option<Vec<i64>>,
}

#[derive(Debug, Serialize)]
struct TriggerAccepted {
    status: &'static str,
    companies: Option<usize>,
}

/// Validate the `x-sync-secret` header in constant time.
fn secret_matches(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get("x-sync-secret")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|provided| provided.as_bytes().ct_eq(expected.as_bytes()).into())
}

pub(super) async fn trigger_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match state.sync_secret.as_deref() {
        Some(secret) => {
            if !secret_matches(&headers, secret) {
                return ApiError::new(req_id.0, "unauthorized", "missing or invalid sync secret")
                    .into_response();
            }
        }
        None => {
            // Config guarantees a secret outside development.
            tracing::warn!("sync trigger accepted without secret (development)");
        }
    }

    // The external cron caller usually sends no body at all.
    let body: TriggerBody = if body.is_empty() {
        TriggerBody::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                return ApiError::new(
                    req_id.0,
                    "bad_request",
                    format!("invalid JSON body: {e}"),
                )
                .into_response()
            }
        }
    };
    let company_count = body.company_ids.as_ref().map(Vec::len);
    let scope = match body.company_ids {
        Some(ids) if !ids.is_empty() => SyncScope::Companies(ids),
        _ => SyncScope::All,
    };

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        if let Err(e) = orchestrator.run(scope, "cron").await {
            tracing::error!(error = %e, "triggered sync run failed to start");
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: TriggerAccepted {
                status: "accepted",
                companies: company_count,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub(super) struct RunsQuery {
    limit: Option<i64>,
}

pub(super) async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<RunsQuery>,
    Extension(req_id): Extension<RequestId>,
) -> Response {
    match pulseboard_db::list_sync_runs(&state.pool, normalize_limit(query.limit)).await {
        Ok(rows) => Json(ApiResponse {
            data: rows,
            meta: ResponseMeta::new(req_id.0),
        })
        .into_response(),
        Err(e) => map_db_error(req_id.0, &e).into_response(),
    }
}

pub(super) async fn list_run_companies(
    State(state): State<AppState>,
    Path(run_id): Path<i64>,
    Extension(req_id): Extension<RequestId>,
) -> Response {
    match pulseboard_db::list_sync_run_companies(&state.pool, run_id).await {
        Ok(rows) => Json(ApiResponse {
            data: rows,
            meta: ResponseMeta::new(req_id.0),
        })
        .into_response(),
        Err(e) => map_db_error(req_id.0, &e).into_response(),
    }
}
