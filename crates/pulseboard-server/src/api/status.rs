//! Sync status read endpoint for operational dashboards.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use pulseboard_engine::{classify, DisplayStatus, SyncStatusRecord};

use crate::middleware::RequestId;

use super::{map_db_error, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct StatusQuery {
    /// Comma-separated company ids; omit for all companies.
    company_ids: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct StatusItem {
    #[serde(flatten)]
    record: SyncStatusRecord,
    /// Derived display classification; computed per request, never stored.
    display: DisplayStatus,
}

fn parse_ids(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .collect()
}

pub(super) async fn list_sync_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
    Extension(req_id): Extension<RequestId>,
) -> Response {
    let ids = query.company_ids.as_deref().map(parse_ids);

    let records = match pulseboard_db::status::list_status(&state.pool, ids.as_deref()).await {
        Ok(records) => records,
        Err(e) => return map_db_error(req_id.0, &e).into_response(),
    };

    let now = Utc::now();
    let items: Vec<StatusItem> = records
        .into_iter()
        .map(|record| StatusItem {
            display: classify(&record, now),
            record,
        })
        .collect();

    Json(ApiResponse {
        data: items,
        meta: ResponseMeta::new(req_id.0),
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ids_skips_malformed_entries() {
        assert_eq!(parse_ids("1, 2,x,4"), vec![1, 2, 4]);
        assert!(parse_ids("").is_empty());
    }

    #[test]
    fn status_item_flattens_record_fields() {
        use pulseboard_core::Platform;
        use pulseboard_engine::SyncState;

        let item = StatusItem {
            record: SyncStatusRecord {
                company_id: 3,
                platform: Platform::Li,
                state: SyncState::Success,
                last_sync_at: Some(Utc::now()),
                last_success_at: Some(Utc::now()),
                last_error: None,
                last_error_at: None,
                consecutive_failures: 0,
                data_start_date: None,
                data_end_date: None,
            },
            display: DisplayStatus::Ok,
        };
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["company_id"], 3);
        assert_eq!(json["platform"], "li");
        assert_eq!(json["display"], "ok");
    }
}
