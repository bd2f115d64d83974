//! Per-(company, platform) sync health: the state machine record and its
//! derived display classification.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use pulseboard_core::Platform;

/// Machine state of the last sync attempt.
///
/// Transitions: `idle → syncing → {success, error}`, and both terminal
/// states return to `syncing` on the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Idle,
    Syncing,
    Success,
    Error,
}

impl SyncState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::Syncing => "syncing",
            SyncState::Success => "success",
            SyncState::Error => "error",
        }
    }
}

impl std::str::FromStr for SyncState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(SyncState::Idle),
            "syncing" => Ok(SyncState::Syncing),
            "success" => Ok(SyncState::Success),
            "error" => Ok(SyncState::Error),
            other => Err(format!("unknown sync state: {other}")),
        }
    }
}

/// One (company, platform) health record.
///
/// Created lazily on the first sync attempt and mutated in place by the
/// orchestrator after every attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStatusRecord {
    pub company_id: i64,
    pub platform: Platform,
    pub state: SyncState,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub consecutive_failures: i32,
    pub data_start_date: Option<NaiveDate>,
    pub data_end_date: Option<NaiveDate>,
}

/// How a status record reads on an operational dashboard.
///
/// Purely derived; computing it never mutates the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayStatus {
    Syncing,
    Error,
    Ok,
    Stale,
    NeverSynced,
}

/// Window within which a past success still reads as `ok`.
const OK_WINDOW_HOURS: i64 = 48;

/// Classify a record for display.
///
/// An in-progress sync wins, then an errored last attempt, then the age
/// of the last success: within 48 hours is `ok`, older is `stale`, never
/// is `never-synced`.
#[must_use]
pub fn classify(record: &SyncStatusRecord, now: DateTime<Utc>) -> DisplayStatus {
    match record.state {
        SyncState::Syncing => DisplayStatus::Syncing,
        SyncState::Error => DisplayStatus::Error,
        SyncState::Idle | SyncState::Success => match record.last_success_at {
            None => DisplayStatus::NeverSynced,
            Some(at) if now - at <= Duration::hours(OK_WINDOW_HOURS) => DisplayStatus::Ok,
            Some(_) => DisplayStatus::Stale,
        },
    }
}
