use thiserror::Error;

use pulseboard_core::DateRange;

/// Failure of an underlying store operation.
///
/// The engine talks to storage through trait seams; implementations wrap
/// their native errors in this opaque type so the engine stays decoupled
/// from any particular backend.
#[derive(Debug, Error)]
#[error("store operation failed: {0}")]
pub struct StoreError(#[from] anyhow::Error);

impl StoreError {
    pub fn new(source: impl Into<anyhow::Error>) -> Self {
        Self(source.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced to a caller of the resolve APIs.
///
/// `NoData` and `NotConnected` are deliberate, user-meaningful conditions:
/// a dashboard distinguishes "never connected" from "temporarily down".
/// Transient provider trouble never reaches here; it degrades to the
/// next cache tier instead.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("company {0} has no provider integrations configured")]
    NotConnected(i64),

    #[error("user {0} has no companies")]
    NoCompanies(i64),

    #[error("no data available for company {company_id} over {range}")]
    NoData { company_id: i64, range: DateRange },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors surfaced by the sync orchestrator's run entry point.
///
/// Individual company failures are captured in the run report, never
/// here; this covers only failures to enumerate or record the run itself.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
}
