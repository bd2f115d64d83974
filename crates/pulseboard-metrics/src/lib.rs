//! Pure metric aggregation: raw per-day provider rows in, dashboard-ready
//! summaries out.
//!
//! Nothing in this crate performs I/O. The resolver and orchestrator feed
//! it rows from whichever tier produced them (normalized storage, cache
//! payloads, or a live fetch) and get back the same shapes either way.

pub mod aggregate;
pub mod bundle;
pub mod rows;
pub mod series;
pub mod snapshot;
pub mod weekly;

pub use aggregate::{pct_change, summarize, summarize_ga, summarize_gsc, summarize_li, summarize_yt};
pub use bundle::{
    GaMetrics, GaTotals, GscMetrics, GscTotals, LiMetrics, LiTotals, MetricBundle,
    PlatformMetrics, YtMetrics, YtTotals,
};
pub use rows::{GaChannelRow, GaDailyRow, GscDailyRow, LiDailyRow, PlatformRows, YtDailyRow};
pub use series::{channel_series, ChannelSeries, SeriesPoint};
pub use snapshot::{PageStat, QueryStat, SegmentShare, SnapshotBreakdowns, VideoStat};
pub use weekly::{weekly_buckets, WeeklyBucket};
