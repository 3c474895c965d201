use crate::metrics::period::PeriodToken;
use crate::types::Segment;
use serde::Serialize;

/// One gap-filled bucket of a time series. `bucket` is the calendar key
/// (`2025-06-01` daily, `2025-06-01T14:00` hourly).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesRow {
    pub bucket: String,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub ctr: f64,
    pub cr: f64,
}

impl SeriesRow {
    pub fn zeroed(bucket: String) -> Self {
        Self {
            bucket,
            impressions: 0,
            clicks: 0,
            conversions: 0,
            ctr: 0.0,
            cr: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelDropoffs {
    pub sessions_to_impressions: i64,
    pub impressions_to_clicks: i64,
    pub clicks_to_conversions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelRates {
    pub impression_rate: f64,
    pub click_through_rate: f64,
    pub conversion_rate: f64,
}

/// Funnel payload: stage counts in fixed order plus derived dropoffs/rates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelResult {
    pub sessions: i64,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub dropoffs: FunnelDropoffs,
    pub rates: FunnelRates,
}

/// Per-segment metrics row. The breakdown always emits one row per segment
/// in `Segment::ALL` order, zero-filled when the segment saw no traffic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentMetric {
    pub segment: Segment,
    pub uv: i64,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub ctr: f64,
    pub cr: f64,
}

/// Period-over-period deltas for the overview snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeSet {
    pub uv_change: f64,
    pub impressions_change: f64,
    pub clicks_change: f64,
    pub conversions_change: f64,
    pub ctr_change: f64,
    pub cr_change: f64,
}

/// Point-in-time aggregate snapshot for a period. The cost-derived fields
/// are `null` (unknown) when the campaign carries no cost figure — never a
/// synthetic zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewSnapshot {
    pub period: PeriodToken,
    pub uv: i64,
    pub reach: i64,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub ctr: f64,
    pub cr: f64,
    pub cpuv: Option<f64>,
    pub cpc: Option<f64>,
    pub cpl: Option<f64>,
    pub change: ChangeSet,
}

/// Time-series dashboard bundle: everything a dashboard render needs for
/// one period, assembled all-or-nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardBundle {
    pub period: PeriodToken,
    pub start: String,
    pub end: String,
    pub daily: Vec<SeriesRow>,
    pub hourly: Vec<SeriesRow>,
    pub funnel: FunnelResult,
    pub segments: Vec<SegmentMetric>,
}
