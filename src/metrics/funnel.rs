use crate::metrics::types::{FunnelDropoffs, FunnelRates, FunnelResult};

/// Round to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage of `whole` that `part` represents, rounded to 2 decimals.
/// A zero (or negative) denominator yields 0 — this policy applies to every
/// rate the engine produces, so no payload ever carries NaN or infinity.
pub fn rate_pct(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        0.0
    } else {
        round2(part as f64 / whole as f64 * 100.0)
    }
}

/// Stage counts in fixed funnel order. Conversions are expected to be
/// pre-filtered to confirmed status by the caller.
#[derive(Debug, Clone, Copy)]
pub struct FunnelStages {
    pub sessions: i64,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
}

/// Compute adjacent-stage dropoffs and rates. Dropoffs may be negative —
/// one session can receive several impressions, so a later stage count can
/// exceed the one before it.
pub fn compute(stages: FunnelStages) -> FunnelResult {
    FunnelResult {
        sessions: stages.sessions,
        impressions: stages.impressions,
        clicks: stages.clicks,
        conversions: stages.conversions,
        dropoffs: FunnelDropoffs {
            sessions_to_impressions: stages.sessions - stages.impressions,
            impressions_to_clicks: stages.impressions - stages.clicks,
            clicks_to_conversions: stages.clicks - stages.conversions,
        },
        rates: FunnelRates {
            impression_rate: rate_pct(stages.impressions, stages.sessions),
            click_through_rate: rate_pct(stages.clicks, stages.impressions),
            conversion_rate: rate_pct(stages.conversions, stages.clicks),
        },
    }
}
