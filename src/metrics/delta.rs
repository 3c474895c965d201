use crate::metrics::funnel::round2;

/// Percentage change from `previous` to `current`, rounded to 2 decimals.
///
/// Zero-baseline rule (a business rule, preserved exactly): when the
/// previous period is 0, any activity counts as +100%, no activity as 0%.
pub fn pct_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        round2((current - previous) / previous * 100.0)
    }
}

/// Convenience for integer counts.
pub fn pct_change_counts(current: i64, previous: i64) -> f64 {
    pct_change(current as f64, previous as f64)
}
