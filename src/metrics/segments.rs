use crate::metrics::funnel::rate_pct;
use crate::metrics::types::SegmentMetric;
use crate::store::{DistinctField, EventFilter, EventKind, EventStore, StoreError};
use crate::types::{ConversionStatus, DateRange, Segment};
use futures::future::try_join_all;

/// Compute the per-segment metric rows for a range. Always one row per
/// segment in `Segment::ALL` order — a segment with no sessions in range
/// produces a zero-filled row, never an omission.
pub async fn breakdown(
    store: &dyn EventStore,
    range: DateRange,
    campaign_id: Option<&str>,
) -> Result<Vec<SegmentMetric>, StoreError> {
    try_join_all(
        Segment::ALL
            .iter()
            .map(|&segment| segment_row(store, range, campaign_id, segment)),
    )
    .await
}

async fn segment_row(
    store: &dyn EventStore,
    range: DateRange,
    campaign_id: Option<&str>,
    segment: Segment,
) -> Result<SegmentMetric, StoreError> {
    let base = EventFilter::new(range).campaign(campaign_id).segment(segment);
    let confirmed = base.clone().status(ConversionStatus::Confirmed);

    let (uv, impressions, clicks, conversions) = tokio::try_join!(
        store.count_distinct(EventKind::Session, DistinctField::SessionId, &base),
        store.count(EventKind::Impression, &base),
        store.count(EventKind::Click, &base),
        store.count(EventKind::Conversion, &confirmed),
    )?;

    Ok(SegmentMetric {
        segment,
        uv,
        impressions,
        clicks,
        conversions,
        ctr: rate_pct(clicks, impressions),
        cr: rate_pct(conversions, clicks),
    })
}
