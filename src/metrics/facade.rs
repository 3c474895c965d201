use crate::campaigns::CampaignDirectory;
use crate::error::{AppError, AppResult};
use crate::metrics::delta::{pct_change, pct_change_counts};
use crate::metrics::funnel::{self, rate_pct, round2, FunnelStages};
use crate::metrics::types::{
    ChangeSet, DashboardBundle, FunnelResult, OverviewSnapshot, SegmentMetric, SeriesRow,
};
use crate::metrics::{period, segments, series};
use crate::metrics::period::PeriodToken;
use crate::store::{
    DistinctField, EventFilter, EventKind, EventStore, Granularity,
};
use crate::types::{ConversionStatus, DateRange};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Orchestrates the aggregation engine: resolves periods, fans out the
/// independent store reads concurrently and assembles the payload shapes.
/// Collaborators arrive by constructor injection; there is no ambient state
/// and no caching here. Any failed sub-query fails the whole request —
/// partial or synthetic payloads are never produced.
pub struct MetricsFacade {
    store: Arc<dyn EventStore>,
    campaigns: Arc<dyn CampaignDirectory>,
}

/// Scalar counts backing an overview snapshot.
#[derive(Debug, Clone, Copy)]
struct SnapshotCounts {
    uv: i64,
    reach: i64,
    impressions: i64,
    clicks: i64,
    conversions: i64,
}

impl SnapshotCounts {
    fn ctr(&self) -> f64 {
        rate_pct(self.clicks, self.impressions)
    }

    fn cr(&self) -> f64 {
        rate_pct(self.conversions, self.clicks)
    }
}

impl MetricsFacade {
    pub fn new(store: Arc<dyn EventStore>, campaigns: Arc<dyn CampaignDirectory>) -> Self {
        Self { store, campaigns }
    }

    /// Point-in-time aggregate snapshot for a named period, with
    /// period-over-period deltas against the preceding comparable period.
    pub async fn overview(
        &self,
        token: PeriodToken,
        campaign_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<OverviewSnapshot> {
        let cost_cents = self.campaign_cost(campaign_id).await?;
        let range = period::resolve(token, now);
        let prev_range = period::resolve(token.previous(), now);

        let (current, previous) = tokio::try_join!(
            self.snapshot_counts(range, campaign_id),
            self.snapshot_counts(prev_range, campaign_id),
        )?;

        let ctr = current.ctr();
        let cr = current.cr();

        Ok(OverviewSnapshot {
            period: token,
            uv: current.uv,
            reach: current.reach,
            impressions: current.impressions,
            clicks: current.clicks,
            conversions: current.conversions,
            ctr,
            cr,
            cpuv: cost_per(cost_cents, current.uv),
            cpc: cost_per(cost_cents, current.clicks),
            cpl: cost_per(cost_cents, current.conversions),
            change: ChangeSet {
                uv_change: pct_change_counts(current.uv, previous.uv),
                impressions_change: pct_change_counts(current.impressions, previous.impressions),
                clicks_change: pct_change_counts(current.clicks, previous.clicks),
                conversions_change: pct_change_counts(current.conversions, previous.conversions),
                ctr_change: pct_change(ctr, previous.ctr()),
                cr_change: pct_change(cr, previous.cr()),
            },
        })
    }

    /// Funnel stage counts plus derived dropoffs/rates for an arbitrary range.
    pub async fn funnel(
        &self,
        range: DateRange,
        campaign_id: Option<&str>,
    ) -> AppResult<FunnelResult> {
        self.ensure_campaign(campaign_id).await?;
        let base = EventFilter::new(range).campaign(campaign_id);
        let confirmed = base.clone().status(ConversionStatus::Confirmed);

        let (sessions, impressions, clicks, conversions) = tokio::try_join!(
            self.store.count(EventKind::Session, &base),
            self.store.count(EventKind::Impression, &base),
            self.store.count(EventKind::Click, &base),
            self.store.count(EventKind::Conversion, &confirmed),
        )?;

        Ok(funnel::compute(FunnelStages {
            sessions,
            impressions,
            clicks,
            conversions,
        }))
    }

    /// Gap-filled daily series spanning the whole range, one row per day.
    pub async fn daily_series(
        &self,
        range: DateRange,
        campaign_id: Option<&str>,
    ) -> AppResult<Vec<SeriesRow>> {
        self.ensure_campaign(campaign_id).await?;
        self.bucketed_series(range, Granularity::Day, campaign_id)
            .await
    }

    /// Gap-filled hourly series over the trailing 24-hour window.
    pub async fn hourly_series(
        &self,
        now: DateTime<Utc>,
        campaign_id: Option<&str>,
    ) -> AppResult<Vec<SeriesRow>> {
        self.ensure_campaign(campaign_id).await?;
        self.bucketed_series(DateRange::trailing_day(now), Granularity::Hour, campaign_id)
            .await
    }

    /// Per-segment breakdown; always one row per fixed segment.
    pub async fn segment_breakdown(
        &self,
        range: DateRange,
        campaign_id: Option<&str>,
    ) -> AppResult<Vec<SegmentMetric>> {
        self.ensure_campaign(campaign_id).await?;
        Ok(segments::breakdown(self.store.as_ref(), range, campaign_id).await?)
    }

    /// Everything a dashboard needs for one period, assembled concurrently
    /// and all-or-nothing.
    pub async fn dashboard(
        &self,
        token: PeriodToken,
        campaign_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<DashboardBundle> {
        self.ensure_campaign(campaign_id).await?;
        let range = period::resolve(token, now);

        let (daily, hourly, funnel, segments) = tokio::try_join!(
            self.bucketed_series(range, Granularity::Day, campaign_id),
            self.bucketed_series(DateRange::trailing_day(now), Granularity::Hour, campaign_id),
            self.funnel(range, campaign_id),
            self.segment_breakdown(range, campaign_id),
        )?;

        Ok(DashboardBundle {
            period: token,
            start: range.start.date_naive().to_string(),
            end: range.end.date_naive().to_string(),
            daily,
            hourly,
            funnel,
            segments,
        })
    }

    async fn bucketed_series(
        &self,
        range: DateRange,
        granularity: Granularity,
        campaign_id: Option<&str>,
    ) -> AppResult<Vec<SeriesRow>> {
        let base = EventFilter::new(range).campaign(campaign_id);
        let confirmed = base.clone().status(ConversionStatus::Confirmed);

        let (impressions, clicks, conversions) = tokio::try_join!(
            self.store
                .group_by_bucket(EventKind::Impression, &base, granularity),
            self.store
                .group_by_bucket(EventKind::Click, &base, granularity),
            self.store
                .group_by_bucket(EventKind::Conversion, &confirmed, granularity),
        )?;

        Ok(series::build_series(
            &range,
            granularity,
            &impressions,
            &clicks,
            &conversions,
        ))
    }

    async fn snapshot_counts(
        &self,
        range: DateRange,
        campaign_id: Option<&str>,
    ) -> Result<SnapshotCounts, crate::store::StoreError> {
        let base = EventFilter::new(range).campaign(campaign_id);
        let confirmed = base.clone().status(ConversionStatus::Confirmed);

        let (uv, reach, impressions, clicks, conversions) = tokio::try_join!(
            self.store
                .count_distinct(EventKind::Session, DistinctField::SessionId, &base),
            self.store
                .count_distinct(EventKind::Impression, DistinctField::SessionId, &base),
            self.store.count(EventKind::Impression, &base),
            self.store.count(EventKind::Click, &base),
            self.store.count(EventKind::Conversion, &confirmed),
        )?;

        Ok(SnapshotCounts {
            uv,
            reach,
            impressions,
            clicks,
            conversions,
        })
    }

    /// Reject references to campaigns the directory does not know. Runs
    /// before any aggregation sub-query is issued.
    async fn ensure_campaign(&self, campaign_id: Option<&str>) -> AppResult<()> {
        self.campaign_cost(campaign_id).await.map(|_| ())
    }

    async fn campaign_cost(&self, campaign_id: Option<&str>) -> AppResult<Option<i64>> {
        match campaign_id {
            None => Ok(None),
            Some(id) => match self.campaigns.campaign(id).await? {
                None => Err(AppError::UnknownCampaign(id.to_string())),
                Some(info) => Ok(info.cost_cents),
            },
        }
    }
}

/// Cost-derived metric in currency units. `None` cost stays unknown; a cost
/// with a zero denominator falls back to 0 under the engine-wide policy of
/// never emitting NaN or infinity.
fn cost_per(cost_cents: Option<i64>, denominator: i64) -> Option<f64> {
    cost_cents.map(|cents| {
        if denominator > 0 {
            round2(cents as f64 / 100.0 / denominator as f64)
        } else {
            0.0
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_per() {
        assert_eq!(cost_per(None, 50), None);
        assert_eq!(cost_per(Some(10_000), 50), Some(2.0));
        assert_eq!(cost_per(Some(10_000), 3), Some(33.33));
        assert_eq!(cost_per(Some(10_000), 0), Some(0.0));
    }
}
