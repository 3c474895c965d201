pub mod migrations;
pub mod sqlite;

use crate::types::{ConversionStatus, DateRange, Segment};
use async_trait::async_trait;
use serde::Serialize;

/// The four funnel event classes, each backed by its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Session,
    Impression,
    Click,
    Conversion,
}

impl EventKind {
    pub fn table(&self) -> &'static str {
        match self {
            EventKind::Session => "sessions",
            EventKind::Impression => "impressions",
            EventKind::Click => "clicks",
            EventKind::Conversion => "conversions",
        }
    }
}

/// Fields a distinct count can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistinctField {
    SessionId,
}

impl DistinctField {
    pub fn column(&self) -> &'static str {
        match self {
            DistinctField::SessionId => "session_id",
        }
    }
}

/// Bucket width for grouped counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Hour,
    Day,
}

/// Read filter applied to event counts. `range` is always required; the
/// optional fields narrow the result. Segment filtering on non-session
/// events resolves through the owning session.
#[derive(Debug, Clone)]
pub struct EventFilter {
    pub range: DateRange,
    pub campaign_id: Option<String>,
    pub advertiser_id: Option<String>,
    pub segment: Option<Segment>,
    pub status: Option<ConversionStatus>,
}

impl EventFilter {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            campaign_id: None,
            advertiser_id: None,
            segment: None,
            status: None,
        }
    }

    pub fn campaign(mut self, campaign_id: Option<&str>) -> Self {
        self.campaign_id = campaign_id.map(str::to_string);
        self
    }

    pub fn advertiser(mut self, advertiser_id: Option<&str>) -> Self {
        self.advertiser_id = advertiser_id.map(str::to_string);
        self
    }

    pub fn segment(mut self, segment: Segment) -> Self {
        self.segment = Some(segment);
        self
    }

    pub fn status(mut self, status: ConversionStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// One non-empty bucket from a grouped count. Buckets with no matching
/// events are absent; gap filling belongs to the series builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketCount {
    pub bucket: String,
    pub count: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("pool error: {0}")]
    Pool(String),
}

/// Read-only event store collaborator. Implementations must be side-effect
/// free; the aggregation engine never writes through this interface.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn count(&self, kind: EventKind, filter: &EventFilter) -> Result<i64, StoreError>;

    async fn count_distinct(
        &self,
        kind: EventKind,
        field: DistinctField,
        filter: &EventFilter,
    ) -> Result<i64, StoreError>;

    async fn group_by_bucket(
        &self,
        kind: EventKind,
        filter: &EventFilter,
        granularity: Granularity,
    ) -> Result<Vec<BucketCount>, StoreError>;
}
