use crate::config::DatabaseConfig;
use crate::store::{
    BucketCount, DistinctField, EventFilter, EventKind, EventStore, Granularity, StoreError,
};
use async_trait::async_trait;
use deadpool_sqlite::{Config, Pool, Runtime};
use rusqlite::types::ToSql;
use rusqlite::Connection;

/// Apply performance PRAGMAs to a SQLite connection.
pub fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA cache_size = -65536;
        PRAGMA busy_timeout = 5000;
        PRAGMA temp_store = MEMORY;
        ",
    )
}

/// Create a deadpool-sqlite connection pool.
pub fn create_pool(config: &DatabaseConfig) -> Result<Pool, deadpool_sqlite::CreatePoolError> {
    let mut cfg = Config::new(config.path.clone());
    cfg.pool = Some(deadpool_sqlite::PoolConfig::new(config.pool_size));
    cfg.create_pool(Runtime::Tokio1)
}

/// Initialize the pool: apply pragmas and run migrations.
pub async fn init_pool(pool: &Pool) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get().await?;
    conn.interact(|conn| {
        apply_pragmas(conn)?;
        crate::store::migrations::run_migrations(conn)?;
        Ok::<_, rusqlite::Error>(())
    })
    .await??;
    Ok(())
}

/// SQLite-backed event store. All operations are plain SELECTs; the event
/// tables are written by the upstream ingestion process, not by this crate.
pub struct SqliteEventStore {
    pool: Pool,
}

impl SqliteEventStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn query_scalar(
        &self,
        sql: String,
        params: Vec<Box<dyn ToSql + Send>>,
    ) -> Result<i64, StoreError> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))?;
        conn.interact(move |conn| {
            let refs: Vec<&dyn ToSql> =
                params.iter().map(|b| b.as_ref() as &dyn ToSql).collect();
            conn.query_row(&sql, refs.as_slice(), |row| row.get(0))
        })
        .await
        .map_err(|e| StoreError::Pool(e.to_string()))?
        .map_err(StoreError::from)
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn count(&self, kind: EventKind, filter: &EventFilter) -> Result<i64, StoreError> {
        let (where_sql, params) = build_where(kind, filter);
        let sql = format!("SELECT COUNT(*) FROM {} e WHERE {}", kind.table(), where_sql);
        self.query_scalar(sql, params).await
    }

    async fn count_distinct(
        &self,
        kind: EventKind,
        field: DistinctField,
        filter: &EventFilter,
    ) -> Result<i64, StoreError> {
        let (where_sql, params) = build_where(kind, filter);
        let sql = format!(
            "SELECT COUNT(DISTINCT e.{}) FROM {} e WHERE {}",
            field.column(),
            kind.table(),
            where_sql
        );
        self.query_scalar(sql, params).await
    }

    async fn group_by_bucket(
        &self,
        kind: EventKind,
        filter: &EventFilter,
        granularity: Granularity,
    ) -> Result<Vec<BucketCount>, StoreError> {
        let fmt = match granularity {
            Granularity::Day => "%Y-%m-%d",
            Granularity::Hour => "%Y-%m-%dT%H:00",
        };
        let (where_sql, params) = build_where(kind, filter);
        let sql = format!(
            "SELECT strftime('{}', e.timestamp / 1000, 'unixepoch') AS bucket, COUNT(*) AS cnt
             FROM {} e WHERE {}
             GROUP BY bucket ORDER BY bucket ASC",
            fmt,
            kind.table(),
            where_sql
        );

        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))?;
        conn.interact(move |conn| {
            let refs: Vec<&dyn ToSql> =
                params.iter().map(|b| b.as_ref() as &dyn ToSql).collect();
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(refs.as_slice(), |row| {
                Ok(BucketCount {
                    bucket: row.get(0)?,
                    count: row.get(1)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| StoreError::Pool(e.to_string()))?
        .map_err(StoreError::from)
    }
}

/// Translate an `EventFilter` into a WHERE clause with positional params.
/// Session rows carry no campaign/advertiser columns, so campaign-scoped
/// session filters resolve through the impressions the session received;
/// segment filters on non-session events resolve through the owning session.
fn build_where(kind: EventKind, filter: &EventFilter) -> (String, Vec<Box<dyn ToSql + Send>>) {
    let mut conds: Vec<String> = vec![
        "e.timestamp >= ?".to_string(),
        "e.timestamp < ?".to_string(),
    ];
    let mut params: Vec<Box<dyn ToSql + Send>> = vec![
        Box::new(filter.range.start_ms()),
        Box::new(filter.range.end_ms()),
    ];

    if let Some(ref campaign_id) = filter.campaign_id {
        if kind == EventKind::Session {
            conds.push(
                "EXISTS (SELECT 1 FROM impressions i
                    WHERE i.session_id = e.session_id
                      AND i.campaign_id = ?
                      AND i.timestamp >= ? AND i.timestamp < ?)"
                    .to_string(),
            );
            params.push(Box::new(campaign_id.clone()));
            params.push(Box::new(filter.range.start_ms()));
            params.push(Box::new(filter.range.end_ms()));
        } else {
            conds.push("e.campaign_id = ?".to_string());
            params.push(Box::new(campaign_id.clone()));
        }
    }

    if let Some(ref advertiser_id) = filter.advertiser_id {
        if kind == EventKind::Session {
            conds.push(
                "EXISTS (SELECT 1 FROM impressions i
                    WHERE i.session_id = e.session_id
                      AND i.advertiser_id = ?
                      AND i.timestamp >= ? AND i.timestamp < ?)"
                    .to_string(),
            );
            params.push(Box::new(advertiser_id.clone()));
            params.push(Box::new(filter.range.start_ms()));
            params.push(Box::new(filter.range.end_ms()));
        } else {
            conds.push("e.advertiser_id = ?".to_string());
            params.push(Box::new(advertiser_id.clone()));
        }
    }

    if let Some(segment) = filter.segment {
        if kind == EventKind::Session {
            conds.push("e.segment = ?".to_string());
        } else {
            conds.push(
                "EXISTS (SELECT 1 FROM sessions s
                    WHERE s.session_id = e.session_id AND s.segment = ?)"
                    .to_string(),
            );
        }
        params.push(Box::new(segment.as_str()));
    }

    if let Some(status) = filter.status {
        if kind == EventKind::Conversion {
            conds.push("e.status = ?".to_string());
            params.push(Box::new(status.as_str()));
        }
    }

    (conds.join(" AND "), params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConversionStatus, DateRange, Segment};
    use chrono::{NaiveDate, TimeZone, Utc};

    async fn test_pool() -> Pool {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let db_path = tmp.path().to_path_buf();
        std::mem::forget(tmp);

        let pool = Config::new(db_path)
            .create_pool(Runtime::Tokio1)
            .unwrap();
        init_pool(&pool).await.unwrap();
        pool
    }

    fn ts(h: u32, m: u32) -> i64 {
        Utc.with_ymd_and_hms(2025, 6, 1, h, m, 0)
            .unwrap()
            .timestamp_millis()
    }

    async fn seed(pool: &Pool) {
        let conn = pool.get().await.unwrap();
        conn.interact(|conn| {
            conn.execute_batch(&format!(
                "INSERT INTO sessions (session_id, restaurant_id, segment, timestamp) VALUES
                    ('s1', 'r1', 'quick_service', {t0}),
                    ('s2', 'r1', 'casual_dining', {t1}),
                    ('s3', 'r2', 'quick_service', {t2});
                 INSERT INTO impressions (session_id, campaign_id, advertiser_id, placement, timestamp) VALUES
                    ('s1', 'camp-1', 'adv-1', 'banner', {t0}),
                    ('s1', 'camp-1', 'adv-1', 'banner', {t0}),
                    ('s2', 'camp-2', 'adv-1', 'feed', {t1});
                 INSERT INTO clicks (session_id, campaign_id, advertiser_id, timestamp) VALUES
                    ('s1', 'camp-1', 'adv-1', {t0});
                 INSERT INTO conversions (session_id, campaign_id, advertiser_id, conversion_type, value_cents, status, timestamp) VALUES
                    ('s1', 'camp-1', 'adv-1', 'reservation', 2500, 'confirmed', {t0}),
                    ('s2', 'camp-2', 'adv-1', 'reservation', 1800, 'pending', {t1});",
                t0 = ts(10, 0),
                t1 = ts(11, 30),
                t2 = ts(23, 15),
            ))
        })
        .await
        .unwrap()
        .unwrap();
    }

    fn june_first() -> DateRange {
        DateRange::from_dates(
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_count_with_filters() {
        let pool = test_pool().await;
        seed(&pool).await;
        let store = SqliteEventStore::new(pool);
        let base = EventFilter::new(june_first());

        assert_eq!(
            store.count(EventKind::Session, &base).await.unwrap(),
            3
        );
        assert_eq!(
            store.count(EventKind::Impression, &base).await.unwrap(),
            3
        );
        assert_eq!(
            store
                .count(
                    EventKind::Impression,
                    &base.clone().campaign(Some("camp-1"))
                )
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            store
                .count(
                    EventKind::Conversion,
                    &base.clone().status(ConversionStatus::Confirmed)
                )
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_segment_filter_joins_through_sessions() {
        let pool = test_pool().await;
        seed(&pool).await;
        let store = SqliteEventStore::new(pool);
        let base = EventFilter::new(june_first());

        // s1 is quick_service: 2 impressions, 1 click
        assert_eq!(
            store
                .count(
                    EventKind::Impression,
                    &base.clone().segment(Segment::QuickService)
                )
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            store
                .count(EventKind::Click, &base.clone().segment(Segment::CasualDining))
                .await
                .unwrap(),
            0
        );
        // s3 started a session but received nothing
        assert_eq!(
            store
                .count(
                    EventKind::Session,
                    &base.clone().segment(Segment::QuickService)
                )
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_advertiser_filter_reaches_sessions_through_impressions() {
        let pool = test_pool().await;
        seed(&pool).await;
        let store = SqliteEventStore::new(pool);
        let base = EventFilter::new(june_first());

        // s1 and s2 were reached by adv-1 impressions, s3 by nobody
        assert_eq!(
            store
                .count(EventKind::Session, &base.clone().advertiser(Some("adv-1")))
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            store
                .count(
                    EventKind::Impression,
                    &base.clone().advertiser(Some("adv-9"))
                )
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_count_distinct_sessions() {
        let pool = test_pool().await;
        seed(&pool).await;
        let store = SqliteEventStore::new(pool);
        let base = EventFilter::new(june_first());

        // reach: s1 and s2 received impressions, s3 did not
        assert_eq!(
            store
                .count_distinct(EventKind::Impression, DistinctField::SessionId, &base)
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_group_by_bucket_returns_only_nonempty_buckets() {
        let pool = test_pool().await;
        seed(&pool).await;
        let store = SqliteEventStore::new(pool);
        let base = EventFilter::new(june_first());

        let buckets = store
            .group_by_bucket(EventKind::Impression, &base, Granularity::Hour)
            .await
            .unwrap();
        assert_eq!(
            buckets,
            vec![
                BucketCount {
                    bucket: "2025-06-01T10:00".to_string(),
                    count: 2
                },
                BucketCount {
                    bucket: "2025-06-01T11:00".to_string(),
                    count: 1
                },
            ]
        );

        let daily = store
            .group_by_bucket(EventKind::Session, &base, Granularity::Day)
            .await
            .unwrap();
        assert_eq!(
            daily,
            vec![BucketCount {
                bucket: "2025-06-01".to_string(),
                count: 3
            }]
        );
    }
}
