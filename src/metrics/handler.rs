use crate::error::{AppError, AppResult};
use crate::metrics::cache::MetricsCache;
use crate::metrics::facade::MetricsFacade;
use crate::metrics::period::{self, PeriodToken};
use crate::types::DateRange;
use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared state for the metrics endpoints.
pub struct MetricsState {
    pub facade: MetricsFacade,
    pub cache: MetricsCache,
    pub pool: deadpool_sqlite::Pool,
    pub default_period: PeriodToken,
}

/// Common query parameters. Either a named `period` or an explicit
/// `from`/`to` date pair (inclusive); a bad token or inverted range is a
/// 400, never a silent fallback.
#[derive(Debug, Deserialize)]
pub struct MetricsQueryParams {
    pub period: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub campaign_id: Option<String>,
}

impl MetricsQueryParams {
    fn token(&self, default: PeriodToken) -> AppResult<PeriodToken> {
        match self.period.as_deref() {
            Some(s) => s.parse(),
            None => Ok(default),
        }
    }

    /// Endpoints that only understand named periods must refuse a custom
    /// range rather than ignore it.
    fn period_only(&self, default: PeriodToken) -> AppResult<PeriodToken> {
        if self.from.is_some() || self.to.is_some() {
            return Err(AppError::Validation(
                "this endpoint does not accept from/to; use period".to_string(),
            ));
        }
        self.token(default)
    }

    fn range(&self, default: PeriodToken, now: DateTime<Utc>) -> AppResult<DateRange> {
        match (self.from, self.to) {
            (Some(from), Some(to)) => DateRange::from_dates(from, to),
            (None, None) => Ok(period::resolve(self.token(default)?, now)),
            _ => Err(AppError::Validation(
                "from and to must be provided together".to_string(),
            )),
        }
    }
}

/// Macro to handle the cache hit/miss pattern.
macro_rules! cached_or_compute {
    ($state:expr, $endpoint:expr, $params:expr, $compute:expr) => {{
        let from = $params.from.map(|d| d.to_string());
        let to = $params.to.map(|d| d.to_string());
        let key = MetricsCache::cache_key(
            $endpoint,
            $params.period.as_deref(),
            $params.campaign_id.as_deref(),
            from.as_deref(),
            to.as_deref(),
        );
        if let Some(cached) = $state.cache.get(&key) {
            let val: serde_json::Value = serde_json::from_str(&cached)
                .map_err(|e| AppError::Internal(format!("cache deserialize: {e}")))?;
            return Ok(Json(val));
        }
        let result = $compute;
        let json_str = serde_json::to_string(&result)
            .map_err(|e| AppError::Internal(format!("serialize: {e}")))?;
        $state.cache.insert(key, json_str);
        Ok(Json(serde_json::to_value(&result).map_err(|e| {
            AppError::Internal(format!("serialize: {e}"))
        })?))
    }};
}

/// GET /v1/metrics/overview
pub async fn overview(
    State(state): State<Arc<MetricsState>>,
    Query(qp): Query<MetricsQueryParams>,
) -> AppResult<Json<serde_json::Value>> {
    let token = qp.period_only(state.default_period)?;
    cached_or_compute!(state, "overview", qp, {
        state
            .facade
            .overview(token, qp.campaign_id.as_deref(), Utc::now())
            .await?
    })
}

/// GET /v1/metrics/funnel
pub async fn funnel(
    State(state): State<Arc<MetricsState>>,
    Query(qp): Query<MetricsQueryParams>,
) -> AppResult<Json<serde_json::Value>> {
    let now = Utc::now();
    let range = qp.range(state.default_period, now)?;
    cached_or_compute!(state, "funnel", qp, {
        state
            .facade
            .funnel(range, qp.campaign_id.as_deref())
            .await?
    })
}

/// GET /v1/metrics/daily
pub async fn daily_series(
    State(state): State<Arc<MetricsState>>,
    Query(qp): Query<MetricsQueryParams>,
) -> AppResult<Json<serde_json::Value>> {
    let now = Utc::now();
    let range = qp.range(state.default_period, now)?;
    cached_or_compute!(state, "daily", qp, {
        state
            .facade
            .daily_series(range, qp.campaign_id.as_deref())
            .await?
    })
}

/// GET /v1/metrics/hourly
pub async fn hourly_series(
    State(state): State<Arc<MetricsState>>,
    Query(qp): Query<MetricsQueryParams>,
) -> AppResult<Json<serde_json::Value>> {
    qp.period_only(state.default_period)?;
    cached_or_compute!(state, "hourly", qp, {
        state
            .facade
            .hourly_series(Utc::now(), qp.campaign_id.as_deref())
            .await?
    })
}

/// GET /v1/metrics/segments
pub async fn segment_breakdown(
    State(state): State<Arc<MetricsState>>,
    Query(qp): Query<MetricsQueryParams>,
) -> AppResult<Json<serde_json::Value>> {
    let now = Utc::now();
    let range = qp.range(state.default_period, now)?;
    cached_or_compute!(state, "segments", qp, {
        state
            .facade
            .segment_breakdown(range, qp.campaign_id.as_deref())
            .await?
    })
}

/// GET /v1/metrics/dashboard
pub async fn dashboard(
    State(state): State<Arc<MetricsState>>,
    Query(qp): Query<MetricsQueryParams>,
) -> AppResult<Json<serde_json::Value>> {
    let token = qp.period_only(state.default_period)?;
    cached_or_compute!(state, "dashboard", qp, {
        state
            .facade
            .dashboard(token, qp.campaign_id.as_deref(), Utc::now())
            .await?
    })
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub db_ok: bool,
}

/// GET /health
pub async fn health(State(state): State<Arc<MetricsState>>) -> Json<HealthResponse> {
    let db_ok = match state.pool.get().await {
        Ok(conn) => conn
            .interact(|conn| conn.execute_batch("SELECT 1"))
            .await
            .is_ok(),
        Err(_) => false,
    };

    Json(HealthResponse {
        status: if db_ok {
            "ok".into()
        } else {
            "degraded".into()
        },
        db_ok,
    })
}
