use moka::sync::Cache;
use std::time::Duration;

/// Transport-layer response cache keyed on endpoint + filter. The engine
/// itself never caches; this sits in front of it so dashboard refreshes do
/// not re-run identical fan-outs. Stores serialized JSON with a TTL.
pub struct MetricsCache {
    inner: Cache<String, String>,
}

impl MetricsCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            inner: Cache::builder()
                .time_to_live(Duration::from_secs(ttl_secs))
                .max_capacity(256)
                .build(),
        }
    }

    pub fn cache_key(
        endpoint: &str,
        period: Option<&str>,
        campaign_id: Option<&str>,
        from: Option<&str>,
        to: Option<&str>,
    ) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            endpoint,
            period.unwrap_or("-"),
            campaign_id.unwrap_or("all"),
            from.unwrap_or("-"),
            to.unwrap_or("-"),
        )
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    pub fn insert(&self, key: String, value: String) {
        self.inner.insert(key, value);
    }
}
