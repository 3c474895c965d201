use crate::store::StoreError;
use async_trait::async_trait;
use deadpool_sqlite::Pool;
use rusqlite::OptionalExtension;
use serde::Serialize;

/// Campaign record as served by the campaign-info collaborator. `cost_cents`
/// is absent until the advertiser books a spend figure; cost-derived metrics
/// stay unknown (not zero) in that case.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignInfo {
    pub id: String,
    pub advertiser_id: String,
    pub name: String,
    pub cost_cents: Option<i64>,
}

/// Campaign-info collaborator. Lookup only; campaign CRUD is owned upstream.
#[async_trait]
pub trait CampaignDirectory: Send + Sync {
    async fn campaign(&self, id: &str) -> Result<Option<CampaignInfo>, StoreError>;
}

pub struct SqliteCampaignDirectory {
    pool: Pool,
}

impl SqliteCampaignDirectory {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignDirectory for SqliteCampaignDirectory {
    async fn campaign(&self, id: &str) -> Result<Option<CampaignInfo>, StoreError> {
        let id = id.to_string();
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))?;
        conn.interact(move |conn| {
            conn.query_row(
                "SELECT id, advertiser_id, name, cost_cents FROM campaigns WHERE id = ?1",
                rusqlite::params![id],
                |row| {
                    Ok(CampaignInfo {
                        id: row.get(0)?,
                        advertiser_id: row.get(1)?,
                        name: row.get(2)?,
                        cost_cents: row.get(3)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(|e| StoreError::Pool(e.to_string()))?
        .map_err(StoreError::from)
    }
}
