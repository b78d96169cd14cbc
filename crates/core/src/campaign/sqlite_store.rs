//! SQLite-backed campaign store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection};
use serde::de::DeserializeOwned;

use super::{
    Campaign, CampaignFilter, CampaignStatus, CampaignStore, CampaignUpdate,
    CreateCampaignRequest, ItemStatuses, StoreError,
};

const SELECT_COLUMNS: &str = "id, status, items, item_statuses, generated_artifact_ids, automation_settings, user_id, workspace_id, version, created_at, updated_at";

/// SQLite-backed campaign store.
pub struct SqliteCampaignStore {
    conn: Mutex<Connection>,
}

impl SqliteCampaignStore {
    /// Create a new SQLite campaign store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite campaign store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS campaigns (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                items TEXT NOT NULL,
                item_statuses TEXT NOT NULL DEFAULT '{}',
                generated_artifact_ids TEXT NOT NULL DEFAULT '[]',
                automation_settings TEXT NOT NULL DEFAULT '{}',
                user_id TEXT NOT NULL,
                workspace_id TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_campaigns_status ON campaigns(status);
            CREATE INDEX IF NOT EXISTS idx_campaigns_created_at ON campaigns(created_at);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }

    /// Insert a new campaign in `draft` status.
    pub fn create(&self, request: CreateCampaignRequest) -> Result<Campaign, StoreError> {
        let now = Utc::now();
        let campaign = Campaign {
            id: uuid::Uuid::new_v4().to_string(),
            status: CampaignStatus::Draft,
            items: request.items,
            item_statuses: ItemStatuses::new(),
            generated_artifact_ids: Vec::new(),
            automation_settings: request.automation_settings,
            user_id: request.user_id,
            workspace_id: request.workspace_id,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        self.insert(&campaign)?;
        Ok(campaign)
    }

    /// Insert a fully-formed campaign record, e.g. one imported from elsewhere.
    pub fn insert(&self, campaign: &Campaign) -> Result<(), StoreError> {
        let conn = self.lock()?;

        conn.execute(
            &format!(
                "INSERT INTO campaigns ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                SELECT_COLUMNS
            ),
            params![
                campaign.id,
                campaign.status.as_str(),
                to_json(&campaign.items)?,
                to_json(&campaign.item_statuses)?,
                to_json(&campaign.generated_artifact_ids)?,
                to_json(&campaign.automation_settings)?,
                campaign.user_id,
                campaign.workspace_id,
                campaign.version as i64,
                campaign.created_at.to_rfc3339(),
                campaign.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    /// Permanently delete a campaign (external CRUD path).
    pub fn delete(&self, id: &str) -> Result<Campaign, StoreError> {
        let conn = self.lock()?;
        let campaign = Self::fetch(&conn, id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        conn.execute("DELETE FROM campaigns WHERE id = ?", params![id])
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(campaign)
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<Campaign>, StoreError> {
        let result = conn.query_row(
            &format!("SELECT {} FROM campaigns WHERE id = ?", SELECT_COLUMNS),
            params![id],
            Self::row_to_campaign,
        );

        match result {
            Ok(campaign) => Ok(Some(campaign)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }

    fn row_to_campaign(row: &rusqlite::Row) -> rusqlite::Result<Campaign> {
        let status_str: String = row.get(1)?;
        let status = CampaignStatus::parse(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                Type::Text,
                format!("unknown campaign status: {}", status_str).into(),
            )
        })?;

        Ok(Campaign {
            id: row.get(0)?,
            status,
            items: parse_column(row, 2)?,
            item_statuses: parse_column(row, 3)?,
            generated_artifact_ids: parse_column(row, 4)?,
            automation_settings: parse_column(row, 5)?,
            user_id: row.get(6)?,
            workspace_id: row.get(7)?,
            version: row.get::<_, i64>(8)? as u64,
            created_at: parse_timestamp(row, 9)?,
            updated_at: parse_timestamp(row, 10)?,
        })
    }
}

impl CampaignStore for SqliteCampaignStore {
    fn get(&self, id: &str) -> Result<Option<Campaign>, StoreError> {
        let conn = self.lock()?;
        Self::fetch(&conn, id)
    }

    fn update(&self, id: &str, update: CampaignUpdate) -> Result<Campaign, StoreError> {
        let conn = self.lock()?;

        let mut campaign =
            Self::fetch(&conn, id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let Some(expected) = update.expected_version {
            if expected != campaign.version {
                return Err(StoreError::VersionConflict {
                    campaign_id: id.to_string(),
                    expected,
                    actual: campaign.version,
                });
            }
        }

        if let Some(status) = update.status {
            campaign.status = status;
        }
        if let Some(item_statuses) = update.item_statuses {
            campaign.item_statuses = item_statuses;
        }
        if let Some(ids) = update.generated_artifact_ids {
            campaign.generated_artifact_ids = ids;
        }
        campaign.version += 1;
        campaign.updated_at = Utc::now();

        // The version predicate keeps the write atomic even if another
        // connection shares the database file.
        let changed = conn
            .execute(
                "UPDATE campaigns SET status = ?, item_statuses = ?, generated_artifact_ids = ?, version = ?, updated_at = ? WHERE id = ? AND version = ?",
                params![
                    campaign.status.as_str(),
                    to_json(&campaign.item_statuses)?,
                    to_json(&campaign.generated_artifact_ids)?,
                    campaign.version as i64,
                    campaign.updated_at.to_rfc3339(),
                    id,
                    (campaign.version - 1) as i64,
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if changed == 0 {
            let actual = Self::fetch(&conn, id)?
                .map(|c| c.version)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            return Err(StoreError::VersionConflict {
                campaign_id: id.to_string(),
                expected: campaign.version - 1,
                actual,
            });
        }

        Ok(campaign)
    }

    fn list(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>, StoreError> {
        let conn = self.lock()?;

        let (where_clause, status_param) = match filter.status {
            Some(status) => ("WHERE status = ?1", Some(status.as_str())),
            None => ("", None),
        };

        let sql = format!(
            "SELECT {} FROM campaigns {} ORDER BY created_at ASC LIMIT ?{} OFFSET ?{}",
            SELECT_COLUMNS,
            where_clause,
            if status_param.is_some() { 2 } else { 1 },
            if status_param.is_some() { 3 } else { 2 },
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = match status_param {
            Some(status) => stmt.query_map(
                params![status, filter.limit, filter.offset],
                Self::row_to_campaign,
            ),
            None => stmt.query_map(params![filter.limit, filter.offset], Self::row_to_campaign),
        }
        .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Database(e.to_string()))
}

fn parse_column<T: DeserializeOwned>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
