use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Report, ReportKind, ScheduleConfig};

use super::schema::{LAST_RUN_KEY, SCHEDULE_CONFIG_KEY, SCHEMA};

pub fn report_key(kind: ReportKind, date_key: &str) -> String {
    format!("report:{}:{}", date_key, kind.as_str())
}

#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Report operations

    pub async fn put_report(&self, kind: ReportKind, date_key: &str, report: &Report) -> Result<()> {
        self.put_json(report_key(kind, date_key), report).await
    }

    pub async fn get_report(&self, kind: ReportKind, date_key: &str) -> Result<Option<Report>> {
        self.get_json(report_key(kind, date_key)).await
    }

    // Run ledger

    pub async fn last_run_key(&self) -> Result<Option<String>> {
        self.get_raw(LAST_RUN_KEY.to_string()).await
    }

    pub async fn set_last_run_key(&self, run_key: &str) -> Result<()> {
        self.put_raw(LAST_RUN_KEY.to_string(), run_key.to_string())
            .await
    }

    // Schedule config

    pub async fn load_schedule_config(&self) -> Result<Option<ScheduleConfig>> {
        self.get_json(SCHEDULE_CONFIG_KEY.to_string()).await
    }

    pub async fn save_schedule_config(&self, config: &ScheduleConfig) -> Result<()> {
        self.put_json(SCHEDULE_CONFIG_KEY.to_string(), config).await
    }

    // Raw key/value access

    async fn put_json<T: Serialize>(&self, key: String, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.put_raw(key, json).await
    }

    // Reads and deserializes `key`. Unparseable entries are removed and
    // reported as absent.
    async fn get_json<T: DeserializeOwned>(&self, key: String) -> Result<Option<T>> {
        let Some(raw) = self.get_raw(key.clone()).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!("Discarding corrupt entry {}: {}", key, e);
                self.delete(key).await?;
                Ok(None)
            }
        }
    }

    pub async fn put_raw(&self, key: String, value: String) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO kv_store (key, value) VALUES (?1, ?2)
                       ON CONFLICT(key) DO UPDATE SET
                           value = excluded.value,
                           updated_at = datetime('now')"#,
                    params![key, value],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_raw(&self, key: String) -> Result<Option<String>> {
        let value = self
            .conn
            .call(move |conn| {
                let value = conn
                    .query_row(
                        "SELECT value FROM kv_store WHERE key = ?1",
                        params![key],
                        |row| row.get::<_, String>(0),
                    )
                    .optional()?;
                Ok(value)
            })
            .await?;
        Ok(value)
    }

    pub async fn delete(&self, key: String) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}
