pub const SCHEMA: &str = r#"
-- key/value entries: reports, last automatic run key, schedule config
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

pub const LAST_RUN_KEY: &str = "lastAutoRunKey";
pub const SCHEDULE_CONFIG_KEY: &str = "scheduleConfig";
