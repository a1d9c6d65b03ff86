use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, params};
use serde_json::Value;

/// Key-value storage for named JSON records.
///
/// The onboarding flow only needs these three operations; whether the backing store
/// is durable, local or remote is up to the implementation. Failures must be
/// reported, never swallowed.
pub trait ProfileStore {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: &Value) -> Result<()>;
    /// Returns `true` if a record was removed.
    fn clear(&self, key: &str) -> Result<bool>;
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS user_settings (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO user_settings (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM user_settings WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    pub fn delete_setting(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM user_settings WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }

    /// When a record was last written, as stored (RFC 3339).
    pub fn setting_updated_at(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT updated_at FROM user_settings WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }
}

impl ProfileStore for Database {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let Some(raw) = self
            .get_setting(key)
            .with_context(|| format!("Failed to read '{key}'"))?
        else {
            return Ok(None);
        };
        // Older clients stored bare strings such as `true` flags without JSON encoding.
        let value = serde_json::from_str::<Value>(&raw).unwrap_or(Value::String(raw));
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set_setting(key, &raw)
            .with_context(|| format!("Failed to write '{key}'"))
    }

    fn clear(&self, key: &str) -> Result<bool> {
        self.delete_setting(key)
            .with_context(|| format!("Failed to clear '{key}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_settings_set_get() {
        let db = Database::open_in_memory().unwrap();
        db.set_setting("test_key", "test_value").unwrap();
        let val = db.get_setting("test_key").unwrap();
        assert_eq!(val.as_deref(), Some("test_value"));
    }

    #[test]
    fn test_user_settings_get_nonexistent() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_setting("nonexistent").unwrap().is_none());
        assert!(db.get("nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_store_round_trips_json_records() {
        let db = Database::open_in_memory().unwrap();
        let record = json!({ "age": 30, "weightUnit": "kg", "height": "175" });
        db.set("macromate_basic_info", &record).unwrap();
        assert_eq!(db.get("macromate_basic_info").unwrap(), Some(record));
    }

    #[test]
    fn test_store_overwrites_existing_key() {
        let db = Database::open_in_memory().unwrap();
        db.set("key", &json!({ "v": 1 })).unwrap();
        db.set("key", &json!({ "v": 2 })).unwrap();
        assert_eq!(db.get("key").unwrap(), Some(json!({ "v": 2 })));
        assert!(db.setting_updated_at("key").unwrap().is_some());
    }

    #[test]
    fn test_store_clear() {
        let db = Database::open_in_memory().unwrap();
        db.set("key", &json!(true)).unwrap();
        assert!(db.clear("key").unwrap());
        assert!(db.get("key").unwrap().is_none());
        // Clearing again returns false
        assert!(!db.clear("key").unwrap());
    }

    #[test]
    fn test_store_reads_non_json_values_as_strings() {
        let db = Database::open_in_memory().unwrap();
        db.set_setting("legacy", "not json").unwrap();
        assert_eq!(db.get("legacy").unwrap(), Some(json!("not json")));
    }

    #[test]
    fn test_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("macromate.db");
        {
            let db = Database::open(&path).unwrap();
            db.set("macromate_onboarding_complete", &json!(true)).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(
            db.get("macromate_onboarding_complete").unwrap(),
            Some(json!(true))
        );
    }

    #[test]
    fn test_migration_creates_user_settings_table() {
        let db = Database::open_in_memory().unwrap();
        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM user_settings", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        let version: i64 = db
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }
}
