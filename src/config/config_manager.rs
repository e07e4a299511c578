// ==========================================
// Transformer Dispatch - configuration manager
// ==========================================
// Storage: config_kv table (scope_id = 'global')
// Missing keys fall back to built-in defaults.
// ==========================================

use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

use crate::engine::document_number::SuffixTemplates;
use crate::i18n::DEFAULT_LOCALE;

// ==========================================
// ConfigManager
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// Share an existing connection (PRAGMAs are re-applied, idempotent)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// Raw global value, None when unset
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// Insert or overwrite a global value
    pub fn set_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, "config value updated");
        Ok(())
    }

    /// Every global key as a JSON object
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// Write back a snapshot produced by `get_config_snapshot`
    ///
    /// Returns the number of keys written.
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> Result<usize, Box<dyn Error>> {
        let config_map: HashMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
                params![key, value],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }

    // ===== Document numbers =====

    /// Suffix templates for composing document numbers
    pub fn get_suffix_templates(&self) -> Result<SuffixTemplates, Box<dyn Error>> {
        let defaults = SuffixTemplates::default();
        Ok(SuffixTemplates {
            official: self.get_config_or_default(config_keys::OFFICIAL_SUFFIX, &defaults.official)?,
            provisional: self
                .get_config_or_default(config_keys::PROVISIONAL_SUFFIX, &defaults.provisional)?,
            lab: self.get_config_or_default(config_keys::LAB_SUFFIX, &defaults.lab)?,
        })
    }

    // ===== UI =====

    pub fn get_locale(&self) -> Result<String, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::UI_LOCALE, DEFAULT_LOCALE)?;
        match value.as_str() {
            "vi" | "en" => Ok(value),
            other => {
                tracing::warn!(config_key = config_keys::UI_LOCALE, raw_value = %other, "unsupported locale, using default");
                Ok(DEFAULT_LOCALE.to_string())
            }
        }
    }
}

// ==========================================
// Config keys
// ==========================================
pub mod config_keys {
    pub const OFFICIAL_SUFFIX: &str = "document_number.official_suffix";
    pub const PROVISIONAL_SUFFIX: &str = "document_number.provisional_suffix";
    pub const LAB_SUFFIX: &str = "document_number.lab_suffix";
    pub const UI_LOCALE: &str = "ui.locale";
}
