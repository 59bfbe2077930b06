//! ClickHouse configuration.

use serde::{Deserialize, Serialize};

/// ClickHouse client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickHouseConfig {
    /// ClickHouse HTTP URL
    pub url: String,
    /// Database holding the readings table
    #[serde(default)]
    pub database: String,
    /// Table the external ingestion path lands readings in
    #[serde(default)]
    pub table: String,
    /// Username (optional)
    #[serde(default)]
    pub username: Option<String>,
    /// Password (optional)
    #[serde(default)]
    pub password: Option<String>,
    /// Create the readings table on startup if it does not exist
    #[serde(default)]
    pub init_schema: bool,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            database: String::new(),
            table: String::new(),
            username: None,
            password: None,
            init_schema: false,
        }
    }
}

impl ClickHouseConfig {
    /// Fully qualified readings table, `database.table`.
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }

    /// Checks the identifiers the job cannot run without.
    ///
    /// Database and table names are spliced into SQL, so only plain
    /// identifiers are accepted.
    pub fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("clickhouse.url is required".into());
        }
        validate_identifier("clickhouse.database", &self.database)?;
        validate_identifier("clickhouse.table", &self.table)
    }
}

/// Accepts `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_identifier(field: &str, value: &str) -> Result<(), String> {
    let mut chars = value.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');

    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("{} must be a plain identifier, got {:?}", field, value));
    }
    Ok(())
}
