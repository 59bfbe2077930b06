//! Shared ClickHouse handle.

use crate::config::ClickHouseConfig;
use clickhouse::Client;
use tracing::info;

/// Cheap to clone; clones share the underlying HTTP connection pool.
#[derive(Clone)]
pub struct ClickHouseClient {
    inner: Client,
    config: ClickHouseConfig,
}

impl ClickHouseClient {
    /// Builds the client. Nothing is sent until the first query, so a bad
    /// URL or credentials show up in [`crate::health::check_connection`].
    pub fn new(config: ClickHouseConfig) -> Self {
        let mut inner = Client::default()
            .with_url(&config.url)
            .with_database(&config.database);

        if let Some(user) = &config.username {
            inner = inner.with_user(user);
        }
        if let Some(password) = &config.password {
            inner = inner.with_password(password);
        }

        info!(
            url = %config.url,
            readings = %config.qualified_table(),
            authenticated = config.username.is_some(),
            "ClickHouse client ready"
        );

        Self { inner, config }
    }

    pub fn inner(&self) -> &Client {
        &self.inner
    }

    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }

    /// `<database>.<table>` of the readings landing table.
    pub fn readings_table(&self) -> String {
        self.config.qualified_table()
    }
}
