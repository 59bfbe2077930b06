//! ClickHouse health checks.

use crate::client::ClickHouseClient;
use crate::schema::all_tables;
use pipeline_core::{Error, Result};
use tracing::{debug, error};

/// Check ClickHouse connection health.
pub async fn check_connection(client: &ClickHouseClient) -> bool {
    match client.inner().query("SELECT 1").fetch_one::<u8>().await {
        Ok(_) => {
            debug!("ClickHouse connection healthy");
            true
        }
        Err(e) => {
            error!("ClickHouse health check failed: {}", e);
            false
        }
    }
}

/// Runs the given DDL statements in order.
pub async fn execute_ddl(client: &ClickHouseClient, statements: &[String]) -> Result<()> {
    for ddl in statements {
        client
            .inner()
            .query(ddl)
            .execute()
            .await
            .map_err(|e| Error::query(format!("Failed to execute DDL: {}", e)))?;
    }
    Ok(())
}

/// Creates the readings table if it does not exist.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    execute_ddl(client, &all_tables(client.config())).await?;
    debug!("ClickHouse schema initialized");
    Ok(())
}
