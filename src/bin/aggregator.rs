//! Hourly export job.
//!
//! Runs once and exits: exports the next fully elapsed hour of readings to
//! the blob store and advances the watermark, or exits cleanly when that
//! hour has not ended yet. Schedule it hourly.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, error, info, warn};

use clickhouse_client::{
    health::{check_connection, execute_ddl, init_schema},
    ClickHouseClient, ClickHouseWatermarkStore, ClickHouseWindowQuery,
};
use pipeline_core::WatermarkStore;
use reading_pipeline::config::{load_aggregator_config, AggregatorConfig, WatermarkBackend};
use telemetry::{health, init_tracing_from_env, metrics};
use worker::{open_store, ExportJob, Exporter, JobOutcome, ObjectWatermarkStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_tracing_from_env("aggregator");

    // rustls 0.23+ requires explicit crypto provider selection
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("A rustls crypto provider was already installed");
    }

    let config = load_aggregator_config().context("Invalid aggregator configuration")?;

    info!(
        clickhouse = %config.clickhouse.url,
        table = %config.clickhouse.qualified_table(),
        bucket = %config.export.bucket_url,
        watermark_backend = ?config.watermark.backend,
        "Loaded aggregator config"
    );

    let clickhouse = ClickHouseClient::new(config.clickhouse.clone());

    if check_connection(&clickhouse).await {
        health().clickhouse.set_healthy();
    } else {
        health().clickhouse.set_unhealthy("Connection failed");
        error!("ClickHouse connection: unhealthy");
    }

    if config.clickhouse.init_schema {
        init_schema(&clickhouse)
            .await
            .context("Failed to initialize ClickHouse schema")?;
    }

    let watermarks = watermark_store(&config, &clickhouse).await?;

    let export_location = open_store(&config.export.bucket_url)
        .context("Failed to open export bucket")?
        .with_prefix(&config.export.prefix);
    let exporter = Exporter::new(export_location).with_part_size(config.export.part_size);

    let job = ExportJob::new(
        Arc::new(ClickHouseWindowQuery::new(clickhouse)),
        exporter,
        watermarks,
    );

    let outcome = job.run(Utc::now()).await.context("Export job failed")?;

    match outcome {
        JobOutcome::NothingToDo => info!("Nothing to export"),
        JobOutcome::Exported {
            window,
            object,
            rows,
            bytes,
        } => info!(
            window = %window,
            object = %object,
            rows = rows,
            bytes = bytes,
            "Export complete"
        ),
    }

    debug!(metrics = ?metrics().snapshot().export, "Final metrics");
    Ok(())
}

async fn watermark_store(
    config: &AggregatorConfig,
    clickhouse: &ClickHouseClient,
) -> Result<Arc<dyn WatermarkStore>> {
    let wm = &config.watermark;

    let store: Arc<dyn WatermarkStore> = match wm.backend {
        WatermarkBackend::ObjectStore => {
            let location = open_store(&wm.url).context("Failed to open watermark store")?;
            let store = ObjectWatermarkStore::new(location, &wm.kind, &wm.name)
                .with_compare_and_swap(wm.compare_and_swap);
            info!(
                path = %store.path(),
                compare_and_swap = wm.compare_and_swap,
                "Using object store watermark"
            );
            Arc::new(store)
        }
        WatermarkBackend::ClickHouse => {
            let store =
                ClickHouseWatermarkStore::new(clickhouse.clone(), &wm.table, &wm.kind, &wm.name)
                    .context("Invalid watermark table")?;
            if config.clickhouse.init_schema {
                execute_ddl(clickhouse, &[store.create_table_sql()])
                    .await
                    .context("Failed to create watermark table")?;
            }
            info!(table = %wm.table, "Using ClickHouse watermark");
            Arc::new(store)
        }
    };

    Ok(store)
}
