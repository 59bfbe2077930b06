//! Configuration for the two binaries.
//!
//! Layering, lowest to highest: built-in defaults, `config/<binary>.toml`,
//! prefixed environment variables with `__` between nesting levels, then
//! the flat `<PREFIX>_<SECTION>_<FIELD>` variables applied by hand.

use anyhow::{bail, Context, Result};
use clickhouse_client::{validate_identifier, ClickHouseConfig};
use pipeline_core::{RelayVariant, DEFAULT_WATERMARK_KIND, DEFAULT_WATERMARK_NAME};
use redpanda::RedpandaConfig;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use worker::export::{DEFAULT_PART_SIZE, MIN_PART_SIZE};

/// Relay service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub variant: RelayVariant,
    #[serde(default)]
    pub redpanda: RedpandaConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            variant: RelayVariant::default(),
            redpanda: RedpandaConfig::default(),
        }
    }
}

impl ReceiverConfig {
    pub fn validate(&self) -> Result<()> {
        self.redpanda.validate().map_err(anyhow::Error::msg)
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        // PORT is what most container platforms inject
        if let Some(port) = var("PORT") {
            self.port = port.parse().context("PORT must be a port number")?;
        }
        if let Some(port) = var("RECEIVER_PORT") {
            self.port = port.parse().context("RECEIVER_PORT must be a port number")?;
        }
        if let Some(variant) = var("RECEIVER_VARIANT") {
            self.variant = match variant.as_str() {
                "temperature" => RelayVariant::Temperature,
                "data_sequence" | "dataSequence" => RelayVariant::DataSequence,
                other => bail!("unknown RECEIVER_VARIANT {:?}", other),
            };
        }

        if let Some(brokers) = var("RECEIVER_REDPANDA_BROKERS") {
            self.redpanda.brokers = brokers.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Some(topic) = var("RECEIVER_REDPANDA_TOPIC") {
            self.redpanda.topic = topic;
        }
        if let Some(username) = var("RECEIVER_REDPANDA_SASL_USERNAME") {
            self.redpanda.sasl_username = Some(username);
        }
        if let Some(password) = var("RECEIVER_REDPANDA_SASL_PASSWORD") {
            self.redpanda.sasl_password = Some(password);
        }
        Ok(())
    }
}

/// Where exported objects go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// `gs://`, `s3://`, `file://` or `memory://` location
    #[serde(default)]
    pub bucket_url: String,
    /// Key prefix under the bucket location
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_part_size")]
    pub part_size: usize,
}

fn default_part_size() -> usize {
    DEFAULT_PART_SIZE
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            bucket_url: String::new(),
            prefix: String::new(),
            part_size: default_part_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WatermarkBackend {
    #[default]
    #[serde(rename = "object_store")]
    ObjectStore,
    #[serde(rename = "clickhouse")]
    ClickHouse,
}

/// Where the watermark lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkConfig {
    #[serde(default)]
    pub backend: WatermarkBackend,
    /// Store location for the object store backend
    #[serde(default)]
    pub url: String,
    /// Table in the ClickHouse database for the clickhouse backend
    #[serde(default = "default_watermark_table")]
    pub table: String,
    #[serde(default = "default_watermark_kind")]
    pub kind: String,
    #[serde(default = "default_watermark_name")]
    pub name: String,
    /// Conditional writes on the object store backend
    #[serde(default)]
    pub compare_and_swap: bool,
}

fn default_watermark_table() -> String {
    "export_watermarks".to_string()
}

fn default_watermark_kind() -> String {
    DEFAULT_WATERMARK_KIND.to_string()
}

fn default_watermark_name() -> String {
    DEFAULT_WATERMARK_NAME.to_string()
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            backend: WatermarkBackend::default(),
            url: String::new(),
            table: default_watermark_table(),
            kind: default_watermark_kind(),
            name: default_watermark_name(),
            compare_and_swap: false,
        }
    }
}

/// Export job configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default)]
    pub clickhouse: ClickHouseConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub watermark: WatermarkConfig,
}

impl AggregatorConfig {
    pub fn validate(&self) -> Result<()> {
        self.clickhouse.validate().map_err(anyhow::Error::msg)?;

        if self.export.bucket_url.trim().is_empty() {
            bail!("export.bucket_url is required");
        }
        if self.export.part_size < MIN_PART_SIZE {
            bail!(
                "export.part_size must be at least {} bytes, got {}",
                MIN_PART_SIZE,
                self.export.part_size
            );
        }

        match self.watermark.backend {
            WatermarkBackend::ObjectStore => {
                if self.watermark.url.trim().is_empty() {
                    bail!("watermark.url is required for the object_store backend");
                }
            }
            WatermarkBackend::ClickHouse => {
                validate_identifier("watermark.table", &self.watermark.table)
                    .map_err(anyhow::Error::msg)?;
                if self.watermark.compare_and_swap {
                    bail!("watermark.compare_and_swap is not supported by the clickhouse backend");
                }
            }
        }
        Ok(())
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = var("AGGREGATOR_CLICKHOUSE_URL") {
            self.clickhouse.url = url;
        }
        if let Some(database) = var("AGGREGATOR_CLICKHOUSE_DATABASE") {
            self.clickhouse.database = database;
        }
        if let Some(table) = var("AGGREGATOR_CLICKHOUSE_TABLE") {
            self.clickhouse.table = table;
        }
        if let Some(username) = var("AGGREGATOR_CLICKHOUSE_USERNAME") {
            self.clickhouse.username = Some(username);
        }
        if let Some(password) = var("AGGREGATOR_CLICKHOUSE_PASSWORD") {
            self.clickhouse.password = Some(password);
        }

        if let Some(url) = var("AGGREGATOR_EXPORT_BUCKET_URL") {
            self.export.bucket_url = url;
        }
        if let Some(prefix) = var("AGGREGATOR_EXPORT_PREFIX") {
            self.export.prefix = prefix;
        }

        if let Some(backend) = var("AGGREGATOR_WATERMARK_BACKEND") {
            self.watermark.backend = match backend.as_str() {
                "object_store" => WatermarkBackend::ObjectStore,
                "clickhouse" => WatermarkBackend::ClickHouse,
                other => bail!("unknown AGGREGATOR_WATERMARK_BACKEND {:?}", other),
            };
        }
        if let Some(url) = var("AGGREGATOR_WATERMARK_URL") {
            self.watermark.url = url;
        }
        if let Some(cas) = var("AGGREGATOR_WATERMARK_COMPARE_AND_SWAP") {
            self.watermark.compare_and_swap = matches!(cas.as_str(), "1" | "true" | "TRUE");
        }
        Ok(())
    }
}

fn load<T>(defaults: &T, file: &str, prefix: &str) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    config::Config::builder()
        .add_source(config::Config::try_from(defaults)?)
        .add_source(
            config::File::with_name(file)
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix(prefix)
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Loads and validates the relay configuration.
pub fn load_receiver_config() -> Result<ReceiverConfig> {
    let mut config = load(&ReceiverConfig::default(), "config/receiver", "RECEIVER")?;
    config.apply_overrides(env_var)?;
    config.validate()?;
    Ok(config)
}

/// Loads and validates the export job configuration.
pub fn load_aggregator_config() -> Result<AggregatorConfig> {
    let mut config = load(&AggregatorConfig::default(), "config/aggregator", "AGGREGATOR")?;
    config.apply_overrides(env_var)?;
    config.validate()?;
    Ok(config)
}
