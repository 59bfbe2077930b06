//! Client construction shared by the producer and health checks.

use crate::config::RedpandaConfig;
use rskafka::client::{partition::Compression, Client, ClientBuilder, Credentials, SaslConfig};
use std::sync::Arc;

/// Creates a TLS configuration for Redpanda Cloud.
fn create_tls_config() -> Arc<rustls::ClientConfig> {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
}

/// Connects to the configured brokers.
///
/// TLS and SCRAM-SHA-256 are enabled only when both SASL credentials are set.
pub async fn connect(config: &RedpandaConfig) -> Result<Client, rskafka::client::error::Error> {
    let mut builder = ClientBuilder::new(vec![config.broker_string()]);

    if let (Some(username), Some(password)) = (&config.sasl_username, &config.sasl_password) {
        builder = builder
            .tls_config(create_tls_config())
            .sasl_config(SaslConfig::ScramSha256(Credentials::new(
                username.clone(),
                password.clone(),
            )));
    }

    builder.build().await
}

/// Maps the configured compression name to the wire codec.
pub fn compression(name: &str) -> Compression {
    match name {
        "gzip" => Compression::Gzip,
        "snappy" => Compression::Snappy,
        "lz4" => Compression::Lz4,
        "zstd" => Compression::Zstd,
        _ => Compression::NoCompression,
    }
}
