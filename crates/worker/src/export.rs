//! NDJSON export of one window to the blob store.

use crate::store::StoreLocation;
use bytes::Bytes;
use clickhouse_client::WindowRows;
use object_store::path::Path;
use object_store::{MultipartUpload, ObjectStore, ObjectStoreExt, PutPayload};
use pipeline_core::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use telemetry::metrics;
use tracing::{debug, info, warn};

/// Default multipart part size (10 MiB).
pub const DEFAULT_PART_SIZE: usize = 10 * 1024 * 1024;

/// Smallest part size cloud stores accept for non-final parts (5 MiB).
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Result of a completed export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub location: Path,
    pub rows: u64,
    pub bytes: u64,
}

/// Writes window rows as newline-delimited JSON objects.
pub struct Exporter {
    store: Arc<dyn ObjectStore>,
    prefix: Option<Path>,
    part_size: usize,
}

impl Exporter {
    pub fn new(location: StoreLocation) -> Self {
        Self {
            store: location.store,
            prefix: location.prefix,
            part_size: DEFAULT_PART_SIZE,
        }
    }

    /// Overrides the multipart part size. Zero is treated as one byte.
    pub fn with_part_size(mut self, part_size: usize) -> Self {
        self.part_size = part_size.max(1);
        self
    }

    /// Key an object name resolves to.
    pub fn object_path(&self, object_name: &str) -> Path {
        match &self.prefix {
            Some(prefix) => prefix.child(object_name),
            None => Path::from(object_name),
        }
    }

    /// Drains `rows` and uploads them as `object_name`.
    ///
    /// Nothing is written until every row has been read, so a failing
    /// query never leaves an object behind.
    pub async fn export_window(
        &self,
        object_name: &str,
        mut rows: Box<dyn WindowRows>,
    ) -> Result<ExportSummary> {
        let (body, row_count) = drain_ndjson(rows.as_mut()).await?;
        let location = self.object_path(object_name);
        let bytes = body.len() as u64;

        debug!(
            location = %location,
            rows = row_count,
            bytes = bytes,
            "Uploading window"
        );

        let start = Instant::now();
        self.upload(&location, body).await?;

        let elapsed = start.elapsed();
        metrics().upload_latency_ms.observe_duration(elapsed);
        metrics().rows_exported.inc_by(row_count);
        metrics().bytes_exported.inc_by(bytes);

        info!(
            location = %location,
            rows = row_count,
            bytes = bytes,
            latency_ms = %elapsed.as_millis(),
            "Uploaded window"
        );

        Ok(ExportSummary {
            location,
            rows: row_count,
            bytes,
        })
    }

    async fn upload(&self, location: &Path, body: Bytes) -> Result<()> {
        let mut upload = self
            .store
            .put_multipart(location)
            .await
            .map_err(|e| Error::upload(format!("Failed to start upload of {}: {}", location, e)))?;

        match write_parts(upload.as_mut(), body, self.part_size).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if let Err(abort_err) = upload.abort().await {
                    warn!(location = %location, "Failed to abort upload: {}", abort_err);
                }
                Err(Error::upload(format!("Failed to upload {}: {}", location, e)))
            }
        }
    }
}

/// Serializes every row on its own line, in cursor order.
async fn drain_ndjson(rows: &mut dyn WindowRows) -> Result<(Bytes, u64)> {
    let mut body = Vec::new();
    let mut count = 0u64;

    while let Some(row) = rows.next_row().await? {
        serde_json::to_writer(&mut body, &row)?;
        body.push(b'\n');
        count += 1;
    }

    Ok((Bytes::from(body), count))
}

async fn write_parts(
    upload: &mut dyn MultipartUpload,
    body: Bytes,
    part_size: usize,
) -> object_store::Result<()> {
    if body.is_empty() {
        // Multipart uploads need at least one part, even an empty one.
        upload.put_part(PutPayload::from(Bytes::new())).await?;
    }

    let mut offset = 0;
    while offset < body.len() {
        let end = (offset + part_size).min(body.len());
        upload.put_part(PutPayload::from(body.slice(offset..end))).await?;
        offset = end;
    }

    upload.complete().await?;
    Ok(())
}
