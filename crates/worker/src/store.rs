//! Blob store construction from a location URL.
//!
//! Supported schemes:
//! - `gs://bucket/prefix` (credentials from the `GOOGLE_*` environment)
//! - `s3://bucket/prefix` (credentials from the `AWS_*` environment)
//! - `file:///absolute/dir`
//! - `memory://` (process-local, for tests and dry runs)

use object_store::aws::AmazonS3Builder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::ObjectStore;
use pipeline_core::{Error, Result};
use std::sync::Arc;
use tracing::info;
use url::Url;

/// A store plus the key prefix everything is written under.
#[derive(Clone)]
pub struct StoreLocation {
    pub store: Arc<dyn ObjectStore>,
    pub prefix: Option<Path>,
}

impl StoreLocation {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: Option<Path>) -> Self {
        Self { store, prefix }
    }

    /// Appends `extra` (slash separated) to the prefix.
    pub fn with_prefix(mut self, extra: &str) -> Self {
        self.prefix = join_prefix(self.prefix.take(), extra);
        self
    }

    /// Full key for `name` under the prefix.
    pub fn path(&self, name: &str) -> Path {
        match &self.prefix {
            Some(prefix) => prefix.child(name),
            None => Path::from(name),
        }
    }
}

/// Joins two slash separated prefixes, dropping empty segments.
pub fn join_prefix(base: Option<Path>, extra: &str) -> Option<Path> {
    let joined: Path = base
        .iter()
        .flat_map(|p| p.parts())
        .chain(Path::from(extra).parts())
        .collect();

    if joined.as_ref().is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Opens the store a location URL points at.
pub fn open_store(location: &str) -> Result<StoreLocation> {
    let url = Url::parse(location)
        .map_err(|e| Error::validation(format!("invalid store URL {:?}: {}", location, e)))?;

    let bucket = || {
        url.host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::validation(format!("store URL {:?} has no bucket", location)))
    };
    let url_prefix = || join_prefix(None, url.path());

    let store: StoreLocation = match url.scheme() {
        "gs" => {
            let bucket = bucket()?;
            info!(bucket = bucket, "Opening GCS bucket");
            let gcs = GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(bucket)
                .build()
                .map_err(|e| Error::upload(format!("Failed to create GCS client: {}", e)))?;
            StoreLocation::new(Arc::new(gcs), url_prefix())
        }
        "s3" => {
            let bucket = bucket()?;
            info!(bucket = bucket, "Opening S3 bucket");
            let s3 = AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .build()
                .map_err(|e| Error::upload(format!("Failed to create S3 client: {}", e)))?;
            StoreLocation::new(Arc::new(s3), url_prefix())
        }
        "file" => {
            let dir = url
                .to_file_path()
                .map_err(|_| Error::validation(format!("invalid file URL {:?}", location)))?;
            std::fs::create_dir_all(&dir).map_err(|e| {
                Error::upload(format!("Failed to create {}: {}", dir.display(), e))
            })?;
            info!(dir = %dir.display(), "Opening local directory store");
            let local = LocalFileSystem::new_with_prefix(&dir)
                .map_err(|e| Error::upload(format!("Failed to open {}: {}", dir.display(), e)))?;
            StoreLocation::new(Arc::new(local), None)
        }
        "memory" => {
            info!("Opening in-memory store");
            StoreLocation::new(Arc::new(InMemory::new()), url_prefix())
        }
        other => {
            return Err(Error::validation(format!(
                "unsupported store scheme {:?}, expected gs, s3, file or memory",
                other
            )))
        }
    };

    Ok(store)
}
