//! Watermark persisted as a JSON document in an object store.

use crate::store::StoreLocation;
use async_trait::async_trait;
use object_store::path::Path;
use object_store::{
    ObjectStore, ObjectStoreExt, PutMode, PutPayload, UpdateVersion,
};
use pipeline_core::{Error, Result, StoredWatermark, Watermark, WatermarkStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the store reported about the document when it was read.
#[derive(Debug, Default, Serialize, Deserialize)]
struct VersionToken {
    #[serde(skip_serializing_if = "Option::is_none")]
    e_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

impl VersionToken {
    fn encode(&self) -> Option<String> {
        if self.e_tag.is_none() && self.version.is_none() {
            return None;
        }
        serde_json::to_string(self).ok()
    }

    fn decode(token: &str) -> Result<Self> {
        serde_json::from_str(token)
            .map_err(|e| Error::watermark(format!("unreadable version token {:?}: {}", token, e)))
    }
}

/// [`WatermarkStore`] keeping `<kind>/<name>.json` in an object store.
///
/// With compare-and-swap enabled, the first write must create the document
/// and later writes must match the version read at the start of the run.
/// Backends without conditional writes (the local filesystem) reject this
/// mode at write time.
pub struct ObjectWatermarkStore {
    store: Arc<dyn ObjectStore>,
    path: Path,
    compare_and_swap: bool,
}

impl ObjectWatermarkStore {
    pub fn new(location: StoreLocation, kind: &str, name: &str) -> Self {
        let path = location.path(kind).child(format!("{}.json", name));
        Self {
            store: location.store,
            path,
            compare_and_swap: false,
        }
    }

    /// Refuse to overwrite a watermark that changed since it was read.
    pub fn with_compare_and_swap(mut self, enabled: bool) -> Self {
        self.compare_and_swap = enabled;
        self
    }

    /// Key of the watermark document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn put_mode(&self, previous: Option<&StoredWatermark>) -> Result<PutMode> {
        if !self.compare_and_swap {
            return Ok(PutMode::Overwrite);
        }

        let Some(previous) = previous else {
            return Ok(PutMode::Create);
        };

        let token = previous
            .version
            .as_deref()
            .map(VersionToken::decode)
            .transpose()?
            .ok_or_else(|| {
                Error::watermark("previous watermark carries no version to compare against")
            })?;

        Ok(PutMode::Update(UpdateVersion {
            e_tag: token.e_tag,
            version: token.version,
        }))
    }
}

#[async_trait]
impl WatermarkStore for ObjectWatermarkStore {
    async fn load(&self) -> Result<Option<StoredWatermark>> {
        let result = match self.store.get(&self.path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                debug!(path = %self.path, "No watermark yet");
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::watermark(format!(
                    "Failed to read {}: {}",
                    self.path, e
                )))
            }
        };

        let token = VersionToken {
            e_tag: result.meta.e_tag.clone(),
            version: result.meta.version.clone(),
        };

        let body = result
            .bytes()
            .await
            .map_err(|e| Error::watermark(format!("Failed to read {}: {}", self.path, e)))?;

        let watermark: Watermark = serde_json::from_slice(&body)
            .map_err(|e| Error::watermark(format!("Malformed watermark {}: {}", self.path, e)))?;

        Ok(Some(StoredWatermark::new(watermark, token.encode())))
    }

    async fn store(
        &self,
        watermark: &Watermark,
        previous: Option<&StoredWatermark>,
    ) -> Result<()> {
        let mode = self.put_mode(previous)?;

        let body = serde_json::to_vec_pretty(watermark)
            .map_err(|e| Error::internal(format!("Failed to encode watermark: {}", e)))?;

        match self
            .store
            .put_opts(&self.path, PutPayload::from(body), mode.into())
            .await
        {
            Ok(_) => {
                info!(
                    path = %self.path,
                    range_start = %watermark.range_start,
                    range_end = %watermark.range_end,
                    "Stored watermark"
                );
                Ok(())
            }
            Err(
                e @ (object_store::Error::AlreadyExists { .. }
                | object_store::Error::Precondition { .. }),
            ) => {
                warn!(path = %self.path, "Watermark changed since it was read: {}", e);
                Err(Error::WatermarkConflict(format!(
                    "{} was updated by another run",
                    self.path
                )))
            }
            Err(e) => Err(Error::watermark(format!(
                "Failed to write {}: {}",
                self.path, e
            ))),
        }
    }
}
