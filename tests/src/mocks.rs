//! Mock implementations for testing.

use async_trait::async_trait;
use clickhouse_client::{WindowQuery, WindowRows};
use futures_util::stream::BoxStream;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    CopyOptions, GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore,
    PutMultipartOptions, PutOptions, PutPayload, PutResult, UploadPart,
};
use parking_lot::Mutex;
use pipeline_core::{Error, ExportedRow, Result, Watermark, WatermarkStore, Window};
use redpanda::{PublishReceipt, Publisher};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock publisher that captures messages in memory.
///
/// Implements the same `Publisher` trait as the real `Producer`, so tests
/// see the exact payloads that would reach the topic without a broker.
#[derive(Clone, Default)]
pub struct MockPublisher {
    /// Every payload acknowledged so far.
    messages: Arc<Mutex<Vec<Vec<u8>>>>,
    /// Fail every publish while set.
    should_fail: Arc<Mutex<bool>>,
    /// Fail once this many publishes have been acknowledged.
    fail_after: Arc<Mutex<Option<usize>>>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured payloads decoded as JSON.
    pub fn captured_json(&self) -> Vec<serde_json::Value> {
        self.messages
            .lock()
            .iter()
            .map(|m| serde_json::from_slice(m).expect("published payload is JSON"))
            .collect()
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().len()
    }

    /// Set failure mode for testing error handling.
    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    /// Accept `n` publishes, then fail the rest.
    pub fn fail_after(&self, n: usize) {
        *self.fail_after.lock() = Some(n);
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, payload: Vec<u8>) -> Result<PublishReceipt> {
        if *self.should_fail.lock() {
            return Err(Error::publish("Mock publisher failure"));
        }

        let mut messages = self.messages.lock();
        if let Some(limit) = *self.fail_after.lock() {
            if messages.len() >= limit {
                return Err(Error::publish("Mock publisher failure"));
            }
        }

        messages.push(payload);
        Ok(PublishReceipt {
            partition: 0,
            offset: messages.len() as i64 - 1,
        })
    }

    fn is_healthy(&self) -> bool {
        !*self.should_fail.lock()
    }
}

/// A watermark write performed while the window query runs, standing in
/// for a second job instance racing this one.
struct Interloper {
    store: Arc<dyn WatermarkStore>,
    watermark: Watermark,
}

/// Window query over a fixed set of rows.
///
/// Rows are filtered by timestamp against the requested window, which is
/// close enough to publish-time filtering for the job tests.
#[derive(Clone, Default)]
pub struct MockWindowQuery {
    rows: Arc<Mutex<Vec<ExportedRow>>>,
    requested: Arc<Mutex<Vec<Window>>>,
    should_fail: Arc<Mutex<bool>>,
    fail_mid_stream: Arc<Mutex<bool>>,
    interloper: Arc<Mutex<Option<Arc<Interloper>>>>,
}

impl MockWindowQuery {
    pub fn new(rows: Vec<ExportedRow>) -> Self {
        let query = Self::default();
        *query.rows.lock() = rows;
        query
    }

    /// Windows fetched so far, in order.
    pub fn requested(&self) -> Vec<Window> {
        self.requested.lock().clone()
    }

    /// Fail `fetch_window` itself.
    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    /// Yield the first row, then fail the cursor.
    pub fn set_fail_mid_stream(&self, fail: bool) {
        *self.fail_mid_stream.lock() = fail;
    }

    /// Overwrite the watermark in `store` during the next fetch.
    pub fn interleave_watermark(&self, store: Arc<dyn WatermarkStore>, watermark: Watermark) {
        *self.interloper.lock() = Some(Arc::new(Interloper { store, watermark }));
    }
}

#[async_trait]
impl WindowQuery for MockWindowQuery {
    async fn fetch_window(&self, window: &Window) -> Result<Box<dyn WindowRows>> {
        self.requested.lock().push(*window);

        if *self.should_fail.lock() {
            return Err(Error::query("Mock query failure"));
        }

        let interloper = self.interloper.lock().take();
        if let Some(interloper) = interloper {
            let previous = interloper.store.load().await?;
            interloper
                .store
                .store(&interloper.watermark, previous.as_ref())
                .await?;
        }

        let mut rows: Vec<Result<ExportedRow>> = self
            .rows
            .lock()
            .iter()
            .filter(|r| window.contains(r.timestamp))
            .copied()
            .map(Ok)
            .collect();

        if *self.fail_mid_stream.lock() {
            rows.truncate(1);
            rows.push(Err(Error::query("Mock cursor failure")));
        }

        Ok(Box::new(MockRows(rows.into_iter())))
    }
}

struct MockRows(std::vec::IntoIter<Result<ExportedRow>>);

#[async_trait]
impl WindowRows for MockRows {
    async fn next_row(&mut self) -> Result<Option<ExportedRow>> {
        self.0.next().transpose()
    }
}

/// In-memory blob store whose multipart uploads accept parts but fail on
/// completion, so nothing ever becomes visible.
///
/// Every other operation goes straight to the wrapped store.
#[derive(Debug)]
pub struct FailingUploads {
    inner: Arc<InMemory>,
    aborted: Arc<AtomicUsize>,
}

impl FailingUploads {
    pub fn new(inner: Arc<InMemory>) -> Self {
        Self {
            inner,
            aborted: Arc::default(),
        }
    }

    /// Uploads aborted by the caller so far.
    pub fn aborted(&self) -> usize {
        self.aborted.load(Ordering::SeqCst)
    }
}

impl fmt::Display for FailingUploads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FailingUploads({})", self.inner)
    }
}

#[async_trait]
impl ObjectStore for FailingUploads {
    async fn put_opts(
        &self,
        location: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        self.inner.put_opts(location, payload, opts).await
    }

    async fn put_multipart_opts(
        &self,
        location: &Path,
        opts: PutMultipartOptions,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        let upload = self.inner.put_multipart_opts(location, opts).await?;
        Ok(Box::new(FailingUpload {
            inner: upload,
            aborted: self.aborted.clone(),
        }))
    }

    async fn get_opts(&self, location: &Path, options: GetOptions) -> object_store::Result<GetResult> {
        self.inner.get_opts(location, options).await
    }

    fn delete_stream(
        &self,
        locations: BoxStream<'static, object_store::Result<Path>>,
    ) -> BoxStream<'static, object_store::Result<Path>> {
        self.inner.delete_stream(locations)
    }

    fn list(&self, prefix: Option<&Path>) -> BoxStream<'static, object_store::Result<ObjectMeta>> {
        self.inner.list(prefix)
    }

    async fn list_with_delimiter(&self, prefix: Option<&Path>) -> object_store::Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy_opts(&self, from: &Path, to: &Path, options: CopyOptions) -> object_store::Result<()> {
        self.inner.copy_opts(from, to, options).await
    }
}

#[derive(Debug)]
struct FailingUpload {
    inner: Box<dyn MultipartUpload>,
    aborted: Arc<AtomicUsize>,
}

#[async_trait]
impl MultipartUpload for FailingUpload {
    fn put_part(&mut self, data: PutPayload) -> UploadPart {
        self.inner.put_part(data)
    }

    async fn complete(&mut self) -> object_store::Result<PutResult> {
        Err(object_store::Error::Generic {
            store: "FailingUploads",
            source: "upload rejected".into(),
        })
    }

    async fn abort(&mut self) -> object_store::Result<()> {
        self.aborted.fetch_add(1, Ordering::SeqCst);
        self.inner.abort().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_publisher_captures_messages() {
        let mock = MockPublisher::new();

        let receipt = mock.publish(br#"{"temperature":1.5}"#.to_vec()).await.unwrap();
        assert_eq!(receipt.offset, 0);
        assert_eq!(mock.message_count(), 1);
        assert_eq!(mock.captured_json()[0]["temperature"], 1.5);
    }

    #[tokio::test]
    async fn test_mock_publisher_failure_mode() {
        let mock = MockPublisher::new();
        mock.set_should_fail(true);

        assert!(mock.publish(b"{}".to_vec()).await.is_err());
        assert!(!mock.is_healthy());
    }

    #[tokio::test]
    async fn test_mock_publisher_fail_after() {
        let mock = MockPublisher::new();
        mock.fail_after(1);

        assert!(mock.publish(b"{}".to_vec()).await.is_ok());
        assert!(mock.publish(b"{}".to_vec()).await.is_err());
        assert_eq!(mock.message_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_query_filters_by_window() {
        let inside = ExportedRow {
            timestamp: "2023-01-01T05:30:00Z".parse().unwrap(),
            temperature: 1.0,
        };
        let outside = ExportedRow {
            timestamp: "2023-01-01T06:00:00Z".parse().unwrap(),
            temperature: 2.0,
        };
        let query = MockWindowQuery::new(vec![inside, outside]);
        let window = Window::ending_at("2023-01-01T06:00:00Z".parse().unwrap()).unwrap();

        let mut rows = query.fetch_window(&window).await.unwrap();
        assert_eq!(rows.next_row().await.unwrap(), Some(inside));
        assert_eq!(rows.next_row().await.unwrap(), None);
        assert_eq!(query.requested(), vec![window]);
    }
}
