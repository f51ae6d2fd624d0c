use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use domain::alert::entity::AlertRecord;
use domain::alert::error::AlertError;

use crate::secondary::message_publisher::{ControlHandler, MessagePublisher};
use crate::secondary::metrics_port::{CycleMetrics, EventMetrics, PublishMetrics};
use crate::secondary::state_store::StateStore;

/// No-op implementation of all metrics sub-traits for use in tests.
pub struct NoopMetrics;

impl EventMetrics for NoopMetrics {}
impl PublishMetrics for NoopMetrics {}
impl CycleMetrics for NoopMetrics {}

/// Publisher test double that records every publish in memory and can be
/// switched to fail on demand.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, Vec<u8>)>>,
    subscriptions: Mutex<Vec<(String, ControlHandler)>>,
    connect_count: AtomicUsize,
    reconnect_count: AtomicUsize,
    liveness_count: AtomicUsize,
    fail_publish: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `publish` fail (or succeed again).
    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::Relaxed);
    }

    /// All `(topic, payload)` pairs published so far, in order.
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().unwrap().clone()
    }

    /// Topics published so far, in order.
    pub fn topics(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(topic, _)| topic.clone())
            .collect()
    }

    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> usize {
        self.reconnect_count.load(Ordering::Relaxed)
    }

    pub fn liveness_count(&self) -> usize {
        self.liveness_count.load(Ordering::Relaxed)
    }

    /// Simulate an inbound control message: invoke every handler whose
    /// subscribed suffix matches.
    pub fn deliver_control(&self, topic_suffix: &str, payload: &[u8]) {
        let subscriptions = self.subscriptions.lock().unwrap();
        for (suffix, handler) in subscriptions.iter() {
            if suffix == topic_suffix {
                handler(suffix, payload);
            }
        }
    }
}

impl MessagePublisher for RecordingPublisher {
    fn connect(&self) -> Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + '_>> {
        self.connect_count.fetch_add(1, Ordering::Relaxed);
        Box::pin(async { Ok(()) })
    }

    fn reconnect_if_needed(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + '_>> {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
        Box::pin(async { Ok(()) })
    }

    fn publish<'a>(
        &'a self,
        topic: &'a str,
        payload: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + 'a>> {
        Box::pin(async move {
            if self.fail_publish.load(Ordering::Relaxed) {
                return Err(AlertError::PublishFailed("injected failure".to_string()));
            }
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), payload.to_vec()));
            Ok(())
        })
    }

    fn publish_liveness(&self) -> Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + '_>> {
        Box::pin(async {
            if self.fail_publish.load(Ordering::Relaxed) {
                return Err(AlertError::PublishFailed("injected failure".to_string()));
            }
            self.liveness_count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
    }

    fn subscribe<'a>(
        &'a self,
        topic_suffix: &'a str,
        handler: ControlHandler,
    ) -> Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + 'a>> {
        Box::pin(async move {
            self.subscriptions
                .lock()
                .unwrap()
                .push((topic_suffix.to_string(), handler));
            Ok(())
        })
    }
}

/// State store test double holding the snapshot in memory, with optional
/// injected save failures.
#[derive(Default)]
pub struct InMemoryStateStore {
    records: Mutex<Vec<AlertRecord>>,
    save_count: AtomicUsize,
    fail_save: AtomicBool,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the snapshot that `load` will return.
    pub fn with_records(records: Vec<AlertRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub fn set_fail_save(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::Relaxed);
    }

    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::Relaxed)
    }

    /// The last saved snapshot.
    pub fn records(&self) -> Vec<AlertRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl StateStore for InMemoryStateStore {
    fn load(&self) -> Result<Vec<AlertRecord>, AlertError> {
        Ok(self.records.lock().unwrap().clone())
    }

    fn save(&self, records: &[AlertRecord]) -> Result<(), AlertError> {
        if self.fail_save.load(Ordering::Relaxed) {
            return Err(AlertError::StoreFailed("injected failure".to_string()));
        }
        *self.records.lock().unwrap() = records.to_vec();
        self.save_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
