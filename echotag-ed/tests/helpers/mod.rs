//! Test Helper Utilities
//!
//! Deterministic classifiers, in-memory collaborators and WAV fixtures shared
//! by the echotag-ed integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use echotag_common::{EventBus, ItemStatus};
use echotag_ed::classifier::{Classifier, ClassifierError};
use echotag_ed::db::{init_tables, ResultStore, StoreError};
use echotag_ed::models::{ItemResult, Prediction};
use echotag_ed::storage::{AudioSource, FetchError};
use echotag_ed::AppState;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sample rate of [`StubClassifier`] and of the WAV fixtures
pub const TEST_RATE: u32 = 16_000;

/// Always returns Speech 0.85, Music 0.05, Cough 0.12, Silence 0.02
#[derive(Default)]
pub struct StubClassifier {
    calls: AtomicUsize,
}

impl StubClassifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for StubClassifier {
    fn model_name(&self) -> &str {
        "stub-model"
    }

    fn sample_rate(&self) -> u32 {
        TEST_RATE
    }

    async fn classify(&self, _samples: &[f32]) -> Result<Vec<Prediction>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            Prediction::new("Speech", 0.85),
            Prediction::new("Music", 0.05),
            Prediction::new("Cough", 0.12),
            Prediction::new("Silence", 0.02),
        ])
    }
}

/// Every call fails with an upstream error
pub struct FailingClassifier;

#[async_trait]
impl Classifier for FailingClassifier {
    fn model_name(&self) -> &str {
        "failing-model"
    }

    fn sample_rate(&self) -> u32 {
        TEST_RATE
    }

    async fn classify(&self, _samples: &[f32]) -> Result<Vec<Prediction>, ClassifierError> {
        Err(ClassifierError::Api(500, "inference backend down".to_string()))
    }
}

/// Audio source over an in-memory path → bytes map
#[derive(Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(path.to_string(), bytes);
        self
    }
}

#[async_trait]
impl AudioSource for MemorySource {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(path.to_string()))
    }
}

/// Memory source that stalls before serving one path
pub struct SlowSource {
    inner: MemorySource,
    slow_path: String,
    delay: Duration,
}

impl SlowSource {
    pub fn new(inner: MemorySource, slow_path: &str, delay: Duration) -> Self {
        Self {
            inner,
            slow_path: slow_path.to_string(),
            delay,
        }
    }
}

#[async_trait]
impl AudioSource for SlowSource {
    fn describe(&self) -> String {
        "slow-memory".to_string()
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        if path == self.slow_path {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.fetch(path).await
    }
}

/// Result store that records calls and can be told to fail
#[derive(Default)]
pub struct RecordingStore {
    pub statuses: Mutex<Vec<(String, ItemStatus)>>,
    pub persisted: Mutex<Vec<(String, ItemResult)>>,
    pub fail_status_updates: bool,
    pub fail_persist: bool,
    pub persist_delay: Option<Duration>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_status_updates() -> Self {
        Self {
            fail_status_updates: true,
            ..Self::default()
        }
    }

    pub fn failing_persist() -> Self {
        Self {
            fail_persist: true,
            ..Self::default()
        }
    }

    pub fn slow_persist(delay: Duration) -> Self {
        Self {
            persist_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn statuses_for(&self, path: &str) -> Vec<ItemStatus> {
        self.statuses
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, s)| *s)
            .collect()
    }

    pub fn persisted_paths(&self) -> Vec<String> {
        self.persisted
            .lock()
            .unwrap()
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }
}

#[async_trait]
impl ResultStore for RecordingStore {
    async fn update_status(
        &self,
        file_path: &str,
        status: ItemStatus,
        _error: Option<&str>,
    ) -> Result<(), StoreError> {
        if self.fail_status_updates {
            return Err(StoreError::Unavailable("status table offline".to_string()));
        }
        self.statuses
            .lock()
            .unwrap()
            .push((file_path.to_string(), status));
        Ok(())
    }

    async fn persist(&self, file_path: &str, result: &ItemResult) -> Result<(), StoreError> {
        if let Some(delay) = self.persist_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_persist {
            return Err(StoreError::Unavailable("results table offline".to_string()));
        }
        self.persisted
            .lock()
            .unwrap()
            .push((file_path.to_string(), result.clone()));
        Ok(())
    }

    async fn ping(&self) -> bool {
        !self.fail_persist
    }
}

/// Mono 16-bit WAV of a 440 Hz tone
pub fn wav_bytes(duration_seconds: f64, sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let total_samples = (duration_seconds * sample_rate as f64).round() as usize;
        for i in 0..total_samples {
            let t = i as f32 / sample_rate as f32;
            let sample = 0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin();
            writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// In-memory database with the service tables
pub async fn memory_pool() -> SqlitePool {
    // One connection: every connection to sqlite::memory: is a separate database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_tables(&pool).await.unwrap();
    pool
}

/// App state over an in-memory database and `source`, without a classifier
pub async fn test_state(source: Arc<dyn AudioSource>) -> AppState {
    AppState::new(memory_pool().await, EventBus::new(100), source)
}
