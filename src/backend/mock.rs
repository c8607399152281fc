//! In-memory backend for tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{BackendFactory, BackendRequest, BackendResponse, StoryBackend};
use crate::error::BackendError;
use crate::models::Usage;

#[derive(Default)]
pub struct MockStats {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    created: Mutex<Vec<String>>,
    requests: Mutex<Vec<(String, BackendRequest)>>,
}

impl MockStats {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn created_keys(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    /// `(api key, request)` of the most recent call.
    pub fn last_request(&self) -> Option<(String, BackendRequest)> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[derive(Clone)]
pub struct MockFactory {
    stats: Arc<MockStats>,
    outcome: Result<BackendResponse, BackendError>,
    delay: Duration,
}

impl Default for MockFactory {
    fn default() -> Self {
        Self {
            stats: Arc::new(MockStats::default()),
            outcome: Ok(BackendResponse {
                text: "Bila jednom jedna djevojčica koja je voljela crtati...".into(),
                usage: Some(Usage {
                    prompt_units: 812,
                    output_units: 420,
                    total_units: 1232,
                }),
                model: None,
            }),
            delay: Duration::ZERO,
        }
    }
}

impl MockFactory {
    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }

    pub fn with_outcome(mut self, outcome: Result<BackendResponse, BackendError>) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl BackendFactory for MockFactory {
    fn create(&self, api_key: &str) -> Arc<dyn StoryBackend> {
        self.stats.created.lock().unwrap().push(api_key.to_string());
        Arc::new(MockBackend {
            api_key: api_key.to_string(),
            factory: self.clone(),
        })
    }
}

pub struct MockBackend {
    api_key: String,
    factory: MockFactory,
}

#[async_trait]
impl StoryBackend for MockBackend {
    fn api_key(&self) -> &str {
        &self.api_key
    }

    async fn generate(&self, request: BackendRequest) -> Result<BackendResponse, BackendError> {
        let stats = &self.factory.stats;
        stats.calls.fetch_add(1, Ordering::SeqCst);
        let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        stats.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        stats
            .requests
            .lock()
            .unwrap()
            .push((self.api_key.clone(), request));

        let _guard = InFlightGuard(stats);
        if !self.factory.delay.is_zero() {
            tokio::time::sleep(self.factory.delay).await;
        }
        self.factory.outcome.clone()
    }
}

struct InFlightGuard<'a>(&'a MockStats);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
