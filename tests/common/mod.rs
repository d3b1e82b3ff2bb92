//! Common test utilities for integration tests
//!
//! Provides a scriptable embedding provider and helpers to wire it into an
//! embedding service backed by an in-memory config source.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use vectorgate::adapters::config::InMemoryConfigSource;
use vectorgate::domain::ports::EmbeddingProvider;
use vectorgate::services::{ConfigRuntime, EmbeddingService, ProviderRegistry, TenantStrategyRegistry};
use vectorgate::{EmbeddingError, EmbeddingResult};

/// Deterministic, distinct vector for `text`.
///
/// Component 0 encodes the text so tests can tell vectors apart; the rest
/// are filler derived from the text length.
pub fn vector_for(text: &str, dimension: usize) -> Vec<f32> {
    let signature = text
        .bytes()
        .fold(17u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)))
        % 100_000;
    (0..dimension)
        .map(|i| {
            if i == 0 {
                signature as f32 + 1.0
            } else {
                (text.len() + i) as f32
            }
        })
        .collect()
}

/// Embedding provider whose behavior is scripted per test.
pub struct ScriptedProvider {
    name: String,
    model_prefix: String,
    dimension: usize,
    calls: AtomicUsize,
    started: AtomicUsize,
    fail_next: AtomicUsize,
    seen: Mutex<Vec<Vec<String>>>,
    dimension_schedule: Mutex<VecDeque<usize>>,
    ragged_next: AtomicUsize,
    short_next: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedProvider {
    /// Provider `name` serving every model that starts with `model_prefix`.
    pub fn new(name: &str, model_prefix: &str, dimension: usize) -> Self {
        Self {
            name: name.to_string(),
            model_prefix: model_prefix.to_string(),
            dimension,
            calls: AtomicUsize::new(0),
            started: AtomicUsize::new(0),
            fail_next: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            dimension_schedule: Mutex::new(VecDeque::new()),
            ragged_next: AtomicUsize::new(0),
            short_next: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Block every call until a permit is added to the returned semaphore.
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    /// Fail the next `count` calls with a provider error.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Use these dimensions for the next calls, in order.
    pub fn schedule_dimensions(&self, dimensions: &[usize]) {
        self.dimension_schedule
            .lock()
            .unwrap()
            .extend(dimensions.iter().copied());
    }

    /// Make the next `count` calls return one vector with a different length.
    pub fn ragged_next(&self, count: usize) {
        self.ragged_next.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` calls return one vector too few.
    pub fn short_next(&self, count: usize) {
        self.short_next.store(count, Ordering::SeqCst);
    }

    /// Completed or failed `embed_all` calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that have entered `embed_all`, including ones still gated.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Inputs of every call, in call order.
    pub fn seen(&self) -> Vec<Vec<String>> {
        self.seen.lock().unwrap().clone()
    }

    fn take_one(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, model: &str) -> bool {
        model.starts_with(&self.model_prefix)
    }

    async fn embed_all(&self, inputs: &[String], _model: &str) -> EmbeddingResult<Vec<Vec<f32>>> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(inputs.to_vec());

        if Self::take_one(&self.fail_next) {
            return Err(EmbeddingError::provider(&self.name, "scripted failure"));
        }

        let dimension = self
            .dimension_schedule
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.dimension);
        let mut vectors: Vec<Vec<f32>> = inputs.iter().map(|t| vector_for(t, dimension)).collect();

        if Self::take_one(&self.ragged_next) {
            if let Some(last) = vectors.last_mut() {
                last.push(0.5);
            }
        }
        if Self::take_one(&self.short_next) {
            vectors.pop();
        }

        Ok(vectors)
    }
}

/// Embedding service over `providers` and an editable config source.
pub fn service_with(
    providers: Vec<Arc<dyn EmbeddingProvider>>,
    settings: &[(&str, &str)],
) -> (Arc<InMemoryConfigSource>, Arc<EmbeddingService>) {
    let source = Arc::new(InMemoryConfigSource::from_pairs(settings.iter().copied()));
    let runtime = Arc::new(ConfigRuntime::new(source.clone()));
    let registry = Arc::new(ProviderRegistry::new(providers).expect("valid providers"));
    let tenants = Arc::new(TenantStrategyRegistry::new());
    let service = EmbeddingService::new(runtime, registry, tenants).expect("valid service");
    (source, Arc::new(service))
}

/// Wait for a condition to be true with timeout
///
/// Polls the predicate every 5ms until it returns true or the timeout passes.
pub async fn wait_for<F>(mut predicate: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    predicate()
}
