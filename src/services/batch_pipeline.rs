//! Asynchronous batching pipeline over the embedding service.
//!
//! Jobs enter a bounded queue and are drained by a fixed pool of worker
//! tasks. Each job is split into sub-batches, every sub-batch goes through
//! the retry policy, and the job's handle receives either the concatenated
//! response or the first failure.
//!
//! Submission never waits for queue space: a full queue is reported
//! immediately as [`EmbeddingError::PipelineBusy`].

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::errors::{EmbeddingError, EmbeddingResult};
use crate::domain::models::{EmbeddingRequest, EmbeddingResponse};
use crate::services::config_runtime::ConfigSnapshot;
use crate::services::embedding_service::EmbeddingService;
use crate::services::retry::RetryPolicy;

/// Default delay before the first retry of a failed sub-batch.
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(200);

/// Pipeline sizing and retry parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPipelineConfig {
    /// Largest number of inputs sent to the provider in one call.
    pub batch_size: usize,
    /// Jobs that may wait in the queue before submissions are rejected.
    pub queue_capacity: usize,
    /// Extra attempts per sub-batch after the first failure.
    pub max_retries: u32,
    /// Number of worker tasks.
    pub worker_threads: usize,
    /// Delay before the first retry; doubles per attempt.
    pub base_backoff: Duration,
}

impl Default for BatchPipelineConfig {
    fn default() -> Self {
        Self::from_snapshot(&ConfigSnapshot::default())
    }
}

impl BatchPipelineConfig {
    /// Take sizing from a configuration snapshot.
    pub const fn from_snapshot(snapshot: &ConfigSnapshot) -> Self {
        Self {
            batch_size: snapshot.batch_size,
            queue_capacity: snapshot.queue_capacity,
            max_retries: snapshot.max_retries,
            worker_threads: snapshot.worker_threads,
            base_backoff: DEFAULT_BASE_BACKOFF,
        }
    }

    /// Replace the first retry delay.
    #[must_use]
    pub const fn with_base_backoff(mut self, base_backoff: Duration) -> Self {
        self.base_backoff = base_backoff;
        self
    }

    fn validate(&self) -> EmbeddingResult<()> {
        if self.batch_size == 0 {
            return Err(EmbeddingError::Validation(
                "batch size must be greater than 0".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(EmbeddingError::Validation(
                "queue capacity must be greater than 0".to_string(),
            ));
        }
        if self.worker_threads == 0 {
            return Err(EmbeddingError::Validation(
                "worker count must be greater than 0".to_string(),
            ));
        }
        if self.base_backoff.is_zero() {
            return Err(EmbeddingError::Validation(
                "base backoff must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Counters exposed by [`BatchPipeline::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Jobs accepted into the queue.
    pub submitted: u64,
    /// Submissions refused because the queue was full or closed.
    pub rejected: u64,
    /// Jobs answered with vectors.
    pub completed: u64,
    /// Jobs answered with an error.
    pub failed: u64,
}

#[derive(Default)]
struct PipelineCounters {
    submitted: AtomicU64,
    rejected: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

struct BatchJob {
    tenant: Option<String>,
    request: EmbeddingRequest,
    result: oneshot::Sender<EmbeddingResult<EmbeddingResponse>>,
}

/// Handle to a submitted job; resolves once a worker finishes it.
///
/// Resolves to [`EmbeddingError::Interrupted`] if the job is dropped without
/// a result, which happens when the pipeline is closed mid-job.
#[derive(Debug)]
#[must_use = "the job result is only observable through this handle"]
pub struct PendingEmbedding {
    rx: oneshot::Receiver<EmbeddingResult<EmbeddingResponse>>,
}

impl Future for PendingEmbedding {
    type Output = EmbeddingResult<EmbeddingResponse>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(EmbeddingError::Interrupted)))
    }
}

/// Bounded queue plus worker pool feeding the embedding service.
pub struct BatchPipeline {
    config: BatchPipelineConfig,
    sender: mpsc::Sender<BatchJob>,
    receiver: Arc<Mutex<mpsc::Receiver<BatchJob>>>,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
    counters: Arc<PipelineCounters>,
}

impl BatchPipeline {
    /// Validate `config` and spawn the worker pool on the current runtime.
    ///
    /// Fails with [`EmbeddingError::Config`] outside a tokio runtime.
    pub fn start(service: Arc<EmbeddingService>, config: BatchPipelineConfig) -> EmbeddingResult<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| {
            EmbeddingError::Config(
                "embedding pipeline must be started inside a tokio runtime".to_string(),
            )
        })?;

        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(PipelineCounters::default());
        let policy = RetryPolicy::new(config.max_retries, config.base_backoff);

        let workers = (0..config.worker_threads)
            .map(|worker_id| {
                runtime.spawn(run_worker(
                    worker_id,
                    Arc::clone(&receiver),
                    Arc::clone(&service),
                    policy,
                    config.batch_size,
                    Arc::clone(&counters),
                ))
            })
            .collect();

        info!(
            workers = config.worker_threads,
            queue_capacity = config.queue_capacity,
            batch_size = config.batch_size,
            max_retries = config.max_retries,
            "Embedding pipeline started"
        );

        Ok(Self {
            config,
            sender,
            receiver,
            workers: std::sync::Mutex::new(workers),
            closed: AtomicBool::new(false),
            counters,
        })
    }

    /// Start a pipeline sized from the service's current configuration.
    pub fn from_service(service: Arc<EmbeddingService>) -> EmbeddingResult<Self> {
        let snapshot = service.snapshot()?;
        Self::start(service, BatchPipelineConfig::from_snapshot(&snapshot))
    }

    /// Enqueue a job without waiting for queue space.
    pub fn submit(
        &self,
        tenant: Option<&str>,
        request: EmbeddingRequest,
    ) -> EmbeddingResult<PendingEmbedding> {
        if self.is_closed() {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(EmbeddingError::PipelineClosed);
        }

        let (result, rx) = oneshot::channel();
        let job = BatchJob {
            tenant: tenant.map(str::to_string),
            request,
            result,
        };

        match self.sender.try_send(job) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(PendingEmbedding { rx })
            }
            Err(TrySendError::Full(_)) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                debug!(capacity = self.config.queue_capacity, "Embedding queue full");
                Err(EmbeddingError::PipelineBusy {
                    capacity: self.config.queue_capacity,
                })
            }
            Err(TrySendError::Closed(_)) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                Err(EmbeddingError::PipelineClosed)
            }
        }
    }

    /// Submit a job and wait up to `timeout` for its result.
    pub async fn submit_and_wait(
        &self,
        tenant: Option<&str>,
        request: EmbeddingRequest,
        timeout: Duration,
    ) -> EmbeddingResult<EmbeddingResponse> {
        let pending = self.submit(tenant, request)?;
        tokio::time::timeout(timeout, pending)
            .await
            .unwrap_or(Err(EmbeddingError::Timeout(timeout)))
    }

    /// Stop the workers and fail every queued job.
    ///
    /// Jobs being processed observe [`EmbeddingError::Interrupted`]; jobs
    /// still queued observe [`EmbeddingError::PipelineClosed`]. Later
    /// submissions are rejected. Calling `close` again is a no-op.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let workers = std::mem::take(
            &mut *self
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for worker in &workers {
            worker.abort();
        }
        for worker in workers {
            // Aborted tasks resolve to a cancellation error.
            let _ = worker.await;
        }

        let mut receiver = self.receiver.lock().await;
        receiver.close();
        let mut drained = 0usize;
        while let Ok(job) = receiver.try_recv() {
            let _ = job.result.send(Err(EmbeddingError::PipelineClosed));
            drained += 1;
        }

        info!(drained, "Embedding pipeline closed");
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Jobs waiting in the queue.
    pub fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Sizing the pipeline was started with.
    pub const fn config(&self) -> &BatchPipelineConfig {
        &self.config
    }

    /// Snapshot of the job counters.
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

impl Drop for BatchPipeline {
    fn drop(&mut self) {
        let workers = self
            .workers
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for worker in workers.drain(..) {
            worker.abort();
        }
    }
}

async fn run_worker(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<BatchJob>>>,
    service: Arc<EmbeddingService>,
    policy: RetryPolicy,
    batch_size: usize,
    counters: Arc<PipelineCounters>,
) {
    debug!(worker_id, "Embedding worker started");

    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let Some(job) = job else {
            break;
        };

        let outcome = process_job(
            &service,
            &policy,
            batch_size,
            job.tenant.as_deref(),
            &job.request,
        )
        .await;

        match &outcome {
            Ok(response) => {
                counters.completed.fetch_add(1, Ordering::Relaxed);
                debug!(worker_id, vectors = response.len(), "Embedding job completed");
            }
            Err(err) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(worker_id, error = %err, "Embedding job failed");
            }
        }

        // The caller may have dropped its handle.
        let _ = job.result.send(outcome);
    }

    debug!(worker_id, "Embedding worker stopped");
}

/// Run one job as consecutive sub-batches and concatenate the results.
async fn process_job(
    service: &EmbeddingService,
    policy: &RetryPolicy,
    batch_size: usize,
    tenant: Option<&str>,
    request: &EmbeddingRequest,
) -> EmbeddingResult<EmbeddingResponse> {
    let mut combined: Option<EmbeddingResponse> = None;

    for chunk in request.inputs().chunks(batch_size) {
        let sub_request = request.with_inputs(chunk);
        let sub_request = &sub_request;
        let response = policy
            .execute(move || service.embed_for_tenant(tenant, sub_request))
            .await?;

        match combined.as_mut() {
            None => combined = Some(response),
            Some(acc) => {
                if response.dimension != acc.dimension {
                    return Err(EmbeddingError::BatchDimensionMismatch {
                        expected: acc.dimension,
                        actual: response.dimension,
                    });
                }
                acc.vectors.extend(response.vectors);
            }
        }
    }

    combined.ok_or(EmbeddingError::NoEmbeddings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_snapshot() {
        let snapshot = ConfigSnapshot {
            batch_size: 3,
            queue_capacity: 7,
            max_retries: 0,
            worker_threads: 2,
            ..ConfigSnapshot::default()
        };
        let config = BatchPipelineConfig::from_snapshot(&snapshot);
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.queue_capacity, 7);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.worker_threads, 2);
        assert_eq!(config.base_backoff, DEFAULT_BASE_BACKOFF);
    }

    #[test]
    fn test_config_rejects_zero_values() {
        let base = BatchPipelineConfig::default();
        assert!(base.validate().is_ok());

        for config in [
            BatchPipelineConfig {
                batch_size: 0,
                ..base.clone()
            },
            BatchPipelineConfig {
                queue_capacity: 0,
                ..base.clone()
            },
            BatchPipelineConfig {
                worker_threads: 0,
                ..base.clone()
            },
            base.clone().with_base_backoff(Duration::ZERO),
        ] {
            assert!(matches!(config.validate(), Err(EmbeddingError::Validation(_))));
        }
    }

    #[test]
    fn test_start_outside_runtime_is_config_error() {
        use crate::adapters::config::InMemoryConfigSource;
        use crate::adapters::embeddings::HashEmbeddingProvider;
        use crate::services::{ConfigRuntime, ProviderRegistry, TenantStrategyRegistry};

        let runtime = Arc::new(ConfigRuntime::new(Arc::new(InMemoryConfigSource::new())));
        let providers =
            Arc::new(ProviderRegistry::new(vec![Arc::new(HashEmbeddingProvider::new())]).unwrap());
        let service = Arc::new(
            EmbeddingService::new(runtime, providers, Arc::new(TenantStrategyRegistry::new()))
                .unwrap(),
        );

        let result = BatchPipeline::start(service, BatchPipelineConfig::default());
        assert!(matches!(result, Err(EmbeddingError::Config(msg)) if msg.contains("tokio runtime")));
    }

    #[tokio::test]
    async fn test_dropped_sender_resolves_interrupted() {
        let (tx, rx) = oneshot::channel();
        drop(tx);
        let pending = PendingEmbedding { rx };
        assert!(matches!(pending.await, Err(EmbeddingError::Interrupted)));
    }
}
