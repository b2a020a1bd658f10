//! Prefetch buffer: keeps a small reservoir of generated items ahead of the
//! consumer.
//!
//! One buffer serves one (exercise type, generation context) pair. The
//! consumer calls [`PrefetchBuffer::prime`] before first use and
//! [`PrefetchBuffer::fill_if_needed`] after consuming; both may start a
//! refill round, which generates batches until the queue reaches the target
//! level or a whole batch comes back empty.
//!
//! At most one round runs per buffer. The in-flight flag is claimed with an
//! atomic compare-and-swap, so a concurrent trigger is a no-op rather than a
//! second or queued round. Rounds run on their own task: a caller that stops
//! awaiting does not cancel the round, and its items still land in the queue.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use uuid::Uuid;

use crate::error::BufferConfigError;
use crate::item::PracticeItem;
use crate::model::{ExerciseType, GenerationContext, RawCandidate};
use crate::registry::ItemRegistry;
use crate::traits::{GenerateOptions, GenerateOutcome, GenerationPort, DEFAULT_MAX_ATTEMPTS};

/// Watermarks and batching for a prefetch buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchConfig {
    /// Generation requests per batch.
    pub batch_size: usize,
    /// Queue length a refill round fills up to.
    pub target_level: usize,
    /// `fill_if_needed` refills when the queue drops below this.
    pub low_watermark: usize,
    /// Attempt budget passed to the generation port per request.
    pub max_attempts: u32,
    /// Issue a batch's requests concurrently. Results are still appended in
    /// submission order.
    pub parallel: bool,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            batch_size: 2,
            target_level: 4,
            low_watermark: 2,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            parallel: false,
        }
    }
}

impl PrefetchConfig {
    pub fn validate(&self) -> Result<(), BufferConfigError> {
        if self.batch_size == 0 {
            return Err(BufferConfigError::ZeroBatchSize);
        }
        if self.low_watermark >= self.target_level {
            return Err(BufferConfigError::WatermarkNotBelowTarget {
                low_watermark: self.low_watermark,
                target_level: self.target_level,
            });
        }
        if self.max_attempts == 0 {
            return Err(BufferConfigError::ZeroMaxAttempts);
        }
        Ok(())
    }
}

/// A queued candidate, constructed into an item when the buffer has a registry.
#[derive(Debug, Clone)]
pub struct Prefetched {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub candidate: RawCandidate,
    pub item: Option<PracticeItem>,
}

/// Counters for one refill round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundStats {
    pub batches: usize,
    pub requested: usize,
    pub appended: usize,
    /// Requests the port reported as failed.
    pub failed: usize,
    /// Candidates the registry rejected.
    pub dropped: usize,
    /// The round ended on a batch with no usable candidate.
    pub stalled: bool,
    /// Queue length when the round ended.
    pub queue_len: usize,
}

/// What a `prime`/`fill_if_needed` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillOutcome {
    /// The queue was already sufficiently full.
    NotNeeded,
    /// Another round was in flight; this trigger did nothing.
    AlreadyRunning,
    /// A round ran to completion.
    Completed(RoundStats),
    /// The round's task panicked. Items appended before the panic are kept.
    Aborted,
}

/// Handle to a prefetch buffer. Clones share the same queue.
#[derive(Clone)]
pub struct PrefetchBuffer {
    inner: Arc<Inner>,
}

struct Inner {
    port: Arc<dyn GenerationPort>,
    registry: Option<Arc<ItemRegistry>>,
    item_type: ExerciseType,
    context: GenerationContext,
    config: PrefetchConfig,
    queue: Mutex<VecDeque<Prefetched>>,
    refilling: AtomicBool,
}

/// Builder for [`PrefetchBuffer`].
pub struct PrefetchBufferBuilder {
    port: Arc<dyn GenerationPort>,
    registry: Option<Arc<ItemRegistry>>,
    item_type: ExerciseType,
    context: GenerationContext,
    config: PrefetchConfig,
}

impl PrefetchBufferBuilder {
    pub fn config(mut self, config: PrefetchConfig) -> Self {
        self.config = config;
        self
    }

    /// Construct every candidate through `registry`; rejected candidates are
    /// dropped during refill.
    pub fn registry(mut self, registry: Arc<ItemRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Result<PrefetchBuffer, BufferConfigError> {
        self.config.validate()?;
        Ok(PrefetchBuffer {
            inner: Arc::new(Inner {
                port: self.port,
                registry: self.registry,
                item_type: self.item_type,
                context: self.context,
                config: self.config,
                queue: Mutex::new(VecDeque::new()),
                refilling: AtomicBool::new(false),
            }),
        })
    }
}

impl PrefetchBuffer {
    pub fn builder(
        port: Arc<dyn GenerationPort>,
        item_type: impl Into<ExerciseType>,
        context: GenerationContext,
    ) -> PrefetchBufferBuilder {
        PrefetchBufferBuilder {
            port,
            registry: None,
            item_type: item_type.into(),
            context,
            config: PrefetchConfig::default(),
        }
    }

    pub fn item_type(&self) -> &ExerciseType {
        &self.inner.item_type
    }

    pub fn config(&self) -> &PrefetchConfig {
        &self.inner.config
    }

    pub fn len(&self) -> usize {
        self.inner.queue().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.queue().is_empty()
    }

    /// Whether a refill round is currently in flight.
    pub fn is_refilling(&self) -> bool {
        self.inner.refilling.load(Ordering::Acquire)
    }

    /// The oldest queued entry, without removing it.
    pub fn peek(&self) -> Option<Prefetched> {
        self.inner.queue().front().cloned()
    }

    /// Remove and return the oldest queued entry. Never triggers a refill.
    pub fn pop(&self) -> Option<Prefetched> {
        self.inner.queue().pop_front()
    }

    /// Make sure there is something to consume: refill if the queue is empty.
    pub async fn prime(&self) -> RefillOutcome {
        if !self.is_empty() {
            return RefillOutcome::NotNeeded;
        }
        self.refill().await
    }

    /// Refill if the queue has dropped below the low watermark.
    pub async fn fill_if_needed(&self) -> RefillOutcome {
        if self.len() >= self.inner.config.low_watermark {
            return RefillOutcome::NotNeeded;
        }
        self.refill().await
    }

    async fn refill(&self) -> RefillOutcome {
        let Some(guard) = RefillGuard::acquire(&self.inner) else {
            tracing::debug!(
                "refill for {} already in flight, skipping",
                self.inner.item_type
            );
            return RefillOutcome::AlreadyRunning;
        };

        let inner = Arc::clone(&self.inner);
        let round = tokio::spawn(async move {
            let _guard = guard;
            inner.run_round().await
        });

        match round.await {
            Ok(stats) => RefillOutcome::Completed(stats),
            Err(e) => {
                tracing::error!("refill round for {} failed: {e}", self.inner.item_type);
                RefillOutcome::Aborted
            }
        }
    }
}

impl fmt::Debug for PrefetchBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefetchBuffer")
            .field("item_type", &self.inner.item_type)
            .field("config", &self.inner.config)
            .field("len", &self.len())
            .field("refilling", &self.is_refilling())
            .finish()
    }
}

/// Claims the in-flight flag; releases it on drop, including on panic.
struct RefillGuard {
    inner: Arc<Inner>,
}

impl RefillGuard {
    fn acquire(inner: &Arc<Inner>) -> Option<Self> {
        inner
            .refilling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                inner: Arc::clone(inner),
            })
    }
}

impl Drop for RefillGuard {
    fn drop(&mut self) {
        self.inner.refilling.store(false, Ordering::Release);
    }
}

impl Inner {
    fn queue(&self) -> MutexGuard<'_, VecDeque<Prefetched>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_round(&self) -> RoundStats {
        let mut stats = RoundStats::default();
        let options = GenerateOptions {
            max_attempts: self.config.max_attempts,
        };

        loop {
            let queued = self.queue().len();
            if queued >= self.config.target_level {
                break;
            }
            // Never ask for more than the deficit, so a round lands exactly on target.
            let count = self.config.batch_size.min(self.config.target_level - queued);

            stats.batches += 1;
            stats.requested += count;
            let outcomes = self.run_batch(count, options).await;

            let mut batch = Vec::with_capacity(count);
            for outcome in outcomes {
                let error = outcome.error.clone();
                match outcome.into_candidate() {
                    Some(candidate) => match self.admit(candidate) {
                        Some(entry) => batch.push(entry),
                        None => stats.dropped += 1,
                    },
                    None => {
                        stats.failed += 1;
                        tracing::debug!(
                            "generation for {} failed: {}",
                            self.item_type,
                            error.as_deref().unwrap_or("no candidate")
                        );
                    }
                }
            }

            if batch.is_empty() {
                stats.stalled = true;
                tracing::warn!(
                    "batch for {} produced no candidates, ending refill round",
                    self.item_type
                );
                break;
            }

            stats.appended += batch.len();
            self.queue().extend(batch);
        }

        stats.queue_len = self.queue().len();
        tracing::info!(
            item_type = %self.item_type,
            batches = stats.batches,
            appended = stats.appended,
            failed = stats.failed,
            dropped = stats.dropped,
            stalled = stats.stalled,
            queue_len = stats.queue_len,
            "refill round finished"
        );
        stats
    }

    async fn run_batch(&self, count: usize, options: GenerateOptions) -> Vec<GenerateOutcome> {
        if self.config.parallel {
            // join_all yields results in submission order.
            join_all((0..count).map(|_| {
                self.port
                    .generate(&self.item_type, &self.context, None, options)
            }))
            .await
        } else {
            let mut outcomes = Vec::with_capacity(count);
            for _ in 0..count {
                outcomes.push(
                    self.port
                        .generate(&self.item_type, &self.context, None, options)
                        .await,
                );
            }
            outcomes
        }
    }

    fn admit(&self, candidate: RawCandidate) -> Option<Prefetched> {
        let item = match &self.registry {
            Some(registry) => match registry.create(&candidate) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!("dropping generated {} candidate: {e}", self.item_type);
                    return None;
                }
            },
            None => None,
        };

        Some(Prefetched {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            candidate,
            item,
        })
    }
}
