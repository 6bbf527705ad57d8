//! Outbox dispatcher: claims pending events and projects them.

use std::time::{Duration, Instant};

use chrono::Utc;
use outbox::{ClaimRequest, OutboxEvent, OutboxStore};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::router::{RouteOutcome, Router};
use crate::store::ReadModelStore;
use crate::{ProjectionError, Result};

/// Tuning knobs of a [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Time between the start of two ticks.
    pub poll_interval: Duration,

    /// Maximum number of events claimed per tick.
    pub batch_size: usize,

    /// How long a claim hides events from other instances.
    pub claim_lease: Duration,

    /// Dead-letter an event once it has been claimed this many times.
    /// `None` retries forever.
    pub max_attempts: Option<u32>,

    /// Dead-letter an update whose target row is missing once it has been
    /// claimed this many times, even when `max_attempts` is `None`.
    pub missing_row_attempts: u32,

    /// Identifies this instance in claims and logs.
    pub worker_id: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            batch_size: 50,
            claim_lease: Duration::from_secs(30),
            max_attempts: None,
            missing_row_attempts: 5,
            worker_id: format!("projector-{}", Uuid::new_v4()),
        }
    }
}

impl DispatcherConfig {
    fn claim_request(&self) -> ClaimRequest {
        ClaimRequest::new(self.batch_size, self.worker_id.clone()).lease(self.claim_lease)
    }

    /// Claims allowed before an event failing with `error` is dead-lettered.
    fn attempt_limit(&self, error: &ProjectionError) -> Option<u32> {
        match error {
            // The row may never arrive; released events return to the head of
            // the claim order, so an unbounded retry would starve the queue.
            ProjectionError::MissingRow { .. } => Some(
                self.max_attempts
                    .map_or(self.missing_row_attempts, |max| {
                        max.min(self.missing_row_attempts)
                    }),
            ),
            _ => self.max_attempts,
        }
    }
}

/// Counts of what one tick did with its claimed events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub claimed: usize,
    /// Applied to the read models and marked dispatched.
    pub dispatched: usize,
    /// Unknown event type; marked dispatched without writes.
    pub ignored: usize,
    /// Already dispatched by someone else; nothing written.
    pub skipped: usize,
    /// Failed and released for a later tick.
    pub retried: usize,
    /// Failed permanently or out of attempts.
    pub dead_lettered: usize,
}

impl TickReport {
    pub fn failed(&self) -> usize {
        self.retried + self.dead_lettered
    }
}

impl std::fmt::Display for TickReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "claimed={} dispatched={} ignored={} skipped={} retried={} dead_lettered={}",
            self.claimed,
            self.dispatched,
            self.ignored,
            self.skipped,
            self.retried,
            self.dead_lettered
        )
    }
}

enum Dispatch {
    Applied,
    Ignored,
    AlreadyDispatched,
}

/// Polls the outbox and applies each pending event to the read models.
///
/// Each event is projected in its own unit of work: the read-model writes of
/// every projector and the `dispatched_at` mark commit together or not at
/// all. A failing event never stops the rest of its batch.
pub struct Dispatcher<O: OutboxStore, S: ReadModelStore> {
    outbox: O,
    store: S,
    router: Router,
    config: DispatcherConfig,
}

impl<O: OutboxStore, S: ReadModelStore> Dispatcher<O, S> {
    /// Creates a dispatcher with the standard router.
    pub fn new(outbox: O, store: S, config: DispatcherConfig) -> Self {
        Self::with_router(outbox, store, Router::standard(), config)
    }

    pub fn with_router(outbox: O, store: S, router: Router, config: DispatcherConfig) -> Self {
        Self {
            outbox,
            store,
            router,
            config,
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Runs ticks every `poll_interval` until `shutdown` is cancelled.
    ///
    /// The first tick runs immediately. Tick errors are logged and the loop
    /// carries on. Cancellation is observed between ticks; a tick in flight
    /// completes first.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            worker = %self.config.worker_id,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            "dispatcher started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(report) if report.claimed > 0 => {
                            tracing::info!(%report, "tick complete");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "tick failed");
                        }
                    }
                }
            }
        }

        tracing::info!(worker = %self.config.worker_id, "dispatcher stopped");
    }

    /// Claims one batch and projects every event in it, oldest first.
    ///
    /// Fails only when the batch cannot be claimed; per-event failures are
    /// recorded in the report.
    #[tracing::instrument(skip(self), fields(worker = %self.config.worker_id))]
    pub async fn tick(&self) -> Result<TickReport> {
        let started = Instant::now();
        let events = self.outbox.claim_batch(&self.config.claim_request()).await?;

        let mut report = TickReport {
            claimed: events.len(),
            ..TickReport::default()
        };

        for event in &events {
            match self.dispatch(event).await {
                Ok(Dispatch::Applied) => {
                    report.dispatched += 1;
                    metrics::counter!("projector_events_dispatched").increment(1);
                }
                Ok(Dispatch::Ignored) => {
                    report.ignored += 1;
                    metrics::counter!("projector_events_dispatched").increment(1);
                }
                Ok(Dispatch::AlreadyDispatched) => {
                    report.skipped += 1;
                    metrics::counter!("projector_events_skipped").increment(1);
                    tracing::debug!(event_id = %event.id, "event already dispatched");
                }
                Err(e) => self.handle_failure(event, e, &mut report).await,
            }
        }

        metrics::histogram!("projector_tick_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        Ok(report)
    }

    async fn dispatch(&self, event: &OutboxEvent) -> Result<Dispatch> {
        let mut session = self.store.begin().await?;

        // Marking first locks the outbox row, so a concurrent instance holding
        // the same event waits here and then sees it dispatched.
        if !session.mark_dispatched(event.id, Utc::now()).await? {
            return Ok(Dispatch::AlreadyDispatched);
        }

        let outcome = self.router.route(session.as_mut(), event).await?;
        session.commit().await?;

        Ok(match outcome {
            RouteOutcome::Applied => Dispatch::Applied,
            RouteOutcome::Ignored => Dispatch::Ignored,
        })
    }

    async fn handle_failure(
        &self,
        event: &OutboxEvent,
        error: ProjectionError,
        report: &mut TickReport,
    ) {
        metrics::counter!("projector_events_failed").increment(1);
        let message = error.to_string();

        let exhausted = self
            .config
            .attempt_limit(&error)
            .is_some_and(|max| event.attempts >= max);

        if error.is_permanent() || exhausted {
            tracing::error!(
                event_id = %event.id,
                event_type = %event.event_type,
                attempts = event.attempts,
                error = %message,
                "event dead-lettered"
            );
            report.dead_lettered += 1;
            metrics::counter!("projector_events_dead_lettered").increment(1);
            if let Err(e) = self.outbox.dead_letter(event.id, &message).await {
                tracing::error!(event_id = %event.id, error = %e, "failed to dead-letter event");
            }
        } else {
            tracing::warn!(
                event_id = %event.id,
                event_type = %event.event_type,
                attempts = event.attempts,
                error = %message,
                "event failed, will retry"
            );
            report.retried += 1;
            // If the release fails the lease expiry frees the event instead.
            if let Err(e) = self.outbox.release(event.id, &message).await {
                tracing::error!(event_id = %event.id, error = %e, "failed to release event");
            }
        }
    }
}
