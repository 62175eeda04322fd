use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::task::JoinError;
use tracing::debug;

use super::aggregate::run_simulation;
use super::error::ParamError;
use super::types::{AggregateResult, SimulationParameters};

/// Idle sessions are dropped once the registry grows past this.
const MAX_IDLE_SESSIONS: usize = 1024;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("invalid parameters: {0}")]
    Invalid(#[from] ParamError),
    #[error("simulation worker failed: {0}")]
    Join(#[from] JoinError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Completed(AggregateResult),
    /// A newer batch was submitted while this one ran; its result is dropped.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchTicket(u64);

/// Runs one caller's batches off the calling task and keeps only the newest
/// result.
#[derive(Debug, Default)]
pub struct BatchScheduler {
    latest: AtomicU64,
}

impl BatchScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a new batch as the latest; any earlier ticket becomes stale.
    pub fn issue(&self) -> BatchTicket {
        BatchTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: BatchTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    pub fn settle(&self, ticket: BatchTicket, result: AggregateResult) -> BatchOutcome {
        if self.is_current(ticket) {
            BatchOutcome::Completed(result)
        } else {
            debug!(ticket = ticket.0, "discarding superseded batch result");
            BatchOutcome::Superseded
        }
    }

    pub async fn submit(&self, params: SimulationParameters) -> Result<BatchOutcome, BatchError> {
        self.submit_with(params, run_simulation).await
    }

    async fn submit_with<F>(
        &self,
        params: SimulationParameters,
        run: F,
    ) -> Result<BatchOutcome, BatchError>
    where
        F: FnOnce(&SimulationParameters) -> Result<AggregateResult, ParamError> + Send + 'static,
    {
        params.validate()?;
        let ticket = self.issue();
        let result = tokio::task::spawn_blocking(move || run(&params)).await??;
        Ok(self.settle(ticket, result))
    }
}

/// Runs a batch with no supersession, for callers that do not identify a
/// session.
pub async fn run_batch(params: SimulationParameters) -> Result<AggregateResult, BatchError> {
    params.validate()?;
    Ok(tokio::task::spawn_blocking(move || run_simulation(&params)).await??)
}

/// One [`BatchScheduler`] per caller session, so a caller's batches only
/// supersede each other.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<BatchScheduler>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduler_for(&self, session: &str) -> Arc<BatchScheduler> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(scheduler) = sessions.get(session) {
            return Arc::clone(scheduler);
        }
        if sessions.len() >= MAX_IDLE_SESSIONS {
            let before = sessions.len();
            sessions.retain(|_, scheduler| Arc::strong_count(scheduler) > 1);
            debug!(evicted = before - sessions.len(), "evicted idle sessions");
        }
        let scheduler = Arc::new(BatchScheduler::new());
        sessions.insert(session.to_string(), Arc::clone(&scheduler));
        scheduler
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;

    use super::*;

    fn quick_params() -> SimulationParameters {
        let mut params = SimulationParameters::default();
        params.simulations = 20;
        params
    }

    /// Starts a batch whose worker holds until `release` fires. Returns once
    /// the batch's ticket has been issued.
    async fn start_held_batch(
        scheduler: Arc<BatchScheduler>,
        params: SimulationParameters,
    ) -> (
        JoinHandle<Result<BatchOutcome, BatchError>>,
        mpsc::Sender<()>,
    ) {
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let handle = tokio::spawn(async move {
            scheduler
                .submit_with(params, move |params| {
                    let _ = started_tx.send(());
                    let _ = release_rx.recv();
                    run_simulation(params)
                })
                .await
        });
        started_rx.await.expect("held batch started");
        (handle, release_tx)
    }

    #[test]
    fn newer_ticket_supersedes_older_result() {
        let scheduler = BatchScheduler::new();
        let first = scheduler.issue();
        let second = scheduler.issue();

        let result = run_simulation(&quick_params()).expect("valid params");
        assert_eq!(
            scheduler.settle(first, result.clone()),
            BatchOutcome::Superseded
        );
        assert_eq!(
            scheduler.settle(second, result.clone()),
            BatchOutcome::Completed(result)
        );
    }

    #[tokio::test]
    async fn submit_returns_completed_for_latest_batch() {
        let scheduler = BatchScheduler::new();
        let outcome = scheduler.submit(quick_params()).await.expect("batch runs");
        let expected = run_simulation(&quick_params()).expect("valid params");
        assert_eq!(outcome, BatchOutcome::Completed(expected));
    }

    #[tokio::test]
    async fn submit_rejects_invalid_params_without_issuing_ticket() {
        let scheduler = BatchScheduler::new();
        let before = scheduler.issue();

        let mut params = quick_params();
        params.income_tax_rate = 140.0;
        let err = scheduler.submit(params).await.expect_err("must reject");
        assert!(matches!(err, BatchError::Invalid(ParamError::PercentOutOfRange { .. })));
        assert!(scheduler.is_current(before));
    }

    #[tokio::test]
    async fn submit_during_a_running_batch_supersedes_it() {
        let scheduler = Arc::new(BatchScheduler::new());
        let (older, release) = start_held_batch(Arc::clone(&scheduler), quick_params()).await;

        let mut newer_params = quick_params();
        newer_params.seed = 7;
        let newer = scheduler.submit(newer_params.clone()).await.expect("batch runs");
        release.send(()).expect("older batch is waiting");
        let older = older.await.expect("task joins").expect("batch runs");

        assert_eq!(older, BatchOutcome::Superseded);
        let expected = run_simulation(&newer_params).expect("valid params");
        assert_eq!(newer, BatchOutcome::Completed(expected));
    }

    #[tokio::test]
    async fn separate_sessions_do_not_supersede_each_other() {
        let registry = SessionRegistry::new();
        let (first, release) =
            start_held_batch(registry.scheduler_for("alice"), quick_params()).await;

        let mut other = quick_params();
        other.seed = 7;
        let second = registry
            .scheduler_for("bob")
            .submit(other)
            .await
            .expect("batch runs");
        release.send(()).expect("first batch is waiting");
        let first = first.await.expect("task joins").expect("batch runs");

        assert!(matches!(first, BatchOutcome::Completed(_)));
        assert!(matches!(second, BatchOutcome::Completed(_)));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn same_session_reuses_its_scheduler() {
        let registry = SessionRegistry::new();
        let a = registry.scheduler_for("alice");
        let b = registry.scheduler_for("alice");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &registry.scheduler_for("bob")));
    }

    #[test]
    fn idle_sessions_are_evicted_when_full() {
        let registry = SessionRegistry::new();
        let busy = registry.scheduler_for("busy");
        for i in 0..MAX_IDLE_SESSIONS {
            registry.scheduler_for(&format!("idle-{i}"));
        }
        assert!(registry.len() <= MAX_IDLE_SESSIONS);
        assert!(Arc::ptr_eq(&busy, &registry.scheduler_for("busy")));
    }

    #[tokio::test]
    async fn run_batch_completes_without_a_session() {
        let result = run_batch(quick_params()).await.expect("batch runs");
        assert_eq!(result, run_simulation(&quick_params()).expect("valid params"));
    }

    #[tokio::test]
    async fn run_batch_rejects_invalid_params() {
        let mut params = quick_params();
        params.simulations = 0;
        let err = run_batch(params).await.expect_err("must reject");
        assert!(matches!(err, BatchError::Invalid(ParamError::NoSimulations)));
    }
}
