//! The correlation run: one event loop owns the run state.
//!
//! Design: sends and receives are multiplexed onto a single task because
//! correctness depends on single-writer access to the three request sets.
//! The loop suspends only while waiting for the next inbound message or the
//! watchdog deadline, whichever comes first; it never blocks on the transport
//! beyond the synchronous hand-off of a batch.

use std::collections::HashMap;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::domain::{
    ClaimRequest, EngineError, RequestId, ResponseRecord, RunId, RunPhase, RunState, TimeoutReport,
};
use crate::engine::policy::RunPolicy;
use crate::engine::watchdog::Watchdog;
use crate::engine::{dispatcher, listener};
use crate::ports::{ClaimTransport, ResponseSource};

/// Result of a run that matched every claim.
#[derive(Debug)]
pub struct RunReport {
    /// All signed results, keyed by correlation id. The caller inspects each
    /// record's error list; the engine only guarantees completeness.
    pub records: HashMap<RequestId, ResponseRecord>,
    /// How many whole-batch retry passes the run needed.
    pub retry_passes: u32,
}

/// Drives one batch of claims to a terminal phase.
///
/// The engine owns its bus subscription exclusively; it is built per run and
/// consumed by [`ClaimEngine::run`]. Nothing survives the run except the
/// returned report (or error).
pub struct ClaimEngine<T, S> {
    run_id: RunId,
    state: RunState,
    transport: T,
    source: S,
    policy: RunPolicy,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<T: ClaimTransport, S: ResponseSource> ClaimEngine<T, S> {
    pub fn new(
        run_id: RunId,
        batch: Vec<ClaimRequest>,
        transport: T,
        source: S,
        policy: RunPolicy,
    ) -> Self {
        Self {
            run_id,
            state: RunState::new(batch),
            transport,
            source,
            policy,
            shutdown: None,
        }
    }

    /// Cancellation hook: when the channel reads `true` the run ends with
    /// [`EngineError::Cancelled`], dropping the subscription and run state
    /// without resending or persisting anything. A cancelled run's claims
    /// must be resubmitted wholesale.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub async fn run(self) -> Result<RunReport, EngineError> {
        let Self {
            run_id,
            mut state,
            transport,
            mut source,
            policy,
            mut shutdown,
        } = self;

        info!(
            run_id = %run_id,
            batch = state.batch_len(),
            timeout_secs = policy.timeout.as_secs(),
            throttle = policy.throttle,
            retry = policy.retry,
            phase = ?RunPhase::Running,
            "starting claim run"
        );
        let mut watchdog = Watchdog::new(policy.timeout);
        let mut retry_passes = 0u32;

        dispatcher::dispatch(&mut state, &transport, policy.throttle)
            .await
            .inspect_err(|error| warn!(run_id = %run_id, %error, phase = ?RunPhase::Failed, "claim run failed"))?;

        loop {
            if state.is_drained() {
                info!(
                    run_id = %run_id,
                    completed = state.counts().completed,
                    retry_passes,
                    phase = ?RunPhase::Complete,
                    "claim run complete"
                );
                return Ok(RunReport {
                    records: state.into_completed(),
                    retry_passes,
                });
            }

            tokio::select! {
                inbound = source.recv() => match inbound? {
                    Some(body) => {
                        if listener::ingest(&mut state, &body) {
                            watchdog.reset();
                            dispatcher::dispatch(&mut state, &transport, policy.throttle)
                                .await
                                .inspect_err(|error| warn!(run_id = %run_id, %error, phase = ?RunPhase::Failed, "claim run failed"))?;
                        }
                    }
                    None => {
                        warn!(run_id = %run_id, counts = ?state.counts(), phase = ?RunPhase::Failed, "reply subscription closed mid-run");
                        return Err(EngineError::SubscriptionClosed);
                    }
                },

                _ = watchdog.expired() => {
                    if retry_passes < policy.retry {
                        retry_passes += 1;
                        let oldest_wait_secs = state.oldest_in_flight_age().map(|age| age.as_secs());
                        let requeued = state.requeue_in_flight();
                        warn!(
                            run_id = %run_id,
                            retry_passes,
                            requeued,
                            oldest_wait_secs,
                            "watchdog expired, resending unanswered claims"
                        );
                        watchdog.reset();
                        dispatcher::dispatch(&mut state, &transport, policy.throttle)
                            .await
                            .inspect_err(|error| warn!(run_id = %run_id, %error, phase = ?RunPhase::Failed, "claim run failed"))?;
                    } else {
                        let unanswered = state.unanswered();
                        warn!(
                            run_id = %run_id,
                            unanswered = unanswered.len(),
                            completed = state.counts().completed,
                            retry_passes,
                            phase = ?RunPhase::TimedOut,
                            "watchdog expired with no retry budget left"
                        );
                        return Err(EngineError::Timeout(TimeoutReport {
                            completed: state.into_completed(),
                            unanswered,
                            retry_passes,
                        }));
                    }
                },

                _ = cancelled(shutdown.as_mut()) => {
                    warn!(run_id = %run_id, counts = ?state.counts(), "claim run cancelled");
                    return Err(EngineError::Cancelled);
                },
            }
        }
    }
}

/// Resolves when the caller requests cancellation; pends forever otherwise
/// (including when no shutdown channel was attached or its sender is gone).
async fn cancelled(shutdown: Option<&mut watch::Receiver<bool>>) {
    let Some(rx) = shutdown else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}
