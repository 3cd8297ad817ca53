//! Run state: the three disjoint correlation sets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::claim::ClaimRequest;
use super::ids::RequestId;
use super::response::ResponseRecord;

/// Phase of a correlation run.
///
/// Transitions:
/// - Init -> Running -> Complete (every claim matched)
/// - Init -> Running -> TimedOut (watchdog expired, retry budget exhausted)
/// - Init -> Running -> Failed (transport hand-off failed)
///
/// Terminal phases are final; a run never restarts itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunPhase {
    Init,
    Running,
    Complete,
    TimedOut,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Complete | RunPhase::TimedOut | RunPhase::Failed)
    }
}

/// Classification of one inbound record against the current sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    /// The id was in-flight; it is now completed.
    Matched,
    /// The id already completed; the stored record is left unchanged.
    Duplicate,
    /// The id is not in-flight: stale, foreign, or answered before being sent.
    Unknown,
}

/// Send-time bookkeeping for an in-flight claim.
#[derive(Debug, Clone, Copy)]
struct InFlight {
    sent_at: Instant,
}

/// Set sizes, for logging and progress reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub pending: usize,
    pub in_flight: usize,
    pub completed: usize,
}

/// Correlation state for one run. Created from the caller's batch at run
/// start and destroyed when the run terminates; nothing survives across runs.
///
/// Invariants:
/// - `pending`, `in_flight`, and `completed` are pairwise disjoint and their
///   union is always the original batch.
/// - `pending` stays in original batch order; `admit` preserves it.
///
/// The caller guarantees request ids are unique within the batch.
pub struct RunState {
    requests: HashMap<RequestId, ClaimRequest>,
    /// Original batch position of each id; admission and requeue order key.
    order: HashMap<RequestId, usize>,
    pending: Vec<RequestId>,
    in_flight: HashMap<RequestId, InFlight>,
    completed: HashMap<RequestId, ResponseRecord>,
    retries: HashMap<RequestId, u32>,
}

impl RunState {
    pub fn new(batch: Vec<ClaimRequest>) -> Self {
        let order: HashMap<RequestId, usize> = batch
            .iter()
            .enumerate()
            .map(|(index, claim)| (claim.request_id, index))
            .collect();
        let pending: Vec<RequestId> = batch.iter().map(|claim| claim.request_id).collect();
        let requests: HashMap<RequestId, ClaimRequest> = batch
            .into_iter()
            .map(|claim| (claim.request_id, claim))
            .collect();
        Self {
            requests,
            order,
            pending,
            in_flight: HashMap::new(),
            completed: HashMap::new(),
            retries: HashMap::new(),
        }
    }

    /// Move claims from `pending` to `in_flight`, in original batch order,
    /// until `pending` is empty or the throttle ceiling is reached. Returns
    /// the admitted claims for one batched transport hand-off.
    pub fn admit(&mut self, throttle: usize) -> Vec<ClaimRequest> {
        let capacity = throttle.saturating_sub(self.in_flight.len());
        let take = capacity.min(self.pending.len());
        let now = Instant::now();

        let mut admitted = Vec::with_capacity(take);
        for id in self.pending.drain(..take) {
            self.in_flight.insert(id, InFlight { sent_at: now });
            let claim = self
                .requests
                .get(&id)
                .expect("admitted id must belong to the batch");
            admitted.push(claim.clone());
        }
        admitted
    }

    /// Match one parsed record against the sets.
    ///
    /// Only `Matched` mutates state; a `Duplicate` never replaces the record
    /// stored when the id first completed.
    pub fn correlate(&mut self, record: ResponseRecord) -> Correlation {
        if self.completed.contains_key(&record.request_id) {
            return Correlation::Duplicate;
        }
        match self.in_flight.remove(&record.request_id) {
            Some(_) => {
                self.completed.insert(record.request_id, record);
                Correlation::Matched
            }
            None => Correlation::Unknown,
        }
    }

    /// Retry pass: move every in-flight id back to `pending` and increment its
    /// retry counter. A pass resends everything still unanswered, since the
    /// authority's unresponsiveness is typically systemic. Returns how many
    /// ids were requeued.
    pub fn requeue_in_flight(&mut self) -> usize {
        let requeued: Vec<RequestId> = self.in_flight.drain().map(|(id, _)| id).collect();
        let count = requeued.len();
        for id in &requeued {
            *self.retries.entry(*id).or_insert(0) += 1;
        }
        self.pending.extend(requeued);
        let order = &self.order;
        self.pending
            .sort_by_key(|id| order.get(id).copied().unwrap_or(usize::MAX));
        count
    }

    /// True when every claim has been matched.
    pub fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_empty()
    }

    /// Ids that never received a response, in original batch order.
    pub fn unanswered(&self) -> Vec<RequestId> {
        let mut ids: Vec<RequestId> = self
            .pending
            .iter()
            .copied()
            .chain(self.in_flight.keys().copied())
            .collect();
        let order = &self.order;
        ids.sort_by_key(|id| order.get(id).copied().unwrap_or(usize::MAX));
        ids
    }

    /// Age of the oldest unanswered send, if any claim is in flight.
    pub fn oldest_in_flight_age(&self) -> Option<std::time::Duration> {
        self.in_flight
            .values()
            .map(|entry| entry.sent_at)
            .min()
            .map(|sent_at| sent_at.elapsed())
    }

    pub fn retries(&self, id: RequestId) -> u32 {
        self.retries.get(&id).copied().unwrap_or(0)
    }

    pub fn batch_len(&self) -> usize {
        self.requests.len()
    }

    pub fn counts(&self) -> RunCounts {
        RunCounts {
            pending: self.pending.len(),
            in_flight: self.in_flight.len(),
            completed: self.completed.len(),
        }
    }

    pub fn completed(&self) -> &HashMap<RequestId, ResponseRecord> {
        &self.completed
    }

    pub fn into_completed(self) -> HashMap<RequestId, ResponseRecord> {
        self.completed
    }
}
