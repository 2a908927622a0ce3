//! Aggregate health state with hysteresis.
//!
//! The aggregate remembers *when* it entered its current status. Polls
//! that confirm the same status leave that instant untouched, so a
//! monitor sees a stable "unhealthy since T" while a fault persists.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::status::Status;

/// Snapshot of the aggregate verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateState {
    status: Status,
    entered_at: Instant,
}

impl AggregateState {
    pub fn new(status: Status, entered_at: Instant) -> Self {
        Self { status, entered_at }
    }

    /// Initial state: `Unknown`, entered now.
    pub fn unknown() -> Self {
        Self::new(Status::Unknown, Instant::now())
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Instant the current status was entered.
    pub fn entered_at(&self) -> Instant {
        self.entered_at
    }

    /// Time spent in the current status.
    pub fn since(&self) -> Duration {
        self.since_at(Instant::now())
    }

    pub fn since_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.entered_at)
    }

    /// Fold one evaluation outcome into this state.
    ///
    /// Returns `self` unchanged unless the outcome differs from the
    /// current status, in which case the new status is entered at `now`.
    pub fn transition(self, failing: bool, now: Instant) -> Self {
        let target = if failing {
            Status::Unhealthy
        } else {
            Status::Healthy
        };
        if self.status == target {
            self
        } else {
            Self::new(target, now)
        }
    }
}

impl Default for AggregateState {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Owner of the single process-wide aggregate.
///
/// Read, compare and replace happen under one lock, so two requests
/// evaluated concurrently cannot overwrite each other's transition.
#[derive(Debug, Default)]
pub struct HealthState {
    current: Mutex<AggregateState>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot without applying an evaluation.
    pub fn current(&self) -> AggregateState {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply an evaluation outcome taken now.
    pub fn observe(&self, failing: bool) -> AggregateState {
        self.observe_at(failing, Instant::now())
    }

    /// Apply an evaluation outcome taken at `now` and return the
    /// resulting state.
    pub fn observe_at(&self, failing: bool, now: Instant) -> AggregateState {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = *current;
        let next = previous.transition(failing, now);
        if next != previous {
            if failing {
                warn!(
                    previous = %previous.status(),
                    after = ?previous.since_at(now),
                    "aggregate health entered Unhealthy"
                );
            } else {
                info!(
                    previous = %previous.status(),
                    after = ?previous.since_at(now),
                    "aggregate health entered Healthy"
                );
            }
        }
        *current = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unknown() {
        let state = HealthState::new();
        assert_eq!(state.current().status(), Status::Unknown);
    }

    #[test]
    fn first_evaluation_leaves_unknown() {
        let state = HealthState::new();
        let t1 = Instant::now();
        let healthy = state.observe_at(false, t1);
        assert_eq!(healthy.status(), Status::Healthy);
        assert_eq!(healthy.entered_at(), t1);

        let state = HealthState::new();
        let unhealthy = state.observe_at(true, t1);
        assert_eq!(unhealthy.status(), Status::Unhealthy);
        assert_eq!(unhealthy.entered_at(), t1);
    }

    #[test]
    fn repeated_unhealthy_keeps_since() {
        let state = HealthState::new();
        let t1 = Instant::now();
        let t2 = t1 + Duration::from_secs(5);

        state.observe_at(true, t1);
        let again = state.observe_at(true, t2);

        assert_eq!(again.status(), Status::Unhealthy);
        assert_eq!(again.entered_at(), t1);
        assert_eq!(again.since_at(t2), Duration::from_secs(5));
    }

    #[test]
    fn healthy_to_unhealthy_resets_since() {
        let state = HealthState::new();
        let t1 = Instant::now();
        let t2 = t1 + Duration::from_secs(30);

        state.observe_at(false, t1);
        let next = state.observe_at(true, t2);

        assert_eq!(next.status(), Status::Unhealthy);
        assert_eq!(next.entered_at(), t2);
        assert!(next.entered_at() > t1);
    }

    #[test]
    fn recovery_resets_since() {
        let t1 = Instant::now();
        let t2 = t1 + Duration::from_secs(2);
        let unhealthy = AggregateState::new(Status::Unhealthy, t1);

        let healthy = unhealthy.transition(false, t2);
        assert_eq!(healthy.status(), Status::Healthy);
        assert_eq!(healthy.entered_at(), t2);

        let still = healthy.transition(false, t2 + Duration::from_secs(9));
        assert_eq!(still.entered_at(), t2);
    }

    #[test]
    fn concurrent_observers_enter_unhealthy_once() {
        let state = std::sync::Arc::new(HealthState::new());
        let t0 = Instant::now();
        state.observe_at(false, t0);

        let threads: Vec<_> = (1..=8u64)
            .map(|i| {
                let state = state.clone();
                std::thread::spawn(move || {
                    state.observe_at(true, t0 + Duration::from_secs(i)).entered_at()
                })
            })
            .collect();
        let seen: Vec<Instant> = threads.into_iter().map(|t| t.join().unwrap()).collect();

        // Whichever thread won the transition, everyone agrees on its instant.
        let entered = state.current().entered_at();
        assert!(seen.iter().all(|t| *t == entered));
    }

    #[test]
    fn since_never_goes_negative() {
        let t1 = Instant::now();
        let state = AggregateState::new(Status::Healthy, t1 + Duration::from_secs(10));
        assert_eq!(state.since_at(t1), Duration::ZERO);
    }
}
