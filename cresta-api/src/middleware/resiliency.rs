use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircuitState {
    Closed,   // Normal operation
    Open,     // Failure detected, failing fast
    HalfOpen, // Testing if service is back
}

/// Per-dependency circuit breaker. The payments handler checks it before
/// calling out and reports the outcome back; while the circuit is open the
/// handler fails fast with `GATEWAY_UNAVAILABLE` instead of queueing work
/// behind a dead provider. Half-open admits exactly one probe at a time.
pub struct CircuitBreaker {
    pub name: String,
    state: RwLock<CircuitState>,
    failure_count: AtomicUsize,
    failure_threshold: usize,
    reset_timeout: Duration,
    last_failure: RwLock<Option<Instant>>,
    probe_inflight: AtomicBool,
}

impl CircuitBreaker {
    pub fn new(name: &str, threshold: usize, timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicUsize::new(0),
            failure_threshold: threshold,
            reset_timeout: timeout,
            last_failure: RwLock::new(None),
            probe_inflight: AtomicBool::new(false),
        }
    }

    pub async fn check(&self) -> bool {
        let state = *self.state.read().await;
        if state == CircuitState::Closed {
            return true;
        }

        if state == CircuitState::Open {
            let last_fail = *self.last_failure.read().await;
            if let Some(instant) = last_fail {
                if instant.elapsed() > self.reset_timeout {
                    let mut s = self.state.write().await;
                    *s = CircuitState::HalfOpen;
                    self.probe_inflight.store(true, Ordering::SeqCst);
                    tracing::info!("Circuit Breaker [{}] moving to Half-Open", self.name);
                    return true;
                }
            }
            return false;
        }

        // Half-Open: only the single probe slot goes through
        !self.probe_inflight.swap(true, Ordering::SeqCst)
    }

    pub async fn record_success(&self) {
        let mut state = self.state.write().await;
        if *state == CircuitState::HalfOpen {
            *state = CircuitState::Closed;
            self.failure_count.store(0, Ordering::SeqCst);
            tracing::info!("Circuit Breaker [{}] recovered to Closed", self.name);
        } else if *state == CircuitState::Closed {
            self.failure_count.store(0, Ordering::SeqCst);
        }
        self.probe_inflight.store(false, Ordering::SeqCst);
    }

    pub async fn record_failure(&self) {
        let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.write().await;

        if count >= self.failure_threshold || *state == CircuitState::HalfOpen {
            *state = CircuitState::Open;
            let mut last = self.last_failure.write().await;
            *last = Some(Instant::now());
            tracing::error!(
                "Circuit Breaker [{}] TRIPPED to Open. Failures: {}",
                self.name,
                count
            );
        }
        self.probe_inflight.store(false, Ordering::SeqCst);
    }

    /// Hand back a probe slot claimed by `check` when the request turned
    /// around before the dependency was ever called. Without this a
    /// half-open circuit whose probe hit a precondition failure would hold
    /// the slot forever and refuse every later caller.
    pub fn release_probe(&self) {
        self.probe_inflight.store(false, Ordering::SeqCst);
    }

    pub async fn current_state(&self) -> CircuitState {
        *self.state.read().await
    }
}
