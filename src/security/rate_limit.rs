//! Per-client rate limiting with background state eviction.
//!
//! One token bucket per client address, all buckets behind a single lock.
//! The lock is only ever held for the map operation plus the bucket
//! arithmetic; nothing inside the critical section awaits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::config::LimiterConfig;
use crate::http::request::client_ip;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;

/// How often the reaper sweeps the registry.
const REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Idle age after which a client's state is evicted.
const IDLE_EVICTION: Duration = Duration::from_secs(180);

/// A token bucket: refills continuously at the configured rate, capped at
/// the burst capacity, and never goes below zero.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// A fresh bucket starts full: a brand-new client gets the whole burst.
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Per-client limiter state.
#[derive(Debug)]
struct ClientState {
    bucket: TokenBucket,
    last_seen: Instant,
}

/// Self-cleaning registry of per-client limiter state.
pub struct ClientRegistry {
    clients: Mutex<HashMap<String, ClientState>>,
    rps: f64,
    burst: f64,
}

impl ClientRegistry {
    pub fn new(config: &LimiterConfig) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            rps: config.rps,
            burst: f64::from(config.burst),
        }
    }

    /// Admit or reject one request from `client_id`, creating state for
    /// first-time clients.
    pub fn admit(&self, client_id: &str) -> bool {
        let mut clients = self.clients.lock().expect("client registry mutex poisoned");
        let state = clients
            .entry(client_id.to_string())
            .or_insert_with(|| ClientState {
                bucket: TokenBucket::new(self.burst),
                last_seen: Instant::now(),
            });
        state.last_seen = Instant::now();
        state.bucket.try_acquire(self.burst, self.rps)
    }

    /// Drop every client not seen for `idle_for`. Returns the eviction count.
    pub fn reap_idle(&self, idle_for: Duration) -> usize {
        let mut clients = self.clients.lock().expect("client registry mutex poisoned");
        let before = clients.len();
        let now = Instant::now();
        clients.retain(|_, state| now.duration_since(state.last_seen) < idle_for);
        before - clients.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().expect("client registry mutex poisoned").len()
    }

    /// Run the sweep loop until the shutdown signal fires.
    pub fn spawn_reaper(self: &Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REAP_INTERVAL);
            // The first tick completes immediately; skip it.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = registry.reap_idle(IDLE_EVICTION);
                        if evicted > 0 {
                            tracing::debug!(
                                evicted,
                                tracked = registry.tracked_clients(),
                                "evicted idle rate limiter clients"
                            );
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("rate limiter reaper stopping");
                        break;
                    }
                }
            }
        });
    }

    #[cfg(test)]
    fn available_tokens(&self, client_id: &str) -> Option<f64> {
        self.clients
            .lock()
            .unwrap()
            .get(client_id)
            .map(|state| state.bucket.tokens)
    }
}

/// Admission middleware: rejects with 429 before anything downstream runs.
pub async fn admit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if !state.config.limiter.enabled {
        return next.run(req).await;
    }

    let client = client_ip(&req);
    if state.clients.admit(&client) {
        next.run(req).await
    } else {
        tracing::warn!(client = %client, path = %req.uri().path(), "rate limit exceeded");
        metrics::record_rate_limited();
        ApiError::RateLimited.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(rps: f64, burst: u32) -> ClientRegistry {
        ClientRegistry::new(&LimiterConfig {
            enabled: true,
            rps,
            burst,
        })
    }

    #[tokio::test]
    async fn burst_is_honored_then_exhausted() {
        // rps=2, burst=4: five rapid requests admit exactly four.
        let registry = registry(2.0, 4);
        let admitted = (0..5).filter(|_| registry.admit("client")).count();
        assert_eq!(admitted, 4);
    }

    #[tokio::test]
    async fn tokens_stay_within_bounds() {
        let registry = registry(2.0, 4);
        for _ in 0..20 {
            registry.admit("client");
            let tokens = registry.available_tokens("client").unwrap();
            assert!((0.0..=4.0).contains(&tokens), "tokens out of bounds: {tokens}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn refill_never_exceeds_burst() {
        let registry = registry(100.0, 4);
        assert!(registry.admit("client"));
        // Ample refill time; the bucket must still cap at burst.
        tokio::time::advance(Duration::from_secs(60)).await;
        let admitted = (0..10).filter(|_| registry.admit("client")).count();
        assert_eq!(admitted, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn tokens_refill_over_time() {
        let registry = registry(2.0, 2);
        assert!(registry.admit("client"));
        assert!(registry.admit("client"));
        assert!(!registry.admit("client"));

        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(registry.admit("client"), "one token should have refilled");
        assert!(!registry.admit("client"));
    }

    #[tokio::test]
    async fn clients_are_limited_independently() {
        let registry = registry(1.0, 1);
        assert!(registry.admit("alpha"));
        assert!(registry.admit("beta"));
        assert!(!registry.admit("alpha"));
        assert!(!registry.admit("beta"));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_clients_are_reaped_active_ones_kept() {
        let registry = registry(2.0, 4);
        registry.admit("idle");
        tokio::time::advance(Duration::from_secs(120)).await;
        registry.admit("active");

        // "idle" is 2 minutes old, still inside the window.
        assert_eq!(registry.reap_idle(IDLE_EVICTION), 0);

        tokio::time::advance(Duration::from_secs(70)).await;
        // "idle" is now past 3 minutes, "active" is not.
        assert_eq!(registry.reap_idle(IDLE_EVICTION), 1);
        assert_eq!(registry.tracked_clients(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reaper_task_sweeps_and_stops_on_shutdown() {
        let registry = Arc::new(registry(2.0, 4));
        let (tx, rx) = broadcast::channel(1);
        registry.spawn_reaper(rx);
        registry.admit("client");

        // Step past the eviction window one sweep at a time.
        for _ in 0..4 {
            tokio::time::advance(Duration::from_secs(61)).await;
            tokio::task::yield_now().await;
        }
        assert_eq!(registry.tracked_clients(), 0);

        tx.send(()).unwrap();
        tokio::task::yield_now().await;

        // After shutdown the reaper no longer sweeps.
        registry.admit("late");
        for _ in 0..4 {
            tokio::time::advance(Duration::from_secs(61)).await;
            tokio::task::yield_now().await;
        }
        assert_eq!(registry.tracked_clients(), 1);
    }
}
