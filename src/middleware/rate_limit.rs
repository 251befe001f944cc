use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

#[derive(Debug)]
struct Window {
    started: Instant,
    second: AtomicU64,
    count: AtomicU32,
}

/// Fixed one-second window per router. Counts may straddle a window reset
/// under contention; the limit is approximate, not exact.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    rps: u32,
    window: Arc<Window>,
}

impl RateLimiter {
    fn new(rps: u32) -> Self {
        Self {
            rps: rps.max(1),
            window: Arc::new(Window {
                started: Instant::now(),
                second: AtomicU64::new(0),
                count: AtomicU32::new(0),
            }),
        }
    }

    fn allow(&self) -> bool {
        let elapsed = self.window.started.elapsed().as_secs();
        let current = self.window.second.load(Ordering::Acquire);
        if elapsed != current
            && self
                .window
                .second
                .compare_exchange(current, elapsed, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            self.window.count.store(0, Ordering::Release);
        }
        self.window.count.fetch_add(1, Ordering::AcqRel) < self.rps
    }
}

pub async fn rps_middleware(
    State(state): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !state.allow() {
        return (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded").into_response();
    }
    next.run(req).await
}

pub fn new_rps_state(rps: u32) -> RateLimiter {
    RateLimiter::new(rps)
}
