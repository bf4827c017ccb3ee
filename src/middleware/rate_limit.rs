//! Fixed-window, per-client-IP request limits for the auth endpoints.
//!
//! Client addresses come from axum's `ConnectInfo`. When the server runs
//! without it (tests, some proxies) every request shares one bucket.

use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;

pub const AUTH_WINDOW: Duration = Duration::from_secs(15 * 60);
pub const REGISTER_MAX_REQUESTS: u32 = 100;
pub const LOGIN_MAX_FAILURES: u32 = 5;

const LIMIT_MESSAGE: &str = "Too many requests, please try again later.";
// Expired windows are swept only once the table grows past this.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    max: u32,
    window: Duration,
    skip_successful: bool,
    clients: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            skip_successful: false,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Successful responses give their hit back, so only failures count.
    pub fn skip_successful(mut self) -> Self {
        self.skip_successful = true;
        self
    }

    /// Records a hit for `client` unless its current window is full.
    pub fn try_acquire(&self, client: IpAddr, now: Instant) -> bool {
        let window = self.window;
        let mut clients = self.clients();
        if clients.len() > PRUNE_THRESHOLD {
            clients.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = clients.entry(client).or_insert(Window {
            started: now,
            hits: 0,
        });
        if now.duration_since(entry.started) >= window {
            *entry = Window {
                started: now,
                hits: 0,
            };
        }
        if entry.hits >= self.max {
            return false;
        }
        entry.hits += 1;
        true
    }

    pub fn release(&self, client: IpAddr) {
        if let Some(window) = self.clients().get_mut(&client) {
            window.hits = window.hits.saturating_sub(1);
        }
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<IpAddr, Window>> {
        self.clients.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Middleware for `axum::middleware::from_fn_with_state`.
pub async fn enforce(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_ip(&req);
    if !limiter.try_acquire(client, Instant::now()) {
        tracing::warn!(%client, path = %req.uri().path(), "rate limit exceeded");
        return Err(AppError::TooManyRequests(LIMIT_MESSAGE.to_string()));
    }

    let response = next.run(req).await;
    if limiter.skip_successful && response.status().is_success() {
        limiter.release(client);
    }
    Ok(response)
}

fn client_ip(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}
