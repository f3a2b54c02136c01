use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Result, ensure};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use erp_gateway_errors::Problem;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;

const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Tracked clients above which expired windows are swept on the next check.
const PRUNE_ABOVE: usize = 4096;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Per-client-IP fixed window: at most `requests` admitted from one address
/// between the window's first request and `window` later.
pub struct ClientRateLimiter {
    windows: DashMap<IpAddr, Window>,
    requests: u32,
    window: Duration,
    limit: HeaderValue,
    prune_above: usize,
}

impl ClientRateLimiter {
    /// # Errors
    /// Returns an error if the request count or window is zero.
    pub fn new(requests: u32, window: Duration) -> Result<Self> {
        ensure!(requests > 0, "rate limit requests is zero");
        ensure!(!window.is_zero(), "rate limit window is zero");
        Ok(Self {
            windows: DashMap::new(),
            requests,
            window,
            limit: requests.into(),
            prune_above: PRUNE_ABOVE,
        })
    }

    /// # Errors
    /// See [`ClientRateLimiter::new`].
    pub fn from_config(config: &RateLimitConfig) -> Result<Self> {
        Self::new(config.requests, Duration::from_secs(config.window_secs))
    }

    /// Remaining capacity on admission.
    ///
    /// # Errors
    /// The wait until `client`'s window closes.
    pub fn check(&self, client: IpAddr) -> Result<u32, Duration> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> Result<u32, Duration> {
        if self.windows.len() > self.prune_above {
            self.prune_expired(now);
        }

        let mut slot = self.windows.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });
        let elapsed = now.saturating_duration_since(slot.started);
        if elapsed >= self.window {
            *slot = Window {
                started: now,
                count: 0,
            };
        } else if slot.count >= self.requests {
            return Err(self.window.saturating_sub(elapsed));
        }

        slot.count += 1;
        Ok(self.requests - slot.count)
    }

    /// Forget clients whose window has closed.
    pub fn prune_expired(&self, now: Instant) {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
        debug!(before, after = self.windows.len(), "pruned rate limit windows");
    }

    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

impl std::fmt::Debug for ClientRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRateLimiter")
            .field("requests", &self.requests)
            .field("window", &self.window)
            .field("tracked", &self.windows.len())
            .finish_non_exhaustive()
    }
}

/// Peer address of the connection. Requests served without connect info
/// (in-process tests, some proxies) share one bucket.
#[must_use]
pub fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |ConnectInfo(addr)| addr.ip())
}

pub async fn limit_by_client_ip(
    State(limiter): State<Arc<ClientRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_ip(&request);

    match limiter.check(client) {
        Ok(remaining) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(X_RATELIMIT_LIMIT, limiter.limit.clone());
            headers.insert(X_RATELIMIT_REMAINING, remaining.into());
            response
        }
        Err(wait) => {
            // Round up so a client honouring Retry-After is admitted.
            let retry_after = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            warn!(%client, retry_after, path = %request.uri().path(), "rate limit exceeded");
            let mut response = Problem::rate_limited(format!(
                "Too many requests; retry in {retry_after} seconds"
            ))
            .into_response();
            let headers = response.headers_mut();
            headers.insert(header::RETRY_AFTER, retry_after.max(1).into());
            headers.insert(X_RATELIMIT_LIMIT, limiter.limit.clone());
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from_static("0"));
            response
        }
    }
}
