use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::AppState;

/// The authenticated user's id, stored in request extensions.
#[derive(Clone, Debug)]
pub struct UserContext(pub String);

/// Middleware to authenticate requests via `X-EchoBase-User` or
/// `Authorization: Bearer`.
///
/// # Security Note
///
/// Signup and login happen at an external auth provider; this server only
/// resolves the provider-issued user id. In the current phase the bearer
/// token IS the user id — there is no per-request signature verification
/// yet. Session tokens are a known follow-up once the provider callback is
/// wired in.
pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    // 1. Extract user id from header
    let user_id = if let Some(val) = req.headers().get("X-EchoBase-User") {
        val.to_str()
            .map_err(|_| StatusCode::UNAUTHORIZED)?
            .to_string()
    } else if let Some(val) = req.headers().get("Authorization") {
        let val_str = val.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;
        if let Some(token) = val_str.strip_prefix("Bearer ") {
            token.to_string()
        } else {
            return Err(StatusCode::UNAUTHORIZED);
        }
    } else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    if user_id.trim().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    // 2. Get AppState
    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?
        .clone();

    // 3. Verify the user is known (blocking DB operation)
    let lookup_id = user_id.clone();
    let known = tokio::task::spawn_blocking(move || {
        let conn = state
            .pool
            .get()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        // Any lookup error is treated as unauthorized for security.
        echobase_store::user_exists(&conn, &lookup_id).map_err(|_| StatusCode::UNAUTHORIZED)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    if !known {
        return Err(StatusCode::UNAUTHORIZED);
    }

    // 4. Insert into extensions
    req.extensions_mut().insert(UserContext(user_id));

    Ok(next.run(req).await)
}

/// In-memory rate limiter state, keyed by client IP.
///
/// Uses a simple fixed window counter. The limiter runs outside the auth
/// layer, so the client address is the only identity available to it.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    state: Arc<Mutex<HashMap<IpAddr, (u32, Instant)>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check if the request is allowed.
    ///
    /// Returns `true` if allowed, `false` if limit exceeded.
    pub fn check(&self, key: IpAddr, limit: u32) -> bool {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // Lock poisoned by a panicked thread. Recover by accepting the
                // poisoned guard — the worst that happens is a stale counter.
                // Refusing all requests because of a poisoned rate-limiter
                // would be a self-inflicted denial of service.
                tracing::error!("rate limiter lock poisoned, recovering with stale state");
                poisoned.into_inner()
            }
        };
        let now = Instant::now();

        // Periodic cleanup to prevent memory leak. Evict only entries whose
        // window has expired, preserving active rate limits.
        if state.len() > 10000 {
            state.retain(|_, (_, start)| now.duration_since(*start) <= Duration::from_secs(60));
        }

        let (count, start) = state.entry(key).or_insert((0, now));

        if now.duration_since(*start) > Duration::from_secs(60) {
            // Reset window
            *count = 1;
            *start = now;
            true
        } else {
            *count += 1;
            *count <= limit
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Rate limiting middleware, keyed by client IP.
///
/// Runs before authentication, so it throttles credential-less probing
/// too. Voice-turn requests get a tighter limit than the rest of the API
/// since each one fans out to three vendor calls.
pub async fn rate_limit_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    // 1. Get AppState
    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?
        .clone();

    // 2. Identify the client
    let key = if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        addr.ip()
    } else {
        // ConnectInfo missing means the server was built without connect
        // info. Fail rather than silently skipping the limit.
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    };

    // 3. Pick the limit for this path
    let path = req.uri().path();
    let limit = if path.ends_with("/voice-turn") || path == "/api/stt" {
        state.rate_limits.voice_per_minute
    } else {
        state.rate_limits.default_per_minute
    };

    // 4. Check Limit
    if !state.rate_limiter.check(key, limit) {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
        response.headers_mut().insert(
            axum::http::header::RETRY_AFTER,
            axum::http::HeaderValue::from_static("60"),
        );
        return Ok(response);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limiter_allows_within_limit() {
        let limiter = RateLimiter::new();
        let key: IpAddr = "127.0.0.1".parse().unwrap();
        for _ in 0..5 {
            assert!(limiter.check(key, 5));
        }
        // 6th request should be denied
        assert!(!limiter.check(key, 5));
    }

    #[test]
    fn rate_limiter_different_addresses_independent() {
        let limiter = RateLimiter::new();
        let addr_a: IpAddr = "10.0.0.1".parse().unwrap();
        let addr_b: IpAddr = "10.0.0.2".parse().unwrap();

        // Fill up addr_a
        for _ in 0..3 {
            assert!(limiter.check(addr_a, 3));
        }
        assert!(!limiter.check(addr_a, 3));

        // addr_b should still be allowed
        assert!(limiter.check(addr_b, 3));
    }

    #[test]
    fn rate_limiter_eviction_preserves_active_limits() {
        let limiter = RateLimiter::new();

        // Fill with 10001 distinct IPs to trigger eviction
        for i in 0..10001u32 {
            let ip: IpAddr = std::net::Ipv4Addr::from(i.to_be_bytes()).into();
            limiter.check(ip, 100);
        }

        // The most recent entry is within its window, so eviction must not
        // have reset its counter.
        let key: IpAddr = std::net::Ipv4Addr::from(10000u32.to_be_bytes()).into();
        for _ in 0..99 {
            assert!(limiter.check(key, 100));
        }
        // Now at 101 total, should be denied
        assert!(!limiter.check(key, 100));
    }
}
