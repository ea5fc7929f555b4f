// web-server/src/middleware/rate_limiter.rs
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Instant, Duration};
use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
    Error, ResponseError,
    HttpResponse
};
use common::RateLimitConfig;
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::fmt;

use super::matches_prefix;

// Hard cap on tracked clients; past it the longest-tracked one is evicted
const MAX_TRACKED_CLIENTS: usize = 4096;

#[derive(Debug)]
struct RateLimitExceeded {
    retry_after: u64,
}

impl fmt::Display for RateLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rate limit exceeded")
    }
}

impl ResponseError for RateLimitExceeded {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::TooManyRequests()
            .append_header((header::RETRY_AFTER, self.retry_after.to_string()))
            .json(serde_json::json!({
                "message": "Too many login attempts. Please try again later."
            }))
    }
}

#[derive(Debug)]
struct HitStore {
    clients: HashMap<String, Vec<Instant>>,
    // Insertion order of `clients`, oldest first
    order: VecDeque<String>,
    last_sweep: Instant,
}

impl HitStore {
    fn new(now: Instant) -> Self {
        Self {
            clients: HashMap::new(),
            order: VecDeque::new(),
            last_sweep: now,
        }
    }

    fn sweep(&mut self, now: Instant, window: Duration) {
        self.clients
            .retain(|_, hits| hits.iter().any(|t| now.duration_since(*t) < window));
        let clients = &self.clients;
        self.order.retain(|ip| clients.contains_key(ip));
        self.last_sweep = now;
    }

    fn track(&mut self, ip: &str, max_clients: usize) -> &mut Vec<Instant> {
        if !self.clients.contains_key(ip) {
            while self.clients.len() >= max_clients {
                match self.order.pop_front() {
                    Some(evicted) => {
                        self.clients.remove(&evicted);
                    },
                    None => break,
                }
            }
            self.order.push_back(ip.to_string());
        }
        self.clients.entry(ip.to_string()).or_default()
    }
}

/// Sliding-window limit per client IP on selected path prefixes
#[derive(Debug, Clone)]
pub struct RateLimiter {
    paths: Vec<String>,
    max_requests: usize,
    window: Duration,
    trust_forwarded_for: bool,
    max_clients: usize,
    store: Arc<Mutex<HitStore>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_client_cap(config, MAX_TRACKED_CLIENTS)
    }

    fn with_client_cap(config: &RateLimitConfig, max_clients: usize) -> Self {
        Self {
            paths: config.paths.clone(),
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
            trust_forwarded_for: config.trust_forwarded_for,
            max_clients: max_clients.max(1),
            store: Arc::new(Mutex::new(HitStore::new(Instant::now()))),
        }
    }

    fn client_key(&self, req: &ServiceRequest) -> String {
        if self.trust_forwarded_for {
            if let Some(ip) = req.connection_info().realip_remote_addr() {
                return ip.to_string();
            }
        }

        req.peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn is_rate_limited(&self, ip: &str, now: Instant) -> bool {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        let window = self.window;

        if now.saturating_duration_since(store.last_sweep) >= window {
            store.sweep(now, window);
        }

        let hits = store.track(ip, self.max_clients);
        hits.retain(|t| now.duration_since(*t) < window);

        if hits.len() >= self.max_requests {
            true
        } else {
            hits.push(now);
            false
        }
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.store.lock().unwrap_or_else(PoisonError::into_inner).clients.len()
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            limiter: self.clone(),
        }))
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let should_rate_limit = self.limiter.paths.iter().any(|p| matches_prefix(req.path(), p));

        if should_rate_limit {
            let ip = self.limiter.client_key(&req);

            if self.limiter.is_rate_limited(&ip, Instant::now()) {
                tracing::warn!("Rate limit exceeded for IP: {}", ip);
                let retry_after = self.limiter.window.as_secs();
                let response = req.error_response(RateLimitExceeded { retry_after });
                return Box::pin(async move {
                    Ok(response.map_into_right_body())
                });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            fut.await.map(ServiceResponse::map_into_left_body)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_requests: usize, window_secs: u64) -> RateLimitConfig {
        RateLimitConfig {
            paths: vec!["/api/auth".to_string()],
            max_requests,
            window_secs,
            trust_forwarded_for: false,
        }
    }

    fn limiter(max_requests: usize, window_secs: u64) -> RateLimiter {
        RateLimiter::new(&config(max_requests, window_secs))
    }

    #[test]
    fn test_limits_per_client() {
        let limiter = limiter(2, 60);
        let now = Instant::now();

        assert!(!limiter.is_rate_limited("10.0.0.1", now));
        assert!(!limiter.is_rate_limited("10.0.0.1", now));
        assert!(limiter.is_rate_limited("10.0.0.1", now));
        assert!(!limiter.is_rate_limited("10.0.0.2", now));
    }

    #[test]
    fn test_window_slides() {
        let limiter = limiter(1, 60);
        let now = Instant::now();

        assert!(!limiter.is_rate_limited("10.0.0.1", now));
        assert!(limiter.is_rate_limited("10.0.0.1", now + Duration::from_secs(59)));
        assert!(!limiter.is_rate_limited("10.0.0.1", now + Duration::from_secs(61)));
    }

    #[test]
    fn test_client_table_is_capped() {
        let limiter = RateLimiter::with_client_cap(&config(1, 60), 3);
        let now = Instant::now();

        for i in 0..100 {
            assert!(!limiter.is_rate_limited(&format!("10.0.1.{}", i), now));
            assert!(limiter.tracked_clients() <= 3);
        }

        // The newest clients are still remembered
        assert!(limiter.is_rate_limited("10.0.1.99", now));
        // The oldest was evicted and starts over
        assert!(!limiter.is_rate_limited("10.0.1.0", now));
    }

    #[test]
    fn test_idle_clients_are_swept_once_per_window() {
        let limiter = limiter(5, 60);
        let now = Instant::now();

        for i in 0..10 {
            limiter.is_rate_limited(&format!("10.0.2.{}", i), now);
        }
        assert_eq!(limiter.tracked_clients(), 10);

        limiter.is_rate_limited("10.0.3.1", now + Duration::from_secs(120));
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_forwarded_header_ignored_by_default() {
        let limiter = limiter(1, 60);
        let req = actix_web::test::TestRequest::default()
            .peer_addr("192.0.2.7:40000".parse().unwrap())
            .insert_header(("x-forwarded-for", "203.0.113.9"))
            .to_srv_request();
        assert_eq!(limiter.client_key(&req), "192.0.2.7");

        let trusting = RateLimiter::new(&RateLimitConfig {
            trust_forwarded_for: true,
            ..config(1, 60)
        });
        assert_eq!(trusting.client_key(&req), "203.0.113.9");
    }
}
