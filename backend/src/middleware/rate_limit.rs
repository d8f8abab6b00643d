use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::{
    net::IpAddr,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub anonymous_limit: u32,
    pub authenticated_limit: u32,
    pub window_secs: u64,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            anonymous_limit: 100,
            authenticated_limit: 500,
            window_secs: 60,
            burst_size: 30,
        }
    }
}

impl RateLimitConfig {
    pub fn read_heavy() -> Self {
        Self {
            anonymous_limit: 150,
            authenticated_limit: 1000,
            window_secs: 60,
            burst_size: 50,
        }
    }

    pub fn write_heavy() -> Self {
        Self {
            anonymous_limit: 50,
            authenticated_limit: 200,
            window_secs: 60,
            burst_size: 20,
        }
    }

    /// every request here costs a model call
    pub fn expensive() -> Self {
        Self {
            anonymous_limit: 10,
            authenticated_limit: 30,
            window_secs: 60,
            burst_size: 5,
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Clone)]
pub enum RateLimiterBackend {
    Memory(MemoryBackend),
    Redis(RedisBackend),
}

impl RateLimiterBackend {
    pub fn memory() -> Self {
        Self::Memory(MemoryBackend::new())
    }

    /// Falls back to memory when redis can't be reached at startup.
    pub async fn connect(redis_url: Option<&str>) -> Self {
        let Some(url) = redis_url else {
            return Self::memory();
        };

        match redis::Client::open(url) {
            Ok(client) => match ConnectionManager::new(client).await {
                Ok(conn) => {
                    tracing::info!("Rate limit counters stored in redis");
                    Self::Redis(RedisBackend {
                        conn,
                        fallback: MemoryBackend::new(),
                    })
                }
                Err(e) => {
                    warn!("Failed to connect to Redis, using memory backend: {}", e);
                    Self::memory()
                }
            },
            Err(e) => {
                warn!("Failed to parse Redis URL, using memory backend: {}", e);
                Self::memory()
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Redis(_) => "redis",
        }
    }

    async fn check_rate_limit(
        &self,
        key: &str,
        limit: u32,
        window_secs: u64,
        burst_size: u32,
    ) -> Result<RateLimitResult, String> {
        match self {
            Self::Memory(backend) => backend.check(key, limit, window_secs, burst_size).await,
            Self::Redis(backend) => backend.check(key, limit, window_secs, burst_size).await,
        }
    }
}

#[derive(Clone)]
pub struct MemoryBackend {
    store: Arc<DashMap<String, RateLimitEntry>>,
}

impl MemoryBackend {
    fn new() -> Self {
        Self {
            store: Arc::new(DashMap::new()),
        }
    }

    async fn check(
        &self,
        key: &str,
        limit: u32,
        window_secs: u64,
        burst_size: u32,
    ) -> Result<RateLimitResult, String> {
        if window_secs == 0 {
            return Err("window_secs must be positive".to_string());
        }

        let now = now_secs();
        let window_start = (now / window_secs) * window_secs;
        let reset_at = window_start + window_secs;
        let total_limit = limit + burst_size;

        let mut entry = self.store.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            window_start,
        });

        if entry.window_start < window_start {
            entry.count = 0;
            entry.window_start = window_start;
        }

        if entry.count >= total_limit {
            return Ok(RateLimitResult {
                allowed: false,
                limit: total_limit,
                remaining: 0,
                reset_at,
            });
        }

        entry.count += 1;

        Ok(RateLimitResult {
            allowed: true,
            limit: total_limit,
            remaining: total_limit.saturating_sub(entry.count),
            reset_at,
        })
    }
}

/// Shares counters between instances. Redis failures degrade to the
/// per-process memory counters instead of failing the request.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
    fallback: MemoryBackend,
}

impl RedisBackend {
    async fn check(
        &self,
        key: &str,
        limit: u32,
        window_secs: u64,
        burst_size: u32,
    ) -> Result<RateLimitResult, String> {
        if window_secs == 0 {
            return Err("window_secs must be positive".to_string());
        }

        let window_start = (now_secs() / window_secs) * window_secs;
        let redis_key = format!("ratelimit:{}:{}", key, window_start);
        let mut conn = self.conn.clone();

        let count: redis::RedisResult<u64> = redis::cmd("INCR")
            .arg(&redis_key)
            .query_async(&mut conn)
            .await;

        let count = match count {
            Ok(count) => count,
            Err(e) => {
                warn!("Redis rate limit check failed, using memory: {}", e);
                return self.fallback.check(key, limit, window_secs, burst_size).await;
            }
        };

        if count == 1 {
            let expired: redis::RedisResult<()> = redis::cmd("EXPIRE")
                .arg(&redis_key)
                .arg(window_secs)
                .query_async(&mut conn)
                .await;
            if let Err(e) = expired {
                warn!("Failed to set expiry on {}: {}", redis_key, e);
            }
        }

        let total_limit = limit + burst_size;
        let count = u32::try_from(count).unwrap_or(u32::MAX);

        Ok(RateLimitResult {
            allowed: count <= total_limit,
            limit: total_limit,
            remaining: total_limit.saturating_sub(count),
            reset_at: window_start + window_secs,
        })
    }
}

#[derive(Debug, Clone)]
struct RateLimitEntry {
    count: u32,
    window_start: u64,
}

#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserTier {
    Anonymous,
    Authenticated,
}

#[derive(Clone)]
pub struct RateLimitLayer {
    backend: RateLimiterBackend,
    config: RateLimitConfig,
    /// keeps tiers from sharing counters
    scope: &'static str,
    principal_header: String,
}

impl RateLimitLayer {
    pub fn new(
        backend: RateLimiterBackend,
        config: RateLimitConfig,
        scope: &'static str,
        principal_header: &str,
    ) -> Self {
        Self {
            backend,
            config,
            scope,
            principal_header: principal_header.to_ascii_lowercase(),
        }
    }

    pub fn read_heavy(backend: RateLimiterBackend, principal_header: &str) -> Self {
        Self::new(backend, RateLimitConfig::read_heavy(), "read", principal_header)
    }

    pub fn write_heavy(backend: RateLimiterBackend, principal_header: &str) -> Self {
        Self::new(backend, RateLimitConfig::write_heavy(), "write", principal_header)
    }

    pub fn expensive(backend: RateLimiterBackend, principal_header: &str) -> Self {
        Self::new(backend, RateLimitConfig::expensive(), "expensive", principal_header)
    }

    pub async fn middleware(
        &self,
        headers: HeaderMap,
        request: Request,
        next: Next,
    ) -> Response {
        let ip_addr = client_ip(&headers);
        let (user_key, tier) = self.extract_user_info(&headers, ip_addr);

        let limit = match tier {
            UserTier::Anonymous => self.config.anonymous_limit,
            UserTier::Authenticated => self.config.authenticated_limit,
        };

        debug!(
            "Rate limit check - Key: {}, Tier: {:?}, Limit: {}",
            user_key, tier, limit
        );

        match self
            .backend
            .check_rate_limit(
                &format!("{}:{}", self.scope, user_key),
                limit,
                self.config.window_secs,
                self.config.burst_size,
            )
            .await
        {
            Ok(result) => {
                if result.allowed {
                    let mut response = next.run(request).await;
                    add_rate_limit_headers(&mut response, &result);
                    response
                } else {
                    debug!("Rate limit exceeded for: {}", user_key);
                    rate_limit_exceeded_response(&result)
                }
            }
            Err(e) => {
                error!("Rate limit check error: {}", e);
                next.run(request).await
            }
        }
    }

    fn extract_user_info(&self, headers: &HeaderMap, ip_addr: IpAddr) -> (String, UserTier) {
        if let Some(email) = headers
            .get(self.principal_header.as_str())
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|e| !e.is_empty())
        {
            return (format!("user:{}", email.to_ascii_lowercase()), UserTier::Authenticated);
        }

        if let Some(key_str) = headers.get("x-api-key").and_then(|h| h.to_str().ok()) {
            return (format!("api:{}", key_str), UserTier::Authenticated);
        }

        (format!("ip:{}", ip_addr), UserTier::Anonymous)
    }
}

fn client_ip(headers: &HeaderMap) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
        .unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

fn add_rate_limit_headers(response: &mut Response, result: &RateLimitResult) {
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(result.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(result.remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(result.reset_at));
}

fn rate_limit_exceeded_response(result: &RateLimitResult) -> Response {
    let retry_after = result.reset_at.saturating_sub(now_secs());

    let body = serde_json::json!({
        "error": "Rate limit exceeded",
        "details": format!(
            "Too many requests. Please try again in {} seconds.",
            retry_after
        ),
        "limit": result.limit,
        "reset_at": result.reset_at,
        "retry_after": retry_after,
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();

    add_rate_limit_headers(&mut response, result);
    response
        .headers_mut()
        .insert("Retry-After", HeaderValue::from(retry_after));

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend() {
        let backend = RateLimiterBackend::memory();
        let config = RateLimitConfig {
            anonymous_limit: 5,
            authenticated_limit: 10,
            window_secs: 60,
            burst_size: 2,
        };

        for i in 1..=5 {
            let result = backend
                .check_rate_limit("test_user", config.anonymous_limit, config.window_secs, config.burst_size)
                .await
                .unwrap();
            assert!(result.allowed, "Request {} should be allowed", i);
        }

        for i in 1..=2 {
            let result = backend
                .check_rate_limit("test_user", config.anonymous_limit, config.window_secs, config.burst_size)
                .await
                .unwrap();
            assert!(result.allowed, "Burst request {} should be allowed", i);
        }

        let result = backend
            .check_rate_limit("test_user", config.anonymous_limit, config.window_secs, config.burst_size)
            .await
            .unwrap();
        assert!(!result.allowed, "Request should be rate limited");
        assert_eq!(result.remaining, 0);
        assert_eq!(result.limit, 7);
    }

    #[tokio::test]
    async fn test_different_users() {
        let backend = RateLimiterBackend::memory();
        let config = RateLimitConfig::expensive();

        for _ in 0..(config.anonymous_limit + config.burst_size) {
            backend
                .check_rate_limit("user1", config.anonymous_limit, config.window_secs, config.burst_size)
                .await
                .unwrap();
        }

        let result = backend
            .check_rate_limit("user2", config.anonymous_limit, config.window_secs, config.burst_size)
            .await
            .unwrap();
        assert!(result.allowed, "Different user should not be rate limited");
    }

    #[tokio::test]
    async fn unreachable_redis_falls_back_to_memory() {
        let backend = RateLimiterBackend::connect(Some("not a redis url")).await;
        assert_eq!(backend.name(), "memory");

        let backend = RateLimiterBackend::connect(None).await;
        assert_eq!(backend.name(), "memory");
    }

    #[test]
    fn principal_beats_api_key_and_ip() {
        let layer = RateLimitLayer::read_heavy(RateLimiterBackend::memory(), "X-Auth-Email");
        let ip = IpAddr::from([10, 0, 0, 7]);

        let mut headers = HeaderMap::new();
        assert_eq!(
            layer.extract_user_info(&headers, ip),
            ("ip:10.0.0.7".to_string(), UserTier::Anonymous)
        );

        headers.insert("x-api-key", HeaderValue::from_static("k1"));
        assert_eq!(
            layer.extract_user_info(&headers, ip),
            ("api:k1".to_string(), UserTier::Authenticated)
        );

        headers.insert("x-auth-email", HeaderValue::from_static("Eve@Example.com"));
        assert_eq!(
            layer.extract_user_info(&headers, ip),
            ("user:eve@example.com".to_string(), UserTier::Authenticated)
        );
    }

    #[test]
    fn forwarded_ip_is_used() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        assert_eq!(client_ip(&headers), IpAddr::from([203, 0, 113, 9]));

        assert_eq!(client_ip(&HeaderMap::new()), IpAddr::from([127, 0, 0, 1]));
    }
}
