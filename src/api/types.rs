//! Shared types for the HTTP API layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::core_state::CoreState;

/// Failed logins allowed per email before the lock engages.
pub const MAX_LOGIN_FAILURES: u32 = 5;

/// How long a locked email stays locked.
pub const LOGIN_LOCK_SECS: u64 = 900;

// ═══════════════════════════════════════════════════════════
// API context
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
/// Wraps `CoreState` plus API-specific caches.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
    pub sessions: Arc<Mutex<SessionRegistry>>,
    pub login_lockout: Arc<Mutex<LoginLockout>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        let ttl = Duration::from_secs(core.config.session_ttl_hours.saturating_mul(3600));
        Self {
            core,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new())),
            sessions: Arc::new(Mutex::new(SessionRegistry::new(ttl))),
            login_lockout: Arc::new(Mutex::new(LoginLockout::new())),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// User context, injected by auth middleware
// ═══════════════════════════════════════════════════════════

/// Authenticated user, injected into request extensions by the auth
/// middleware after the bearer token checks out.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: Uuid,
    pub token_hash: [u8; 32],
}

// ═══════════════════════════════════════════════════════════
// Sessions
// ═══════════════════════════════════════════════════════════

struct Session {
    user_id: Uuid,
    expires_at: Instant,
}

/// Bearer sessions keyed by the SHA-256 of the token. Raw tokens are
/// never stored.
pub struct SessionRegistry {
    sessions: HashMap<[u8; 32], Session>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl,
        }
    }

    /// Issue a fresh token for `user_id`. Returns the raw token.
    pub fn issue(&mut self, user_id: Uuid) -> String {
        self.cleanup();
        let token = generate_token();
        self.sessions.insert(
            hash_token(&token),
            Session {
                user_id,
                expires_at: Instant::now() + self.ttl,
            },
        );
        token
    }

    /// The user behind a token hash, if the session is still live.
    pub fn validate(&mut self, token_hash: &[u8; 32]) -> Option<Uuid> {
        let session = self.sessions.get(token_hash)?;
        if Instant::now() >= session.expires_at {
            self.sessions.remove(token_hash);
            return None;
        }
        Some(session.user_id)
    }

    /// Drop one session. Returns whether it existed.
    pub fn revoke(&mut self, token_hash: &[u8; 32]) -> bool {
        self.sessions.remove(token_hash).is_some()
    }

    /// Whether `user_id` still has any live session.
    pub fn has_user(&self, user_id: &Uuid) -> bool {
        let now = Instant::now();
        self.sessions
            .values()
            .any(|s| &s.user_id == user_id && now < s.expires_at)
    }

    fn cleanup(&mut self) {
        let now = Instant::now();
        self.sessions.retain(|_, s| now < s.expires_at);
    }
}

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

// ═══════════════════════════════════════════════════════════
// Login lockout
// ═══════════════════════════════════════════════════════════

struct FailureRecord {
    count: u32,
    locked_until: Option<Instant>,
}

/// Per-email brute-force guard for the login endpoint.
pub struct LoginLockout {
    failures: HashMap<String, FailureRecord>,
    max_failures: u32,
    lock_for: Duration,
}

impl LoginLockout {
    pub fn new() -> Self {
        Self::with_limits(MAX_LOGIN_FAILURES, Duration::from_secs(LOGIN_LOCK_SECS))
    }

    pub fn with_limits(max_failures: u32, lock_for: Duration) -> Self {
        Self {
            failures: HashMap::new(),
            max_failures,
            lock_for,
        }
    }

    /// Seconds left on the lock for `key`, if locked.
    pub fn locked_for(&mut self, key: &str) -> Option<u64> {
        let now = Instant::now();
        let locked_until = self.failures.get(key)?.locked_until;
        match locked_until {
            Some(until) if now < until => Some((until - now).as_secs().max(1)),
            Some(_) => {
                self.failures.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn record_failure(&mut self, key: &str) {
        let record = self
            .failures
            .entry(key.to_string())
            .or_insert(FailureRecord {
                count: 0,
                locked_until: None,
            });
        record.count += 1;
        if record.count >= self.max_failures {
            record.locked_until = Some(Instant::now() + self.lock_for);
            tracing::warn!(attempts = record.count, "Login locked after repeated failures");
        }
    }

    pub fn clear(&mut self, key: &str) {
        self.failures.remove(key);
    }
}

impl Default for LoginLockout {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════
// Rate limiter: per-client sliding window
// ═══════════════════════════════════════════════════════════

/// Per-client rate limiter with per-minute and per-hour limits.
pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    per_minute: u32,
    per_hour: u32,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_limits(100, 1000)
    }

    pub fn with_limits(per_minute: u32, per_hour: u32) -> Self {
        Self {
            windows: HashMap::new(),
            per_minute,
            per_hour,
        }
    }

    /// Check if a client is within rate limits. Returns `Ok(())` or
    /// `Err(retry_after_secs)` if exceeded.
    pub fn check(&mut self, key: &str) -> Result<(), u64> {
        let now = Instant::now();
        let entries = self.windows.entry(key.to_string()).or_default();

        entries.retain(|ts| now.duration_since(*ts) < Duration::from_secs(3600));

        let last_minute = entries
            .iter()
            .filter(|ts| now.duration_since(**ts) < Duration::from_secs(60))
            .count() as u32;
        if last_minute >= self.per_minute {
            return Err(60);
        }

        if entries.len() as u32 >= self.per_hour {
            return Err(3600);
        }

        entries.push(now);
        Ok(())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_token_deterministic() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }

    #[test]
    fn generated_tokens_are_unique_and_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn session_issue_validate_revoke() {
        let mut sessions = SessionRegistry::new(Duration::from_secs(60));
        let user = Uuid::new_v4();
        let token = sessions.issue(user);
        let hash = hash_token(&token);

        assert_eq!(sessions.validate(&hash), Some(user));
        assert!(sessions.has_user(&user));
        assert!(sessions.revoke(&hash));
        assert_eq!(sessions.validate(&hash), None);
        assert!(!sessions.has_user(&user));
        assert!(!sessions.revoke(&hash));
    }

    #[test]
    fn longest_configured_ttl_issues_sessions() {
        let mut core = CoreState::in_memory().unwrap();
        core.config.session_ttl_hours = crate::config::MAX_SESSION_TTL_HOURS;
        let ctx = ApiContext::new(Arc::new(core));
        let mut sessions = ctx.sessions.lock().unwrap();
        let user = Uuid::new_v4();
        let token = sessions.issue(user);
        assert_eq!(sessions.validate(&hash_token(&token)), Some(user));
    }

    #[test]
    fn expired_session_rejected() {
        let mut sessions = SessionRegistry::new(Duration::ZERO);
        let token = sessions.issue(Uuid::new_v4());
        assert_eq!(sessions.validate(&hash_token(&token)), None);
    }

    #[test]
    fn lockout_engages_at_threshold_and_clears() {
        let mut lockout = LoginLockout::with_limits(3, Duration::from_secs(900));
        lockout.record_failure("a@example.org");
        lockout.record_failure("a@example.org");
        assert_eq!(lockout.locked_for("a@example.org"), None);
        lockout.record_failure("a@example.org");
        let left = lockout.locked_for("a@example.org").unwrap();
        assert!(left > 890 && left <= 900);
        assert_eq!(lockout.locked_for("b@example.org"), None);

        lockout.clear("a@example.org");
        assert_eq!(lockout.locked_for("a@example.org"), None);
    }

    #[test]
    fn lock_expires() {
        let mut lockout = LoginLockout::with_limits(1, Duration::ZERO);
        lockout.record_failure("a@example.org");
        assert_eq!(lockout.locked_for("a@example.org"), None);
    }

    #[test]
    fn rate_limiter_per_minute() {
        let mut limiter = RateLimiter::with_limits(3, 1000);
        for _ in 0..3 {
            assert!(limiter.check("client").is_ok());
        }
        assert_eq!(limiter.check("client"), Err(60));
        assert!(limiter.check("other").is_ok());
    }

    #[test]
    fn rate_limiter_per_hour() {
        let mut limiter = RateLimiter::with_limits(1000, 2);
        assert!(limiter.check("client").is_ok());
        assert!(limiter.check("client").is_ok());
        assert_eq!(limiter.check("client"), Err(3600));
    }
}
