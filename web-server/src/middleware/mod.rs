// web-server/src/middleware/mod.rs
pub mod rate_limiter;
pub mod session_gate;

pub use rate_limiter::RateLimiter;
pub use session_gate::SessionGate;

/// `prefix` matches itself and anything below it, on segment boundaries.
pub fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_prefix() {
        assert!(matches_prefix("/protected", "/protected"));
        assert!(matches_prefix("/protected/profile", "/protected"));
        assert!(matches_prefix("/api/auth", "/api/"));
        assert!(!matches_prefix("/protectedness", "/protected"));
        assert!(!matches_prefix("/", "/api"));
    }
}
