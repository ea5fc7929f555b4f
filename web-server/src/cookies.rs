// web-server/src/cookies.rs
use actix_web::cookie::time::OffsetDateTime;
use actix_web::cookie::{Cookie, SameSite};
use common::models::session::IssuedSession;
use common::SessionConfig;

/// HTTP-only cookie carrying `session`, expiring with its claims.
pub fn session_cookie(config: &SessionConfig, session: &IssuedSession) -> Cookie<'static> {
    let expires = OffsetDateTime::from_unix_timestamp(session.claims.expires_at.timestamp())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);

    Cookie::build(config.cookie_name.clone(), session.token.clone())
        .path("/")
        .secure(config.secure_cookie)
        .http_only(true)
        .same_site(SameSite::Lax)
        .expires(expires)
        .finish()
}

/// Empty, already expired session cookie
pub fn cleared_cookie(config: &SessionConfig) -> Cookie<'static> {
    Cookie::build(config.cookie_name.clone(), "")
        .path("/")
        .http_only(true)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::models::session::{SessionClaims, SessionUser};

    #[test]
    fn test_session_cookie_matches_claims() {
        let session = IssuedSession {
            token: "header.body.sig".to_string(),
            claims: SessionClaims::new(
                SessionUser {
                    telegram_id: 42,
                    username: None,
                    display_name: Some("Ann".into()),
                },
                Utc.timestamp_opt(1_700_003_600, 0).unwrap(),
            ),
        };
        let cookie = session_cookie(&SessionConfig::default(), &session);

        assert_eq!(cookie.name(), "session");
        assert_eq!(cookie.value(), "header.body.sig");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(
            cookie.expires_datetime().map(|t| t.unix_timestamp()),
            Some(1_700_003_600)
        );
    }

    #[test]
    fn test_cleared_cookie_is_expired() {
        let cookie = cleared_cookie(&SessionConfig::default());
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.expires_datetime().map(|t| t.unix_timestamp()), Some(0));
    }
}
