// common/src/models/session.rs
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::launch::UserClaim;

/// Identity carried inside a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    /// Telegram user id
    pub telegram_id: i64,
    pub username: Option<String>,
    /// Taken from the launch user's first name
    pub display_name: Option<String>,
}

impl From<&UserClaim> for SessionUser {
    fn from(user: &UserClaim) -> Self {
        Self {
            telegram_id: user.id,
            username: user.username.clone(),
            display_name: user.first_name.clone(),
        }
    }
}

/// Claims of an authenticated session.
///
/// Never mutated: renewal builds a new value through [`SessionClaims::renewed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user: SessionUser,
    pub expires_at: DateTime<Utc>,
}

impl SessionClaims {
    /// Expiry is kept at whole-second precision, the resolution of the token.
    pub fn new(user: SessionUser, expires_at: DateTime<Utc>) -> Self {
        Self {
            user,
            expires_at: expires_at.with_nanosecond(0).unwrap_or(expires_at),
        }
    }

    /// A session is dead at its expiry instant, not after it.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Same user, new expiry
    pub fn renewed(&self, expires_at: DateTime<Utc>) -> Self {
        Self::new(self.user.clone(), expires_at)
    }
}

/// A freshly signed token and the claims it carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub token: String,
    pub claims: SessionClaims,
}

/// Response structure for session API endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub is_authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionStatusResponse {
    pub fn anonymous() -> Self {
        Self {
            is_authenticated: false,
            user: None,
            expires_at: None,
        }
    }
}

impl From<&SessionClaims> for SessionStatusResponse {
    fn from(claims: &SessionClaims) -> Self {
        Self {
            is_authenticated: true,
            user: Some(claims.user.clone()),
            expires_at: Some(claims.expires_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn user() -> SessionUser {
        SessionUser {
            telegram_id: 42,
            username: Some("ann42".into()),
            display_name: Some("Ann".into()),
        }
    }

    #[test]
    fn test_expiry_truncated_to_seconds() {
        let at = Utc.timestamp_opt(1_700_000_000, 987_654_321).unwrap();
        let claims = SessionClaims::new(user(), at);
        assert_eq!(claims.expires_at.timestamp(), 1_700_000_000);
        assert_eq!(claims.expires_at.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_expired_at_boundary() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let claims = SessionClaims::new(user(), at);
        assert!(!claims.is_expired_at(at - Duration::seconds(1)));
        assert!(claims.is_expired_at(at));
        assert!(claims.is_expired_at(at + Duration::seconds(1)));
    }

    #[test]
    fn test_renewed_keeps_user_and_original() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let claims = SessionClaims::new(user(), at);
        let renewed = claims.renewed(at + Duration::hours(1));

        assert_eq!(renewed.user, claims.user);
        assert_eq!(renewed.expires_at, at + Duration::hours(1));
        assert_eq!(claims.expires_at, at);
    }

    #[test]
    fn test_user_from_launch_claim() {
        let claim = UserClaim {
            id: 7,
            first_name: Some("Jo".into()),
            last_name: Some("Smith".into()),
            username: None,
            language_code: Some("en".into()),
            is_premium: None,
            photo_url: None,
        };
        let user = SessionUser::from(&claim);
        assert_eq!(user.telegram_id, 7);
        assert_eq!(user.display_name.as_deref(), Some("Jo"));
        assert!(user.username.is_none());
    }

    #[test]
    fn test_status_response_shape() {
        let anonymous = serde_json::to_value(SessionStatusResponse::anonymous()).unwrap();
        assert_eq!(anonymous, serde_json::json!({ "isAuthenticated": false }));

        let claims = SessionClaims::new(user(), Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        let value = serde_json::to_value(SessionStatusResponse::from(&claims)).unwrap();
        assert_eq!(value["isAuthenticated"], true);
        assert_eq!(value["user"]["telegramId"], 42);
        assert_eq!(value["user"]["displayName"], "Ann");
        assert!(value["user"].get("telegram_id").is_none());
        assert!(value["expiresAt"].is_string());
    }
}
