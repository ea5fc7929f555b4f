// common/src/lifecycle.rs
//! Login, per-request renewal, and read-back of sessions.
//!
//! The manager holds no per-user state. Everything about a session lives in
//! the credential the caller stores, so one manager can serve any number of
//! concurrent requests.
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::clock::Clock;
use crate::launch::{LaunchVerifier, Rejection, VerifiedLaunch};
use crate::models::session::{IssuedSession, SessionClaims, SessionUser};
use crate::session::{SessionCodec, SessionError};

/// Default session lifetime: one hour
pub const DEFAULT_SESSION_DURATION_SECS: i64 = 3600;

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Outcome of the per-request session gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    /// Holds the renewed session; its token must replace the stored credential.
    Authenticated(IssuedSession),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn claims(&self) -> Option<&SessionClaims> {
        match self {
            SessionState::Authenticated(session) => Some(&session.claims),
            SessionState::Anonymous => None,
        }
    }
}

#[derive(Clone)]
pub struct SessionManager {
    verifier: LaunchVerifier,
    codec: SessionCodec,
    clock: Arc<dyn Clock>,
    duration: Duration,
}

impl SessionManager {
    pub fn new(
        verifier: LaunchVerifier,
        codec: SessionCodec,
        clock: Arc<dyn Clock>,
        duration: Duration,
    ) -> Self {
        Self {
            verifier,
            codec,
            clock,
            duration,
        }
    }

    pub fn session_duration(&self) -> Duration {
        self.duration
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Verify a raw launch payload and open a session for its user.
    pub fn login(&self, raw_payload: &str) -> Result<IssuedSession, LoginError> {
        let now = self.clock.now();
        let launch = self.verifier.verify(raw_payload, now)?;
        Ok(self.start(&launch, now)?)
    }

    /// Open a session for launch data that already passed verification.
    pub fn start(
        &self,
        launch: &VerifiedLaunch,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, SessionError> {
        let claims = SessionClaims::new(SessionUser::from(&launch.user), self.expiry_from(now)?);
        self.issue(claims, now)
    }

    /// Decode a stored credential without renewing it.
    pub fn current(&self, credential: &str) -> Result<SessionClaims, SessionError> {
        self.codec.verify(credential, self.clock.now())
    }

    /// Verify a stored credential and re-issue it with a fresh expiry.
    pub fn renew(&self, credential: &str) -> Result<IssuedSession, SessionError> {
        let now = self.clock.now();
        let claims = self.codec.verify(credential, now)?;
        self.issue(claims.renewed(self.expiry_from(now)?), now)
    }

    /// Per-request gate: every failure is simply [`SessionState::Anonymous`].
    pub fn resume(&self, credential: Option<&str>) -> SessionState {
        let credential = match credential.filter(|c| !c.is_empty()) {
            Some(credential) => credential,
            None => return SessionState::Anonymous,
        };

        match self.renew(credential) {
            Ok(session) => {
                tracing::debug!(
                    telegram_id = session.claims.user.telegram_id,
                    expires_at = %session.claims.expires_at,
                    "Session renewed"
                );
                SessionState::Authenticated(session)
            }
            Err(e) => {
                tracing::debug!("Session not resumed: {}", e);
                SessionState::Anonymous
            }
        }
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, SessionError> {
        now.checked_add_signed(self.duration)
            .ok_or(SessionError::ExpiryOutOfRange)
    }

    fn issue(&self, claims: SessionClaims, now: DateTime<Utc>) -> Result<IssuedSession, SessionError> {
        let token = self.codec.issue(&claims, now)?;
        Ok(IssuedSession { token, claims })
    }
}
