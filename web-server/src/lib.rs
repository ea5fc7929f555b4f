// web-server/src/lib.rs
pub mod api;
pub mod cookies;
pub mod middleware;

use common::launch::LaunchVerifier;
use common::lifecycle::SessionManager;
use common::session::SessionCodec;
use common::{Clock, Config, ConfigurationError};
use std::sync::Arc;

/// Build the session manager from configuration. Fails on a weak signing key
/// or an out-of-range duration.
pub fn session_manager(
    config: &Config,
    clock: Arc<dyn Clock>,
) -> Result<SessionManager, ConfigurationError> {
    config.validate()?;

    let verifier = LaunchVerifier::new(config.bot_token.as_deref(), config.launch.max_age());
    if !verifier.is_configured() {
        tracing::warn!("Bot token is not set; every login will be rejected");
    }

    let codec = SessionCodec::new(config.jwt_secret.as_bytes())?;

    Ok(SessionManager::new(
        verifier,
        codec,
        clock,
        config.session.duration(),
    ))
}
