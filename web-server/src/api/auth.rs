// web-server/src/api/auth.rs
use actix_web::{post, web, HttpResponse, Responder};
use common::lifecycle::{LoginError, SessionManager};
use common::Config;
use serde::Deserialize;
use serde_json::json;

use crate::cookies::{cleared_cookie, session_cookie};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Raw launch data exactly as the Mini App received it
    pub init_data: String,
}

// Verify launch data and open a session
#[post("/auth")]
pub async fn login(
    body: web::Json<LoginRequest>,
    manager: web::Data<SessionManager>,
    config: web::Data<Config>,
) -> impl Responder {
    match manager.login(&body.init_data) {
        Ok(session) => {
            tracing::info!(
                telegram_id = session.claims.user.telegram_id,
                "Authentication successful"
            );

            HttpResponse::Ok()
                .cookie(session_cookie(&config.session, &session))
                .json(json!({
                    "message": "Authentication successful",
                    "user": session.claims.user,
                }))
        },
        Err(LoginError::Rejected(reason)) => {
            tracing::warn!(reason = reason.code(), "Launch data rejected");
            HttpResponse::Unauthorized().json(json!({
                "message": reason.to_string(),
                "code": reason.code(),
            }))
        },
        Err(LoginError::Session(e)) => {
            tracing::error!("Error issuing session: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

// Replace the session cookie with an empty, expired one
#[post("/logout")]
pub async fn logout(config: web::Data<Config>) -> impl Responder {
    tracing::info!("Session cleared");

    HttpResponse::Ok()
        .cookie(cleared_cookie(&config.session))
        .json(json!({
            "message": "Logout successful"
        }))
}
