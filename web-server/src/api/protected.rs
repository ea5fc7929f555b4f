// web-server/src/api/protected.rs
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use common::lifecycle::SessionManager;
use common::Config;
use serde_json::json;

use super::current_claims;

#[get("/profile")]
pub async fn profile(
    req: HttpRequest,
    manager: web::Data<SessionManager>,
    config: web::Data<Config>,
) -> impl Responder {
    match current_claims(&req, &manager, &config.session) {
        Some(claims) => HttpResponse::Ok().json(json!({
            "user": claims.user,
            "expiresAt": claims.expires_at,
        })),
        // The gate redirects before this; only reachable if it is not mounted.
        None => HttpResponse::Unauthorized().json(json!({
            "error": "Not authenticated"
        })),
    }
}
