// web-server/src/api/session.rs
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use common::lifecycle::SessionManager;
use common::models::session::SessionStatusResponse;
use common::Config;

use super::current_claims;

// Report whether the caller holds a live session
#[get("/session")]
pub async fn session_status(
    req: HttpRequest,
    manager: web::Data<SessionManager>,
    config: web::Data<Config>,
) -> impl Responder {
    match current_claims(&req, &manager, &config.session) {
        Some(claims) => HttpResponse::Ok().json(SessionStatusResponse::from(&claims)),
        None => HttpResponse::Unauthorized().json(SessionStatusResponse::anonymous()),
    }
}
