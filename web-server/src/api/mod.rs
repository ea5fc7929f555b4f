// web-server/src/api/mod.rs
pub mod auth;
pub mod protected;
pub mod session;

use actix_web::{get, web, HttpMessage, HttpRequest, HttpResponse, Responder};
use common::lifecycle::SessionManager;
use common::models::session::SessionClaims;
use common::SessionConfig;

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("Mini App Auth")
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(
            web::scope("/api")
                .service(auth::login)
                .service(auth::logout)
                .service(session::session_status)
        )
        .service(
            web::scope("/protected")
                .service(protected::profile)
        );
}

/// Claims left by the session gate, or decoded from the cookie when the
/// gate did not run for this path.
pub fn current_claims(
    req: &HttpRequest,
    manager: &SessionManager,
    session: &SessionConfig,
) -> Option<SessionClaims> {
    if let Some(claims) = req.extensions().get::<SessionClaims>() {
        return Some(claims.clone());
    }

    let cookie = req.cookie(&session.cookie_name)?;
    manager.current(cookie.value()).ok()
}
