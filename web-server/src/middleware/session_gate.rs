// web-server/src/middleware/session_gate.rs
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage, HttpResponse,
};
use common::lifecycle::{SessionManager, SessionState};
use common::{RouteConfig, SessionConfig};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;

use super::matches_prefix;
use crate::cookies::session_cookie;

/// Reads the session cookie on gated paths, renews it, and turns anonymous
/// visitors of protected paths away before the handler runs.
#[derive(Clone)]
pub struct SessionGate {
    inner: Rc<GateSettings>,
}

struct GateSettings {
    manager: SessionManager,
    session: SessionConfig,
    routes: RouteConfig,
}

impl SessionGate {
    pub fn new(manager: SessionManager, session: SessionConfig, routes: RouteConfig) -> Self {
        Self {
            inner: Rc::new(GateSettings {
                manager,
                session,
                routes,
            }),
        }
    }
}

impl GateSettings {
    fn is_gated(&self, path: &str) -> bool {
        self.routes.gated_prefixes.iter().any(|p| matches_prefix(path, p))
    }

    fn is_protected(&self, path: &str) -> bool {
        self.routes.protected_prefixes.iter().any(|p| matches_prefix(path, p))
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = SessionGateMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionGateMiddleware {
            service,
            gate: self.inner.clone(),
        }))
    }
}

pub struct SessionGateMiddleware<S> {
    service: S,
    gate: Rc<GateSettings>,
}

impl<S, B> Service<ServiceRequest> for SessionGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path().to_string();

        if !self.gate.is_gated(&path) {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        let credential = req
            .cookie(&self.gate.session.cookie_name)
            .map(|cookie| cookie.value().to_string());

        let renewal = match self.gate.manager.resume(credential.as_deref()) {
            SessionState::Authenticated(session) => {
                let cookie = session_cookie(&self.gate.session, &session);
                req.extensions_mut().insert(session.claims);
                Some(cookie)
            },
            SessionState::Anonymous if self.gate.is_protected(&path) => {
                tracing::info!("Redirecting unauthenticated request for {}", path);
                let response = HttpResponse::TemporaryRedirect()
                    .insert_header((header::LOCATION, self.gate.routes.entry_point.clone()))
                    .finish();
                return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
            },
            SessionState::Anonymous => None,
        };

        let fut = self.service.call(req);
        Box::pin(async move {
            let mut res = fut.await?;

            if let Some(cookie) = renewal {
                // Login and logout write the cookie themselves; theirs wins.
                let handler_set_cookie = res
                    .response()
                    .cookies()
                    .any(|c| c.name() == cookie.name());

                if !handler_set_cookie {
                    if let Err(e) = res.response_mut().add_cookie(&cookie) {
                        tracing::error!("Failed to attach renewed session cookie: {}", e);
                    }
                }
            }

            Ok(res.map_into_left_body())
        })
    }
}
