/// Access Token Middleware
///
/// Authenticates every request in the wrapped scope through
/// `SessionService::require_auth` and injects the acting account into request
/// extensions for route handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use uuid::Uuid;

use crate::auth::SessionService;

/// Account the current request acts as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Uuid);

/// Middleware for protecting routes
///
/// Rejects the request with the generic 401 response when the bearer access
/// token is missing, malformed, expired or badly signed.
pub struct RequireAuth {
    sessions: SessionService,
}

impl RequireAuth {
    pub fn new(sessions: SessionService) -> Self {
        Self { sessions }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireAuthService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequireAuthService {
            service: Rc::new(service),
            sessions: self.sessions.clone(),
        }))
    }
}

pub struct RequireAuthService<S> {
    service: Rc<S>,
    sessions: SessionService,
}

impl<S, B> Service<ServiceRequest> for RequireAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.sessions.require_auth(req.headers()) {
            Ok(user_id) => {
                req.extensions_mut().insert(AuthenticatedUser(user_id));
                tracing::debug!(user_id = %user_id, "Access token validated");

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => Box::pin(async move { Err(e.into()) }),
        }
    }
}
