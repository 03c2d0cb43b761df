use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use log::{info, warn};
use std::rc::Rc;
use std::time::Instant;

/// Logs method, path, status and latency of every request.
///
/// Headers are never logged; they carry credentials.
pub struct RequestTiming;

impl<S, B> Transform<S, ServiceRequest> for RequestTiming
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestTimingService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequestTimingService {
            service: Rc::new(service),
        }))
    }
}

pub struct RequestTimingService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestTimingService<S>
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
        let started = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();

        let service = self.service.clone();

        Box::pin(async move {
            let res = service.call(req).await;
            let elapsed_ms = started.elapsed().as_millis();

            match &res {
                Ok(response) if response.status().is_server_error() => warn!(
                    "{} {} -> {} ({}ms)",
                    method,
                    path,
                    response.status().as_u16(),
                    elapsed_ms
                ),
                Ok(response) => info!(
                    "{} {} -> {} ({}ms)",
                    method,
                    path,
                    response.status().as_u16(),
                    elapsed_ms
                ),
                Err(e) => info!(
                    "{} {} -> {} ({}ms)",
                    method,
                    path,
                    e.as_response_error().status_code().as_u16(),
                    elapsed_ms
                ),
            }

            res
        })
    }
}
