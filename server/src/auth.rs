//! API key check applied to every call before a handler runs.

use crate::metrics::AUTH_REJECTIONS;
use protocol_grpctest::bearer_token;
use std::sync::Arc;
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tracing::warn;

#[derive(Clone)]
pub struct ApiKey {
    key: Arc<str>,
}

impl ApiKey {
    pub fn new(key: &str) -> Self {
        Self { key: key.into() }
    }
}

impl Interceptor for ApiKey {
    fn call(&mut self, request: Request<()>) -> Result<Request<()>, Status> {
        let token = bearer_token(request.metadata()).inspect_err(|status| {
            AUTH_REJECTIONS.increment();
            warn!(reason = status.message(), "rejected call");
        })?;

        if token != &*self.key {
            AUTH_REJECTIONS.increment();
            warn!("rejected call with wrong API key");
            return Err(Status::unauthenticated("Invalid API key"));
        }

        Ok(request)
    }
}
