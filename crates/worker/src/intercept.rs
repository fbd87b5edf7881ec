//! The intercepted-fetch channel between the page and the worker.

use std::sync::Arc;

use async_trait::async_trait;

use crate::strategy::Interception;
use crate::worker::Worker;
use precios_core::{Error, Network, Request, Response};

/// A `Network` for the page context that routes every request through the
/// worker first and forwards pass-through requests to `inner`.
#[derive(Clone)]
pub struct InterceptingNetwork {
    worker: Arc<Worker>,
    inner: Arc<dyn Network>,
}

impl InterceptingNetwork {
    pub fn new(worker: Arc<Worker>, inner: Arc<dyn Network>) -> Self {
        Self { worker, inner }
    }
}

#[async_trait]
impl Network for InterceptingNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        match self.worker.handle_fetch(request).await {
            Interception::PassThrough => self.inner.fetch(request).await,
            Interception::Respond { response, .. } => Ok(response),
        }
    }
}
