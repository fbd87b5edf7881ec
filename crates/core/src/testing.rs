//! Scripted network double for tests across the workspace.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::Error;
use crate::http::{Network, Request, Response};

/// A `Network` that answers from a table keyed by absolute URL.
///
/// Unknown URLs answer 404; URLs marked failing, or every URL while offline,
/// fail with `Error::NetworkFailure`.
#[derive(Debug, Default)]
pub struct MockNetwork {
    routes: Mutex<HashMap<String, Response>>,
    failing: Mutex<Vec<String>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: Response) -> &Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(url.to_string(), response);
        }
        self
    }

    pub fn fail(&self, url: &str) -> &Self {
        if let Ok(mut failing) = self.failing.lock() {
            failing.push(url.to_string());
        }
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// URLs fetched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls().iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url.to_string();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.clone());
        }

        let failing = self.failing.lock().map(|f| f.contains(&url)).unwrap_or(false);
        if self.offline.load(Ordering::SeqCst) || failing {
            return Err(Error::NetworkFailure(format!("{url}: connection refused")));
        }

        let route = self.routes.lock().ok().and_then(|r| r.get(&url).cloned());
        Ok(route.unwrap_or_else(|| Response::new(404, "Not Found")))
    }
}
