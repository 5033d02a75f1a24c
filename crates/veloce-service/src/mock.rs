use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use veloce_core::breakdown::BreakdownStep;

use crate::{BreakdownGenerator, BreakdownRequest, ServiceError};

/// A scripted generator for tests and offline demos. Records every request.
pub struct MockGenerator {
    result: Result<Vec<BreakdownStep>, String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<BreakdownRequest>>,
}

impl MockGenerator {
    /// Create a mock that returns the given steps.
    pub fn success(steps: Vec<BreakdownStep>) -> Self {
        Self {
            result: Ok(steps),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always fails.
    pub fn failure(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<BreakdownRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .last()
            .cloned()
    }
}

#[async_trait]
impl BreakdownGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        request: &BreakdownRequest,
    ) -> Result<Vec<BreakdownStep>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(request.clone());
        self.result
            .clone()
            .map_err(ServiceError::Internal)
    }
}
