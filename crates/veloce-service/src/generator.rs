use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use veloce_core::breakdown::{parse_breakdown, BreakdownStep};

use crate::http::parse_error;
use crate::{BreakdownGenerator, BreakdownRequest, ServiceError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Calls a remote breakdown endpoint.
///
/// The endpoint receives a `BreakdownRequest` as JSON and may answer with the
/// step payload directly or with `{"content": "<model reply>"}` wrapping it.
pub struct HttpGenerator {
    endpoint: String,
    client: Client,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpGenerator {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            client: Client::new(),
            api_key,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn extract_steps(body: &str) -> Result<Vec<BreakdownStep>, ServiceError> {
    match parse_breakdown(body) {
        Ok(steps) => Ok(steps),
        Err(direct) => {
            let content = serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| v["content"].as_str().map(String::from));
            match content {
                Some(inner) => Ok(parse_breakdown(&inner)?),
                None => Err(direct.into()),
            }
        }
    }
}

#[async_trait]
impl BreakdownGenerator for HttpGenerator {
    fn name(&self) -> &str {
        "http"
    }

    async fn generate(
        &self,
        request: &BreakdownRequest,
    ) -> Result<Vec<BreakdownStep>, ServiceError> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }
        let resp = builder
            .send()
            .await
            .map_err(|e| ServiceError::Internal(format!("connection failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(parse_error(resp).await);
        }
        let body = resp
            .text()
            .await
            .map_err(|e| ServiceError::Internal(format!("read body: {e}")))?;
        let steps = extract_steps(&body)?;
        debug!(count = steps.len(), title = %request.task_title, "breakdown generated");
        Ok(steps)
    }
}

/// Generator used when no endpoint is configured; every call fails so the
/// session falls back to the local templates.
pub struct OfflineGenerator;

#[async_trait]
impl BreakdownGenerator for OfflineGenerator {
    fn name(&self) -> &str {
        "offline"
    }

    async fn generate(
        &self,
        _request: &BreakdownRequest,
    ) -> Result<Vec<BreakdownStep>, ServiceError> {
        Err(ServiceError::Internal("no breakdown endpoint configured".into()))
    }
}
