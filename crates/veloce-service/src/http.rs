use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use veloce_core::subtask::SubTask;

use crate::{ServiceError, SubTaskStore};

const SUBTASKS_PATH: &str = "/rest/v1/subtasks";

/// Remote row store speaking a PostgREST-style dialect:
/// filters as `column=eq.value` query parameters, bulk insert as a JSON
/// array, upsert via `Prefer: resolution=merge-duplicates`.
pub struct HttpStore {
    base_url: String,
    client: Client,
    api_key: Option<String>,
}

impl HttpStore {
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            client: Client::new(),
            api_key: None,
        }
    }

    pub fn with_api_key(base_url: &str, key: String) -> Self {
        Self {
            api_key: Some(key),
            ..Self::new(base_url)
        }
    }

    fn url(&self) -> String {
        format!("{}{SUBTASKS_PATH}", self.base_url)
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder
                .header("apikey", key.as_str())
                .header("Authorization", format!("Bearer {key}")),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, ServiceError> {
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(parse_error(resp).await)
        }
    }
}

pub(crate) async fn parse_error(resp: reqwest::Response) -> ServiceError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let msg = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v["message"]
                .as_str()
                .or_else(|| v["error"].as_str())
                .map(String::from)
        })
        .unwrap_or(body);

    if status == StatusCode::NOT_FOUND {
        ServiceError::NotFound(msg)
    } else if status == StatusCode::BAD_REQUEST {
        ServiceError::InvalidInput(msg)
    } else {
        ServiceError::Internal(format!("{status}: {msg}"))
    }
}

#[async_trait]
impl SubTaskStore for HttpStore {
    async fn list_for_task(&self, task_id: &str) -> Result<Vec<SubTask>, ServiceError> {
        let builder = self.client.get(self.url()).query(&[
            ("task_id", format!("eq.{task_id}")),
            ("order", "order_index.asc".to_string()),
        ]);
        self.send(builder)
            .await?
            .json::<Vec<SubTask>>()
            .await
            .map_err(|e| ServiceError::Internal(format!("json decode: {e}")))
    }

    async fn delete_for_task(&self, task_id: &str) -> Result<(), ServiceError> {
        let builder = self
            .client
            .delete(self.url())
            .query(&[("task_id", format!("eq.{task_id}"))]);
        self.send(builder).await.map(|_| ())
    }

    async fn insert_many(&self, rows: &[SubTask]) -> Result<(), ServiceError> {
        if rows.is_empty() {
            return Ok(());
        }
        let builder = self.client.post(self.url()).json(rows);
        self.send(builder).await.map(|_| ())
    }

    async fn upsert(&self, row: &SubTask) -> Result<(), ServiceError> {
        let builder = self
            .client
            .post(self.url())
            .header("Prefer", "resolution=merge-duplicates")
            .json(&[row]);
        self.send(builder).await.map(|_| ())
    }

    async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let builder = self
            .client
            .delete(self.url())
            .query(&[("id", format!("eq.{id}"))]);
        self.send(builder).await.map(|_| ())
    }
}
