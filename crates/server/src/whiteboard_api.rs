use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::ACCEPT, redirect::Policy, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use wbbot_core::domain::entry::{RequestMethod, WhiteboardRequest};
use wbbot_core::domain::standup::{Standup, StandupItems};
use wbbot_core::errors::BackendError;
use wbbot_core::whiteboard::WhiteboardApi;

const ITEM_ID_HEADER: &str = "Item-Id";

/// Whiteboard backend over HTTP. The backend answers a successful create or
/// update with a redirect, so redirects are never followed.
#[derive(Clone)]
pub struct HttpWhiteboardClient {
    http: reqwest::Client,
    host_url: String,
}

impl HttpWhiteboardClient {
    pub fn new(host_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .user_agent("wbbot")
            .redirect(Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|error| BackendError::Transport(error.to_string()))?;

        Ok(Self { http, host_url: host_url.trim_end_matches('/').to_owned() })
    }

    fn submit_target(&self, request: &WhiteboardRequest, standup_id: i64) -> (Method, String) {
        match (&request.method, request.id.as_deref().filter(|id| !id.is_empty())) {
            (RequestMethod::Patch, Some(id)) => {
                (Method::PATCH, format!("{}/items/{id}", self.host_url))
            }
            _ => (Method::POST, format!("{}/standups/{standup_id}/items", self.host_url)),
        }
    }

    async fn get_json<T>(&self, operation: &'static str, url: &str) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| BackendError::Transport(error.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(BackendError::UnexpectedStatus { operation, status: status.as_u16() });
        }
        response.json::<T>().await.map_err(|error| BackendError::Decode(error.to_string()))
    }
}

#[async_trait]
impl WhiteboardApi for HttpWhiteboardClient {
    async fn get_standup(&self, standup_id: &str) -> Result<Standup, BackendError> {
        let not_found = || BackendError::StandupNotFound(standup_id.to_owned());
        let id: i64 = standup_id.trim().parse().map_err(|_| not_found())?;

        let url = format!("{}/standups/{id}", self.host_url);
        self.get_json("get_standup", &url).await.map_err(|error| match error {
            BackendError::UnexpectedStatus { status: 404, .. } => not_found(),
            other => other,
        })
    }

    async fn get_standup_items(&self, standup_id: i64) -> Result<StandupItems, BackendError> {
        let url = format!("{}/standups/{standup_id}/items", self.host_url);
        self.get_json("get_standup_items", &url).await
    }

    async fn submit(
        &self,
        request: &WhiteboardRequest,
        standup_id: i64,
    ) -> Result<String, BackendError> {
        let (method, url) = self.submit_target(request, standup_id);
        debug!(method = %method, url = %url, commit = %request.commit, "submitting whiteboard item");

        let response = self
            .http
            .request(method, &url)
            .json(request)
            .send()
            .await
            .map_err(|error| BackendError::Transport(error.to_string()))?;

        let status = response.status();
        if status != StatusCode::FOUND {
            return Err(BackendError::UnexpectedStatus {
                operation: "submit",
                status: status.as_u16(),
            });
        }

        let assigned = response
            .headers()
            .get(ITEM_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned);
        Ok(assigned.or_else(|| request.id.clone()).unwrap_or_default())
    }
}
