use crate::api::models::{ChatRequest, ChatResponse, ErrorBody};
use crate::error::{ConnectivityError, RequestError};
use reqwest::Client as HttpClient;
use std::time::Duration;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
pub const CHAT_TIMEOUT: Duration = Duration::from_secs(60);

/// Thin client for the agent backend. Cheap to clone; clones share the
/// connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    probe_timeout: Duration,
    chat_timeout: Duration,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiClient {
    pub fn new() -> Self {
        Self::with_timeouts(PROBE_TIMEOUT, CHAT_TIMEOUT)
    }

    pub fn with_timeouts(probe_timeout: Duration, chat_timeout: Duration) -> Self {
        Self {
            http: HttpClient::new(),
            probe_timeout,
            chat_timeout,
        }
    }

    fn base(base_url: &str) -> &str {
        base_url.trim_end_matches('/')
    }

    /// Liveness probe against the backend root. Any 2xx counts as online.
    pub async fn ping(&self, base_url: &str) -> Result<(), ConnectivityError> {
        let endpoint = format!("{}/", Self::base(base_url));
        let resp = self
            .http
            .get(&endpoint)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| ConnectivityError(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ConnectivityError(format!("HTTP {}", resp.status())))
        }
    }

    /// Sends one chat turn and returns the assistant's reply text.
    pub async fn chat(&self, base_url: &str, request: &ChatRequest) -> Result<String, RequestError> {
        let endpoint = format!("{}/api/chat", Self::base(base_url));
        log::debug!(
            "POST {endpoint} ({} history messages, {} recipients)",
            request.history.len(),
            request.recipients.as_ref().map_or(0, Vec::len)
        );
        let resp = self
            .http
            .post(&endpoint)
            .json(request)
            .timeout(self.chat_timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.json::<ErrorBody>().await.unwrap_or_default();
            return Err(RequestError::Server {
                status: status.as_u16(),
                detail: body.detail_text(),
            });
        }
        let body = resp.json::<ChatResponse>().await.map_err(classify)?;
        Ok(body.response)
    }
}

fn classify(err: reqwest::Error) -> RequestError {
    if err.is_timeout() {
        RequestError::Timeout
    } else if err.is_decode() {
        RequestError::InvalidResponse(err.to_string())
    } else if let Some(status) = err.status() {
        RequestError::Server { status: status.as_u16(), detail: None }
    } else {
        RequestError::Unreachable(err.to_string())
    }
}
