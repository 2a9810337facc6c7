//! HTTP reply backend
//!
//! Wire format:
//!
//! ```text
//! POST {reply_url}
//! {"session_id": "...", "messages": [{"role": "candidate", "content": "..."}], "context": {...}}
//!
//! 200 OK
//! {"reply": "...", "concluded": false}
//! ```

use async_trait::async_trait;
use mock_interview_config::{EndpointSettings, TimeoutSettings};
use mock_interview_core::{
    BackendError, HistoryEntry, InterviewContext, InterviewerReply, ReplyBackend, ReplyRequest,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct ReplyRequestBody<'a> {
    session_id: &'a str,
    messages: &'a [HistoryEntry],
    context: &'a InterviewContext,
}

#[derive(Deserialize)]
struct ReplyResponseBody {
    #[serde(alias = "content")]
    reply: String,
    #[serde(default)]
    concluded: bool,
}

/// Reply backend over a JSON HTTP endpoint
pub struct HttpReplyBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpReplyBackend {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            timeout,
        })
    }

    /// Build from settings; fails when no reply URL is configured
    pub fn from_settings(
        endpoints: &EndpointSettings,
        timeouts: &TimeoutSettings,
    ) -> Result<Self, BackendError> {
        let endpoint = endpoints.reply_url.clone().ok_or_else(|| {
            BackendError::Unavailable("endpoints.reply_url is not configured".to_string())
        })?;
        Self::new(endpoint, endpoints.api_key.clone(), timeouts.reply())
    }

    fn map_send_error(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.timeout.as_millis() as u64)
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl ReplyBackend for HttpReplyBackend {
    async fn fetch_reply(&self, request: &ReplyRequest) -> Result<InterviewerReply, BackendError> {
        let body = ReplyRequestBody {
            session_id: &request.session_id,
            messages: &request.history,
            context: &request.context,
        };

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        tracing::debug!(
            endpoint = %self.endpoint,
            history_len = request.history.len(),
            "Requesting interviewer reply"
        );

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ReplyResponseBody = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        Ok(InterviewerReply {
            content: parsed.reply,
            concluded: parsed.concluded,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}
