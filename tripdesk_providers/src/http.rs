use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde_json::{Value, json};
use tracing::{debug, info};
use tripdesk_core::{ConversationBackend, SendReply, SessionSummary};

use crate::retry::{RetryPolicy, retry_with_backoff};

/// Conversation backend reached over HTTP with JSON bodies.
///
/// Reads are retried with backoff; writes (session creation, sends) are
/// attempted once since they are not idempotent.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        info!("Creating HttpBackend for {base_url}");
        Ok(Self {
            client: Client::new(),
            base_url: Url::parse(base_url)?,
            api_key: None,
            retry: RetryPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Join path segments onto the base URL, escaping each one.
    fn endpoint(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("Base URL cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Helper method to send a single GET request
    async fn try_get(&self, url: &Url) -> anyhow::Result<Value> {
        let response = self
            .authorize(self.client.get(url.clone()))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(response)
    }

    async fn get(&self, segments: &[&str]) -> anyhow::Result<Value> {
        let url = self.endpoint(segments)?;
        debug!("GET {url}");
        retry_with_backoff(|| self.try_get(&url), &self.retry).await
    }

    async fn post(&self, segments: &[&str], body: &Value) -> anyhow::Result<Value> {
        let url = self.endpoint(segments)?;
        debug!("POST {url}");
        let response = self
            .authorize(self.client.post(url))
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(response)
    }
}

/// A bare array, or one wrapped as `{ "<key>": [...] }`. `null` reads as
/// empty.
fn unwrap_list(response: Value, key: &str) -> anyhow::Result<Vec<Value>> {
    match response {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        Value::Object(mut obj) => match obj.remove(key) {
            Some(Value::Array(items)) => Ok(items),
            Some(Value::Null) | None if obj.is_empty() => Ok(Vec::new()),
            _ => anyhow::bail!("Invalid response format: missing {key} list"),
        },
        _ => anyhow::bail!("Invalid response format: expected {key} list"),
    }
}

#[async_trait]
impl ConversationBackend for HttpBackend {
    async fn list_sessions(&self) -> anyhow::Result<Vec<SessionSummary>> {
        let listing = unwrap_list(self.get(&["sessions"]).await?, "sessions")?;
        let sessions: Vec<SessionSummary> = listing
            .iter()
            .filter_map(SessionSummary::from_value)
            .collect();
        if sessions.len() < listing.len() {
            debug!("Ignored {} session entries without an id", listing.len() - sessions.len());
        }
        Ok(sessions)
    }

    async fn create_session(&self) -> anyhow::Result<SessionSummary> {
        let response = self.post(&["sessions"], &json!({})).await?;
        let record = response.get("session").unwrap_or(&response);
        SessionSummary::from_value(record)
            .ok_or_else(|| anyhow::anyhow!("Invalid response format: created session has no id"))
    }

    async fn session_history(&self, session_id: &str) -> anyhow::Result<Vec<Value>> {
        let response = self.get(&["sessions", session_id, "messages"]).await?;
        unwrap_list(response, "messages")
    }

    async fn send(&self, session_id: Option<&str>, text: &str) -> anyhow::Result<SendReply> {
        let body = json!({
            "session_id": session_id,
            "message": text,
        });
        info!("Sending message to backend (session: {session_id:?})");
        let response = self.post(&["chat"], &body).await?;
        info!("Received reply from backend");
        Ok(SendReply::from_value(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_escape_segments() {
        let Ok(backend) = HttpBackend::new("https://api.example.com/v1/") else {
            panic!("valid base url");
        };
        let url = backend.endpoint(&["sessions", "a b/c", "messages"]);
        assert_eq!(
            url.map(|u| u.to_string()).ok().as_deref(),
            Some("https://api.example.com/v1/sessions/a%20b%2Fc/messages")
        );
    }

    #[test]
    fn base_without_trailing_slash() {
        let Ok(backend) = HttpBackend::new("http://localhost:8080/api") else {
            panic!("valid base url");
        };
        let url = backend.endpoint(&["chat"]);
        assert_eq!(
            url.map(|u| u.to_string()).ok().as_deref(),
            Some("http://localhost:8080/api/chat")
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(HttpBackend::new("not a url").is_err());
    }

    #[test]
    fn blank_api_key_is_ignored() {
        let backend = HttpBackend::new("http://localhost")
            .map(|b| b.with_api_key(Some("  ".to_string())));
        assert!(backend.is_ok_and(|b| b.api_key.is_none()));
    }

    #[test]
    fn list_envelopes() {
        assert_eq!(
            unwrap_list(json!([1, 2]), "sessions").map(|v| v.len()).ok(),
            Some(2)
        );
        assert_eq!(
            unwrap_list(json!({"sessions": [{"id": "S1"}]}), "sessions")
                .map(|v| v.len())
                .ok(),
            Some(1)
        );
        assert_eq!(
            unwrap_list(Value::Null, "messages").map(|v| v.len()).ok(),
            Some(0)
        );
        assert_eq!(
            unwrap_list(json!({}), "messages").map(|v| v.len()).ok(),
            Some(0)
        );
        assert!(unwrap_list(json!({"error": "nope"}), "messages").is_err());
        assert!(unwrap_list(json!("text"), "messages").is_err());
    }
}
