//! In-process backend used by the integration suites.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tripdesk_core::{ConversationBackend, SendReply, SessionSummary};

#[derive(Default)]
pub struct ScriptedBackend {
    pub sessions: Mutex<Vec<SessionSummary>>,
    pub histories: Mutex<HashMap<String, Vec<Value>>>,
    pub replies: Mutex<VecDeque<anyhow::Result<SendReply>>>,
    pub fail_listing: bool,
    pub send_delay: Option<Duration>,

    pub list_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub history_calls: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<(Option<String>, String)>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(self, session: SessionSummary) -> Self {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(session);
        self
    }

    pub fn with_history(self, id: &str, history: Vec<Value>) -> Self {
        self.histories
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(id.to_string(), history);
        self
    }

    pub fn with_reply(self, reply: anyhow::Result<SendReply>) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(reply);
        self
    }

    pub fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn history_fetches(&self) -> Vec<String> {
        self.history_calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn sent(&self) -> Vec<(Option<String>, String)> {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ConversationBackend for ScriptedBackend {
    async fn list_sessions(&self) -> anyhow::Result<Vec<SessionSummary>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_listing {
            anyhow::bail!("connection refused");
        }
        Ok(self
            .sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }

    async fn create_session(&self) -> anyhow::Result<SessionSummary> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::task::yield_now().await;
        Ok(SessionSummary::new(format!("created-{n}")))
    }

    async fn session_history(&self, session_id: &str) -> anyhow::Result<Vec<Value>> {
        self.history_calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(session_id.to_string());
        tokio::task::yield_now().await;
        Ok(self
            .histories
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn send(&self, session_id: Option<&str>, text: &str) -> anyhow::Result<SendReply> {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((session_id.map(str::to_string), text.to_string()));
        match self.send_delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
        self.replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Ok(SendReply::default()))
    }
}
