//! Reqwest-based client for the Anthropic Messages API (streaming).

use std::{pin::Pin, time::Duration};

use anyhow::{Context, Result};
use async_stream::try_stream;
use futures_core::Stream;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::config::Config;

const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

#[derive(Debug)]
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    pub model: String,
    pub max_tokens: u64,
}

impl LlmClient {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let api_key = cfg.require("ANTHROPIC_API_KEY")?;
        let timeout = cfg.get_u64("REQUEST_TIMEOUT")?.unwrap_or(60);
        let base_url = cfg
            .get("ANTHROPIC_BASE_URL")
            .unwrap_or_else(|| "https://api.anthropic.com".into())
            .trim_end_matches('/')
            .to_string();
        let model = cfg.get("DEFAULT_MODEL").unwrap_or_else(|| "claude-3-haiku-20240307".into());
        let max_tokens = cfg.get_u64("MAX_TOKENS")?.unwrap_or(1024);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?;

        Ok(Self { http, base_url, api_key, model, max_tokens })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn message_stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>> {
        let http = self.http.clone();
        let url = format!("{}/v1/messages", self.base_url);
        let api_key = self.api_key.clone();
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": messages,
            "stream": true,
        });

        Box::pin(try_stream! {
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("text/event-stream"));
            headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
            headers.insert("x-api-key", HeaderValue::from_str(&api_key)?);

            let resp = http
                .post(url)
                .headers(headers)
                .json(&body)
                .send()
                .await
                .context("failed to send messages request")?;

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                Err::<(), _>(anyhow::anyhow!("LLM error: {} - {}", status, text))?;
                return;
            }

            let mut buf = Vec::new();
            let mut stream = resp.bytes_stream();
            use futures_util::StreamExt as _;

            while let Some(chunk) = stream.next().await {
                let bytes = chunk.context("stream error")?;
                buf.extend_from_slice(&bytes);
                while let Some(line) = next_line(&mut buf) {
                    let Some(payload) = line.strip_prefix("data:") else { continue };
                    match parse_event(payload.trim())? {
                        Some(StreamEvent::Done) => { yield StreamEvent::Done; return; }
                        Some(ev) => yield ev,
                        None => {}
                    }
                }
            }
            yield StreamEvent::Done;
        })
    }
}

/// Pop one complete line off the front of `buf`, decoded and trimmed.
/// Bytes after the last newline stay buffered until more arrive.
fn next_line(buf: &mut Vec<u8>) -> Option<String> {
    let pos = buf.iter().position(|&b| b == b'\n')?;
    let line: Vec<u8> = buf.drain(..=pos).collect();
    Some(String::from_utf8_lossy(&line).trim().to_string())
}

#[derive(Debug, PartialEq, Eq)]
pub enum StreamEvent {
    Text(String),
    Done,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Event {
    ContentBlockDelta { delta: Delta },
    MessageStop,
    Error { error: ApiError },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Map one SSE `data:` payload to an event; `None` for payloads we skip.
fn parse_event(payload: &str) -> Result<Option<StreamEvent>> {
    let Ok(event) = serde_json::from_str::<Event>(payload) else {
        return Ok(None);
    };
    match event {
        Event::ContentBlockDelta { delta } => {
            Ok(delta.text.filter(|t| !t.is_empty()).map(StreamEvent::Text))
        }
        Event::MessageStop => Ok(Some(StreamEvent::Done)),
        Event::Error { error } => Err(anyhow::anyhow!("LLM stream error: {}", error.message)),
        Event::Other => Ok(None),
    }
}
