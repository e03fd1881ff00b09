//! Display formatting for message bodies and session lists
//!
//! Everything here is pure: it reads sessions and messages and produces
//! strings for the UI layer, and never touches store state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::session::{relative_time_from, Message, MessageRole, Session};
use crate::utils::text::{formatting::truncate, markdown::to_plain_text};

/// Maximum characters shown in a session-list preview
pub const PREVIEW_MAX_CHARS: usize = 60;

/// Declared format of a message body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    #[default]
    Text,
    Markdown,
    Code,
    Json,
    Table,
}

impl ContentFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Code => "code",
            Self::Json => "json",
            Self::Table => "table",
        }
    }

    /// Parse a format tag; unknown tags fall back to plain text
    pub fn from_tag(tag: &str) -> Self {
        tag.parse().unwrap_or_default()
    }
}

impl FromStr for ContentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "markdown" | "md" => Ok(Self::Markdown),
            "code" => Ok(Self::Code),
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            other => Err(format!("unknown content format: {}", other)),
        }
    }
}

impl std::fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Content plus how it should be displayed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub content: String,
    #[serde(default)]
    pub format: Option<ContentFormat>,
    /// Language annotation for `code` blocks
    #[serde(default)]
    pub language: Option<String>,
}

impl RenderRequest {
    pub fn new(content: impl Into<String>, format: ContentFormat) -> Self {
        Self {
            content: content.into(),
            format: Some(format),
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Turn content into a display string according to its declared format
pub fn render_content(request: &RenderRequest) -> String {
    match request.format.unwrap_or_default() {
        ContentFormat::Code => fenced(request.language.as_deref().unwrap_or(""), &request.content),
        ContentFormat::Json => {
            match serde_json::from_str::<serde_json::Value>(&request.content)
                .and_then(|value| serde_json::to_string_pretty(&value))
            {
                Ok(pretty) => fenced("json", &pretty),
                Err(_) => request.content.clone(),
            }
        }
        ContentFormat::Text | ContentFormat::Markdown | ContentFormat::Table => {
            request.content.clone()
        }
    }
}

fn fenced(language: &str, body: &str) -> String {
    format!("```{}\n{}\n```", language.trim(), body)
}

/// Display-ready view of a single message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageView {
    pub role_label: &'static str,
    pub body: String,
    pub relative_time: String,
}

pub fn role_label(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "You",
        MessageRole::Assistant => "Assistant",
    }
}

/// Build the view of `message` as seen at `now`
pub fn render_message(message: &Message, format: ContentFormat, now: DateTime<Utc>) -> MessageView {
    MessageView {
        role_label: role_label(message.role),
        body: render_content(&RenderRequest::new(message.content.clone(), format)),
        relative_time: relative_time_from(&message.timestamp, now),
    }
}

/// One row of the session list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub message_count: usize,
    pub is_active: bool,
    pub preview: String,
}

/// Summarize a session for the session list
pub fn summarize_session(session: &Session, active_session_id: Option<&str>) -> SessionSummary {
    let preview = session
        .last_message()
        .map(|m| truncate(&to_plain_text(&m.content), PREVIEW_MAX_CHARS))
        .unwrap_or_default();

    SessionSummary {
        id: session.id.clone(),
        title: session.title.clone(),
        message_count: session.message_count(),
        is_active: active_session_id == Some(session.id.as_str()),
        preview,
    }
}
