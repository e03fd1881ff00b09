//! Subcommands operating on the persisted session store
//!
//! Each command applies at most one store operation and reports whether the
//! store changed, so the caller knows whether to save.

use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::Args;
use serde_json::json;
use tracing::{debug, info};

use crate::config::Config;
use crate::net::{ApiClient, Feedback};
use crate::render::{render_message, summarize_session, ContentFormat, SessionSummary};
use crate::session::{Session, SessionStore, SessionTemplate};

/// Templates offered by `convo new --template`
pub fn builtin_templates() -> Vec<SessionTemplate> {
    vec![
        SessionTemplate::new("brainstorm", "Brainstorm")
            .with_prompt("Help me brainstorm ideas for "),
        SessionTemplate::new("code-review", "Code review")
            .with_prompt("Review the following code and point out problems:\n"),
        SessionTemplate::new("summarize", "Summary")
            .with_prompt("Summarize this text in a few bullet points:\n"),
    ]
}

fn find_template(name: &str) -> Result<SessionTemplate> {
    let templates = builtin_templates();
    templates
        .iter()
        .find(|t| t.name == name)
        .cloned()
        .ok_or_else(|| {
            let names: Vec<&str> = templates.iter().map(|t| t.name.as_str()).collect();
            anyhow!("Unknown template '{}'. Available: {}", name, names.join(", "))
        })
}

/// Resolve an explicit session id, or the active session
fn resolve_session<'a>(store: &'a SessionStore, id: Option<&str>) -> Result<&'a Session> {
    match id {
        Some(id) => store
            .get_session(id)
            .ok_or_else(|| anyhow!("No session with id {}", id)),
        None => store
            .get_active_session()
            .ok_or_else(|| anyhow!("No active session. Create one with `convo new`.")),
    }
}

/// One line of `convo list` output
pub fn format_summary(summary: &SessionSummary) -> String {
    let marker = if summary.is_active { "*" } else { " " };
    let mut line = format!(
        "{} {}  {} ({} message{})",
        marker,
        summary.id,
        summary.title,
        summary.message_count,
        if summary.message_count == 1 { "" } else { "s" }
    );
    if !summary.preview.is_empty() {
        line.push_str(&format!("  {}", summary.preview));
    }
    line
}

/// List sessions
#[derive(Args, Debug)]
pub struct ListCommand {}

impl ListCommand {
    pub fn execute(&self, store: &SessionStore) -> Result<bool> {
        if store.is_empty() {
            println!("No sessions yet.");
            return Ok(false);
        }

        for session in store.sessions() {
            println!("{}", format_summary(&summarize_session(session, store.active_session_id())));
        }

        Ok(false)
    }
}

/// Create a session and make it active
#[derive(Args, Debug)]
pub struct NewCommand {
    /// Title for the new session
    #[arg(short, long)]
    pub title: Option<String>,

    /// Start from a built-in template (brainstorm, code-review, summarize)
    #[arg(long, conflicts_with = "title")]
    pub template: Option<String>,
}

impl NewCommand {
    pub fn execute(&self, store: &mut SessionStore) -> Result<bool> {
        let session = match &self.template {
            Some(name) => {
                let template = find_template(name)?;
                let session = store.launch_template(&template);
                if let Some(prompt) = &template.prompt {
                    println!("Suggested prompt: {}", prompt.trim_end());
                }
                session
            }
            None => store.create_session(Some(&json!({ "title": self.title }))),
        };

        info!("Created session {}", session.id);
        println!("{}  {}", session.id, session.title);
        Ok(true)
    }
}

/// Make another session active
#[derive(Args, Debug)]
pub struct SwitchCommand {
    /// Id of the session to activate
    pub id: String,
}

impl SwitchCommand {
    pub fn execute(&self, store: &mut SessionStore) -> Result<bool> {
        store.switch_session(&self.id);

        match store.get_active_session() {
            Some(session) => println!("Active session: {}", session.title),
            None => println!("No session with id {}; no session is active", self.id),
        }

        Ok(true)
    }
}

/// Append a message to a session
#[derive(Args, Debug)]
pub struct SendCommand {
    /// Message text
    #[arg(required = true)]
    pub text: Vec<String>,

    /// Role of the sender (user or assistant)
    #[arg(short, long, default_value = "user")]
    pub role: String,

    /// Target session id; defaults to the active session
    #[arg(short, long)]
    pub session: Option<String>,
}

impl SendCommand {
    pub fn execute(&self, store: &mut SessionStore) -> Result<bool> {
        let session_id = match &self.session {
            Some(id) => resolve_session(store, Some(id))?.id.clone(),
            None => match store.get_active_session() {
                Some(session) => session.id.clone(),
                None => {
                    debug!("No active session; starting a new one");
                    store.create_session(None).id
                }
            },
        };

        let raw = json!({
            "role": self.role,
            "content": self.text.join(" "),
            "timestamp": Utc::now().to_rfc3339(),
        });
        store.append_message(&session_id, &raw);

        println!("Message added to {}", session_id);
        Ok(true)
    }
}

/// Change a session's title
#[derive(Args, Debug)]
pub struct RenameCommand {
    /// Id of the session to rename
    pub id: String,

    /// New title; blank titles fall back to the default
    pub title: Vec<String>,
}

impl RenameCommand {
    pub fn execute(&self, store: &mut SessionStore) -> Result<bool> {
        resolve_session(store, Some(&self.id))?;
        store.rename_session(&self.id, &json!(self.title.join(" ")));

        if let Some(session) = store.get_session(&self.id) {
            println!("Renamed to {}", session.title);
        }
        Ok(true)
    }
}

/// Delete a session
#[derive(Args, Debug)]
pub struct DeleteCommand {
    /// Id of the session to delete
    pub id: String,
}

impl DeleteCommand {
    pub fn execute(&self, store: &mut SessionStore) -> Result<bool> {
        let title = resolve_session(store, Some(&self.id))?.title.clone();
        store.delete_session(&self.id);
        println!("Deleted {}", title);
        Ok(true)
    }
}

/// Print a session's messages
#[derive(Args, Debug)]
pub struct ShowCommand {
    /// Session id; defaults to the active session
    #[arg(short, long)]
    pub session: Option<String>,

    /// Display format for message bodies (text, markdown, code, json, table)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

impl ShowCommand {
    pub fn execute(&self, store: &SessionStore) -> Result<bool> {
        let session = resolve_session(store, self.session.as_deref())?;
        let format = ContentFormat::from_tag(&self.format);
        let now = Utc::now();

        println!("# {}", session.title);
        if session.messages.is_empty() {
            println!("(no messages)");
        }

        for message in &session.messages {
            let view = render_message(message, format, now);
            println!("\n[{} · {}]", view.role_label, view.relative_time);
            println!("{}", view.body);
        }

        Ok(false)
    }
}

/// Create a public share link for a session
#[derive(Args, Debug)]
pub struct ShareCommand {
    /// Session id; defaults to the active session
    #[arg(short, long)]
    pub session: Option<String>,
}

impl ShareCommand {
    pub async fn execute(&self, store: &SessionStore, config: &Config) -> Result<bool> {
        let session = resolve_session(store, self.session.as_deref())?;
        let client = ApiClient::new(config.api_client_options())?;

        let link = client.create_share_link_with_retry(session).await?;
        println!("{}", link.url);
        Ok(false)
    }
}

/// Send feedback about the active session
#[derive(Args, Debug)]
pub struct FeedbackCommand {
    /// Feedback text
    #[arg(required = true)]
    pub comment: Vec<String>,

    /// Rating from 1 to 5
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub rating: Option<u8>,
}

impl FeedbackCommand {
    pub async fn execute(&self, store: &SessionStore, config: &Config) -> Result<bool> {
        let feedback = Feedback {
            session_id: store.get_active_session().map(|s| s.id.clone()),
            rating: self.rating,
            comment: self.comment.join(" "),
        };

        let client = ApiClient::new(config.api_client_options())?;
        client.submit_feedback_with_retry(&feedback).await?;
        println!("Thanks for the feedback!");
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MessageRole, DEFAULT_SESSION_TITLE};

    #[test]
    fn test_new_with_title_and_template() {
        let mut store = SessionStore::new();

        NewCommand { title: Some("Plans".to_string()), template: None }
            .execute(&mut store)
            .unwrap();
        assert_eq!(store.get_active_session().unwrap().title, "Plans");

        NewCommand { title: None, template: None }.execute(&mut store).unwrap();
        assert_eq!(store.get_active_session().unwrap().title, DEFAULT_SESSION_TITLE);

        NewCommand { title: None, template: Some("code-review".to_string()) }
            .execute(&mut store)
            .unwrap();
        assert_eq!(store.get_active_session().unwrap().title, "Code review");
        assert_eq!(store.len(), 3);

        let err = NewCommand { title: None, template: Some("nope".to_string()) }
            .execute(&mut store)
            .unwrap_err();
        assert!(err.to_string().contains("brainstorm"));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_send_starts_session_when_none_active() {
        let mut store = SessionStore::new();
        let cmd = SendCommand {
            text: vec!["hello".to_string(), "world".to_string()],
            role: "user".to_string(),
            session: None,
        };
        cmd.execute(&mut store).unwrap();

        let session = store.get_active_session().unwrap();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].content, "hello world");
        assert_eq!(session.messages[0].role, MessageRole::User);
        assert_ne!(session.messages[0].timestamp, "unknown");
    }

    #[test]
    fn test_send_with_unknown_role_defaults_to_assistant() {
        let mut store = SessionStore::new();
        let id = store.create_session(None).id;
        SendCommand { text: vec!["beep".to_string()], role: "robot".to_string(), session: Some(id.clone()) }
            .execute(&mut store)
            .unwrap();
        assert_eq!(store.get_session(&id).unwrap().messages[0].role, MessageRole::Assistant);
    }

    #[test]
    fn test_send_to_missing_session_fails_without_creating() {
        let mut store = SessionStore::new();
        let result = SendCommand {
            text: vec!["hi".to_string()],
            role: "user".to_string(),
            session: Some("missing".to_string()),
        }
        .execute(&mut store);
        assert!(result.is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_switch_to_missing_session_leaves_no_active() {
        let mut store = SessionStore::new();
        store.create_session(None);
        SwitchCommand { id: "ghost".to_string() }.execute(&mut store).unwrap();
        assert!(store.get_active_session().is_none());
    }

    #[test]
    fn test_delete_and_rename_require_existing_session() {
        let mut store = SessionStore::new();
        assert!(DeleteCommand { id: "x".to_string() }.execute(&mut store).is_err());
        assert!(RenameCommand { id: "x".to_string(), title: vec!["T".to_string()] }
            .execute(&mut store)
            .is_err());

        let id = store.create_session(None).id;
        RenameCommand { id: id.clone(), title: vec!["New".to_string(), "name".to_string()] }
            .execute(&mut store)
            .unwrap();
        assert_eq!(store.get_session(&id).unwrap().title, "New name");

        DeleteCommand { id }.execute(&mut store).unwrap();
        assert!(store.is_empty());
        assert!(store.active_session_id().is_none());
    }

    #[test]
    fn test_format_summary_line() {
        let summary = SessionSummary {
            id: "abc".to_string(),
            title: "Notes".to_string(),
            message_count: 1,
            is_active: true,
            preview: "hello".to_string(),
        };
        assert_eq!(format_summary(&summary), "* abc  Notes (1 message)  hello");

        let summary = SessionSummary { is_active: false, message_count: 0, preview: String::new(), ..summary };
        assert_eq!(format_summary(&summary), "  abc  Notes (0 messages)");
    }
}
