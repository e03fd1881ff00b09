//! In-memory session store
//!
//! The store is the only mutation path for sessions and the active-session
//! pointer. Operations never fail: unknown ids are absorbed as no-ops and the
//! active pointer is a plain id that may dangle.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::sanitize::{sanitize_message, sanitize_session, sanitize_snapshot, sanitize_title};
use super::types::{generate_session_id, Session, SessionTemplate};

/// Serialized form of the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub sessions: Vec<Session>,
    #[serde(rename = "activeSessionId")]
    pub active_session_id: Option<String>,
}

/// Session collection plus the active-session pointer.
///
/// Sessions are kept in creation order; new sessions are appended.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Vec<Session>,
    active_session_id: Option<String>,
}

impl SessionStore {
    /// Create an empty store with no active session
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a serialized snapshot of unknown shape
    pub fn resume(snapshot: &Value) -> Self {
        let sanitized = sanitize_snapshot(snapshot);
        for warning in &sanitized.warnings {
            warn!("Resuming sessions: {}", warning);
        }

        Self::resume_sanitized(sanitized.sessions, sanitized.active_session_id)
    }

    /// Assemble a store from records that already passed sanitization
    pub(crate) fn resume_sanitized(
        sessions: Vec<Session>,
        active_session_id: Option<String>,
    ) -> Self {
        Self {
            sessions,
            active_session_id,
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            sessions: self.sessions.clone(),
            active_session_id: self.active_session_id.clone(),
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// The raw pointer; may name a session that no longer exists
    pub fn active_session_id(&self) -> Option<&str> {
        self.active_session_id.as_deref()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get_session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    fn get_session_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    /// Resolve the active pointer; a dangling id reads as no active session
    pub fn get_active_session(&self) -> Option<&Session> {
        self.active_session_id
            .as_deref()
            .and_then(|id| self.get_session(id))
    }

    /// Create a session from optional partial data and make it active
    pub fn create_session(&mut self, initial: Option<&Value>) -> Session {
        let mut session = sanitize_session(initial.unwrap_or(&Value::Null));

        if self.get_session(&session.id).is_some() {
            let fresh = generate_session_id();
            warn!("Session id {} already in use; assigning {}", session.id, fresh);
            session.id = fresh;
        }

        debug!("Created session {} ({})", session.id, session.title);
        self.active_session_id = Some(session.id.clone());
        self.sessions.push(session.clone());
        session
    }

    /// Create an empty session titled after a template and make it active
    pub fn launch_template(&mut self, template: &SessionTemplate) -> Session {
        debug!("Launching template {}", template.name);
        let initial = serde_json::json!({ "title": template.title });
        self.create_session(Some(&initial))
    }

    /// Point at `id` without checking that it resolves
    pub fn switch_session(&mut self, id: &str) {
        if self.get_session(id).is_none() {
            debug!("Switching to unknown session {}", id);
        }
        self.active_session_id = Some(id.to_string());
    }

    /// Append a sanitized message; unknown session ids are ignored
    pub fn append_message(&mut self, session_id: &str, raw_message: &Value) {
        match self.get_session_mut(session_id) {
            Some(session) => session.messages.push(sanitize_message(raw_message)),
            None => debug!("Dropping message for unknown session {}", session_id),
        }
    }

    /// Replace a session's title; unknown session ids are ignored
    pub fn rename_session(&mut self, id: &str, raw_title: &Value) {
        if let Some(session) = self.get_session_mut(id) {
            session.title = sanitize_title(raw_title);
        }
    }

    /// Remove a session, clearing the active pointer if it named it
    pub fn delete_session(&mut self, id: &str) {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);

        if self.sessions.len() != before {
            debug!("Deleted session {}", id);
            if self.active_session_id.as_deref() == Some(id) {
                self.active_session_id = None;
            }
        }
    }

    /// Drop every session and the active pointer
    pub fn reset(&mut self) {
        self.sessions.clear();
        self.active_session_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MessageRole, DEFAULT_SESSION_TITLE};
    use serde_json::json;

    #[test]
    fn test_fresh_store_is_empty() {
        let store = SessionStore::new();
        assert!(store.sessions().is_empty());
        assert!(store.active_session_id().is_none());
        assert!(store.get_active_session().is_none());
    }

    #[test]
    fn test_create_session_becomes_active() {
        let mut store = SessionStore::new();
        let first = store.create_session(None);
        let second = store.create_session(Some(&json!({"title": "Groceries"})));

        assert_eq!(first.title, DEFAULT_SESSION_TITLE);
        assert_eq!(store.len(), 2);
        assert_eq!(store.sessions()[0].id, first.id);
        assert_eq!(store.sessions()[1].id, second.id);
        assert_eq!(store.active_session_id(), Some(second.id.as_str()));
        assert_eq!(store.get_active_session().unwrap().title, "Groceries");
    }

    #[test]
    fn test_create_session_with_taken_id_gets_fresh_id() {
        let mut store = SessionStore::new();
        let a = store.create_session(Some(&json!({"id": "same"})));
        let b = store.create_session(Some(&json!({"id": "same"})));
        assert_eq!(a.id, "same");
        assert_ne!(b.id, "same");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_switch_to_missing_session_does_not_panic() {
        let mut store = SessionStore::new();
        store.switch_session("missing-id");
        assert_eq!(store.active_session_id(), Some("missing-id"));
        assert!(store.get_active_session().is_none());
    }

    #[test]
    fn test_append_message_preserves_order() {
        let mut store = SessionStore::new();
        let session = store.create_session(None);
        store.append_message(&session.id, &json!({"role": "user", "content": "one"}));
        store.append_message(&session.id, &json!({"content": "two"}));
        store.append_message(&session.id, &json!(null));

        let messages = &store.get_session(&session.id).unwrap().messages;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].content, "two");
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[2].content, "");
    }

    #[test]
    fn test_append_to_unknown_session_is_noop() {
        let mut store = SessionStore::new();
        store.create_session(None);
        let before = store.snapshot();

        store.append_message("nope", &json!({"role": "user", "content": "hi"}));
        assert_eq!(store.snapshot(), before);

        let mut empty = SessionStore::new();
        empty.append_message("nope", &json!({"content": "hi"}));
        assert!(empty.is_empty());
    }

    #[test]
    fn test_delete_active_session_clears_pointer() {
        let mut store = SessionStore::new();
        let a = store.create_session(None);
        let b = store.create_session(None);

        store.delete_session(&b.id);
        assert!(store.active_session_id().is_none());
        assert_eq!(store.len(), 1);

        store.switch_session(&a.id);
        store.delete_session("unknown");
        assert_eq!(store.active_session_id(), Some(a.id.as_str()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_inactive_session_keeps_pointer() {
        let mut store = SessionStore::new();
        let a = store.create_session(None);
        let b = store.create_session(None);
        store.delete_session(&a.id);
        assert_eq!(store.active_session_id(), Some(b.id.as_str()));
    }

    #[test]
    fn test_rename_session_sanitizes_title() {
        let mut store = SessionStore::new();
        let session = store.create_session(None);
        store.rename_session(&session.id, &json!("  Road trip "));
        assert_eq!(store.get_session(&session.id).unwrap().title, "Road trip");
        store.rename_session(&session.id, &json!(""));
        assert_eq!(store.get_session(&session.id).unwrap().title, DEFAULT_SESSION_TITLE);
        store.rename_session("missing", &json!("x"));
    }

    #[test]
    fn test_launch_template_creates_empty_active_session() {
        let mut store = SessionStore::new();
        let template = SessionTemplate::new("code-review", "Code review")
            .with_prompt("Review this diff");
        let session = store.launch_template(&template);
        assert_eq!(session.title, "Code review");
        assert!(session.messages.is_empty());
        assert_eq!(store.active_session_id(), Some(session.id.as_str()));
    }

    #[test]
    fn test_resume_round_trips_snapshot() {
        let mut store = SessionStore::new();
        let session = store.create_session(Some(&json!({"title": "Kept"})));
        store.append_message(&session.id, &json!({"role": "user", "content": "hello"}));

        let value = serde_json::to_value(store.snapshot()).unwrap();
        assert!(value.get("activeSessionId").is_some());

        let resumed = SessionStore::resume(&value);
        assert_eq!(resumed.snapshot(), store.snapshot());
    }

    #[test]
    fn test_reset_returns_to_default() {
        let mut store = SessionStore::new();
        store.create_session(None);
        store.reset();
        assert!(store.is_empty());
        assert!(store.active_session_id().is_none());
    }
}
