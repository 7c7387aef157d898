//! Email and audit sinks used by the event subscribers.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::EventId;
use serde::{Deserialize, Serialize};

use super::{read, write};
use crate::error::WorkflowError;

/// Outbound email.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), WorkflowError>;
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub event_type: String,
    /// `Order` or `Payment`.
    pub entity_type: String,
    pub entity_id: String,
    pub event_id: EventId,
    pub occurred_at: DateTime<Utc>,
    pub data: serde_json::Value,
}

/// Append-only audit trail.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: AuditLogEntry) -> Result<(), WorkflowError>;
}

/// An email captured by [`InMemoryEmailSender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Default)]
struct EmailState {
    sent: Vec<SentEmail>,
    fail_on_send: bool,
}

/// Records emails instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmailSender {
    state: Arc<RwLock<EmailState>>,
}

impl InMemoryEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_send(&self, fail: bool) {
        write(&self.state).fail_on_send = fail;
    }

    /// Returns every captured email, oldest first.
    pub fn sent(&self) -> Vec<SentEmail> {
        read(&self.state).sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        read(&self.state).sent.len()
    }
}

#[async_trait]
impl EmailSender for InMemoryEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), WorkflowError> {
        let mut state = write(&self.state);
        if state.fail_on_send {
            return Err(WorkflowError::Subscriber(format!(
                "SMTP relay refused mail to {to}"
            )));
        }
        state.sent.push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
struct AuditState {
    entries: Vec<AuditLogEntry>,
    fail_on_append: bool,
}

/// In-memory audit trail.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditLog {
    state: Arc<RwLock<AuditState>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_append(&self, fail: bool) {
        write(&self.state).fail_on_append = fail;
    }

    /// Returns every entry, oldest first.
    pub fn entries(&self) -> Vec<AuditLogEntry> {
        read(&self.state).entries.clone()
    }

    /// Returns the entries about one entity, newest first.
    pub fn entries_for(&self, entity_type: &str, entity_id: &str) -> Vec<AuditLogEntry> {
        let mut entries: Vec<_> = read(&self.state)
            .entries
            .iter()
            .filter(|e| e.entity_type == entity_type && e.entity_id == entity_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        entries
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, entry: AuditLogEntry) -> Result<(), WorkflowError> {
        let mut state = write(&self.state);
        if state.fail_on_append {
            return Err(WorkflowError::Subscriber("Audit store unavailable".to_string()));
        }
        state.entries.push(entry);
        Ok(())
    }
}
