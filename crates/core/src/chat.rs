use std::sync::Arc;

use crate::{
    api::SummarizerApi,
    error::{KonspektError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatEntryKind {
    Question,
    Answer,
    Error,
}

#[derive(Debug, Clone)]
pub struct ChatEntry {
    pub kind: ChatEntryKind,
    pub content: String,
}

/// Append-only question/answer/error log for a single completed task. One
/// question may be in flight at a time; the frontend disables its input
/// while `is_waiting` is true. There is no automatic retry; the user
/// resends manually.
pub struct ChatSession {
    api: Arc<dyn SummarizerApi>,
    task_id: String,
    entries: Vec<ChatEntry>,
    in_flight: bool,
}

impl ChatSession {
    pub fn new(api: Arc<dyn SummarizerApi>, task_id: impl Into<String>) -> Self {
        Self {
            api,
            task_id: task_id.into(),
            entries: Vec::new(),
            in_flight: false,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn is_waiting(&self) -> bool {
        self.in_flight
    }

    /// Ask one question. The question is appended optimistically before the
    /// request goes out; the response appends either an answer entry or, on
    /// any failure, an error entry with a human-readable message. A blank
    /// question is a no-op. Returns the entry the exchange ended on.
    pub async fn ask(&mut self, question: &str) -> Result<Option<&ChatEntry>> {
        if self.in_flight {
            return Err(KonspektError::QuestionPending {
                task_id: self.task_id.clone(),
            });
        }
        let question = question.trim();
        if question.is_empty() {
            return Ok(None);
        }

        self.entries.push(ChatEntry {
            kind: ChatEntryKind::Question,
            content: question.to_string(),
        });

        self.in_flight = true;
        let reply = match self.api.ask(&self.task_id, question).await {
            Ok(answer) => ChatEntry {
                kind: ChatEntryKind::Answer,
                content: answer,
            },
            Err(e) => ChatEntry {
                kind: ChatEntryKind::Error,
                content: e.to_string(),
            },
        };
        self.in_flight = false;

        self.entries.push(reply);
        Ok(self.entries.last())
    }
}
