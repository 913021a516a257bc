use crate::traits::{ChatMessage, ToolRequest};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered, append-only message history for one question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt), ChatMessage::user(question)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub(crate) fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Text of the most recent assistant message.
    pub fn last_answer(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match m {
            ChatMessage::Assistant { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }

    /// Requests of the latest assistant turn that have no result yet.
    pub fn unanswered_requests(&self) -> Vec<&ToolRequest> {
        let Some(turn_start) = self
            .messages
            .iter()
            .rposition(|m| matches!(m, ChatMessage::Assistant { .. }))
        else {
            return Vec::new();
        };

        let answered: HashSet<&str> = self.messages[turn_start + 1..]
            .iter()
            .filter_map(|m| match m {
                ChatMessage::Tool(result) => Some(result.id.as_str()),
                _ => None,
            })
            .collect();

        self.messages[turn_start]
            .tool_requests()
            .iter()
            .filter(|r| !answered.contains(r.id.as_str()))
            .collect()
    }
}
