//! Saved dialogs as returned by the backend, and their chat-style view.
//!
//! These types are UI-agnostic: the terminal front-end renders them, but they
//! carry no UI state.

use serde::{Deserialize, Serialize};

use crate::api::RemoteId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    pub id: RemoteId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// One prompt/response pair stored in a dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogPrompt {
    pub id: RemoteId,
    #[serde(default)]
    pub prompt_content: Option<String>,
    #[serde(default)]
    pub response_content: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogDetails {
    pub dialog: Dialog,
    #[serde(default)]
    pub prompts: Vec<DialogPrompt>,
}

/// Number of most recent messages sent as context with a follow-up.
pub const CHAT_CONTEXT_MESSAGES: usize = 5;

/// A message in the conversation view of a dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// The stored prompt this message came from; `None` for follow-ups.
    pub prompt_id: Option<RemoteId>,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

/// Flattens stored prompts into a conversation: each prompt followed by its
/// response. Missing or empty halves are skipped.
pub fn conversation(prompts: &[DialogPrompt]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(prompts.len() * 2);

    for prompt in prompts {
        let halves = [
            (ChatRole::User, &prompt.prompt_content),
            (ChatRole::Assistant, &prompt.response_content),
        ];
        for (role, content) in halves {
            if let Some(content) = content.as_ref().filter(|c| !c.is_empty()) {
                messages.push(ChatMessage {
                    role,
                    content: content.clone(),
                    prompt_id: Some(prompt.id.clone()),
                });
            }
        }
    }

    messages
}

/// Joins the last few messages into the context string for a follow-up.
pub fn chat_context(messages: &[ChatMessage]) -> String {
    let start = messages.len().saturating_sub(CHAT_CONTEXT_MESSAGES);
    messages[start..]
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
