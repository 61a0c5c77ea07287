//! Prompts in the shape the backend stores them inside dialogs.
//!
//! A stored prompt keeps its blocks by kind name next to the rendered prompt
//! and the response, so it can be loaded back into the builder later.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::api::RemoteId;
use crate::catalog;
use crate::document::PromptDocument;
use crate::error::DocumentError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptMetadata {
    pub model: String,
    pub temperature: f32,
    pub generated_at: String,
    pub is_editing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_prompt_id: Option<RemoteId>,
}

/// One prompt/response exchange as sent to dialog creation and the
/// add/update prompt endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptEntry {
    pub blocks: Vec<StoredBlock>,
    pub prompt_content: String,
    pub prompt_title: String,
    pub response_content: String,
    pub metadata: PromptMetadata,
}

impl PromptEntry {
    pub fn from_document(
        document: &PromptDocument,
        model: &str,
        temperature: f32,
        response: &str,
        generated_at: DateTime<Local>,
    ) -> Self {
        let blocks = document
            .blocks()
            .iter()
            .map(|block| StoredBlock {
                kind: block.kind().as_str().to_string(),
                label: block.label().to_string(),
                content: block.content().to_string(),
                required: block.is_required(),
            })
            .collect();

        Self {
            blocks,
            prompt_content: document.serialize(),
            prompt_title: document.title().to_string(),
            response_content: response.to_string(),
            metadata: PromptMetadata {
                model: model.to_string(),
                temperature,
                generated_at: generated_at.to_rfc3339(),
                is_editing: false,
                original_prompt_id: None,
            },
        }
    }

    /// Marks the entry as a replacement for the stored prompt `prompt_id`.
    pub fn replacing(mut self, prompt_id: RemoteId) -> Self {
        self.metadata.is_editing = true;
        self.metadata.original_prompt_id = Some(prompt_id);
        self
    }
}

/// A stored prompt fetched back for editing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoredPrompt {
    #[serde(default)]
    pub dialog_title: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub blocks: Vec<StoredBlock>,
}

impl StoredPrompt {
    /// Rebuilds an editable document.
    ///
    /// Required blocks stay first whatever order they were stored in; optional
    /// blocks follow in stored order. Unknown kinds and repeated optional kinds
    /// are rejected.
    pub fn to_document(&self) -> Result<PromptDocument, DocumentError> {
        let mut document = PromptDocument::initialize();

        let title = [&self.title, &self.dialog_title]
            .into_iter()
            .flatten()
            .find(|t| !t.trim().is_empty());
        if let Some(title) = title {
            document.set_title(title.as_str());
        }

        for stored in &self.blocks {
            let kind = catalog::find(&stored.kind)?.kind;
            let id = if kind.is_required() {
                document
                    .blocks()
                    .iter()
                    .find(|b| b.kind() == kind)
                    .map(|b| b.id())
                    .ok_or(DocumentError::UnknownBlockKind(stored.kind.clone()))?
            } else {
                document.add_block(kind)?.id()
            };
            document.set_block_content(id, stored.content.as_str())?;
        }

        Ok(document)
    }
}

/// History of a dialog condensed for continuing it in a new prompt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DialogContext {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub context: Option<String>,
}
