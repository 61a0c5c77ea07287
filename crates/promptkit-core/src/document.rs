//! The prompt document: an ordered list of typed blocks plus a title.
//!
//! A document always holds the required `context` and `task` blocks and at
//! most one block of every other kind. Block order is insertion order and is
//! the order blocks are rendered and serialized in.

use std::collections::BTreeSet;
use std::fmt;

use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{self, BlockKind};
use crate::error::DocumentError;

/// Closing line appended to every serialized prompt.
pub const PROMPT_TRAILER: &str = "Get started!";

/// Opaque identifier of a block within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(Uuid);

impl BlockId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One block of a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockInstance {
    id: BlockId,
    kind: BlockKind,
    content: String,
}

impl BlockInstance {
    fn empty(kind: BlockKind) -> Self {
        Self {
            id: BlockId::new(),
            kind,
            content: String::new(),
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    pub fn is_required(&self) -> bool {
        self.kind.is_required()
    }

    fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// Outcome of [`PromptDocument::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub missing_required_kinds: BTreeSet<BlockKind>,
    pub title_empty: bool,
}

impl Validation {
    /// Short human-readable description of what is missing.
    pub fn summary(&self) -> String {
        let mut problems = Vec::new();
        if !self.missing_required_kinds.is_empty() {
            let labels: Vec<&str> = self
                .missing_required_kinds
                .iter()
                .map(|kind| kind.label())
                .collect();
            problems.push(format!("fill in the required blocks: {}", labels.join(", ")));
        }
        if self.title_empty {
            problems.push("enter a title".to_string());
        }
        if problems.is_empty() {
            "ok".to_string()
        } else {
            problems.join("; ")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptDocument {
    title: String,
    blocks: Vec<BlockInstance>,
}

impl PromptDocument {
    /// Creates a document titled after today's date, holding an empty
    /// `context` block followed by an empty `task` block.
    pub fn initialize() -> Self {
        let title = format!("Prompt from {}", Local::now().format("%Y-%m-%d"));
        let blocks = catalog::all_kinds()
            .iter()
            .filter(|spec| spec.required)
            .map(|spec| BlockInstance::empty(spec.kind))
            .collect();
        tracing::debug!(%title, "initialized prompt document");
        Self { title, blocks }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn blocks(&self) -> &[BlockInstance] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> Option<&BlockInstance> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains_kind(&self, kind: BlockKind) -> bool {
        self.blocks.iter().any(|b| b.kind == kind)
    }

    /// Optional kinds not yet used, in catalog order.
    pub fn available_kinds(&self) -> Vec<BlockKind> {
        catalog::all_kinds()
            .iter()
            .filter(|spec| !spec.required && !self.contains_kind(spec.kind))
            .map(|spec| spec.kind)
            .collect()
    }

    /// Appends an empty block of `kind`.
    pub fn add_block(&mut self, kind: BlockKind) -> Result<&BlockInstance, DocumentError> {
        if kind.is_required() {
            return Err(DocumentError::CannotAddRequiredKind(kind));
        }
        if self.contains_kind(kind) {
            return Err(DocumentError::DuplicateBlockKind(kind));
        }

        self.blocks.push(BlockInstance::empty(kind));
        tracing::debug!(%kind, "added block");
        Ok(&self.blocks[self.blocks.len() - 1])
    }

    /// Appends the first optional kind that is not in use yet.
    pub fn add_next_block(&mut self) -> Result<&BlockInstance, DocumentError> {
        let kind = self
            .available_kinds()
            .first()
            .copied()
            .ok_or(DocumentError::NoAvailableBlockKind)?;
        self.add_block(kind)
    }

    pub fn remove_block(&mut self, id: BlockId) -> Result<(), DocumentError> {
        let index = self.index_of(id)?;
        let kind = self.blocks[index].kind;
        if kind.is_required() {
            return Err(DocumentError::CannotRemoveRequiredBlock(kind));
        }

        self.blocks.remove(index);
        tracing::debug!(%kind, "removed block");
        Ok(())
    }

    /// Reassigns an optional block to another kind. The block keeps its
    /// position; its content is cleared because content written for one kind
    /// does not carry over to another.
    pub fn change_block_kind(&mut self, id: BlockId, new_kind: BlockKind) -> Result<(), DocumentError> {
        let index = self.index_of(id)?;
        let old_kind = self.blocks[index].kind;
        if old_kind.is_required() {
            return Err(DocumentError::CannotRetypeRequiredBlock(old_kind));
        }
        if self.contains_kind(new_kind) {
            return Err(DocumentError::DuplicateBlockKind(new_kind));
        }

        let block = &mut self.blocks[index];
        block.kind = new_kind;
        block.content.clear();
        tracing::debug!(from = %old_kind, to = %new_kind, "changed block kind");
        Ok(())
    }

    pub fn set_block_content(&mut self, id: BlockId, text: impl Into<String>) -> Result<(), DocumentError> {
        let index = self.index_of(id)?;
        self.blocks[index].content = text.into();
        Ok(())
    }

    pub fn set_title(&mut self, text: impl Into<String>) {
        self.title = text.into();
    }

    /// Puts `text` in front of the context block, separated by a blank line.
    /// Used to carry an earlier conversation into a new prompt.
    pub fn prepend_context(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        if let Some(block) = self.blocks.iter_mut().find(|b| b.kind == BlockKind::Context) {
            block.content = if block.content.is_empty() {
                text.to_string()
            } else {
                format!("{}\n\n{}", text, block.content)
            };
        }
    }

    pub fn validate(&self) -> Validation {
        let missing_required_kinds: BTreeSet<BlockKind> = catalog::required_kinds()
            .into_iter()
            .filter(|kind| !self.blocks.iter().any(|b| b.kind == *kind && b.has_content()))
            .collect();
        let title_empty = self.title.trim().is_empty();

        Validation {
            valid: missing_required_kinds.is_empty() && !title_empty,
            missing_required_kinds,
            title_empty,
        }
    }

    /// Renders the prompt sent to the generation backend.
    ///
    /// Blocks whose trimmed content is empty are skipped, required or not.
    /// Call [`validate`](Self::validate) first if the output must contain
    /// every required block.
    pub fn serialize(&self) -> String {
        let sections: Vec<String> = self
            .blocks
            .iter()
            .filter(|b| b.has_content())
            .map(|b| format!("## {}\n{}", b.label(), b.content))
            .collect();

        format!("# {}\n\n{}\n\n{}", self.title, sections.join("\n\n"), PROMPT_TRAILER)
    }

    fn index_of(&self, id: BlockId) -> Result<usize, DocumentError> {
        self.blocks
            .iter()
            .position(|b| b.id == id)
            .ok_or(DocumentError::BlockNotFound(id))
    }
}

impl Default for PromptDocument {
    fn default() -> Self {
        Self::initialize()
    }
}
