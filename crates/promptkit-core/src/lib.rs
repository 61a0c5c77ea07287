pub mod api;
pub mod auth;
pub mod autosave;
pub mod catalog;
pub mod config;
pub mod dialog;
pub mod document;
pub mod error;
pub mod export;
pub mod session;
pub mod stored;

// Re-export main types for convenience
pub use api::{BackendClient, DialogRecord, DialogStore, GenerationBackend, GenerationRequest, RemoteId};
pub use auth::{AuthSession, UserProfile};
pub use autosave::AutosaveQueue;
pub use catalog::{BlockKind, BlockSpec};
pub use config::Config;
pub use dialog::{ChatMessage, ChatRole, Dialog, DialogDetails, DialogPrompt};
pub use document::{BlockId, BlockInstance, PromptDocument, Validation};
pub use error::{ApiError, DocumentError, SessionError};
pub use session::{GenerationSession, SessionResult, SessionState};
pub use stored::{DialogContext, PromptEntry, PromptMetadata, StoredBlock, StoredPrompt};
