//! Client side of the promptkit REST backend.
//!
//! The generation session only talks to the two traits below; the reqwest
//! implementation is [`BackendClient`].

pub mod client;
pub mod types;

use async_trait::async_trait;

pub use client::BackendClient;
pub use types::{DialogRecord, GenerationRequest, RemoteId};

use crate::error::ApiError;

/// The AI generation endpoint.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Sends one prompt and returns the generated text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ApiError>;
}

/// The dialog persistence endpoint.
#[async_trait]
pub trait DialogStore: Send + Sync {
    async fn save_dialog(&self, record: &DialogRecord) -> Result<(), ApiError>;
}
