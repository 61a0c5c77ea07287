//! A single generation attempt.
//!
//! A session moves `Idle -> InFlight -> Succeeded | Failed` exactly once.
//! It is never restarted; a new attempt gets a new session.

use std::sync::Arc;

use serde::Serialize;

use crate::api::{DialogRecord, GenerationBackend, GenerationRequest};
use crate::autosave::AutosaveQueue;
use crate::document::PromptDocument;
use crate::error::{ApiError, SessionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    InFlight,
    Succeeded,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Succeeded | SessionState::Failed)
    }
}

/// Snapshot returned by [`GenerationSession::result`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionResult {
    pub state: SessionState,
    pub response: Option<String>,
    pub error_message: Option<String>,
}

pub struct GenerationSession {
    backend: Arc<dyn GenerationBackend>,
    autosave: AutosaveQueue,
    state: SessionState,
    request_prompt: String,
    response: Option<String>,
    error_message: Option<String>,
}

impl GenerationSession {
    pub fn new(backend: Arc<dyn GenerationBackend>, autosave: AutosaveQueue) -> Self {
        Self {
            backend,
            autosave,
            state: SessionState::Idle,
            request_prompt: String::new(),
            response: None,
            error_message: None,
        }
    }

    /// Sends `document` to the generation backend and waits for the outcome.
    ///
    /// Returns an error only when the attempt is refused up front (invalid
    /// document, temperature out of range, session already used); the
    /// session then stays `Idle` and nothing is sent. Once the request is
    /// issued every outcome is reported through the returned snapshot.
    pub async fn start(
        &mut self,
        document: &PromptDocument,
        model: &str,
        temperature: f32,
    ) -> Result<SessionResult, SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::AlreadyStarted);
        }
        let validation = document.validate();
        if !validation.valid {
            return Err(SessionError::InvalidDocument(validation));
        }
        if !(0.0..=1.0).contains(&temperature) {
            return Err(SessionError::TemperatureOutOfRange(temperature));
        }

        self.request_prompt = document.serialize();
        self.state = SessionState::InFlight;
        tracing::debug!(model, temperature, "generation request in flight");

        let request = GenerationRequest {
            serialized_prompt: self.request_prompt.clone(),
            model: model.to_string(),
            temperature,
        };

        match self.backend.generate(&request).await {
            Ok(response) => {
                self.autosave.enqueue(DialogRecord {
                    title: document.title().to_string(),
                    prompt: self.request_prompt.clone(),
                    response: response.clone(),
                });
                self.response = Some(response);
                self.state = SessionState::Succeeded;
                tracing::info!(model, "generation succeeded");
            }
            Err(e) => {
                tracing::warn!(model, error = %e, "generation failed");
                self.error_message = Some(failure_message(&e));
                self.state = SessionState::Failed;
            }
        }

        Ok(self.result())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The serialized prompt that was sent, empty before `start`.
    pub fn request_prompt(&self) -> &str {
        &self.request_prompt
    }

    pub fn result(&self) -> SessionResult {
        SessionResult {
            state: self.state,
            response: self.response.clone(),
            error_message: self.error_message.clone(),
        }
    }
}

fn failure_message(error: &ApiError) -> String {
    match error {
        ApiError::Rejected { message, .. } => format!("Generation failed: {}", message),
        ApiError::Transport(e) => format!("Could not reach the server: {}", e),
        ApiError::Status(status) => format!("Server error: {}", status),
        ApiError::Malformed(detail) => format!("Unexpected server response: {}", detail),
        ApiError::Unauthorized => "You need to log in before generating".to_string(),
    }
}
