use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::types::{
    ChatRequest, CreatedDialog, DataBody, DialogPromptRequest, DialogRecord, Empty, Envelope,
    GenerateBody, GenerationRequest, LoginData, LoginRequest, NewDialogRequest, RemoteId,
};
use super::{DialogStore, GenerationBackend};
use crate::auth::AuthSession;
use crate::dialog::DialogDetails;
use crate::error::ApiError;
use crate::stored::{DialogContext, PromptEntry, StoredPrompt};

/// HTTP client for the promptkit REST backend.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let token = self.token.as_deref().ok_or(ApiError::Unauthorized)?;
        Ok(request.bearer_auth(token))
    }

    /// Logs in and returns the session the caller should keep.
    ///
    /// The client's own token is left alone; callers install the new one
    /// with [`set_token`](Self::set_token) once they accept the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        let request = LoginRequest {
            email: email.trim().to_lowercase(),
            password,
        };

        let response = self
            .client
            .post(self.url("/api/login"))
            .json(&request)
            .send()
            .await?;

        let body: DataBody<LoginData> = read_envelope(response)
            .await?
            .into_body("Invalid email or password")?;
        let data = body
            .data
            .ok_or_else(|| ApiError::Malformed("login reply has no data".to_string()))?;

        tracing::info!(user = %data.user.username, "logged in");
        Ok(AuthSession {
            token: data.token,
            user: data.user,
        })
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        let request = self.authorized(self.client.post(self.url("/api/logout")))?;
        let response = request.send().await?;
        read_envelope::<Empty>(response).await?.into_body("Logout failed")?;
        Ok(())
    }

    pub async fn get_dialog(&self, dialog_id: &str) -> Result<DialogDetails, ApiError> {
        let request = self.authorized(self.client.get(self.url(&format!("/api/dialogs/{}", dialog_id))))?;
        let response = request.send().await?;

        let body: DataBody<DialogDetails> = read_envelope(response).await?.into_body("Dialog not found")?;
        body.data
            .ok_or_else(|| ApiError::Malformed("dialog reply has no data".to_string()))
    }

    pub async fn delete_dialog(&self, dialog_id: &str) -> Result<(), ApiError> {
        let request =
            self.authorized(self.client.delete(self.url(&format!("/api/dialogs/{}", dialog_id))))?;
        let response = request.send().await?;
        read_envelope::<Empty>(response).await?.into_body("Could not delete dialog")?;
        Ok(())
    }

    pub async fn delete_dialog_prompt(&self, dialog_id: &str, prompt_id: &str) -> Result<(), ApiError> {
        let url = self.url(&format!("/api/dialogs/{}/prompts/{}", dialog_id, prompt_id));
        let request = self.authorized(self.client.delete(url))?;
        let response = request.send().await?;
        read_envelope::<Empty>(response).await?.into_body("Could not delete prompt")?;
        Ok(())
    }

    /// Creates a dialog whose first prompt is `entry` and returns its id.
    pub async fn create_dialog(&self, title: &str, entry: &PromptEntry) -> Result<RemoteId, ApiError> {
        let body = NewDialogRequest {
            title,
            prompts: [entry],
        };
        let request = self.authorized(self.client.post(self.url("/api/dialogs/create")))?;
        let response = request.json(&body).send().await?;

        let body: DataBody<CreatedDialog> =
            read_envelope(response).await?.into_body("Could not create dialog")?;
        let created = body
            .data
            .ok_or_else(|| ApiError::Malformed("create reply has no dialog".to_string()))?;

        tracing::info!(dialog = %created.dialog.id, "dialog created");
        Ok(created.dialog.id)
    }

    pub async fn add_prompt(&self, dialog_id: &RemoteId, entry: &PromptEntry) -> Result<(), ApiError> {
        self.send_prompt("/api/dialogs/add-prompt", dialog_id, entry, "Could not add prompt")
            .await
    }

    /// Replaces a stored prompt. `entry` should come from
    /// [`PromptEntry::replacing`] so the backend knows which one.
    pub async fn update_prompt(&self, dialog_id: &RemoteId, entry: &PromptEntry) -> Result<(), ApiError> {
        self.send_prompt("/api/dialogs/update-prompt", dialog_id, entry, "Could not update prompt")
            .await
    }

    async fn send_prompt(
        &self,
        path: &str,
        dialog_id: &RemoteId,
        entry: &PromptEntry,
        fallback: &str,
    ) -> Result<(), ApiError> {
        let body = DialogPromptRequest { dialog_id, entry };
        let request = self.authorized(self.client.post(self.url(path)))?;
        let response = request.json(&body).send().await?;
        read_envelope::<Empty>(response).await?.into_body(fallback)?;
        Ok(())
    }

    /// Sends a follow-up message in a dialog. `context` is the recent
    /// conversation the backend should answer against.
    pub async fn chat(&self, dialog_id: &RemoteId, message: &str, context: &str) -> Result<String, ApiError> {
        let url = self.url(&format!("/api/dialogs/{}/chat", dialog_id));
        let request = self.authorized(self.client.post(url))?;
        let response = request.json(&ChatRequest { message, context }).send().await?;

        let body: GenerateBody = read_envelope(response).await?.into_body("No reply from the AI")?;
        body.response
            .ok_or_else(|| ApiError::Malformed("chat reply has no response".to_string()))
    }

    pub async fn get_prompt(&self, prompt_id: &RemoteId) -> Result<StoredPrompt, ApiError> {
        let url = self.url(&format!("/api/prompts/{}", prompt_id));
        let response = self.authorized(self.client.get(url))?.send().await?;

        let body: DataBody<StoredPrompt> = read_envelope(response).await?.into_body("Prompt not found")?;
        body.data
            .ok_or_else(|| ApiError::Malformed("prompt reply has no data".to_string()))
    }

    pub async fn dialog_context(&self, dialog_id: &RemoteId) -> Result<DialogContext, ApiError> {
        let url = self.url(&format!("/api/dialogs/{}/context", dialog_id));
        let response = self.authorized(self.client.get(url))?.send().await?;

        let body: DataBody<DialogContext> =
            read_envelope(response).await?.into_body("Could not load dialog context")?;
        body.data
            .ok_or_else(|| ApiError::Malformed("context reply has no data".to_string()))
    }
}

#[async_trait]
impl GenerationBackend for BackendClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ApiError> {
        let builder = self.authorized(self.client.post(self.url("/api/ai/generate")))?;
        let response = builder.json(request).send().await?;

        let body: GenerateBody = read_envelope(response).await?.into_body("Generation failed")?;
        body.response
            .ok_or_else(|| ApiError::Malformed("generation reply has no response".to_string()))
    }
}

#[async_trait]
impl DialogStore for BackendClient {
    async fn save_dialog(&self, record: &DialogRecord) -> Result<(), ApiError> {
        let builder = self.authorized(self.client.post(self.url("/api/dialogs/save")))?;
        let response = builder.json(record).send().await?;
        read_envelope::<Empty>(response).await?.into_body("Could not save dialog")?;
        Ok(())
    }
}

/// Reads the `{success, ...}` envelope from a response.
///
/// Error statuses usually still carry an envelope with a message, so the
/// body is parsed first and the status only matters when it is not JSON.
async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<Envelope<T>, ApiError> {
    let status = response.status();
    let text = response.text().await?;

    match serde_json::from_str::<Envelope<T>>(&text) {
        Ok(envelope) => Ok(envelope),
        Err(_) if !status.is_success() => Err(ApiError::Status(status)),
        Err(err) => Err(ApiError::Malformed(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = BackendClient::new("http://localhost:3000/");
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(client.url("/api/login"), "http://localhost:3000/api/login");
    }

    #[tokio::test]
    async fn test_authenticated_calls_require_token() {
        let client = BackendClient::new("http://127.0.0.1:9");
        let request = GenerationRequest {
            serialized_prompt: "# T".to_string(),
            model: "m".to_string(),
            temperature: 0.1,
        };
        assert!(matches!(client.generate(&request).await, Err(ApiError::Unauthorized)));
        assert!(matches!(client.delete_dialog("1").await, Err(ApiError::Unauthorized)));
    }
}
