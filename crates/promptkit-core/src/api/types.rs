use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::auth::UserProfile;
use crate::dialog::Dialog;
use crate::error::ApiError;
use crate::stored::PromptEntry;

/// Identifier assigned by the backend. Some endpoints return numbers, others
/// strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteId::Number(n) => write!(f, "{}", n),
            RemoteId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    #[serde(rename = "prompt")]
    pub serialized_prompt: String,
    pub model: String,
    pub temperature: f32,
}

/// A prompt/response exchange handed to dialog storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogRecord {
    pub title: String,
    pub prompt: String,
    pub response: String,
}

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: String,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LoginData {
    pub user: UserProfile,
    pub token: String,
}

#[derive(Serialize)]
pub(crate) struct NewDialogRequest<'a> {
    pub title: &'a str,
    pub prompts: [&'a PromptEntry; 1],
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CreatedDialog {
    pub dialog: Dialog,
}

#[derive(Serialize)]
pub(crate) struct DialogPromptRequest<'a> {
    pub dialog_id: &'a RemoteId,
    #[serde(flatten)]
    pub entry: &'a PromptEntry,
}

#[derive(Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub message: &'a str,
    pub context: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GenerateBody {
    #[serde(default)]
    pub response: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DataBody<T> {
    pub data: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Empty {}

/// The `{success, message, code, ...}` wrapper every endpoint answers with.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_code")]
    pub code: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

/// Error codes arrive as strings or numbers depending on the endpoint.
fn lenient_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(code)) => Some(code),
        Some(other) => Some(other.to_string()),
    })
}

impl<T> Envelope<T> {
    /// Returns the body of a successful reply or a `Rejected` error carrying
    /// the server's message (or `fallback` when it sent none).
    pub fn into_body(self, fallback: &str) -> Result<T, ApiError> {
        if self.success {
            Ok(self.body)
        } else {
            Err(ApiError::rejected(self.message, self.code, fallback))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_request_wire_format() {
        let request = GenerationRequest {
            serialized_prompt: "# T".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.5,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"prompt": "# T", "model": "gpt-3.5-turbo", "temperature": 0.5})
        );
    }

    #[test]
    fn test_envelope_success() {
        let envelope: Envelope<GenerateBody> =
            serde_json::from_str(r#"{"success": true, "response": "R"}"#).unwrap();
        let body = envelope.into_body("generation failed").unwrap();
        assert_eq!(body.response.as_deref(), Some("R"));
    }

    #[test]
    fn test_envelope_rejection_uses_server_message() {
        let envelope: Envelope<GenerateBody> =
            serde_json::from_str(r#"{"success": false, "message": "quota exceeded", "code": "QUOTA"}"#)
                .unwrap();
        match envelope.into_body("generation failed") {
            Err(ApiError::Rejected { message, code }) => {
                assert_eq!(message, "quota exceeded");
                assert_eq!(code.as_deref(), Some("QUOTA"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_envelope_accepts_numeric_code() {
        let envelope: Envelope<GenerateBody> =
            serde_json::from_str(r#"{"success": false, "message": "X", "code": 429}"#).unwrap();
        match envelope.into_body("generation failed") {
            Err(ApiError::Rejected { message, code }) => {
                assert_eq!(message, "X");
                assert_eq!(code.as_deref(), Some("429"));
            }
            other => panic!("unexpected: {:?}", other),
        }

        let envelope: Envelope<Empty> =
            serde_json::from_str(r#"{"success": false, "code": null}"#).unwrap();
        assert_eq!(envelope.code, None);
    }

    #[test]
    fn test_envelope_rejection_falls_back() {
        let envelope: Envelope<Empty> = serde_json::from_str(r#"{"success": false}"#).unwrap();
        match envelope.into_body("could not save") {
            Err(ApiError::Rejected { message, .. }) => assert_eq!(message, "could not save"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_remote_id_accepts_numbers_and_strings() {
        let ids: Vec<RemoteId> = serde_json::from_str(r#"[7, "a1"]"#).unwrap();
        assert_eq!(ids, vec![RemoteId::Number(7), RemoteId::Text("a1".to_string())]);
        assert_eq!(ids[0].to_string(), "7");
        assert_eq!(ids[1].to_string(), "a1");
    }
}
