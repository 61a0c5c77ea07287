//! Exercises `BackendClient` against a throwaway axum server.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use chrono::{Local, TimeZone};
use promptkit_core::{
    ApiError, AutosaveQueue, BackendClient, BlockKind, DialogStore, GenerationBackend,
    GenerationRequest, GenerationSession, PromptDocument, PromptEntry, RemoteId, SessionState,
};

#[derive(Clone, Default)]
struct Recorded {
    calls: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

impl Recorded {
    fn push(&self, route: &str, headers: &HeaderMap, body: Value) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.calls.lock().unwrap().push((route.to_string(), auth, body));
    }

    fn routes(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|c| c.0.clone()).collect()
    }
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn request(prompt: &str) -> GenerationRequest {
    GenerationRequest {
        serialized_prompt: prompt.to_string(),
        model: "gpt-3.5-turbo".to_string(),
        temperature: 0.7,
    }
}

fn backend_router(recorded: Recorded, reply: Value) -> Router {
    Router::new()
        .route(
            "/api/ai/generate",
            post(
                |State((rec, reply)): State<(Recorded, Value)>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    rec.push("generate", &headers, body);
                    Json(reply)
                },
            ),
        )
        .route(
            "/api/dialogs/save",
            post(
                |State((rec, _)): State<(Recorded, Value)>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    rec.push("save", &headers, body);
                    Json(json!({"success": true}))
                },
            ),
        )
        .with_state((recorded, reply))
}

fn complete_document() -> PromptDocument {
    let mut doc = PromptDocument::initialize();
    doc.set_title("Launch plan");
    let ids: Vec<_> = doc.blocks().iter().map(|b| (b.id(), b.kind())).collect();
    for (id, kind) in ids {
        let text = match kind {
            BlockKind::Context => "We ship on Friday",
            _ => "Draft the announcement",
        };
        doc.set_block_content(id, text).unwrap();
    }
    doc
}

#[tokio::test]
async fn test_generate_sends_prompt_with_bearer_token() {
    let recorded = Recorded::default();
    let base = serve(backend_router(recorded.clone(), json!({"success": true, "response": "R"}))).await;
    let client = BackendClient::new(&base).with_token("tok");

    let response = client.generate(&request("# T")).await.unwrap();

    assert_eq!(response, "R");
    let calls = recorded.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1.as_deref(), Some("Bearer tok"));
    assert_eq!(calls[0].2["prompt"], "# T");
    assert_eq!(calls[0].2["model"], "gpt-3.5-turbo");
}

#[tokio::test]
async fn test_generate_maps_rejection_to_server_message() {
    let recorded = Recorded::default();
    let base = serve(backend_router(recorded, json!({"success": false, "message": "X"}))).await;
    let client = BackendClient::new(&base).with_token("tok");

    match client.generate(&request("# T")).await {
        Err(ApiError::Rejected { message, .. }) => assert_eq!(message, "X"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_generate_without_response_field_is_malformed() {
    let base = serve(backend_router(Recorded::default(), json!({"success": true}))).await;
    let client = BackendClient::new(&base).with_token("tok");

    assert!(matches!(
        client.generate(&request("# T")).await,
        Err(ApiError::Malformed(_))
    ));
}

#[tokio::test]
async fn test_non_json_bodies_map_to_status_or_malformed() {
    let app = Router::new()
        .route(
            "/api/ai/generate",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down").into_response() }),
        )
        .route("/api/dialogs/save", post(|| async { "saved!" }));
    let base = serve(app).await;
    let client = BackendClient::new(&base).with_token("tok");

    match client.generate(&request("# T")).await {
        Err(ApiError::Status(status)) => assert_eq!(status.as_u16(), 502),
        other => panic!("unexpected: {:?}", other),
    }

    let record = promptkit_core::DialogRecord {
        title: "t".to_string(),
        prompt: "p".to_string(),
        response: "r".to_string(),
    };
    assert!(matches!(client.save_dialog(&record).await, Err(ApiError::Malformed(_))));
}

#[tokio::test]
async fn test_unreachable_server_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = BackendClient::new(&format!("http://{}", addr)).with_token("tok");
    assert!(matches!(
        client.generate(&request("# T")).await,
        Err(ApiError::Transport(_))
    ));
}

#[tokio::test]
async fn test_login_normalizes_email_and_returns_session() {
    let recorded = Recorded::default();
    let app = Router::new()
        .route(
            "/api/login",
            post(|State(rec): State<Recorded>, headers: HeaderMap, Json(body): Json<Value>| async move {
                let ok = body["email"] == "ada@example.com" && body["password"] == "secret";
                rec.push("login", &headers, body);
                if ok {
                    Json(json!({
                        "success": true,
                        "data": {"user": {"id": 7, "username": "ada", "email": "ada@example.com"}, "token": "jwt"}
                    }))
                } else {
                    Json(json!({"success": false, "message": "Invalid email or password", "code": "BAD_CREDENTIALS"}))
                }
            }),
        )
        .with_state(recorded.clone());
    let base = serve(app).await;
    let client = BackendClient::new(&base);

    let session = client.login("  Ada@Example.com ", "secret").await.unwrap();
    assert_eq!(session.token, "jwt");
    assert_eq!(session.user.username, "ada");
    assert_eq!(session.user.id, Some(RemoteId::Number(7)));
    assert_eq!(recorded.calls.lock().unwrap()[0].1, None);

    match client.login("ada@example.com", "wrong").await {
        Err(ApiError::Rejected { code, .. }) => assert_eq!(code.as_deref(), Some("BAD_CREDENTIALS")),
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_dialog_endpoints() {
    let recorded = Recorded::default();
    let app = Router::new()
        .route(
            "/api/dialogs/:id",
            get(|Path(id): Path<String>| async move {
                if id == "5" {
                    Json(json!({
                        "success": true,
                        "data": {
                            "dialog": {"id": 5, "title": "Launch plan"},
                            "prompts": [{"id": 1, "prompt_content": "# P", "response_content": "R"}]
                        }
                    }))
                } else {
                    Json(json!({"success": false, "message": "Dialog not found"}))
                }
            })
            .delete(|State(rec): State<Recorded>, headers: HeaderMap, Path(id): Path<String>| async move {
                rec.push(&format!("delete {}", id), &headers, Value::Null);
                Json(json!({"success": true}))
            }),
        )
        .route(
            "/api/dialogs/:id/prompts/:prompt_id",
            delete(
                |State(rec): State<Recorded>, headers: HeaderMap, Path((id, prompt_id)): Path<(String, String)>| async move {
                    rec.push(&format!("delete {}/{}", id, prompt_id), &headers, Value::Null);
                    Json(json!({"success": true}))
                },
            ),
        )
        .with_state(recorded.clone());
    let base = serve(app).await;
    let client = BackendClient::new(&base).with_token("tok");

    let details = client.get_dialog("5").await.unwrap();
    assert_eq!(details.dialog.title, "Launch plan");
    assert_eq!(promptkit_core::dialog::conversation(&details.prompts).len(), 2);

    match client.get_dialog("6").await {
        Err(ApiError::Rejected { message, .. }) => assert_eq!(message, "Dialog not found"),
        other => panic!("unexpected: {:?}", other),
    }

    client.delete_dialog_prompt("5", "1").await.unwrap();
    client.delete_dialog("5").await.unwrap();
    assert_eq!(recorded.routes(), vec!["delete 5/1", "delete 5"]);
}

#[tokio::test]
async fn test_session_round_trip_saves_dialog_once() {
    let recorded = Recorded::default();
    let base = serve(backend_router(recorded.clone(), json!({"success": true, "response": "R"}))).await;
    let client = Arc::new(BackendClient::new(&base).with_token("tok"));
    let (queue, worker) = AutosaveQueue::spawn(client.clone());
    let mut session = GenerationSession::new(client, queue);
    let doc = complete_document();

    let result = session.start(&doc, "gpt-3.5-turbo", 0.4).await.unwrap();
    assert_eq!(result.state, SessionState::Succeeded);
    assert_eq!(result.response.as_deref(), Some("R"));

    drop(session);
    worker.await.unwrap();

    assert_eq!(recorded.routes(), vec!["generate", "save"]);
    let calls = recorded.calls.lock().unwrap();
    assert_eq!(calls[1].1.as_deref(), Some("Bearer tok"));
    assert_eq!(
        calls[1].2,
        json!({"title": "Launch plan", "prompt": doc.serialize(), "response": "R"})
    );
}

fn entry(doc: &PromptDocument) -> PromptEntry {
    let at = Local.with_ymd_and_hms(2025, 11, 5, 10, 30, 0).unwrap();
    PromptEntry::from_document(doc, "gpt-3.5-turbo", 0.7, "Here is the plan", at)
}

/// Router that records every JSON body posted to `path` and answers `reply`.
fn recording_post(path: &str, recorded: Recorded, reply: Value) -> Router {
    let route = path.to_string();
    Router::new()
        .route(
            path,
            post(
                move |State((rec, reply)): State<(Recorded, Value)>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    rec.push(&route, &headers, body);
                    Json(reply)
                },
            ),
        )
        .with_state((recorded, reply))
}

#[tokio::test]
async fn test_create_dialog_returns_new_id() {
    let recorded = Recorded::default();
    let reply = json!({"success": true, "data": {"dialog": {"id": 12, "title": "Launch plan"}}});
    let base = serve(recording_post("/api/dialogs/create", recorded.clone(), reply)).await;
    let client = BackendClient::new(&base).with_token("tok");
    let doc = complete_document();

    let id = client.create_dialog(doc.title(), &entry(&doc)).await.unwrap();

    assert_eq!(id, RemoteId::Number(12));
    let calls = recorded.calls.lock().unwrap();
    assert_eq!(calls[0].1.as_deref(), Some("Bearer tok"));
    let body = &calls[0].2;
    assert_eq!(body["title"], "Launch plan");
    assert_eq!(body["prompts"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["prompts"][0]["prompt_content"], doc.serialize());
    assert_eq!(body["prompts"][0]["response_content"], "Here is the plan");
    assert_eq!(body["prompts"][0]["blocks"][0]["type"], "context");
    assert_eq!(body["prompts"][0]["metadata"]["model"], "gpt-3.5-turbo");
}

#[tokio::test]
async fn test_add_and_update_prompt() {
    let recorded = Recorded::default();
    let ok = json!({"success": true});
    let app = recording_post("/api/dialogs/add-prompt", recorded.clone(), ok.clone())
        .merge(recording_post("/api/dialogs/update-prompt", recorded.clone(), ok));
    let base = serve(app).await;
    let client = BackendClient::new(&base).with_token("tok");
    let doc = complete_document();
    let dialog = RemoteId::Number(5);

    client.add_prompt(&dialog, &entry(&doc)).await.unwrap();
    client
        .update_prompt(&dialog, &entry(&doc).replacing(RemoteId::Number(41)))
        .await
        .unwrap();

    assert_eq!(
        recorded.routes(),
        vec!["/api/dialogs/add-prompt", "/api/dialogs/update-prompt"]
    );
    let calls = recorded.calls.lock().unwrap();
    assert_eq!(calls[0].2["dialog_id"], 5);
    assert_eq!(calls[0].2["prompt_title"], "Launch plan");
    assert_eq!(calls[0].2["metadata"]["is_editing"], false);
    assert_eq!(calls[1].2["metadata"]["is_editing"], true);
    assert_eq!(calls[1].2["metadata"]["original_prompt_id"], 41);
}

#[tokio::test]
async fn test_add_prompt_rejection() {
    let reply = json!({"success": false, "message": "Dialog is archived", "code": 409});
    let base = serve(recording_post("/api/dialogs/add-prompt", Recorded::default(), reply)).await;
    let client = BackendClient::new(&base).with_token("tok");

    match client.add_prompt(&RemoteId::Number(5), &entry(&complete_document())).await {
        Err(ApiError::Rejected { message, code }) => {
            assert_eq!(message, "Dialog is archived");
            assert_eq!(code.as_deref(), Some("409"));
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_chat_sends_message_with_context() {
    let recorded = Recorded::default();
    let reply = json!({"success": true, "response": "Sure, shorter:"});
    let base = serve(recording_post("/api/dialogs/:id/chat", recorded.clone(), reply)).await;
    let client = BackendClient::new(&base).with_token("tok");

    let answer = client
        .chat(&RemoteId::Number(5), "Make it shorter", "# P\n\nR")
        .await
        .unwrap();

    assert_eq!(answer, "Sure, shorter:");
    let calls = recorded.calls.lock().unwrap();
    assert_eq!(calls[0].2, json!({"message": "Make it shorter", "context": "# P\n\nR"}));
}

#[tokio::test]
async fn test_get_prompt_loads_editable_document() {
    let app = Router::new().route(
        "/api/prompts/:id",
        get(|Path(id): Path<String>| async move {
            if id == "41" {
                Json(json!({
                    "success": true,
                    "data": {
                        "dialog_title": "Launch plan",
                        "title": "Announcement",
                        "model": "gpt-4",
                        "temperature": 0.3,
                        "blocks": [
                            {"type": "context", "label": "Context", "content": "We ship Friday", "required": true},
                            {"type": "task", "label": "Task", "content": "Draft it", "required": true},
                            {"type": "role", "label": "Role", "content": "Copywriter", "required": false}
                        ]
                    }
                }))
            } else {
                Json(json!({"success": false}))
            }
        }),
    );
    let base = serve(app).await;
    let client = BackendClient::new(&base).with_token("tok");

    let stored = client.get_prompt(&RemoteId::Number(41)).await.unwrap();
    assert_eq!(stored.model.as_deref(), Some("gpt-4"));
    assert_eq!(stored.temperature, Some(0.3));

    let doc = stored.to_document().unwrap();
    assert_eq!(doc.title(), "Announcement");
    assert!(doc.validate().valid);
    assert_eq!(doc.blocks()[2].kind(), BlockKind::Role);
    assert_eq!(doc.blocks()[2].content(), "Copywriter");

    match client.get_prompt(&RemoteId::Number(42)).await {
        Err(ApiError::Rejected { message, .. }) => assert_eq!(message, "Prompt not found"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_dialog_context_prepends_to_new_prompt() {
    let app = Router::new().route(
        "/api/dialogs/:id/context",
        get(|Path(id): Path<String>, headers: HeaderMap| async move {
            assert_eq!(id, "5");
            assert!(headers.contains_key("authorization"));
            Json(json!({
                "success": true,
                "data": {"title": "Launch plan", "context": "Q: plan?\nA: ship Friday"}
            }))
        }),
    );
    let base = serve(app).await;
    let client = BackendClient::new(&base).with_token("tok");

    let context = client.dialog_context(&RemoteId::Number(5)).await.unwrap();
    assert_eq!(context.title, "Launch plan");

    let mut doc = PromptDocument::initialize();
    doc.prepend_context(context.context.as_deref().unwrap_or_default());
    assert_eq!(doc.blocks()[0].content(), "Q: plan?\nA: ship Friday");
}
