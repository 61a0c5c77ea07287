use std::sync::Arc;

use promptkit_core::{
    catalog, dialog, export, ApiError, AuthSession, AutosaveQueue, BackendClient, BlockId,
    BlockKind, ChatMessage, ChatRole, Config, DialogContext, DialogDetails, DocumentError,
    GenerationSession, PromptDocument, PromptEntry, RemoteId, SessionError, SessionResult,
    SessionState, StoredPrompt,
};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Builder,
    Dialog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Password,
}

/// Which input box the dialog screen is typing into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogField {
    Id,
    Message,
}

/// Outcome of a background request started from the dialog or builder screen.
#[derive(Debug)]
pub enum Action {
    DialogDeleted(Result<(), ApiError>),
    PromptDeleted {
        prompt_id: RemoteId,
        outcome: Result<(), ApiError>,
    },
    ChatReplied(Result<String, ApiError>),
    ContextLoaded {
        dialog_id: RemoteId,
        outcome: Result<DialogContext, ApiError>,
    },
    PromptLoaded {
        dialog_id: RemoteId,
        prompt_id: RemoteId,
        outcome: Result<StoredPrompt, ApiError>,
    },
    DialogCreated(Result<RemoteId, ApiError>),
    PromptSaved {
        updated: bool,
        outcome: Result<(), ApiError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub text: String,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub status: Option<Status>,

    // Session context
    pub config: Config,
    pub client: BackendClient,
    pub auth: Option<AuthSession>,
    pub autosave: Option<AutosaveQueue>,

    // Login state
    pub email_input: String,
    pub password_input: String,
    pub login_field: LoginField,
    pub login_task: Option<JoinHandle<Result<AuthSession, ApiError>>>,

    // Builder state
    pub document: PromptDocument,
    pub focus: usize, // 0 is the title, 1.. are blocks
    pub edit_buffer: String,
    pub model: String,
    pub temperature: f32,
    pub generation_task: Option<JoinHandle<Result<SessionResult, SessionError>>>,
    pub last_result: Option<SessionResult>,
    pub response_scroll: u16,
    pub target_dialog: Option<RemoteId>, // dialog the builder saves into
    pub editing_prompt: Option<RemoteId>, // stored prompt being replaced

    // Dialog state
    pub dialog_id_input: String,
    pub dialog_field: DialogField,
    pub chat_input: String,
    pub chat_log: Vec<ChatMessage>, // follow-ups sent in this session
    pub dialog: Option<DialogDetails>,
    pub dialog_task: Option<JoinHandle<Result<DialogDetails, ApiError>>>,
    pub dialog_scroll: u16,

    // Other requests, one at a time
    pub action_task: Option<JoinHandle<Action>>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(config: Config, auth: Option<AuthSession>) -> Self {
        let mut client = BackendClient::new(&config.api_base_url);
        client.set_token(auth.as_ref().map(|a| a.token.clone()));

        let (screen, input_mode) = if auth.is_some() {
            (Screen::Builder, InputMode::Normal)
        } else {
            (Screen::Login, InputMode::Editing)
        };

        let mut app = Self {
            should_quit: false,
            screen,
            input_mode,
            status: None,

            model: config.default_model.clone(),
            temperature: config.temperature,
            config,
            client,
            auth: None,
            autosave: None,

            email_input: String::new(),
            password_input: String::new(),
            login_field: LoginField::Email,
            login_task: None,

            document: PromptDocument::initialize(),
            focus: 1,
            edit_buffer: String::new(),
            generation_task: None,
            last_result: None,
            response_scroll: 0,
            target_dialog: None,
            editing_prompt: None,

            dialog_id_input: String::new(),
            dialog_field: DialogField::Id,
            chat_input: String::new(),
            chat_log: Vec::new(),
            dialog: None,
            dialog_task: None,
            dialog_scroll: 0,

            action_task: None,

            animation_frame: 0,
        };
        if let Some(auth) = auth {
            app.install_session(auth);
        }
        app
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            kind: StatusKind::Info,
            text: text.into(),
        });
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            kind: StatusKind::Error,
            text: text.into(),
        });
    }

    pub fn is_busy(&self) -> bool {
        self.login_task.is_some()
            || self.generation_task.is_some()
            || self.dialog_task.is_some()
            || self.action_task.is_some()
    }

    /// Starts `request` unless another action is still running.
    fn spawn_action<F>(&mut self, request: F) -> bool
    where
        F: std::future::Future<Output = Action> + Send + 'static,
    {
        if self.action_task.is_some() {
            self.error("Wait for the current request to finish");
            return false;
        }
        self.action_task = Some(tokio::spawn(request));
        true
    }

    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // ---- Session lifecycle ----

    /// Makes `auth` the current session. The autosave worker is respawned so
    /// it saves with the new token.
    fn install_session(&mut self, auth: AuthSession) {
        self.client.set_token(Some(auth.token.clone()));
        if tokio::runtime::Handle::try_current().is_ok() {
            let (queue, _worker) = AutosaveQueue::spawn(Arc::new(self.client.clone()));
            self.autosave = Some(queue);
        }
        self.auth = Some(auth);
    }

    pub fn submit_login(&mut self) {
        if self.login_task.is_some() {
            return;
        }
        if self.email_input.trim().is_empty() || self.password_input.is_empty() {
            self.error("Enter your email and password");
            return;
        }

        let client = self.client.clone();
        let email = self.email_input.clone();
        let password = self.password_input.clone();
        self.login_task = Some(tokio::spawn(async move { client.login(&email, &password).await }));
        self.info("Logging in");
    }

    fn finish_login(&mut self, outcome: Result<AuthSession, ApiError>) {
        match outcome {
            Ok(auth) => {
                if let Err(e) = auth.save() {
                    tracing::warn!(error = %e, "could not persist session");
                }
                let name = auth.user.username.clone();
                self.install_session(auth);
                self.password_input.clear();
                self.screen = Screen::Builder;
                self.input_mode = InputMode::Normal;
                self.info(format!("Welcome, {}!", name));
            }
            Err(ApiError::Rejected { message, code }) => {
                if code.as_deref() == Some("EMAIL_NOT_VERIFIED") {
                    self.error("Confirm your email before logging in");
                } else {
                    self.error(message);
                }
            }
            Err(e) => self.error(e.to_string()),
        }
    }

    pub fn logout(&mut self) {
        if self.auth.take().is_some() {
            let client = self.client.clone();
            tokio::spawn(async move {
                if let Err(e) = client.logout().await {
                    tracing::warn!(error = %e, "logout request failed");
                }
            });
        }
        if let Err(e) = AuthSession::clear() {
            tracing::warn!(error = %e, "could not remove saved session");
        }
        self.client.set_token(None);
        self.autosave = None;
        self.screen = Screen::Login;
        self.input_mode = InputMode::Editing;
        self.login_field = LoginField::Email;
        self.info("Logged out");
    }

    // ---- Builder: focus and editing ----

    pub fn focused_block(&self) -> Option<BlockId> {
        self.focus
            .checked_sub(1)
            .and_then(|i| self.document.blocks().get(i))
            .map(|b| b.id())
    }

    pub fn focus_down(&mut self) {
        self.focus = (self.focus + 1).min(self.document.len());
    }

    pub fn focus_up(&mut self) {
        self.focus = self.focus.saturating_sub(1);
    }

    pub fn begin_edit(&mut self) {
        self.edit_buffer = match self.focused_block() {
            Some(id) => self
                .document
                .block(id)
                .map(|b| b.content().to_string())
                .unwrap_or_default(),
            None => self.document.title().to_string(),
        };
        self.input_mode = InputMode::Editing;
    }

    pub fn commit_edit(&mut self) {
        let text = std::mem::take(&mut self.edit_buffer);
        match self.focused_block() {
            Some(id) => {
                if let Err(e) = self.document.set_block_content(id, text) {
                    self.report(e);
                }
            }
            None => self.document.set_title(text),
        }
        self.input_mode = InputMode::Normal;
    }

    fn report(&mut self, error: DocumentError) {
        self.error(error.to_string());
    }

    pub fn add_block(&mut self) {
        match self.document.add_next_block() {
            Ok(block) => {
                let label = block.label();
                self.focus = self.document.len();
                self.info(format!("Added {} block", label));
            }
            Err(e) => self.report(e),
        }
    }

    pub fn remove_focused_block(&mut self) {
        let Some(id) = self.focused_block() else {
            return;
        };
        match self.document.remove_block(id) {
            Ok(()) => {
                self.focus = self.focus.min(self.document.len());
                self.info("Block removed");
            }
            Err(e) => self.report(e),
        }
    }

    /// Switches the focused optional block to the next unused kind.
    pub fn cycle_focused_kind(&mut self) {
        let Some(id) = self.focused_block() else {
            return;
        };
        let Some(current) = self.document.block(id).map(|b| b.kind()) else {
            return;
        };
        if current.is_required() {
            self.report(DocumentError::CannotRetypeRequiredBlock(current));
            return;
        }

        match next_kind(current, &self.document.available_kinds()) {
            Some(kind) => match self.document.change_block_kind(id, kind) {
                Ok(()) => self.info(format!("Block is now {}", kind.label())),
                Err(e) => self.report(e),
            },
            None => self.error("No other block kind is free"),
        }
    }

    pub fn adjust_temperature(&mut self, delta: f32) {
        self.temperature = step_temperature(self.temperature, delta);
        if let Err(e) = Config::save_temperature(self.temperature) {
            tracing::warn!(error = %e, "could not save temperature");
        }
    }

    pub fn reset_document(&mut self) {
        self.replace_document(PromptDocument::initialize());
        self.target_dialog = None;
        self.editing_prompt = None;
        self.info("Ready for a new prompt");
    }

    fn replace_document(&mut self, document: PromptDocument) {
        self.document = document;
        self.focus = 1;
        self.last_result = None;
        self.response_scroll = 0;
    }

    // ---- Builder: generation and export ----

    pub fn generate(&mut self) {
        if self.generation_task.is_some() {
            return;
        }
        let validation = self.document.validate();
        if !validation.valid {
            self.error(format!("Cannot generate: {}", validation.summary()));
            return;
        }
        let Some(autosave) = self.autosave.clone() else {
            self.error("Log in to generate");
            return;
        };

        let mut session = GenerationSession::new(Arc::new(self.client.clone()), autosave);
        let document = self.document.clone();
        let model = self.model.clone();
        let temperature = self.temperature;
        self.generation_task = Some(tokio::spawn(async move {
            session.start(&document, &model, temperature).await
        }));
        self.last_result = None;
        self.response_scroll = 0;
        self.info("Generating");
    }

    fn finish_generation(&mut self, outcome: Result<SessionResult, SessionError>) {
        match outcome {
            Ok(result) => {
                match result.state {
                    SessionState::Succeeded => self.info("Response received"),
                    _ => self.error(
                        result
                            .error_message
                            .clone()
                            .unwrap_or_else(|| "Generation failed".to_string()),
                    ),
                }
                self.last_result = Some(result);
            }
            Err(e) => self.error(e.to_string()),
        }
    }

    pub fn response(&self) -> Option<&str> {
        self.last_result.as_ref().and_then(|r| r.response.as_deref())
    }

    pub fn export(&mut self) {
        let Some(response) = self.response().map(str::to_string) else {
            self.error("Get a response from the AI first");
            return;
        };

        let now = chrono::Local::now();
        let name = export::file_name(self.document.title(), now.date_naive());
        let text = export::transcript(&self.document, &self.model, self.temperature, &response, now);
        match std::fs::write(&name, text) {
            Ok(()) => self.info(format!("Saved {}", name)),
            Err(e) => self.error(format!("Could not write {}: {}", name, e)),
        }
    }

    /// Stores the current prompt and response: as a new dialog, as an extra
    /// prompt of the dialog being continued, or over the prompt being edited.
    pub fn save_to_dialog(&mut self) {
        let Some(response) = self.response().map(str::to_string) else {
            self.error("Get a response from the AI first");
            return;
        };

        let entry = PromptEntry::from_document(
            &self.document,
            &self.model,
            self.temperature,
            &response,
            chrono::Local::now(),
        );
        let client = self.client.clone();
        let started = match (self.target_dialog.clone(), self.editing_prompt.clone()) {
            (Some(dialog_id), Some(prompt_id)) => self.spawn_action(async move {
                let outcome = client.update_prompt(&dialog_id, &entry.replacing(prompt_id)).await;
                Action::PromptSaved { updated: true, outcome }
            }),
            (Some(dialog_id), None) => self.spawn_action(async move {
                let outcome = client.add_prompt(&dialog_id, &entry).await;
                Action::PromptSaved { updated: false, outcome }
            }),
            (None, _) => {
                let title = self.document.title().to_string();
                self.spawn_action(async move {
                    Action::DialogCreated(client.create_dialog(&title, &entry).await)
                })
            }
        };
        if started {
            self.info("Saving to dialog");
        }
    }

    // ---- Dialog viewer ----

    pub fn open_dialog_screen(&mut self) {
        self.screen = Screen::Dialog;
        self.input_mode = InputMode::Editing;
        self.dialog_field = DialogField::Id;
        self.dialog_scroll = 0;
    }

    pub fn begin_dialog_input(&mut self, field: DialogField) {
        if field == DialogField::Message && self.dialog.is_none() {
            self.error("Open a dialog first");
            return;
        }
        self.dialog_field = field;
        self.input_mode = InputMode::Editing;
    }

    /// The loaded conversation followed by this session's follow-ups.
    pub fn dialog_messages(&self) -> Vec<ChatMessage> {
        let mut messages = self
            .dialog
            .as_ref()
            .map(|d| dialog::conversation(&d.prompts))
            .unwrap_or_default();
        messages.extend(self.chat_log.iter().cloned());
        messages
    }

    fn open_dialog_id(&self) -> Option<RemoteId> {
        self.dialog.as_ref().map(|d| d.dialog.id.clone())
    }

    pub fn load_dialog(&mut self) {
        let id = self.dialog_id_input.trim().to_string();
        if id.is_empty() || self.dialog_task.is_some() {
            return;
        }
        let client = self.client.clone();
        self.dialog_task = Some(tokio::spawn(async move { client.get_dialog(&id).await }));
        self.input_mode = InputMode::Normal;
    }

    pub fn send_chat(&mut self) {
        let message = self.chat_input.trim().to_string();
        let Some(dialog_id) = self.open_dialog_id() else {
            return;
        };
        if message.is_empty() {
            return;
        }

        let context = dialog::chat_context(&self.dialog_messages());
        let client = self.client.clone();
        let request_message = message.clone();
        if self.spawn_action(async move {
            Action::ChatReplied(client.chat(&dialog_id, &request_message, &context).await)
        }) {
            self.chat_input.clear();
            self.chat_log.push(ChatMessage {
                role: ChatRole::User,
                content: message,
                prompt_id: None,
            });
            self.input_mode = InputMode::Normal;
        }
    }

    pub fn delete_dialog(&mut self) {
        let Some(dialog_id) = self.open_dialog_id() else {
            return;
        };
        let client = self.client.clone();
        if self.spawn_action(async move {
            Action::DialogDeleted(client.delete_dialog(&dialog_id.to_string()).await)
        }) {
            self.info("Deleting dialog");
        }
    }

    /// Removes the newest prompt of the open dialog.
    pub fn delete_last_prompt(&mut self) {
        let Some(details) = self.dialog.as_ref() else {
            return;
        };
        let Some(prompt) = details.prompts.last() else {
            self.error("Dialog has no prompts");
            return;
        };
        let dialog_id = details.dialog.id.to_string();
        let prompt_id = prompt.id.clone();

        let client = self.client.clone();
        if self.spawn_action(async move {
            let outcome = client.delete_dialog_prompt(&dialog_id, &prompt_id.to_string()).await;
            Action::PromptDeleted { prompt_id, outcome }
        }) {
            self.info("Deleting prompt");
        }
    }

    /// Starts a new prompt that carries the open dialog's history in its
    /// context block.
    pub fn continue_dialog(&mut self) {
        let Some(dialog_id) = self.open_dialog_id() else {
            return;
        };
        let client = self.client.clone();
        if self.spawn_action(async move {
            let outcome = client.dialog_context(&dialog_id).await;
            Action::ContextLoaded { dialog_id, outcome }
        }) {
            self.info("Loading dialog context");
        }
    }

    /// Loads the newest prompt of the open dialog into the builder.
    pub fn edit_last_prompt(&mut self) {
        let Some(details) = self.dialog.as_ref() else {
            return;
        };
        let Some(prompt) = details.prompts.last() else {
            self.error("Dialog has no prompts");
            return;
        };
        let dialog_id = details.dialog.id.clone();
        let prompt_id = prompt.id.clone();

        let client = self.client.clone();
        if self.spawn_action(async move {
            let outcome = client.get_prompt(&prompt_id).await;
            Action::PromptLoaded { dialog_id, prompt_id, outcome }
        }) {
            self.info("Loading prompt");
        }
    }

    fn finish_action(&mut self, action: Action) {
        match action {
            Action::DialogDeleted(Ok(())) => {
                if self.target_dialog == self.open_dialog_id() {
                    self.target_dialog = None;
                    self.editing_prompt = None;
                }
                self.dialog = None;
                self.chat_log.clear();
                self.dialog_id_input.clear();
                self.info("Dialog deleted");
            }
            Action::PromptDeleted { prompt_id, outcome: Ok(()) } => {
                if let Some(details) = self.dialog.as_mut() {
                    details.prompts.retain(|p| p.id != prompt_id);
                }
                if self.editing_prompt.as_ref() == Some(&prompt_id) {
                    self.editing_prompt = None;
                }
                self.info("Prompt deleted");
            }
            Action::ChatReplied(Ok(reply)) => {
                self.chat_log.push(ChatMessage {
                    role: ChatRole::Assistant,
                    content: reply,
                    prompt_id: None,
                });
                self.info("Reply received");
            }
            Action::ContextLoaded { dialog_id, outcome: Ok(context) } => {
                let mut document = PromptDocument::initialize();
                if !context.title.trim().is_empty() {
                    document.set_title(context.title.as_str());
                }
                document.prepend_context(context.context.as_deref().unwrap_or_default());
                self.replace_document(document);
                self.target_dialog = Some(dialog_id);
                self.editing_prompt = None;
                self.screen = Screen::Builder;
                self.input_mode = InputMode::Normal;
                self.info("Dialog context loaded");
            }
            Action::PromptLoaded { dialog_id, prompt_id, outcome: Ok(stored) } => {
                match stored.to_document() {
                    Ok(document) => {
                        self.replace_document(document);
                        if let Some(model) = stored.model.filter(|m| !m.trim().is_empty()) {
                            self.model = model;
                        }
                        if let Some(temperature) = stored.temperature {
                            self.temperature = step_temperature(temperature, 0.0);
                        }
                        self.target_dialog = Some(dialog_id);
                        self.editing_prompt = Some(prompt_id);
                        self.screen = Screen::Builder;
                        self.input_mode = InputMode::Normal;
                        self.info("Prompt loaded for editing");
                    }
                    Err(e) => self.report(e),
                }
            }
            Action::DialogCreated(Ok(id)) => {
                self.info(format!("Dialog {} created", id));
                self.target_dialog = Some(id);
            }
            Action::PromptSaved { updated, outcome: Ok(()) } => {
                self.info(if updated { "Prompt updated" } else { "Prompt added to dialog" });
            }
            Action::DialogDeleted(Err(e))
            | Action::PromptDeleted { outcome: Err(e), .. }
            | Action::ChatReplied(Err(e))
            | Action::ContextLoaded { outcome: Err(e), .. }
            | Action::PromptLoaded { outcome: Err(e), .. }
            | Action::DialogCreated(Err(e))
            | Action::PromptSaved { outcome: Err(e), .. } => self.error(e.to_string()),
        }
    }

    /// Collects background tasks that have finished.
    pub async fn poll_tasks(&mut self) {
        if self.login_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.login_task.take() {
                match task.await {
                    Ok(outcome) => self.finish_login(outcome),
                    Err(e) => self.error(format!("Login task failed: {}", e)),
                }
            }
        }

        if self.generation_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.generation_task.take() {
                match task.await {
                    Ok(outcome) => self.finish_generation(outcome),
                    Err(e) => self.error(format!("Generation task failed: {}", e)),
                }
            }
        }

        if self.dialog_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.dialog_task.take() {
                match task.await {
                    Ok(Ok(details)) => {
                        self.info(format!("Opened dialog: {}", details.dialog.title));
                        self.dialog = Some(details);
                        self.chat_log.clear();
                        self.dialog_scroll = 0;
                    }
                    Ok(Err(e)) => self.error(e.to_string()),
                    Err(e) => self.error(format!("Dialog task failed: {}", e)),
                }
            }
        }

        if self.action_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.action_task.take() {
                match task.await {
                    Ok(action) => self.finish_action(action),
                    Err(e) => self.error(format!("Request task failed: {}", e)),
                }
            }
        }
    }
}

/// The first free kind after `current` in catalog order, wrapping around.
fn next_kind(current: BlockKind, available: &[BlockKind]) -> Option<BlockKind> {
    let kinds: Vec<BlockKind> = catalog::all_kinds().iter().map(|s| s.kind).collect();
    let start = kinds.iter().position(|k| *k == current)?;
    (1..kinds.len())
        .map(|offset| kinds[(start + offset) % kinds.len()])
        .find(|k| available.contains(k))
}

/// Moves the temperature by `delta`, clamped to 0.0..=1.0 and rounded to one
/// decimal place.
fn step_temperature(current: f32, delta: f32) -> f32 {
    ((current + delta).clamp(0.0, 1.0) * 10.0).round() / 10.0
}
