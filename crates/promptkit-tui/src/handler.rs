use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, DialogField, InputMode, LoginField, Screen};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.screen {
        Screen::Login => handle_login(app, key),
        Screen::Builder => match app.input_mode {
            InputMode::Normal => handle_builder_normal(app, key),
            InputMode::Editing => handle_builder_editing(app, key),
        },
        Screen::Dialog => match app.input_mode {
            InputMode::Normal => handle_dialog_normal(app, key),
            InputMode::Editing => handle_dialog_editing(app, key),
        },
    }
}

fn handle_login(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            app.login_field = match app.login_field {
                LoginField::Email => LoginField::Password,
                LoginField::Password => LoginField::Email,
            };
        }
        KeyCode::Enter => {
            if app.login_field == LoginField::Email {
                app.login_field = LoginField::Password;
            } else {
                app.submit_login();
            }
        }
        KeyCode::Backspace => {
            login_input(app).pop();
        }
        KeyCode::Char(c) => login_input(app).push(c),
        _ => {}
    }
}

fn login_input(app: &mut App) -> &mut String {
    match app.login_field {
        LoginField::Email => &mut app.email_input,
        LoginField::Password => &mut app.password_input,
    }
}

fn handle_builder_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Focus
        KeyCode::Char('j') | KeyCode::Down | KeyCode::Tab => app.focus_down(),
        KeyCode::Char('k') | KeyCode::Up | KeyCode::BackTab => app.focus_up(),

        // Editing
        KeyCode::Enter | KeyCode::Char('i') => app.begin_edit(),

        // Block actions
        KeyCode::Char('a') => app.add_block(),
        KeyCode::Char('d') => app.remove_focused_block(),
        KeyCode::Char('t') => app.cycle_focused_kind(),

        // Model settings
        KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_temperature(0.1),
        KeyCode::Char('-') => app.adjust_temperature(-0.1),

        // Response scrolling
        KeyCode::Char('J') | KeyCode::PageDown => {
            app.response_scroll = app.response_scroll.saturating_add(5);
        }
        KeyCode::Char('K') | KeyCode::PageUp => {
            app.response_scroll = app.response_scroll.saturating_sub(5);
        }

        KeyCode::Char('g') => app.generate(),
        KeyCode::Char('e') => app.export(),
        KeyCode::Char('s') => app.save_to_dialog(),
        KeyCode::Char('n') => app.reset_document(),
        KeyCode::Char('o') => app.open_dialog_screen(),
        KeyCode::Char('L') => app.logout(),
        _ => {}
    }
}

fn handle_builder_editing(app: &mut App, key: KeyEvent) {
    let editing_title = app.focused_block().is_none();
    match key.code {
        KeyCode::Esc => app.commit_edit(),
        KeyCode::Enter if editing_title => app.commit_edit(),
        KeyCode::Enter => app.edit_buffer.push('\n'),
        KeyCode::Backspace => {
            app.edit_buffer.pop();
        }
        KeyCode::Char(c) => app.edit_buffer.push(c),
        _ => {}
    }
}

fn handle_dialog_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => match app.dialog_field {
            DialogField::Id => app.load_dialog(),
            DialogField::Message => app.send_chat(),
        },
        KeyCode::Backspace => {
            dialog_input(app).pop();
        }
        KeyCode::Char(c) => dialog_input(app).push(c),
        _ => {}
    }
}

fn dialog_input(app: &mut App) -> &mut String {
    match app.dialog_field {
        DialogField::Id => &mut app.dialog_id_input,
        DialogField::Message => &mut app.chat_input,
    }
}

fn handle_dialog_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc | KeyCode::Char('b') => {
            app.screen = Screen::Builder;
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Char('/') | KeyCode::Char('i') => app.begin_dialog_input(DialogField::Id),
        KeyCode::Char('r') => app.begin_dialog_input(DialogField::Message),
        KeyCode::Char('j') | KeyCode::Down => {
            app.dialog_scroll = app.dialog_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.dialog_scroll = app.dialog_scroll.saturating_sub(1);
        }
        KeyCode::Char('c') => app.continue_dialog(),
        KeyCode::Char('e') => app.edit_last_prompt(),
        KeyCode::Char('x') => app.delete_last_prompt(),
        KeyCode::Char('X') => app.delete_dialog(),
        _ => {}
    }
}
