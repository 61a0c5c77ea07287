use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use crate::app::{App, DialogField, InputMode, LoginField, Screen, StatusKind};
use promptkit_core::ChatRole;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, status, footer
    let [header_area, body_area, status_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Login => render_login_screen(app, frame, body_area),
        Screen::Builder => render_builder_screen(app, frame, body_area),
        Screen::Dialog => render_dialog_screen(app, frame, body_area),
    }

    render_status(app, frame, status_area);
    render_footer(app, frame, footer_area);

    // Block editor sits on top of the builder
    if app.screen == Screen::Builder && app.input_mode == InputMode::Editing {
        render_editor(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let user_indicator = match &app.auth {
        Some(auth) if !auth.user.username.is_empty() => format!(" [{}]", auth.user.username),
        Some(auth) => format!(" [{}]", auth.user.email),
        None => String::new(),
    };

    let title = Line::from(vec![
        Span::styled(" Prompt Builder ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(user_indicator, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    let line = match &app.status {
        Some(status) => {
            let color = match status.kind {
                StatusKind::Info => Color::Green,
                StatusKind::Error => Color::Red,
            };
            let text = if app.is_busy() {
                format!(" {}{}", status.text, loading_dots(app))
            } else {
                format!(" {}", status.text)
            };
            Line::from(Span::styled(text, Style::default().fg(color)))
        }
        None => Line::default(),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.screen {
        Screen::Login => " LOGIN ",
        Screen::Builder => " BUILD ",
        Screen::Dialog => " DIALOG ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let keys: &[(&str, &str)] = match (app.screen, app.input_mode) {
        (Screen::Login, _) => &[(" Tab ", " field "), (" Enter ", " login "), (" Esc ", " quit ")],
        (Screen::Builder, InputMode::Normal) => &[
            (" j/k ", " nav "),
            (" Enter ", " edit "),
            (" a ", " add "),
            (" d ", " remove "),
            (" t ", " type "),
            (" +/- ", " temp "),
            (" g ", " generate "),
            (" e ", " export "),
            (" s ", " save to dialog "),
            (" n ", " new "),
            (" o ", " dialogs "),
            (" L ", " logout "),
            (" q ", " quit "),
        ],
        (Screen::Builder, InputMode::Editing) => {
            if app.focused_block().is_none() {
                &[(" Enter ", " save "), (" Esc ", " save ")]
            } else {
                &[(" Enter ", " newline "), (" Esc ", " save ")]
            }
        }
        (Screen::Dialog, InputMode::Normal) => &[
            (" / ", " dialog id "),
            (" r ", " reply "),
            (" c ", " continue "),
            (" e ", " edit last "),
            (" j/k ", " scroll "),
            (" x ", " delete last prompt "),
            (" X ", " delete dialog "),
            (" b ", " back "),
        ],
        (Screen::Dialog, InputMode::Editing) => match app.dialog_field {
            DialogField::Id => &[(" Enter ", " open "), (" Esc ", " cancel ")],
            DialogField::Message => &[(" Enter ", " send "), (" Esc ", " cancel ")],
        },
    };

    let hints = keys.iter().flat_map(|(key, label)| {
        [Span::styled(*key, key_style), Span::styled(*label, label_style)]
    });

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_login_screen(app: &App, frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 50, 9);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Log in ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let field_style = |field: LoginField| {
        if app.login_field == field {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };

    let email_area = Rect::new(inner.x, inner.y + 1, inner.width, 1);
    let password_area = Rect::new(inner.x, inner.y + 3, inner.width, 1);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Email:    ", field_style(LoginField::Email)),
            Span::raw(app.email_input.as_str()),
        ])),
        email_area,
    );
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Password: ", field_style(LoginField::Password)),
            Span::raw(mask(&app.password_input)),
        ])),
        password_area,
    );

    let server = Paragraph::new(format!("Server: {}", app.client.base_url()))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(server, Rect::new(inner.x, inner.y + 5, inner.width, 1));

    // Cursor follows the active field
    let (field_area, typed) = match app.login_field {
        LoginField::Email => (email_area, app.email_input.chars().count()),
        LoginField::Password => (password_area, app.password_input.chars().count()),
    };
    let cursor_x = (10 + typed).min(field_area.width.saturating_sub(1) as usize) as u16;
    frame.set_cursor_position((field_area.x + cursor_x, field_area.y));
}

fn render_builder_screen(app: &App, frame: &mut Frame, area: Rect) {
    let [prompt_area, side_area] =
        Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)]).areas(area);
    let [settings_area, response_area] =
        Layout::vertical([Constraint::Length(6), Constraint::Min(0)]).areas(side_area);

    render_prompt(app, frame, prompt_area);
    render_settings(app, frame, settings_area);
    render_response(app, frame, response_area);
}

fn render_prompt(app: &App, frame: &mut Frame, area: Rect) {
    let focused_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let heading_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let placeholder_style = Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC);

    let mut lines = Vec::new();

    let title_marker = if app.focus == 0 { "> " } else { "  " };
    let title = app.document.title();
    lines.push(Line::from(vec![
        Span::styled(
            format!("{}Title: ", title_marker),
            if app.focus == 0 { focused_style } else { heading_style },
        ),
        if title.trim().is_empty() {
            Span::styled("(untitled)", placeholder_style)
        } else {
            Span::raw(title.to_string())
        },
    ]));

    for (i, block) in app.document.blocks().iter().enumerate() {
        let focused = app.focus == i + 1;
        lines.push(Line::default());

        let marker = if focused { "> " } else { "  " };
        let mut heading = vec![Span::styled(
            format!("{}{}", marker, block.label()),
            if focused { focused_style } else { heading_style },
        )];
        if block.is_required() {
            heading.push(Span::styled(" (required)", Style::default().fg(Color::DarkGray)));
        }
        lines.push(Line::from(heading));

        if block.content().trim().is_empty() {
            lines.push(Line::from(Span::styled(
                format!("    {}", block.kind().placeholder()),
                placeholder_style,
            )));
        } else {
            for text in block.content().lines() {
                lines.push(Line::from(format!("    {}", text)));
            }
        }
    }

    let available = app.document.available_kinds().len();
    let prompt_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Prompt ({} more block kinds available) ", available));

    // Keep the focused block roughly in view
    let focused_line = lines
        .iter()
        .position(|l| l.spans.first().is_some_and(|s| s.content.starts_with("> ")))
        .unwrap_or(0) as u16;
    let visible = area.height.saturating_sub(2);
    let scroll = focused_line.saturating_sub(visible / 2);

    let prompt = Paragraph::new(Text::from(lines))
        .block(prompt_block)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(prompt, area);
}

fn render_settings(app: &App, frame: &mut Frame, area: Rect) {
    let validation = app.document.validate();
    let (ready_text, ready_color) = if validation.valid {
        ("ready to generate".to_string(), Color::Green)
    } else {
        (validation.summary(), Color::Red)
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Model:       ", Style::default().fg(Color::DarkGray)),
            Span::raw(app.model.as_str()),
        ]),
        Line::from(vec![
            Span::styled("Temperature: ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!("{:.1}", app.temperature)),
        ]),
        Line::from(vec![
            Span::styled("Status:      ", Style::default().fg(Color::DarkGray)),
            Span::styled(ready_text, Style::default().fg(ready_color)),
        ]),
    ];
    if let Some(dialog_id) = &app.target_dialog {
        let target = match &app.editing_prompt {
            Some(prompt_id) => format!("{} (editing prompt {})", dialog_id, prompt_id),
            None => dialog_id.to_string(),
        };
        lines.push(Line::from(vec![
            Span::styled("Dialog:      ", Style::default().fg(Color::DarkGray)),
            Span::raw(target),
        ]));
    }

    let settings = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue))
                .title(" Settings "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(settings, area);
}

fn render_response(app: &App, frame: &mut Frame, area: Rect) {
    let response_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Response (J/K to scroll) ");

    let text = if app.generation_task.is_some() {
        // Animated ellipsis: cycles through ".", "..", "..."
        Text::from(Line::from(Span::styled(
            format!("Generating{}", loading_dots(app)),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )))
    } else if let Some(response) = app.response() {
        Text::from(response.to_string())
    } else if let Some(message) = app.last_result.as_ref().and_then(|r| r.error_message.as_deref()) {
        Text::from(Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Red),
        )))
    } else {
        Text::from(Line::from(Span::styled(
            "Fill in Context and Task, then press g to generate.",
            Style::default().fg(Color::DarkGray),
        )))
    };

    let response = Paragraph::new(text)
        .block(response_block)
        .wrap(Wrap { trim: false })
        .scroll((app.response_scroll, 0));
    frame.render_widget(response, area);
}

fn render_editor(app: &App, frame: &mut Frame, area: Rect) {
    let heading = match app.focused_block().and_then(|id| app.document.block(id)) {
        Some(block) => format!(" Edit {} ", block.label()),
        None => " Edit title ".to_string(),
    };

    let popup_width = 70.min(area.width.saturating_sub(4));
    let popup_height = 14.min(area.height.saturating_sub(2));
    let popup_area = centered(area, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(heading);

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let (row, col) = cursor_offset(&app.edit_buffer);
    let scroll = row.saturating_sub(inner.height.saturating_sub(1));

    let editor = Paragraph::new(app.edit_buffer.as_str()).scroll((scroll, 0));
    frame.render_widget(editor, inner);

    let cursor_x = col.min(inner.width.saturating_sub(1));
    frame.set_cursor_position((inner.x + cursor_x, inner.y + row - scroll));
}

fn render_dialog_screen(app: &App, frame: &mut Frame, area: Rect) {
    let [input_area, chat_area] =
        Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(area);

    let editing = app.input_mode == InputMode::Editing;
    let (input_title, input_text) = match app.dialog_field {
        DialogField::Id => (" Dialog id ", app.dialog_id_input.as_str()),
        DialogField::Message => (" Follow-up ", app.chat_input.as_str()),
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(input_title);
    let input = Paragraph::new(input_text).block(input_block);
    frame.render_widget(input, input_area);

    if editing {
        let cursor_x = input_text.chars().count() as u16;
        frame.set_cursor_position((input_area.x + 1 + cursor_x, input_area.y + 1));
    }

    let chat_title = match &app.dialog {
        Some(details) => format!(" {} ", details.dialog.title),
        None => " Conversation ".to_string(),
    };
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(chat_title);

    let chat_text = if app.dialog_task.is_some() {
        Text::from(Line::from(Span::styled(
            format!("Loading{}", loading_dots(app)),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )))
    } else if app.dialog.is_some() {
        let mut lines = Vec::new();
        for message in app.dialog_messages() {
            let (label, color) = match message.role {
                ChatRole::User => ("You:", Color::Green),
                ChatRole::Assistant => ("AI:", Color::Yellow),
            };
            lines.push(Line::from(Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));
            for text in message.content.lines() {
                lines.push(Line::from(text.to_string()));
            }
            lines.push(Line::default());
        }
        if app.action_task.is_some() {
            lines.push(Line::from(Span::styled(
                format!("Waiting{}", loading_dots(app)),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
        if lines.is_empty() {
            lines.push(Line::from(Span::styled(
                "This dialog has no prompts yet.",
                Style::default().fg(Color::DarkGray),
            )));
        }
        Text::from(lines)
    } else {
        Text::from(Line::from(Span::styled(
            "Enter a dialog id and press Enter to open it.",
            Style::default().fg(Color::DarkGray),
        )))
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.dialog_scroll, 0));
    frame.render_widget(chat, chat_area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn loading_dots(app: &App) -> String {
    ".".repeat((app.animation_frame as usize) + 1)
}

fn mask(secret: &str) -> String {
    "*".repeat(secret.chars().count())
}

/// Row and column of the end of `text`, counted in lines and chars.
fn cursor_offset(text: &str) -> (u16, u16) {
    let row = text.matches('\n').count();
    let col = text.rsplit('\n').next().map(|l| l.chars().count()).unwrap_or(0);
    (row as u16, col as u16)
}
