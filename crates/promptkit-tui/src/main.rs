use std::sync::Mutex;

use anyhow::{anyhow, Result};
use promptkit_core::{AuthSession, Config};
use tracing_subscriber::{prelude::*, EnvFilter};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;

/// Logs go to a file: stdout and stderr belong to the terminal UI.
fn init_logging() -> Result<()> {
    let log_dir = dirs::data_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?
        .join("promptkit")
        .join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_path = log_dir.join("promptkit.log");
    let file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(&log_path)?;

    let filter = EnvFilter::try_from_env("PROMPTKIT_LOG")
        .unwrap_or_else(|_| EnvFilter::new("promptkit=info,promptkit_core=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false), // No ANSI colors in file
        )
        .try_init()?;

    tracing::info!("Logging initialized to: {:?}", log_path);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = init_logging() {
        eprintln!("Logging disabled: {}", e);
    }

    let config = Config::load()?;
    let auth = AuthSession::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable saved session");
        None
    });

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let mut app = App::new(config, auth);

    let result = run(&mut terminal, &mut events, &mut app).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, events: &mut tui::EventHandler, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event).await?;
        app.poll_tasks().await;
    }

    Ok(())
}
