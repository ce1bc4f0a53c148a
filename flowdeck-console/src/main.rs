//! Flowdeck Console
//!
//! Terminal operations console for an Airflow scheduler: browse and search
//! DAGs, drill into runs and task instances, read task logs and the audit
//! trail, and perform the mutations your role allows.

mod app;
mod ui;

use app::{App, AppEvent};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use flowdeck_client::ClientConfig;
use ratatui::prelude::*;
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(tui_logger::tracing_subscriber_layer())
        .with(env_filter);

    // FLOWDECK_LOG_DIR adds a daily-rolling file layer alongside the TUI pane
    match std::env::var("FLOWDECK_LOG_DIR") {
        Ok(dir) if !dir.is_empty() => {
            let file_appender = tracing_appender::rolling::daily(dir, "flowdeck-console");
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(file_appender)
                        .with_ansi(false),
                )
                .init();
        }
        _ => registry.init(),
    }

    // Also init log crate adapter just in case dependencies use log crate
    tui_logger::init_logger(log::LevelFilter::Info).ok();
    tui_logger::set_default_level(log::LevelFilter::Info);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (tx, mut rx) = mpsc::channel(32);
    let mut app = App::new(ClientConfig::from_env(), tx);

    let res = run_app(&mut terminal, &mut app, &mut rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err);
    }

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    rx: &mut mpsc::Receiver<AppEvent>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if app.should_quit {
            return Ok(());
        }

        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat)
        {
            app.handle_key(key);
        }

        // Drain background results without blocking the input loop
        while let Ok(event) = rx.try_recv() {
            app.on_event(event);
        }
    }
}
