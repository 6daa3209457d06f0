//! ConectaPe - a terminal front end for the congressional contact directory.
//!
//! Sign in with a 9-digit phone number, then browse and search the staff
//! directory (and, for admins, the congress members list), and dial or
//! message a contact straight from the list.

mod app;
mod demo;
mod ui;

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use conectape_core::backend::{AuthService, DocumentStore, FirebaseBackend};
use conectape_core::diagnostics::save_ip_notice;
use conectape_core::intents::SystemLauncher;
use conectape_core::Config;

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const LOG_FILE: &str = "conectape.log";

/// Initialize the tracing subscriber for logging.
///
/// The terminal belongs to the UI, so logs go to a file under `log_dir`.
/// Use RUST_LOG to control the level (e.g. RUST_LOG=conectape_core=debug).
fn init_tracing(log_dir: &Path) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if std::fs::create_dir_all(log_dir).is_err() {
        return None;
    }
    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load()?;
    let _guard = config.cache_dir().ok().and_then(|dir| init_tracing(&dir));

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "--save-ip" {
        let Some(ip) = args.get(2) else {
            bail!("Usage: conectape --save-ip <ip>");
        };
        return save_ip(&config, ip);
    }
    let demo = args.len() > 1 && args[1] == "--demo";

    info!(demo, "ConectaPe starting");

    let (auth, store): (Arc<dyn AuthService>, Arc<dyn DocumentStore>) = if demo {
        let backend = demo::seeded_backend();
        (Arc::new(backend.clone()), Arc::new(backend))
    } else {
        let settings = config.firebase_settings()?.context(
            "Backend not configured: set CONECTAPE_API_KEY and CONECTAPE_PROJECT_ID \
             (or api_key/project_id in the config file), or run with --demo",
        )?;
        let backend = FirebaseBackend::new(settings)?;
        if let Err(e) = backend.restore_session().await {
            warn!(error = %e, "Could not restore saved session");
        }
        (Arc::new(backend.clone()), Arc::new(backend))
    };

    let mut app = App::new(config, auth, store, Box::new(SystemLauncher));
    app.demo = demo;
    app.start();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("ConectaPe shutting down");
    Ok(())
}

/// Write the given IP to the data directory and report the outcome.
fn save_ip(config: &Config, ip: &str) -> Result<()> {
    let dir = config.data_dir()?;
    let notice = save_ip_notice(&dir, ip);
    if notice.is_error() {
        bail!("{}: {}", notice.title, notice.message);
    }
    println!("{}\n{}", notice.title, notice.message);
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                // Handle input
                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Apply listener deliveries and finished sign-ins
        app.check_background_tasks();

        // Check if we should quit
        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
