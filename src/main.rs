// ============================================================================
// CryptoWidget - Tableau de cours crypto et change
// ============================================================================
// Programme TUI : tableau des cours rafraîchi toutes les 60 secondes,
// graphique 7 jours de chaque instrument dans une fenêtre popup.
//
// ARCHITECTURE :
// 1. Thread "refresh" : runtime tokio, exécute un cycle par période et
//    envoie un CycleReport au thread UI
// 2. Thread UI (main) : seul propriétaire de App (lignes, images,
//    fenêtres) ; consomme les rapports, dessine, traite les événements
// ============================================================================

use std::io;
use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::{Context, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, error, info, warn};

use cryptowidget::api::{CoinGeckoClient, ExchangeRateClient};
use cryptowidget::app::App;
use cryptowidget::clock::TokioClock;
use cryptowidget::config::Config;
use cryptowidget::refresh::{spawn_refresh_loop, CycleReport, RefreshService};
use cryptowidget::ui::events::{
    click_position, is_down_event, is_escape_event, is_quit_event, is_tab_event, is_up_event,
    is_view_event,
};
use cryptowidget::ui::{hit_test, render, Column, Event, EventHandler};

type Tui = Terminal<CrosstermBackend<io::Stdout>>;

// ============================================================================
// Logging
// ============================================================================
// Les println! ne fonctionnent pas une fois le TUI lancé : on log vers un
// fichier, avec rotation quotidienne.
// ============================================================================

/// Répertoire des logs
///
/// - Linux : ~/.local/share/cryptowidget/logs
/// - macOS : ~/Library/Application Support/cryptowidget/logs
/// - Windows : C:\Users\<user>\AppData\Local\cryptowidget\logs
/// - ./logs si le répertoire de données est introuvable
fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("cryptowidget").join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// Initialise le système de logging vers fichier
///
/// ```bash
/// tail -f ~/.local/share/cryptowidget/logs/cryptowidget.log.*
/// RUST_LOG=cryptowidget=trace cargo run
/// ```
fn init_logging() -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), "cryptowidget.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_line_number(true),
        )
        .with(
            // Par défaut : debug pour cryptowidget, info pour les dépendances
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cryptowidget=debug,info".into()),
        )
        .init();

    info!(?log_dir, "Logging initialisé");
    Ok(())
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    init_logging().unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    info!("CryptoWidget starting up");

    let config = Config::from_env();
    debug!(?config, "Configuration loaded");

    let market = CoinGeckoClient::new(&config).context("Échec de la création du client CoinGecko")?;
    let fx = ExchangeRateClient::new(&config).context("Échec de la création du client de change")?;

    let app = App::new(&config);
    let period = config.poll_period;
    let service = RefreshService::new(market, fx, TokioClock, config);

    let (report_tx, report_rx) = mpsc::channel::<CycleReport>();
    let handle = spawn_refresh_loop(service, period, report_tx)?;

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;

    let events = EventHandler::new();
    info!("Starting event loop");
    let result = run(&mut terminal, app, &events, report_rx);

    // Restaure le terminal (même en cas d'erreur)
    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    info!("Stopping refresh loop");
    handle.shutdown();

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

// ============================================================================
// Event loop
// ============================================================================
// 0. RÉSULTATS : consomme les CycleReport du thread refresh
// 1. RENDER : dessine l'interface
// 2. INPUT : traite les événements (bloque au plus 250ms)
// ============================================================================

fn run(
    terminal: &mut Tui,
    mut app: App,
    events: &EventHandler,
    report_rx: mpsc::Receiver<CycleReport>,
) -> Result<()> {
    let mut refresh_alive = true;

    while app.is_running() {
        // Non-blocking : tous les rapports arrivés depuis le dernier tour
        while refresh_alive {
            match report_rx.try_recv() {
                Ok(report) => {
                    app.apply_report(report);
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    warn!("Refresh thread disconnected, data will no longer update");
                    refresh_alive = false;
                }
            }
        }

        terminal.draw(|frame| render(frame, &app))?;

        match events.next() {
            Ok(event) => {
                let area = terminal.size()?;
                handle_event(&mut app, event, area);
            }
            Err(e) => {
                error!(error = %e, "Failed to read terminal event");
            }
        }
    }

    Ok(())
}

/// Traite un événement et met à jour l'état de l'application
///
/// `area` : taille de l'écran, pour le hit-test des clics
fn handle_event(app: &mut App, event: Event, area: ratatui::layout::Rect) {
    match event {
        Event::Key(_) if is_quit_event(&event) => {
            // Quit confirmation two-step
            if app.is_awaiting_quit_confirmation() {
                info!("User confirmed quit");
                app.quit();
            } else {
                app.request_quit();
            }
        }

        // Toute autre touche annule la demande de quit
        Event::Key(_) if app.is_awaiting_quit_confirmation() => {
            app.cancel_quit();
        }

        Event::Key(_) if is_escape_event(&event) => app.close_top_chart(),
        Event::Key(_) if is_tab_event(&event) => app.cycle_charts(),
        Event::Key(_) if is_up_event(&event) => app.navigate_up(),
        Event::Key(_) if is_down_event(&event) => app.navigate_down(),
        Event::Key(_) if is_view_event(&event) => {
            app.open_selected_chart();
        }

        Event::Mouse(_) => {
            let Some((x, y)) = click_position(&event) else {
                return;
            };
            if let Some(hit) = hit_test(app, area, x, y) {
                debug!(row = hit.row, column = ?hit.column, "Table clicked");
                app.select(hit.row);
                if hit.column == Column::View {
                    app.open_selected_chart();
                }
            }
        }

        _ => {}
    }
}

// ============================================================================
// Terminal
// ============================================================================

/// Configure le terminal en mode TUI (raw mode, alternate screen, souris)
fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| e.into())
}

/// Restaure le terminal à son état normal
fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}
