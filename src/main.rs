mod app;
mod batcher;
mod config;
mod logging;
mod sim;
mod ui;

use anyhow::Result;
use app::{App, FocusTarget};
use batcher::controller::{Controller, Report};
use batcher::formulas::oracle_for;
use batcher::ram::RamBudget;
use config::{CONFIG_FILE, load_config};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use sim::SimNetwork;
use std::io;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config(CONFIG_FILE)?;
    logging::setup_logging(&config.logging)?;

    let network = SimNetwork::generate(&config.network, config.scripts);
    info!(
        seed = config.network.seed,
        servers = config.network.servers,
        "simulated network generated"
    );
    let budget = RamBudget::new(
        config.scripts,
        config.batcher.home.clone(),
        config.batcher.home_reserve_gb,
    );
    let controller = Controller::new(
        network,
        oracle_for(config.batcher.oracle),
        budget,
        config.batcher.clone(),
    );

    let (report_tx, report_rx) = watch::channel(Report::default());
    let worker = task::spawn(controller.run(report_tx));

    let mut terminal = setup_terminal()?;
    let result = run(&mut terminal, report_rx).await;
    restore_terminal(&mut terminal)?;

    worker.abort();
    info!("dashboard closed");
    result
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut reports: watch::Receiver<Report>,
) -> Result<()> {
    let mut app = App::new();

    let (input_tx, mut input_rx) = mpsc::unbounded_channel();
    task::spawn(async move {
        loop {
            match task::spawn_blocking(crossterm::event::read).await {
                Ok(Ok(event)) => {
                    if input_tx.send(event).is_err() {
                        break;
                    }
                }
                Ok(Err(_)) => break,
                Err(_) => break,
            }
        }
    });

    let tick_rate = Duration::from_millis(250);
    let mut should_quit = false;

    loop {
        let report = reports.borrow_and_update().clone();
        app.clamp_host_selection(report.hosts.len());
        terminal.draw(|f| ui::render(f, &app, &report))?;
        if should_quit {
            break;
        }

        tokio::select! {
            Some(event) = input_rx.recv() => {
                if handle_event(event, &mut app, report.hosts.len()) {
                    should_quit = true;
                }
            }
            changed = reports.changed() => {
                if changed.is_err() {
                    // The controller task is gone; keep showing its last report.
                    tokio::time::sleep(tick_rate).await;
                }
            }
            _ = tokio::time::sleep(tick_rate) => {}
        }
    }

    Ok(())
}

fn handle_event(event: Event, app: &mut App, hosts: usize) -> bool {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key_event(key, app, hosts),
        _ => false,
    }
}

fn handle_key_event(key: KeyEvent, app: &mut App, hosts: usize) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Tab | KeyCode::BackTab => {
            app.next_focus();
            false
        }
        KeyCode::Left => {
            app.set_focus(FocusTarget::Hosts);
            false
        }
        KeyCode::Right => {
            app.set_focus(FocusTarget::Status);
            false
        }
        KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('K') => {
            app.move_host_selection(-1, hosts);
            false
        }
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('J') => {
            app.move_host_selection(1, hosts);
            false
        }
        _ => false,
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), terminal::LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
