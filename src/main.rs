//! Wheelmode keyboard steering
//!
//! Main entry point, headless loop and TUI run loop.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use futures::StreamExt;
use ratatui::prelude::*;
use std::fs::OpenOptions;
use std::io::{stdout, Stdout};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use wheelmode::driver::{Driver, LiveFeed};
use wheelmode::joystick::{AxisId, JoystickError, VirtualJoystick};
use wheelmode::keyboard::EvdevKeyboard;
use wheelmode::profile::{ProfileStore, DEFAULT_PROFILE};
use wheelmode::tui::app::{App, PromptKind, Tab};
use wheelmode::tui::render;
use wheelmode_engine::Settings;

/// How often headless mode checks the profile file for edits
const RELOAD_INTERVAL: Duration = Duration::from_secs(1);
/// TUI redraw and capture poll period
const UI_TICK: Duration = Duration::from_millis(50);
const LOG_FILE: &str = "wheelmode.log";

#[derive(Parser)]
#[command(name = "wheelmode")]
#[command(about = "Keyboard steering for racing games through a virtual joystick axis")]
struct Cli {
    /// Config directory (default: ~/.config/wheelmode)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Profile to use instead of the last selected one
    #[arg(short, long)]
    profile: Option<String>,

    /// Run without TUI (headless mode)
    #[arg(long)]
    headless: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Keyboard event device (default: every keyboard under /dev/input)
    #[arg(short, long)]
    keyboard: Option<PathBuf>,

    /// Name of the virtual device as shown to games
    #[arg(long, default_value = "Wheelmode Virtual Wheel")]
    device_name: String,

    /// Axis that carries steering
    #[arg(long, value_enum, default_value_t = AxisId::X)]
    axis: AxisId,

    /// Steering tick period in milliseconds
    #[arg(long, default_value_t = 10)]
    tick_ms: u64,
}

type DriverHandle = JoinHandle<Result<(), JoystickError>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(ProfileStore::default_root);

    init_logging(&cli, &config_dir)?;

    // Profile
    let store = ProfileStore::new(&config_dir);
    let profile = match &cli.profile {
        Some(name) => {
            store.select(name)?;
            name.clone()
        }
        None => store.selected().unwrap_or_else(|e| {
            warn!("{}; using \"{}\"", e, DEFAULT_PROFILE);
            DEFAULT_PROFILE.to_string()
        }),
    };
    let settings = store.load(&profile).unwrap_or_else(|e| {
        warn!("{}; starting with default settings", e);
        Settings::default()
    });
    info!(
        "Using profile \"{}\" from {}",
        profile,
        store.root().display()
    );

    // Devices
    let mut joystick = VirtualJoystick::new(&cli.device_name, cli.axis).map_err(|e| {
        error!("{}", e);
        e
    })?;
    let device_path = joystick.device_path();
    info!(
        "Created virtual joystick: {} (axis {})",
        cli.device_name,
        cli.axis.display_name()
    );
    if let Some(path) = &device_path {
        info!("Device path: {}", path.display());
    }

    let keyboard = EvdevKeyboard::open(cli.keyboard.as_deref())?;

    // Steering loop
    let (settings_tx, settings_rx) = watch::channel(Arc::new(settings.clone()));
    let (feed, live) = LiveFeed::new();
    let period = Duration::from_millis(cli.tick_ms.max(1));
    let driver = Driver::new(keyboard, joystick, settings_rx, feed, period);
    let driver_task = tokio::spawn(driver.run());

    if cli.headless {
        run_headless(store, profile, settings_tx, driver_task).await
    } else {
        // A second handle for binding capture; steering keeps its own
        let capture_keyboard = match EvdevKeyboard::open(cli.keyboard.as_deref()) {
            Ok(kb) => Some(kb),
            Err(e) => {
                warn!("Key capture falls back to the terminal: {}", e);
                None
            }
        };
        let app = App::new(
            store,
            profile,
            settings,
            settings_tx,
            live,
            capture_keyboard,
            device_path.map(|p| p.display().to_string()),
        );
        run_tui(app, driver_task).await
    }
}

/// Log to stderr when headless, to a file in the config dir under the TUI
fn init_logging(cli: &Cli, config_dir: &Path) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        std::fs::create_dir_all(config_dir)
            .with_context(|| format!("Failed to create {}", config_dir.display()))?;
        let path = config_dir.join(LOG_FILE);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

/// Turn a finished steering task into the error that ends the program
fn driver_failure(result: Result<Result<(), JoystickError>, JoinError>) -> anyhow::Error {
    match result {
        Ok(Ok(())) => anyhow!("Steering loop stopped unexpectedly"),
        Ok(Err(e)) => {
            error!("{}", e);
            e.into()
        }
        Err(e) => anyhow!("Steering loop panicked: {}", e),
    }
}

/// Run in headless mode (no TUI)
///
/// Edits to the profile file are picked up while running.
async fn run_headless(
    store: ProfileStore,
    profile: String,
    settings_tx: watch::Sender<Arc<Settings>>,
    mut driver_task: DriverHandle,
) -> Result<()> {
    info!("Running in headless mode. Press Ctrl+C to exit.");

    let mut last_modified = store.modified(&profile);
    let mut reload = tokio::time::interval(RELOAD_INTERVAL);

    loop {
        tokio::select! {
            result = &mut driver_task => return Err(driver_failure(result)),

            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }

            _ = reload.tick() => {
                let modified = store.modified(&profile);
                if modified == last_modified {
                    continue;
                }
                last_modified = modified;
                match store.load(&profile) {
                    Ok(settings) => {
                        info!("Reloaded profile \"{}\"", profile);
                        settings_tx.send_replace(Arc::new(settings));
                    }
                    Err(e) => warn!("{}; keeping previous settings", e),
                }
            }
        }
    }

    driver_task.abort();
    Ok(())
}

/// Run with TUI
async fn run_tui(mut app: App, mut driver_task: DriverHandle) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = tui_loop(&mut terminal, &mut app, &mut driver_task).await;

    // Cleanup
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    driver_task.abort();

    result
}

async fn tui_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    driver_task: &mut DriverHandle,
) -> Result<()> {
    let mut events = EventStream::new();

    loop {
        let live = app.frame();
        terminal.draw(|f| render::render(f, app, &live))?;

        tokio::select! {
            // Terminal events
            event = events.next() => {
                if let Some(Ok(event)) = event {
                    handle_event(app, event);
                }
            }

            result = &mut *driver_task => return Err(driver_failure(result)),

            // Redraw and capture poll
            _ = tokio::time::sleep(UI_TICK) => {
                app.poll_capture();
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Handle terminal events
fn handle_event(app: &mut App, event: Event) {
    let Event::Key(key) = event else {
        return;
    };
    if key.kind != KeyEventKind::Press {
        return;
    }

    // The one-line prompt takes every key while open
    if app.prompt.is_some() {
        match key.code {
            KeyCode::Enter => app.submit_prompt(),
            KeyCode::Esc => app.cancel_prompt(),
            KeyCode::Backspace => app.prompt_backspace(),
            KeyCode::Char(c) => app.prompt_input(c),
            _ => {}
        }
        return;
    }

    if app.capture.is_some() {
        match key.code {
            KeyCode::Esc => app.cancel_capture(),
            KeyCode::Char(c) => app.capture_typed(c),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('?') => app.show_help = !app.show_help,
        KeyCode::Esc => app.show_help = false,
        KeyCode::Tab => {
            let next = match app.tab {
                Tab::Live => Tab::Settings,
                Tab::Settings => Tab::ActionKeys,
                Tab::ActionKeys => Tab::Live,
            };
            app.set_tab(next);
        }
        KeyCode::Char('1') => app.set_tab(Tab::Live),
        KeyCode::Char('2') => app.set_tab(Tab::Settings),
        KeyCode::Char('3') => app.set_tab(Tab::ActionKeys),
        KeyCode::Up => app.select_prev(),
        KeyCode::Down => app.select_next(),
        KeyCode::Enter => app.select_enter(),
        KeyCode::Char(' ') => app.toggle_current(),
        KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_current(1),
        KeyCode::Char('-') => app.adjust_current(-1),
        KeyCode::PageUp => app.adjust_current(10),
        KeyCode::PageDown => app.adjust_current(-10),
        // No letters here: a and d steer by default
        KeyCode::Insert if app.tab == Tab::ActionKeys => app.add_action_key(),
        KeyCode::Delete if app.tab == Tab::ActionKeys => app.delete_action_key(),
        KeyCode::Backspace | KeyCode::Delete => app.unbind_current(),
        KeyCode::Char('u') if app.tab == Tab::ActionKeys => app.move_action_key(true),
        KeyCode::Char('j') if app.tab == Tab::ActionKeys => app.move_action_key(false),
        KeyCode::Char('[') => app.cycle_profile(false),
        KeyCode::Char(']') => app.cycle_profile(true),
        KeyCode::Char('n') => app.open_prompt(PromptKind::NewProfile),
        KeyCode::Char('r') => app.open_prompt(PromptKind::RenameProfile),
        KeyCode::Char('L') => app.reload_profile(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, KeyModifiers};
    use tempfile::TempDir;

    fn press(app: &mut App, code: KeyCode) {
        handle_event(app, Event::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn app(dir: &TempDir) -> App {
        let (tx, _rx) = watch::channel(Arc::new(Settings::default()));
        let (_feed, live) = LiveFeed::new();
        App::new(
            ProfileStore::new(dir.path()),
            DEFAULT_PROFILE.to_string(),
            Settings::default(),
            tx,
            live,
            None,
            None,
        )
    }

    #[test]
    fn test_steer_letters_leave_action_keys_alone() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.set_tab(Tab::ActionKeys);

        press(&mut app, KeyCode::Insert);
        assert_eq!(app.settings.action_keys.len(), 1);
        press(&mut app, KeyCode::Esc); // leave capture

        for _ in 0..5 {
            press(&mut app, KeyCode::Char('a'));
            press(&mut app, KeyCode::Char('d'));
        }
        assert_eq!(app.settings.action_keys.len(), 1);
        assert!(app.capture.is_none());

        press(&mut app, KeyCode::Delete);
        assert!(app.settings.action_keys.is_empty());
    }

    #[test]
    fn test_delete_unbinds_on_settings_tab() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.set_tab(Tab::Settings);
        app.field_index = wheelmode::tui::Field::ALL
            .iter()
            .position(|f| *f == wheelmode::tui::Field::SteerRight)
            .unwrap();
        press(&mut app, KeyCode::Delete);
        assert_eq!(app.settings.bindings.steer_right, "");
    }
}
