//! linecon - a line-oriented shell console in the terminal
//!
//! Runs the user's shell behind a single editable text surface. Output
//! scrolls above the input line; Enter sends the line to the shell.
//!
//! # Quick Start
//!
//! ```text
//! linecon                    # Default shell in the current directory
//! linecon -d ~/project       # Start in another directory
//! linecon -s /bin/zsh        # Use a specific shell
//! linecon -r script.py       # Run a file once the shell is up
//! ```
//!
//! # Keybindings
//!
//! | Key | Action |
//! |-----|--------|
//! | Ctrl+Q | Quit |
//! | Ctrl+L | Clear the display |
//! | Ctrl+R | Restart the shell |
//! | Ctrl+Shift+C | Copy selection |
//! | Ctrl+V | Paste |
//! | Shift+PageUp/PageDown | Scroll |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use arboard::Clipboard;
use crossterm::event::{self, Event, KeyCode, KeyEvent as TermKeyEvent, KeyEventKind, KeyModifiers};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use linecon::config::Config;
use linecon::paths;
use linecon::ui::{KeyEvent, Renderer};
use linecon::{ConsoleController, ConsoleOptions};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Rows moved per Shift+PageUp/PageDown
const SCROLL_STEP: usize = 10;

/// Command line options
#[derive(Debug, Default, PartialEq)]
struct Args {
    /// Starting directory
    dir: Option<PathBuf>,
    /// Shell override
    shell: Option<String>,
    /// File to run after startup
    run: Option<PathBuf>,
}

fn print_version() {
    eprintln!("linecon {}", VERSION);
}

fn print_help() {
    eprintln!("linecon {} - a line-oriented shell console", VERSION);
    eprintln!();
    eprintln!("Usage: linecon [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -d, --dir <DIR>       Start the shell in DIR");
    eprintln!("  -s, --shell <CMD>     Shell program (default: detected from PATH)");
    eprintln!("  -r, --run <FILE>      Run FILE using the configured run rules");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Keys:");
    eprintln!("  Enter                 Send the input line to the shell");
    eprintln!("  Up/Down               Recall earlier commands");
    eprintln!("  Ctrl+L                Clear the display");
    eprintln!("  Ctrl+R                Restart the shell");
    eprintln!("  Ctrl+Shift+C          Copy selection");
    eprintln!("  Ctrl+V                Paste");
    eprintln!("  Shift+PageUp/PageDown Scroll");
    eprintln!("  Ctrl+Q                Quit");
    eprintln!();
    eprintln!("Configuration: ~/.linecon/config.toml");
    eprintln!("Log file:      ~/.linecon/linecon.log");
}

fn parse_args<I>(args: I) -> Result<Args, String>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-d" | "--dir" => {
                let dir = args.next().ok_or("Missing directory argument")?;
                parsed.dir = Some(PathBuf::from(dir));
            }
            "-s" | "--shell" => {
                let shell = args.next().ok_or("Missing shell argument")?;
                parsed.shell = Some(shell);
            }
            "-r" | "--run" => {
                let file = args.next().ok_or("Missing file argument")?;
                parsed.run = Some(PathBuf::from(file));
            }
            other => {
                return Err(format!("Unknown argument: {}. Use -h for help.", other));
            }
        }
    }

    Ok(parsed)
}

/// Log to `~/.linecon/linecon.log`; `RUST_LOG` overrides the configured level
fn init_logging(level: &str) {
    let log_path = paths::app_dir()
        .map(|dir| dir.join("linecon.log"))
        .unwrap_or_else(|| PathBuf::from("linecon.log"));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let mut config = Config::load();
    init_logging(&config.log_level);
    info!("linecon {} starting...", VERSION);

    // Command line overrides the config file
    if let Some(shell) = args.shell {
        config.shell = Some(shell);
        config.shell_args = None;
    }
    let cwd = args
        .dir
        .or_else(|| config.working_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut console = ConsoleController::new(ConsoleOptions::from_config(&config));
    let mut renderer = Renderer::new(config.palette.clone());
    renderer.init()?;

    console.start(&cwd);
    if let Some(file) = args.run {
        console.run_file(&file);
    }

    let result = run_main_loop(&mut console, &mut renderer);

    console.stop();
    let _ = renderer.cleanup();
    info!("linecon exiting");

    result
}

/// Keys handled by the host rather than the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostAction {
    Quit,
    Clear,
    Restart,
    Copy,
    Paste,
    ScrollUp,
    ScrollDown,
}

fn host_action(key: &TermKeyEvent) -> Option<HostAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);

    match key.code {
        KeyCode::Char('c') | KeyCode::Char('C') if ctrl && shift => Some(HostAction::Copy),
        KeyCode::Char('q') if ctrl => Some(HostAction::Quit),
        KeyCode::Char('l') if ctrl => Some(HostAction::Clear),
        KeyCode::Char('r') if ctrl => Some(HostAction::Restart),
        KeyCode::Char('v') if ctrl => Some(HostAction::Paste),
        KeyCode::PageUp if shift => Some(HostAction::ScrollUp),
        KeyCode::PageDown if shift => Some(HostAction::ScrollDown),
        _ => None,
    }
}

fn run_main_loop(console: &mut ConsoleController, renderer: &mut Renderer) -> anyhow::Result<()> {
    let poll_timeout = Duration::from_millis(10);
    let mut clipboard = match Clipboard::new() {
        Ok(clipboard) => Some(clipboard),
        Err(e) => {
            warn!("Clipboard unavailable: {}", e);
            None
        }
    };

    renderer.render(console)?;

    loop {
        let mut dirty = console.pump();

        if event::poll(poll_timeout)? {
            match event::read()? {
                Event::Key(key_event) => {
                    if key_event.kind != KeyEventKind::Press {
                        continue;
                    }
                    match host_action(&key_event) {
                        Some(HostAction::Quit) => break,
                        Some(HostAction::Clear) => console.clear(),
                        Some(HostAction::Restart) => console.restart(),
                        Some(HostAction::Copy) => {
                            if let (Some(clipboard), Some(text)) =
                                (clipboard.as_mut(), console.buffer().selected_text())
                            {
                                if let Err(e) = clipboard.set_text(text.to_string()) {
                                    warn!("Copy failed: {}", e);
                                }
                            }
                        }
                        Some(HostAction::Paste) => {
                            if let Some(clipboard) = clipboard.as_mut() {
                                match clipboard.get_text() {
                                    Ok(text) => {
                                        console.paste(&text);
                                        renderer.scroll_to_bottom();
                                    }
                                    Err(e) => warn!("Paste failed: {}", e),
                                }
                            }
                        }
                        Some(HostAction::ScrollUp) => renderer.scroll_up(SCROLL_STEP),
                        Some(HostAction::ScrollDown) => renderer.scroll_down(SCROLL_STEP),
                        None => {
                            console.handle_key(&KeyEvent::from(key_event));
                            renderer.scroll_to_bottom();
                        }
                    }
                    dirty = true;
                }
                Event::Paste(text) => {
                    console.paste(&text);
                    renderer.scroll_to_bottom();
                    dirty = true;
                }
                Event::Resize(..) => dirty = true,
                _ => {}
            }
        }

        if dirty {
            renderer.render(console)?;
        }
    }

    Ok(())
}
