//! roles-manager binary entry point.
//!
//! Parses arguments, sets up file logging, initializes the terminal in raw
//! mode, runs the TUI event loop, and restores the terminal state on exit.
//!
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use roles_manager::api::http::HttpBackend;
use roles_manager::app::config::{CONFIG_FILE, LOG_FILE};
use roles_manager::app::keymap::Keymap;
use roles_manager::app::{self, AppState, ClientConfig, KEYBINDS_FILE, ReloadPolicy};

/// Edit organizational roles and their members from the terminal.
#[derive(Debug, Parser)]
#[command(name = "roles-manager", version, about)]
struct Args {
    /// Base URL of the roles backend (overrides the config file).
    #[arg(long, env = "ROLES_MANAGER_URL")]
    base_url: Option<String>,

    /// Path to the configuration file.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// What a reload does to edit mode, filters and selection.
    #[arg(long, value_enum)]
    reload_policy: Option<ReloadPolicy>,

    /// Log file (default: roles-manager.log in the config directory).
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log filter, e.g. "info" or "roles_manager=debug" (default: info).
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,
}

/// `--log-level` wins over `RUST_LOG`; a missing or unparsable filter means "info".
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// The terminal owns stdout, so logs always go to a file.
fn init_logging(args: &Args) -> Result<()> {
    let filter = log_filter(args.log_level.as_deref());
    let path = args
        .log_file
        .clone()
        .unwrap_or_else(|| app::config_file_write_path(LOG_FILE));
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file)
                .with_ansi(false),
        )
        .init();
    Ok(())
}

/// Config file first, then command-line overrides.
fn load_config(args: &Args) -> Result<ClientConfig> {
    let mut cfg = match &args.config {
        Some(path) => match ClientConfig::from_file(&path.to_string_lossy()) {
            Some(cfg) => cfg,
            None => bail!("cannot read config file {}", path.display()),
        },
        None => ClientConfig::load_or_init(&app::config_file_write_path(CONFIG_FILE).to_string_lossy()),
    };
    if let Some(url) = &args.base_url {
        cfg.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(policy) = args.reload_policy {
        cfg.reload_policy = policy;
    }
    Ok(cfg)
}

/// Initialize a Crossterm-backed `ratatui` terminal in raw mode.
fn init_terminal() -> Result<Terminal<CrosstermBackend<std::io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Program entry point: run the TUI and report any top-level error to stderr.
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;
    let config = load_config(&args)?;
    let backend = HttpBackend::new(&config.base_url)?;
    tracing::info!(
        base_url = %backend.base_url(),
        reload_policy = config.reload_policy.as_str(),
        "starting"
    );
    let keymap = Keymap::load_or_init(&app::config_file_write_path(KEYBINDS_FILE).to_string_lossy());
    let mut state = AppState::new(config, keymap);

    let mut terminal = init_terminal().context("init terminal")?;

    let res = app::run(&mut terminal, &mut state, Arc::new(backend)).await;

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    if let Err(err) = res {
        tracing::error!(%err, "application error");
        eprintln!("application error: {err:#}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn log_level_reads_rust_log() {
        let cmd = Args::command();
        let arg = cmd
            .get_arguments()
            .find(|a| a.get_id() == "log_level")
            .unwrap();
        assert_eq!(arg.get_env(), Some(std::ffi::OsStr::new("RUST_LOG")));
        assert_eq!(arg.get_default_values().len(), 0);
    }

    #[test]
    fn log_filter_falls_back_to_info() {
        assert_eq!(log_filter(None).to_string(), "info");
        assert_eq!(log_filter(Some("roles_manager=loud")).to_string(), "info");
        assert!(log_filter(Some("roles_manager=debug")).to_string().contains("roles_manager=debug"));
    }
}
