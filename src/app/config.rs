//! Client configuration: parse/write `roles-manager.conf`.
//!
//! The file uses one `<key> = <value>` pair per line; `#` starts a comment
//! and unknown keys are skipped. Missing keys keep their defaults.

use std::path::PathBuf;
use std::time::Duration;

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE: &str = "roles-manager.conf";
/// Name of the key bindings file inside the config directory.
pub const KEYBINDS_FILE: &str = "keybinds.conf";
/// Name of the log file inside the config directory.
pub const LOG_FILE: &str = "roles-manager.log";

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_SUCCESS_FLASH_MS: u64 = 1000;

/// What a reload does to client-side view state once fresh rows arrive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReloadPolicy {
    /// Behave like a fresh start: edit mode off, filters cleared, first row selected.
    #[default]
    Reset,
    /// Keep edit mode, filters and selection.
    Preserve,
}

impl ReloadPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ReloadPolicy::Reset => "reset",
            ReloadPolicy::Preserve => "preserve",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "reset" => Some(ReloadPolicy::Reset),
            "preserve" | "keep" => Some(ReloadPolicy::Preserve),
            _ => None,
        }
    }
}

/// Settings for the terminal client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Root URL of the roles backend.
    pub base_url: String,
    pub reload_policy: ReloadPolicy,
    /// How long the "Saved!" indicator stays up before the reload.
    pub success_flash: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            reload_policy: ReloadPolicy::default(),
            success_flash: Duration::from_millis(DEFAULT_SUCCESS_FLASH_MS),
        }
    }
}

impl ClientConfig {
    /// Load from `path`, or from the standard locations, or write defaults to `path`.
    pub fn load_or_init(path: &str) -> Self {
        let p = std::path::Path::new(path);
        if p.exists() {
            return Self::from_file(path).unwrap_or_default();
        }
        if let Some(existing) = config_file_read_path(CONFIG_FILE) {
            return Self::from_file(&existing.to_string_lossy()).unwrap_or_default();
        }
        let cfg = Self::default();
        if let Err(err) = cfg.write_file(path) {
            tracing::warn!(path, %err, "could not write default config");
        }
        cfg
    }

    /// `Some(config)` if the file is readable; `None` otherwise.
    pub fn from_file(path: &str) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        Some(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        let mut cfg = Self::default();
        for raw in contents.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.splitn(2, '=');
            let lhs = parts.next().map(|s| s.trim()).unwrap_or("");
            let rhs = parts.next().map(|s| s.trim()).unwrap_or("");
            if lhs.is_empty() || rhs.is_empty() {
                continue;
            }
            match lhs {
                "base_url" => cfg.base_url = rhs.trim_end_matches('/').to_string(),
                "reload_policy" => {
                    cfg.reload_policy = ReloadPolicy::parse(rhs).unwrap_or(cfg.reload_policy);
                }
                "success_flash_ms" => {
                    if let Ok(ms) = rhs.parse::<u64>() {
                        cfg.success_flash = Duration::from_millis(ms);
                    }
                }
                _ => {}
            }
        }
        cfg
    }

    pub fn write_file(&self, path: &str) -> std::io::Result<()> {
        use std::fmt::Write as _;
        let mut buf = String::new();
        buf.push_str("# roles-manager client configuration\n");
        buf.push_str("# Reload policy: reset|preserve\n\n");
        let _ = writeln!(&mut buf, "base_url = {}", self.base_url);
        let _ = writeln!(&mut buf, "reload_policy = {}", self.reload_policy.as_str());
        let _ = writeln!(&mut buf, "success_flash_ms = {}", self.success_flash.as_millis());
        std::fs::write(path, buf)
    }
}

/// `$XDG_CONFIG_HOME/roles-manager`, else `~/.config/roles-manager`.
pub fn config_dir() -> Option<PathBuf> {
    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(std::env::var_os("HOME")?).join(".config"),
    };
    Some(base.join("roles-manager"))
}

/// First existing location of `name`: the config directory, then the
/// working directory.
pub fn config_file_read_path(name: &str) -> Option<PathBuf> {
    if let Some(dir) = config_dir() {
        let p = dir.join(name);
        if p.exists() {
            return Some(p);
        }
    }
    let local = PathBuf::from(name);
    local.exists().then_some(local)
}

/// Where `name` should be written; creates the config directory if needed
/// and falls back to the working directory.
pub fn config_file_write_path(name: &str) -> PathBuf {
    if let Some(dir) = config_dir()
        && std::fs::create_dir_all(&dir).is_ok()
    {
        return dir.join(name);
    }
    PathBuf::from(name)
}
