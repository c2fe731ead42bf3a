//! Configuration for linecon.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.linecon/config.toml`
//! - Run options mapping file name patterns to run commands
//! - The display palette
//!
//! # Configuration File
//!
//! ```toml
//! # Shell override (optional; detected from PATH otherwise)
//! shell = "/bin/zsh"
//! shell_args = ["-i"]
//!
//! working_dir = "/home/me/project"
//! stop_timeout_ms = 1000
//! write_timeout_ms = 100
//! log_level = "info"
//!
//! [palette]
//! output = { r = 200, g = 200, b = 200 }
//!
//! [[run]]
//! pattern = "*.py"
//! command = "python3 $path"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use globset::Glob;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::core::process::SessionTimeouts;
use crate::paths;

/// Placeholder replaced by the quoted file path in run commands
pub const PATH_PLACEHOLDER: &str = "$path";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine config path")]
    NoConfigPath,
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shell program; detected when unset
    pub shell: Option<String>,
    /// Shell arguments; derived from the shell name when unset
    pub shell_args: Option<Vec<String>>,
    /// Initial working directory
    pub working_dir: Option<PathBuf>,
    /// How long `stop` waits for the shell to exit
    pub stop_timeout_ms: u64,
    /// How long a stdin write may take before it is dropped
    pub write_timeout_ms: u64,
    /// Log filter (overridden by `RUST_LOG`)
    pub log_level: String,
    /// Display colors
    pub palette: Palette,
    /// Run commands by file pattern
    pub run: RunOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: None,
            shell_args: None,
            working_dir: None,
            stop_timeout_ms: 1000,
            write_timeout_ms: 100,
            log_level: "info".to_string(),
            palette: Palette::default(),
            run: RunOptions::default(),
        }
    }
}

impl Config {
    /// Load configuration from `~/.linecon/config.toml`, falling back to
    /// defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to `~/.linecon/config.toml`
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoConfigPath)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn config_path() -> Option<PathBuf> {
        paths::app_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn timeouts(&self) -> SessionTimeouts {
        SessionTimeouts {
            write: Duration::from_millis(self.write_timeout_ms),
            stop: Duration::from_millis(self.stop_timeout_ms),
        }
    }
}

/// One file pattern and the command that runs matching files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRule {
    /// Glob matched against the file name, e.g. `*.py`
    pub pattern: String,
    /// Command template; `$path` is replaced by the quoted absolute path
    pub command: String,
}

impl RunRule {
    pub fn new(pattern: &str, command: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            command: command.to_string(),
        }
    }
}

/// Ordered run rules; the first match wins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunOptions {
    pub rules: Vec<RunRule>,
}

impl Default for RunOptions {
    fn default() -> Self {
        let python = if cfg!(windows) { "python $path" } else { "python3 $path" };
        Self {
            rules: vec![
                RunRule::new("*.py", python),
                RunRule::new("*.js", "node $path"),
                RunRule::new("*.rb", "ruby $path"),
                RunRule::new("*.sh", "sh $path"),
            ],
        }
    }
}

impl RunOptions {
    pub fn new(rules: Vec<RunRule>) -> Self {
        Self { rules }
    }

    /// Command line that runs `path`, if any rule matches its file name
    pub fn command_for(&self, path: &Path) -> Option<String> {
        let file_name = path.file_name()?.to_string_lossy();

        for rule in &self.rules {
            let matcher = match Glob::new(&rule.pattern) {
                Ok(glob) => glob.compile_matcher(),
                Err(e) => {
                    warn!("Skipping run pattern {:?}: {}", rule.pattern, e);
                    continue;
                }
            };
            if matcher.is_match(file_name.as_ref()) {
                let quoted = format!("\"{}\"", paths::absolute_path(path).display());
                return Some(rule.command.replace(PATH_PLACEHOLDER, &quoted));
            }
        }
        None
    }
}

/// Color definition (RGB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert to crossterm Color
    pub fn to_crossterm(&self) -> crossterm::style::Color {
        crossterm::style::Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

/// Console colors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// Committed scrollback
    pub output: Color,
    /// Pending input line
    pub input: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            output: Color::new(200, 200, 200),
            input: Color::new(255, 255, 255),
            selection_bg: Color::new(255, 255, 255),
            selection_fg: Color::new(0, 0, 0),
            status_bar_bg: Color::new(0, 100, 0),
            status_bar_fg: Color::new(255, 255, 255),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("shell = \"/bin/zsh\"\nstop_timeout_ms = 250\n").unwrap();

        assert_eq!(config.shell.as_deref(), Some("/bin/zsh"));
        assert_eq!(config.shell_args, None);
        assert_eq!(config.timeouts().stop, Duration::from_millis(250));
        assert_eq!(config.timeouts().write, Duration::from_millis(100));
        assert_eq!(config.run, RunOptions::default());
    }

    #[test]
    fn test_run_rules_from_toml() {
        let text = r#"
            [[run]]
            pattern = "*.py"
            command = "uv run $path"

            [[run]]
            pattern = "Makefile"
            command = "make"
        "#;
        let config: Config = toml::from_str(text).unwrap();

        assert_eq!(
            config.run.rules,
            vec![RunRule::new("*.py", "uv run $path"), RunRule::new("Makefile", "make")]
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.shell = Some("bash".to_string());
        config.palette.input = Color::new(1, 2, 3);

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded.shell.as_deref(), Some("bash"));
        assert_eq!(loaded.palette.input, Color::new(1, 2, 3));
        assert_eq!(loaded.run, config.run);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "stop_timeout_ms = \"soon\"").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_command_for_quotes_absolute_path() {
        let options = RunOptions::new(vec![RunRule::new("*.py", "python3 $path")]);
        let path = Path::new("/work/my script.py");

        assert_eq!(
            options.command_for(path).as_deref(),
            Some("python3 \"/work/my script.py\"")
        );
    }

    #[test]
    fn test_command_for_first_match_wins() {
        let options = RunOptions::new(vec![
            RunRule::new("test_*.py", "pytest $path"),
            RunRule::new("*.py", "python3 $path"),
        ]);

        let command = options.command_for(Path::new("/w/test_io.py")).unwrap();
        assert!(command.starts_with("pytest "));

        let command = options.command_for(Path::new("/w/io.py")).unwrap();
        assert!(command.starts_with("python3 "));

        assert_eq!(options.command_for(Path::new("/w/notes.txt")), None);
    }

    #[test]
    fn test_command_for_relative_path() {
        let options = RunOptions::default();
        let command = options.command_for(Path::new("run.sh")).unwrap();
        let expected = paths::absolute_path(Path::new("run.sh"));

        assert_eq!(command, format!("sh \"{}\"", expected.display()));
    }

    #[test]
    fn test_bad_pattern_is_skipped() {
        let options = RunOptions::new(vec![
            RunRule::new("[", "broken"),
            RunRule::new("*.rb", "ruby $path"),
        ]);

        assert!(options.command_for(Path::new("/w/a.rb")).is_some());
    }
}
