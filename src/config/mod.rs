use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::plugins::ControlNode;
use crate::settings::Settings;

/// Environment variable holding extra plugin directories, in `PATH` syntax
pub const PLUGIN_PATH_ENV: &str = "HEARTH_PLUGIN_PATH";

/// Main configuration structure, including the saved panel layout
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub panel: Settings,
    #[serde(default)]
    pub plugins: PluginsConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub icons: IconsConfig,
    /// One record per control, in panel order
    #[serde(default)]
    pub controls: Vec<ControlNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginsConfig {
    /// Directories scanned for plugin libraries; earlier ones win on name clashes
    #[serde(default = "default_plugin_dirs")]
    pub dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// Terminal emulator used for commands that run in a terminal
    #[serde(default = "detect_terminal")]
    pub terminal: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IconsConfig {
    #[serde(default = "default_icon_dirs")]
    pub search_dirs: Vec<PathBuf>,
}

fn hearth_home() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".hearth"))
}

fn default_plugin_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = hearth_home().map(|h| h.join("plugins")).into_iter().collect();
    dirs.push(PathBuf::from("/usr/local/lib/hearth/plugins"));
    dirs.push(PathBuf::from("/usr/lib/hearth/plugins"));
    dirs
}

fn default_icon_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = hearth_home().map(|h| h.join("icons")).into_iter().collect();
    dirs.push(PathBuf::from("/usr/share/hearth/icons"));
    dirs
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            dirs: default_plugin_dirs(),
        }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            terminal: detect_terminal(),
        }
    }
}

impl Default for IconsConfig {
    fn default() -> Self {
        Self {
            search_dirs: default_icon_dirs(),
        }
    }
}

impl Config {
    /// Load configuration from default location
    pub fn load_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;

        let config: Config =
            serde_yaml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_yaml::to_string(self).context("Failed to serialize config")?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        fs::write(path.as_ref(), contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get default configuration path
    pub fn default_config_path() -> Result<PathBuf> {
        let home = hearth_home().context("Failed to get home directory")?;

        Ok(home.join("config.yaml"))
    }

    /// Plugin directories in scan order: `extra` first, then the environment, then the config file
    #[must_use]
    pub fn plugin_search_path(&self, extra: &[PathBuf]) -> Vec<PathBuf> {
        let from_env: Vec<PathBuf> = std::env::var_os(PLUGIN_PATH_ENV)
            .map(|value| std::env::split_paths(&value).collect())
            .unwrap_or_default();

        let mut dirs: Vec<PathBuf> = Vec::new();
        for dir in extra.iter().chain(&from_env).chain(&self.plugins.dirs) {
            if !dir.as_os_str().is_empty() && !dirs.contains(dir) {
                dirs.push(dir.clone());
            }
        }
        dirs
    }
}

/// Pick a terminal emulator for in-terminal commands
fn detect_terminal() -> String {
    if let Ok(terminal) = std::env::var("TERMINAL") {
        if !terminal.is_empty() {
            return terminal;
        }
    }

    ["x-terminal-emulator", "xfce4-terminal", "xterm"]
        .iter()
        .find(|candidate| which::which(candidate).is_ok())
        .map_or_else(|| "xterm".to_string(), ToString::to_string)
}
