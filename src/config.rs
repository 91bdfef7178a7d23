use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{vlog_debug, Error, Result};

/// Pause between cycles when nothing else is configured.
pub const DEFAULT_PACING_DELAY_MS: u64 = 1000;

/// How per-cycle outcomes are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// Discard outcomes entirely.
    None,
    /// Log failed tasks to the vigil log.
    #[default]
    Log,
    /// Log failures and print every cycle report as a JSON line on stdout.
    Json,
}

/// An external monitor program run once per cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSpec {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub cwd: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,
    /// Unset means tasks may take as long as they like.
    pub task_timeout_ms: Option<u64>,
    #[serde(default)]
    pub report: ReportMode,
    #[serde(default)]
    pub monitors: Vec<MonitorSpec>,
}

fn default_pacing_delay_ms() -> u64 {
    DEFAULT_PACING_DELAY_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pacing_delay_ms: DEFAULT_PACING_DELAY_MS,
            task_timeout_ms: None,
            report: ReportMode::default(),
            monitors: Vec::new(),
        }
    }
}

impl Config {
    pub fn vigil_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".vigil"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::vigil_dir()?.join("vigil.toml"))
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_ms.map(Duration::from_millis)
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        vlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            vlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        vlog_debug!(
            "Config loaded: pacing_delay_ms={}, task_timeout_ms={:?}, monitors={}",
            config.pacing_delay_ms,
            config.task_timeout_ms,
            config.monitors.len()
        );
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        vlog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.pacing_delay_ms == 0 {
            return Err(Error::Validation(
                "pacing_delay_ms must be greater than zero".to_string(),
            ));
        }
        if self.task_timeout_ms == Some(0) {
            return Err(Error::Validation(
                "task_timeout_ms must be greater than zero".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for monitor in &self.monitors {
            if monitor.name.trim().is_empty() {
                return Err(Error::Validation("monitor name cannot be empty".to_string()));
            }
            if monitor.program.trim().is_empty() {
                return Err(Error::Validation(format!(
                    "monitor {} has no program",
                    monitor.name
                )));
            }
            if !seen.insert(monitor.name.as_str()) {
                return Err(Error::DuplicateTask(monitor.name.clone()));
            }
        }
        Ok(())
    }
}

pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
