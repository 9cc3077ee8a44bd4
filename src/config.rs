use crate::conan::{BuildVariant, DEFAULT_SEQUENCE};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "ccache-check.toml";

/// Top-level configuration loaded from ccache-check.toml.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub ccache: CcacheConfig,
    pub conan: ConanConfig,
    pub runner: RunnerConfig,
    pub report: ReportConfig,
    pub builds: Vec<BuildVariant>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CcacheConfig {
    pub command: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ConanConfig {
    pub command: String,
    /// Appended to every `conan create` invocation.
    pub extra_args: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct RunnerConfig {
    /// Per-command limit; 0 waits forever.
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Statistic labels reported after every step.
    pub counters: Vec<String>,
}

/// CLI flags that take precedence over the file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub ccache: Option<String>,
    pub conan: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Errors that can occur while loading the config file.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    Invalid {
        path: PathBuf,
        reason: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config {}: {}", path.display(), source)
            }
            ConfigError::Invalid { path, reason } => {
                write!(f, "invalid config {}: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid { .. } => None,
        }
    }
}

impl CheckConfig {
    /// Load the config at `path`.
    ///
    /// A missing file falls back to defaults unless the path was given
    /// explicitly (`required`), in which case it is an error.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let config: CheckConfig = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate().map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.builds.is_empty() {
            return Err("at least one [[builds]] entry is required".to_string());
        }
        if self.report.counters.is_empty() {
            return Err("report.counters must name at least one statistic".to_string());
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(ccache) = overrides.ccache {
            self.ccache.command = ccache;
        }
        if let Some(conan) = overrides.conan {
            self.conan.command = conan;
        }
        if let Some(secs) = overrides.timeout_secs {
            self.runner.timeout_secs = secs;
        }
    }
}

impl RunnerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

// --- Default implementations ---

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            ccache: CcacheConfig::default(),
            conan: ConanConfig::default(),
            runner: RunnerConfig::default(),
            report: ReportConfig::default(),
            builds: DEFAULT_SEQUENCE.to_vec(),
        }
    }
}

impl Default for CcacheConfig {
    fn default() -> Self {
        Self {
            command: "ccache".to_string(),
        }
    }
}

impl Default for ConanConfig {
    fn default() -> Self {
        Self {
            command: "conan".to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            counters: vec!["cache hit (direct)".to_string(), "cache miss".to_string()],
        }
    }
}
