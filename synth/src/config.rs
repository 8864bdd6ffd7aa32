//! Session configuration loaded from `loom.toml`.
//!
//! ```toml
//! [session]
//! parallel = true
//! threads = 4
//!
//! [output]
//! generated-dir = "generated"
//! generated-suffix = ".g.lm"
//! ```
//!
//! Every key is optional; missing tables and keys fall back to defaults.

use serde::Deserialize;
use std::fmt;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "loom.toml";

/// Settings that shape one synthesis session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Run the per-unit passes on the rayon pool
    pub parallel: bool,
    /// Size of a dedicated thread pool; the global pool when `None`
    pub threads: Option<usize>,
    pub output: OutputConfig,
}

/// `[output]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// Directory prefix of generated artifact paths
    pub generated_dir: String,
    /// File suffix of generated artifact paths
    pub generated_suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            generated_dir: "generated".to_string(),
            generated_suffix: ".g.lm".to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            output: OutputConfig::default(),
        }
    }
}

/// `[session]` section
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SessionSection {
    parallel: Option<bool>,
    threads: Option<usize>,
}

/// The raw TOML structure
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    session: SessionSection,
    #[serde(default)]
    output: OutputConfig,
}

/// Failure to read or parse `loom.toml`
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read {}: {}", CONFIG_FILE_NAME, e),
            ConfigError::Parse(e) => write!(f, "failed to parse {}: {}", CONFIG_FILE_NAME, e),
            ConfigError::Invalid(e) => write!(f, "invalid {}: {}", CONFIG_FILE_NAME, e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl SessionConfig {
    /// Parse the contents of a `loom.toml` file
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        if raw.session.threads == Some(0) {
            return Err(ConfigError::Invalid(
                "session.threads must be at least 1".to_string(),
            ));
        }
        if raw.output.generated_suffix.is_empty() {
            return Err(ConfigError::Invalid(
                "output.generated-suffix must not be empty".to_string(),
            ));
        }

        let defaults = SessionConfig::default();
        Ok(Self {
            parallel: raw.session.parallel.unwrap_or(defaults.parallel),
            threads: raw.session.threads,
            output: raw.output,
        })
    }

    /// Load `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load `loom.toml` from `dir`, or the defaults when the file is absent
    pub fn load_or_default(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            log::debug!("loading session config from {}", path.display());
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Generated artifact path for `qualified_name` synthesized by `annotation`
    pub fn artifact_path(&self, qualified_name: &str, annotation: &str) -> String {
        let dir = self.output.generated_dir.trim_end_matches('/');
        if dir.is_empty() {
            format!("{}.{}{}", qualified_name, annotation, self.output.generated_suffix)
        } else {
            format!(
                "{}/{}.{}{}",
                dir, qualified_name, annotation, self.output.generated_suffix
            )
        }
    }
}
