//! Configuration for dreadnot.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (DREADNOT_DATA_ROOT)
//! 2. Config file (--config, DREADNOT_CONFIG, or ./dreadnot.yaml)
//! 3. Defaults (data root at ~/.dreadnot)
//!
//! A relative `data_root` in the config file is resolved against the
//! config file's parent directory.
//!
//! Only `data_root` and `stacks` are consumed by the orchestrator itself;
//! the remaining fields are carried for the transport layer.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Environment variable overriding `data_root`
pub const DATA_ROOT_ENV: &str = "DREADNOT_DATA_ROOT";

/// Config file used when none is given
pub const DEFAULT_CONFIG_FILE: &str = "dreadnot.yaml";

/// Name of the warning file inside the data root
pub const WARNING_FILE: &str = "warning.txt";

/// Top-level configuration (matches YAML structure)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Instance name shown to operators
    #[serde(default = "default_name")]
    pub name: String,

    /// Environment name (e.g. "production")
    #[serde(default = "default_env")]
    pub env: String,

    /// Whether the transport layer should redirect to HTTPS
    #[serde(default)]
    pub secure: bool,

    /// Directory holding durable state (warning file, sessions, logs)
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,

    /// Configured stacks, keyed by name, in file order
    #[serde(default)]
    pub stacks: IndexMap<String, StackConfig>,

    /// Whether users must log in
    #[serde(default = "default_login_required")]
    pub login_required: bool,

    /// Whether unauthenticated users may read
    #[serde(default)]
    pub unauthorized_read: bool,
}

/// Per-stack configuration slice.
///
/// Keys other than the ones below are kept in `extra` and handed to the
/// stack untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackConfig {
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,

    /// Regions this stack deploys to
    #[serde(default)]
    pub regions: Vec<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn default_name() -> String {
    "dreadnot".to_string()
}

fn default_env() -> String {
    "default".to_string()
}

fn default_login_required() -> bool {
    true
}

fn default_data_root() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".dreadnot"))
        .unwrap_or_else(|| PathBuf::from(".dreadnot"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            env: default_env(),
            secure: false,
            data_root: default_data_root(),
            stacks: IndexMap::new(),
            login_required: default_login_required(),
            unauthorized_read: false,
        }
    }
}

impl Config {
    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse configuration")
    }

    /// Load configuration from a file, resolving paths and env overrides
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        let base_dir = path.parent().unwrap_or(Path::new("."));
        let env_root = std::env::var(DATA_ROOT_ENV).ok();
        config.data_root = resolve_data_root(base_dir, &config.data_root, env_root.as_deref());

        Ok(config)
    }

    /// Configured stack names in config file order, as used for startup
    /// and aggregation
    pub fn stack_names(&self) -> Vec<String> {
        self.stacks.keys().cloned().collect()
    }

    /// Path of the persisted warning (`<data_root>/warning.txt`)
    pub fn warning_path(&self) -> PathBuf {
        self.data_root.join(WARNING_FILE)
    }

    /// Session store directory, owned by the transport layer
    pub fn sessions_dir(&self) -> PathBuf {
        self.data_root.join("sessions")
    }

    /// Log directory for one stack
    pub fn stack_log_dir(&self, stack: &str) -> PathBuf {
        self.data_root.join("logs").join(stack)
    }
}

/// Resolve the data root: env override first, then relative to the config file
fn resolve_data_root(base: &Path, configured: &Path, env_override: Option<&str>) -> PathBuf {
    if let Some(root) = env_override.filter(|r| !r.is_empty()) {
        return PathBuf::from(root);
    }

    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        base.join(configured)
    }
}
