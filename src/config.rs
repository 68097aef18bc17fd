use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::decay::DecayConfig;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EngramConfig {
    pub storage: StorageConfig,
    pub classifier: ClassifierConfig,
    pub decay: MaintenanceConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Project-scope database. Relative paths resolve against the project
    /// root at open time.
    pub project_db_path: String,
    pub user_db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Scope confidence below this routes content to the user store.
    pub scope_threshold: f64,
    /// Similarity floor for automatic waypoint creation on store.
    pub link_threshold: f64,
    /// How many nearest neighbors to consider for auto-linking.
    pub auto_link_k: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MaintenanceConfig {
    #[serde(flatten)]
    pub salience: DecayConfig,
    /// Daily confidence decay rate for open facts.
    pub fact_decay_rate: f64,
    /// Waypoint edges below this weight are dropped during maintenance.
    pub prune_min_weight: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_limit: usize,
    /// Score multiplier for project-store hits in blended recall.
    pub project_boost: f64,
    /// Cross-store embedding similarity above which hits are duplicates.
    pub dedup_threshold: f64,
    /// Cap on memories pulled in through waypoint expansion per query.
    pub expansion_limit: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let user_db_path = default_engram_dir()
            .join("user.db")
            .to_string_lossy()
            .into_owned();
        Self {
            project_db_path: ".engram/project.db".into(),
            user_db_path,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            scope_threshold: 0.65,
            link_threshold: 0.75,
            auto_link_k: 5,
        }
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            salience: DecayConfig::default(),
            fact_decay_rate: 0.01,
            prune_min_weight: 0.05,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            project_boost: 1.2,
            dedup_threshold: 0.9,
            expansion_limit: 5,
        }
    }
}

/// Returns `~/.engram/`
pub fn default_engram_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".engram")
}

/// Returns the default config file path: `~/.engram/config.toml`
pub fn default_config_path() -> PathBuf {
    default_engram_dir().join("config.toml")
}

impl EngramConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            EngramConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (ENGRAM_PROJECT_DB,
    /// ENGRAM_USER_DB, ENGRAM_SCOPE_THRESHOLD).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ENGRAM_PROJECT_DB") {
            self.storage.project_db_path = val;
        }
        if let Ok(val) = std::env::var("ENGRAM_USER_DB") {
            self.storage.user_db_path = val;
        }
        if let Ok(val) = std::env::var("ENGRAM_SCOPE_THRESHOLD") {
            if let Ok(parsed) = val.parse::<f64>() {
                self.classifier.scope_threshold = parsed;
            }
        }
    }

    /// Resolve the user database path, expanding `~` if needed.
    pub fn resolved_user_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.user_db_path)
    }

    /// Resolve the project database path against a project root.
    pub fn resolved_project_db_path(&self, project_root: &Path) -> PathBuf {
        let raw = expand_tilde(&self.storage.project_db_path);
        if raw.is_absolute() {
            raw
        } else {
            project_root.join(raw)
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
