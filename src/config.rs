//! Configuration loading and the shared settings snapshot.

use crate::error::{Error, Result};
use crate::rules::InclusionRules;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Number of deletions between two intermediate commits.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Deepest level the traverser descends to (the root is depth 0).
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Where relative resource types are looked up.
pub const DEFAULT_SEARCH_PATHS: &[&str] = &["/apps", "/libs"];

/// Type cleanup configuration, usually read from a TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Resource type prefixes checked for obsolescence
    pub inclusions: Vec<String>,
    /// Prefixes never checked, even when included
    pub exclusions: Vec<String>,
    pub search_paths: Vec<String>,
    pub max_depth: usize,
    pub batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            inclusions: Vec::new(),
            exclusions: Vec::new(),
            search_paths: DEFAULT_SEARCH_PATHS.iter().map(|s| s.to_string()).collect(),
            max_depth: DEFAULT_MAX_DEPTH,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Config::from_toml_str(&content).map_err(|e| match e {
            Error::Config(message) => Error::Config(format!("{}: {}", path.display(), message)),
            other => other,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Inclusion rules with blank entries filtered out.
    pub fn rules(&self) -> InclusionRules {
        InclusionRules::new(self.inclusions.iter().cloned(), self.exclusions.iter().cloned())
    }

    pub fn settings(&self) -> Settings {
        Settings {
            rules: self.rules(),
            search_paths: self.search_paths.clone(),
            max_depth: self.max_depth,
            batch_size: self.batch_size,
        }
    }
}

/// Everything an operation reads from the configuration, taken as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub rules: InclusionRules,
    pub search_paths: Vec<String>,
    pub max_depth: usize,
    pub batch_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Config::default().settings()
    }
}

/// Process-wide holder for the current settings.
///
/// Readers take a snapshot once per operation; [`SettingsHandle::replace`]
/// swaps the whole set so a running operation keeps the rules, search paths
/// and limits it started with.
#[derive(Debug, Clone, Default)]
pub struct SettingsHandle {
    current: Arc<RwLock<Arc<Settings>>>,
}

impl SettingsHandle {
    pub fn new(settings: Settings) -> Self {
        SettingsHandle {
            current: Arc::new(RwLock::new(Arc::new(settings))),
        }
    }

    pub fn snapshot(&self) -> Arc<Settings> {
        // A poisoned lock still holds a complete Arc, never a torn set
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn replace(&self, settings: Settings) {
        info!(
            inclusions = settings.rules.included().len(),
            exclusions = settings.rules.excluded().len(),
            search_paths = ?settings.search_paths,
            max_depth = settings.max_depth,
            batch_size = settings.batch_size,
            "configuring type cleanup"
        );
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(settings);
    }
}
