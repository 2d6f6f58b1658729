//! Configuration loading for Thicket.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.thicket/config.toml`)
//! 3. User config (`~/.thicket/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. Contract constants such as the content
//! ceiling and the result limit ceiling are deliberately not configurable.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ThicketError};

/// Main configuration struct for Thicket.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Index storage configuration.
    pub index: IndexConfig,
    /// Query configuration.
    pub search: SearchConfig,
}

/// When mutations are written back to durable storage.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PersistMode {
    /// Persist after every upsert or delete.
    #[default]
    Immediate,
    /// Mark the index dirty; persist on `flush()` or when the engine drops.
    Deferred,
}

impl PersistMode {
    /// Parse a mode name as used in config files and env vars.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "immediate" => Some(Self::Immediate),
            "deferred" => Some(Self::Deferred),
            _ => None,
        }
    }
}

/// Index storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    /// Index blob file. Defaults to `<thicket_home>/index.json`.
    pub path: Option<PathBuf>,
    /// Heap budget for the index writer, in bytes.
    pub writer_heap_bytes: usize,
    /// When to persist mutations.
    pub persist: PersistMode,
    /// Reject a persist if the stored index changed since it was loaded.
    pub check_generation: bool,
}

/// Default writer heap (15MB), the smallest budget tantivy accepts for one thread.
pub const DEFAULT_WRITER_HEAP_BYTES: usize = 15_000_000;

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: None,
            writer_heap_bytes: DEFAULT_WRITER_HEAP_BYTES,
            persist: PersistMode::Immediate,
            check_generation: false,
        }
    }
}

/// Query configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Result count when the caller gives none (still clamped to the ceiling).
    pub default_limit: usize,
    /// Edit distance for the index's fuzzy pass (0 disables it).
    pub fuzzy_distance: u8,
    /// Relevance boost for title matches.
    pub title_boost: f32,
    /// Relevance boost for summary matches.
    pub summary_boost: f32,
    /// Relevance boost for content matches.
    pub content_boost: f32,
}

/// Largest edit distance the index supports for fuzzy queries.
pub const MAX_FUZZY_DISTANCE: u8 = 2;

impl SearchConfig {
    /// Check if a fuzzy distance is supported.
    pub fn is_valid_fuzzy_distance(value: u8) -> bool {
        value <= MAX_FUZZY_DISTANCE
    }

    /// Check if a default limit is usable (must be at least 1).
    pub fn is_valid_default_limit(value: usize) -> bool {
        value >= 1
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            fuzzy_distance: 2,
            title_boost: 2.0,
            summary_boost: 1.5,
            content_boost: 1.0,
        }
    }
}

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Project config (`.thicket/config.toml` in cwd)
    /// 3. User config (`~/.thicket/config.toml`)
    /// 4. Defaults
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load user config from `<thicket_home>/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = thicket_home()?;
        Self::load_existing(&home.join("config.toml"))
    }

    /// Load project config from `.thicket/config.toml` in the given directory.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        Self::load_existing(&cwd.join(".thicket").join("config.toml"))
    }

    /// Load a config file if present; a present but broken file is reported
    /// and skipped.
    fn load_existing(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                None
            }
        }
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| ThicketError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| ThicketError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // THICKET_INDEX_PATH
        if let Ok(val) = env::var("THICKET_INDEX_PATH") {
            if val.is_empty() {
                tracing::warn!("THICKET_INDEX_PATH is empty, ignoring");
            } else {
                self.index.path = Some(PathBuf::from(val));
            }
        }

        // THICKET_PERSIST_MODE
        if let Ok(val) = env::var("THICKET_PERSIST_MODE") {
            match PersistMode::parse(&val) {
                Some(mode) => self.index.persist = mode,
                None => tracing::warn!(
                    value = %val,
                    "invalid THICKET_PERSIST_MODE, expected 'immediate' or 'deferred'; keeping {:?}",
                    self.index.persist
                ),
            }
        }

        // THICKET_CHECK_GENERATION
        if let Ok(val) = env::var("THICKET_CHECK_GENERATION") {
            self.index.check_generation = val == "true" || val == "1";
        }

        // THICKET_DEFAULT_LIMIT
        if let Ok(val) = env::var("THICKET_DEFAULT_LIMIT") {
            match val.parse::<usize>() {
                Ok(n) if SearchConfig::is_valid_default_limit(n) => self.search.default_limit = n,
                _ => tracing::warn!(
                    value = %val,
                    "invalid THICKET_DEFAULT_LIMIT, expected a positive integer; keeping {}",
                    self.search.default_limit
                ),
            }
        }

        // THICKET_FUZZY_DISTANCE
        if let Ok(val) = env::var("THICKET_FUZZY_DISTANCE") {
            match val.parse::<u8>() {
                Ok(n) if SearchConfig::is_valid_fuzzy_distance(n) => {
                    self.search.fuzzy_distance = n
                }
                _ => tracing::warn!(
                    value = %val,
                    "invalid THICKET_FUZZY_DISTANCE, expected 0..={}; keeping {}",
                    MAX_FUZZY_DISTANCE,
                    self.search.fuzzy_distance
                ),
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// The `other` config takes precedence field by field: every value in
    /// `other` that differs from the default replaces the value in `self`.
    ///
    /// # Limitation
    ///
    /// A higher layer cannot explicitly reset a field back to its default
    /// once a lower layer changed it, because "unset" and "set to default"
    /// look the same after deserialization.
    fn merge(mut self, other: Config) -> Self {
        let default_index = IndexConfig::default();
        if other.index.path.is_some() {
            self.index.path = other.index.path;
        }
        if other.index.writer_heap_bytes != default_index.writer_heap_bytes {
            self.index.writer_heap_bytes = other.index.writer_heap_bytes;
        }
        if other.index.persist != default_index.persist {
            self.index.persist = other.index.persist;
        }
        if other.index.check_generation != default_index.check_generation {
            self.index.check_generation = other.index.check_generation;
        }

        let default_search = SearchConfig::default();
        if other.search.default_limit != default_search.default_limit {
            self.search.default_limit = other.search.default_limit;
        }
        if other.search.fuzzy_distance != default_search.fuzzy_distance {
            self.search.fuzzy_distance = other.search.fuzzy_distance;
        }
        if other.search.title_boost != default_search.title_boost {
            self.search.title_boost = other.search.title_boost;
        }
        if other.search.summary_boost != default_search.summary_boost {
            self.search.summary_boost = other.search.summary_boost;
        }
        if other.search.content_boost != default_search.content_boost {
            self.search.content_boost = other.search.content_boost;
        }

        self
    }

    /// Resolved index blob path: configured path, else `<thicket_home>/index.json`.
    pub fn index_path(&self) -> Option<PathBuf> {
        match &self.index.path {
            Some(path) => Some(path.clone()),
            None => thicket_home().map(|h| h.join("index.json")),
        }
    }
}

/// Get the Thicket home directory.
///
/// Returns `$THICKET_HOME` if set and non-empty, else `~/.thicket`, else a
/// per-user directory under the system temp dir.
pub fn thicket_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("THICKET_HOME") {
        if home.is_empty() {
            tracing::warn!("THICKET_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("THICKET_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".thicket"));
    }

    let fallback_path = env::temp_dir().join("thicket");
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}
