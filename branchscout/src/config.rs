use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::{ScanError, ScanResult};
use crate::search::repository::derive_local_name;

/// Settings for one scan run, loaded once and never mutated afterwards.
///
/// # Configuration Format
///
/// The settings live under a top-level `repository` key. Example:
/// ```yaml
/// repository:
///   # Repositories to scan (the last path segment names the clone directory)
///   names:
///     - https://github.com/org/service.git
///     - https://github.com/org/tooling.git
///
///   # Search terms (regular expressions unless literalTerms is set)
///   searchTerms:
///     - TODO
///     - "password\\s*="
///
///   searchCaseSensitive: false
///   matchWord: false
///
///   # Where working copies are cloned, and whether to delete them afterwards
///   cloneDir: ./repos
///   cleanUpDir: true
///
///   outputFile: results.csv
///
///   # Repositories processed at once (default: CPU cores)
///   concurrentSearches: 4
///
///   # Time budget for one repository
///   repositoryTimeout: 15m
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    /// Remote repository URLs
    #[serde(rename = "names", default)]
    pub repositories: Vec<String>,

    /// Terms to search for on every branch
    #[serde(default)]
    pub search_terms: Vec<String>,

    /// Match case exactly; off by default
    #[serde(default)]
    pub search_case_sensitive: bool,

    /// Only match terms at word boundaries
    #[serde(default)]
    pub match_word: bool,

    /// Root directory that holds one working copy per repository
    #[serde(default = "default_clone_dir")]
    pub clone_dir: PathBuf,

    /// Remove each working copy before cloning and after processing
    #[serde(default)]
    pub clean_up_dir: bool,

    /// Path of the CSV report
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,

    /// Maximum number of repositories processed at the same time
    #[serde(default = "default_concurrent_searches")]
    pub concurrent_searches: NonZeroUsize,

    /// Time budget for one repository, end to end
    #[serde(
        default = "default_repository_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub repository_timeout: Duration,

    /// Remote whose tracking branches are searched
    #[serde(default = "default_remote_name")]
    pub remote_name: String,

    /// Fetch from the remote before each checkout (best effort)
    #[serde(default = "default_true")]
    pub fetch_before_checkout: bool,

    /// Treat search terms as literal text instead of regular expressions
    #[serde(default)]
    pub literal_terms: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Deserialize)]
struct ConfigDocument {
    repository: ScanConfig,
}

fn default_clone_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_file() -> PathBuf {
    PathBuf::from("results.csv")
}

fn default_concurrent_searches() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_repository_timeout() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_remote_name() -> String {
    "origin".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    humantime::parse_duration(&text).map_err(serde::de::Error::custom)
}

impl ScanConfig {
    /// Creates a configuration with defaults for everything but the inputs
    pub fn new(repositories: Vec<String>, search_terms: Vec<String>) -> Self {
        Self {
            repositories,
            search_terms,
            search_case_sensitive: false,
            match_word: false,
            clone_dir: default_clone_dir(),
            clean_up_dir: false,
            output_file: default_output_file(),
            concurrent_searches: default_concurrent_searches(),
            repository_timeout: default_repository_timeout(),
            remote_name: default_remote_name(),
            fetch_before_checkout: true,
            literal_terms: false,
            log_level: default_log_level(),
        }
    }

    /// Loads and validates the configuration document at `path`
    pub fn load_from(path: &Path) -> ScanResult<Self> {
        debug!("Reading config file: {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| {
            ScanError::config_error(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Parses and validates a configuration document
    pub fn from_yaml(content: &str) -> ScanResult<Self> {
        let document: ConfigDocument = serde_yaml::from_str(content)
            .map_err(|e| ScanError::config_error(format!("Failed to parse config: {}", e)))?;
        let mut config = document.repository;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the scan relies on and drops repeated URLs.
    ///
    /// Two different URLs that derive the same local name would share one
    /// working-copy directory, so that is rejected.
    pub fn validate(&mut self) -> ScanResult<()> {
        if self.repositories.is_empty() {
            return Err(ScanError::config_error("No repositories configured"));
        }
        if self.search_terms.is_empty() {
            return Err(ScanError::config_error("No search terms configured"));
        }
        if self.search_terms.iter().any(|t| t.is_empty()) {
            return Err(ScanError::config_error("Search terms must not be empty"));
        }
        if self.repository_timeout.is_zero() {
            return Err(ScanError::config_error("repositoryTimeout must be non-zero"));
        }
        if self.remote_name.trim().is_empty() {
            return Err(ScanError::config_error("remoteName must not be empty"));
        }

        let mut unique = Vec::with_capacity(self.repositories.len());
        let mut owners: HashMap<String, String> = HashMap::new();
        for url in self.repositories.drain(..) {
            let url = url.trim().to_string();
            if url.is_empty() {
                return Err(ScanError::config_error("Repository URLs must not be empty"));
            }
            let name = derive_local_name(&url)?;
            match owners.get(&name) {
                Some(existing) if *existing == url => {
                    warn!("Repository listed more than once, scanning it once: {}", url);
                }
                Some(existing) => {
                    return Err(ScanError::config_error(format!(
                        "Repositories {} and {} would both clone into '{}'",
                        existing, url, name
                    )));
                }
                None => {
                    owners.insert(name, url.clone());
                    unique.push(url);
                }
            }
        }
        self.repositories = unique;
        Ok(())
    }
}
