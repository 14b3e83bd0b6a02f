//! Application configuration for lessonforge.
//!
//! User config lives at `~/.lessonforge/lessonforge.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LessonForgeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "lessonforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".lessonforge";

// ---------------------------------------------------------------------------
// Config structs (matching lessonforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Navigation retry policy.
    #[serde(default)]
    pub retry: RetryConfig,

    /// CSS selectors used against fetched pages.
    #[serde(default)]
    pub selectors: SelectorsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Concurrent lesson tasks.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Progress ledger file path.
    #[serde(default = "default_ledger_path")]
    pub ledger_path: String,

    /// Extension for directly downloaded assets.
    #[serde(default = "default_asset_ext")]
    pub asset_ext: String,

    /// Extension for synthesized documents.
    #[serde(default = "default_doc_ext")]
    pub doc_ext: String,

    /// Per-navigation timeout in seconds.
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            ledger_path: default_ledger_path(),
            asset_ext: default_asset_ext(),
            doc_ext: default_doc_ext(),
            navigation_timeout_secs: default_navigation_timeout(),
        }
    }
}

fn default_concurrency() -> u32 {
    5
}
fn default_ledger_path() -> String {
    "processed_links.txt".into()
}
fn default_asset_ext() -> String {
    "pdf".into()
}
fn default_doc_ext() -> String {
    "doc.json".into()
}
fn default_navigation_timeout() -> u64 {
    30
}

/// `[retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Navigation attempts before a lesson is abandoned for this run.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Lower bound of the randomized backoff between attempts.
    #[serde(default = "default_backoff_min")]
    pub backoff_min_ms: u64,

    /// Upper bound of the randomized backoff between attempts.
    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_min_ms: default_backoff_min(),
            backoff_max_ms: default_backoff_max(),
        }
    }
}

impl RetryConfig {
    /// Backoff bounds as a `(min, max)` millisecond pair.
    pub fn backoff_ms_range(&self) -> (u64, u64) {
        (self.backoff_min_ms, self.backoff_max_ms)
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_min() -> u64 {
    2000
}
fn default_backoff_max() -> u64 {
    4000
}

/// `[selectors]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorsConfig {
    /// Anchors on a subject index page that point at lessons.
    #[serde(default = "default_lesson_links")]
    pub lesson_links: String,

    /// Direct-download link on a lesson page, when present.
    #[serde(default = "default_download_link")]
    pub download_link: String,

    /// Main content region of a lesson page; falls back to the whole page.
    #[serde(default = "default_content_region")]
    pub content_region: String,
}

impl Default for SelectorsConfig {
    fn default() -> Self {
        Self {
            lesson_links: default_lesson_links(),
            download_link: default_download_link(),
            content_region: default_content_region(),
        }
    }
}

fn default_lesson_links() -> String {
    "a.leaf2".into()
}
fn default_download_link() -> String {
    "a#btn-download-md".into()
}
fn default_content_region() -> String {
    "div#content-post".into()
}

// ---------------------------------------------------------------------------
// Crawl config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Bounded worker pool size.
    pub concurrency: u32,
    /// Progress ledger file path.
    pub ledger_path: PathBuf,
    /// Extension for directly downloaded assets.
    pub asset_ext: String,
    /// Extension for synthesized documents.
    pub doc_ext: String,
    /// Per-navigation timeout in seconds.
    pub navigation_timeout_secs: u64,
    /// Navigation attempts before abandoning a lesson for this run.
    pub max_attempts: u32,
    /// Randomized backoff range between attempts, in milliseconds.
    pub backoff_ms: (u64, u64),
    /// Lesson-link anchor selector for subject discovery.
    pub lesson_link_selector: String,
    /// Direct-download link selector.
    pub download_link_selector: String,
    /// Main content region selector.
    pub content_region_selector: String,
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: config.defaults.concurrency,
            ledger_path: PathBuf::from(&config.defaults.ledger_path),
            asset_ext: config.defaults.asset_ext.clone(),
            doc_ext: config.defaults.doc_ext.clone(),
            navigation_timeout_secs: config.defaults.navigation_timeout_secs,
            max_attempts: config.retry.max_attempts,
            backoff_ms: (config.retry.backoff_min_ms, config.retry.backoff_max_ms),
            lesson_link_selector: config.selectors.lesson_links.clone(),
            download_link_selector: config.selectors.download_link.clone(),
            content_region_selector: config.selectors.content_region.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.lessonforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LessonForgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.lessonforge/lessonforge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LessonForgeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        LessonForgeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LessonForgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LessonForgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LessonForgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
