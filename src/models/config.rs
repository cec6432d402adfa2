//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Upstream page and access paths
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Markers used to read the page
    #[serde(default)]
    pub parser: ParserConfig,

    /// Refresh cadence
    #[serde(default)]
    pub watch: WatchConfig,

    /// Snapshot location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Change notification delivery
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Query surface
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let url = self.fetcher.url.trim();
        if url.is_empty() {
            return Err(AppError::validation("fetcher.url is empty"));
        }
        url::Url::parse(url)?;
        if self.fetcher.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetcher.user_agent is empty"));
        }
        if self.fetcher.timeout_secs == 0 {
            return Err(AppError::validation("fetcher.timeout_secs must be > 0"));
        }
        for alt in &self.fetcher.alternatives {
            if !alt.template.contains(URL_PLACEHOLDER) {
                return Err(AppError::validation(format!(
                    "fetcher.alternatives '{}' template lacks {}",
                    alt.name, URL_PLACEHOLDER
                )));
            }
        }
        if self.watch.interval_secs == 0 {
            return Err(AppError::validation("watch.interval_secs must be > 0"));
        }
        if self.fetcher.worst_case_secs() >= self.watch.interval_secs {
            return Err(AppError::validation(format!(
                "fetcher.timeout_secs across {} access paths ({}s) must be shorter than watch.interval_secs",
                self.fetcher.access_paths(),
                self.fetcher.worst_case_secs()
            )));
        }
        if self.parser.status_prefix.is_empty() {
            return Err(AppError::validation("parser.status_prefix is empty"));
        }
        if self.notifier.backend == NotifierBackend::Command && self.notifier.command.is_empty() {
            return Err(AppError::validation(
                "notifier.command is required for the command backend",
            ));
        }
        Ok(())
    }
}

/// Placeholder replaced with the encoded upstream URL in alternative templates.
pub const URL_PLACEHOLDER: &str = "{url}";

/// Upstream access settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Schedule page URL
    #[serde(default = "defaults::url")]
    pub url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Deadline for a single attempt in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Bodies shorter than this many characters are rejected
    #[serde(default = "defaults::min_body_chars")]
    pub min_body_chars: usize,

    /// Whether to try the alternative paths after a direct failure
    #[serde(default = "defaults::try_alternatives")]
    pub try_alternatives: bool,

    /// Relay endpoints tried in order
    #[serde(default = "defaults::alternatives")]
    pub alternatives: Vec<AlternativePath>,
}

impl FetcherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Number of attempts one fetch may make: direct plus alternatives.
    pub fn access_paths(&self) -> u64 {
        let alternatives = if self.try_alternatives {
            self.alternatives.len() as u64
        } else {
            0
        };
        1 + alternatives
    }

    /// Upper bound on one fetch when every access path times out.
    pub fn worst_case_secs(&self) -> u64 {
        self.timeout_secs.saturating_mul(self.access_paths())
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            url: defaults::url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            min_body_chars: defaults::min_body_chars(),
            try_alternatives: defaults::try_alternatives(),
            alternatives: defaults::alternatives(),
        }
    }
}

/// A relay endpoint that proxies the upstream page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlternativePath {
    /// Name used in logs and error reports
    pub name: String,

    /// URL template, `{url}` is replaced with the percent-encoded upstream URL
    pub template: String,
}

impl AlternativePath {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    /// Build the request URL for a given upstream URL.
    pub fn resolve(&self, upstream: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(upstream.as_bytes()).collect();
        self.template.replace(URL_PLACEHOLDER, &encoded)
    }
}

/// Page markers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Class of the element holding the description prose
    #[serde(default = "defaults::description_class")]
    pub description_class: String,

    /// Class of the queue number cell
    #[serde(default = "defaults::queue_class")]
    pub queue_class: String,

    /// Class of the subqueue number cell
    #[serde(default = "defaults::subqueue_class")]
    pub subqueue_class: String,

    /// Prefix of half-hour status class tokens
    #[serde(default = "defaults::status_prefix")]
    pub status_prefix: String,

    /// Keep the fetched document in the parsed schedule
    #[serde(default = "defaults::retain_raw_html")]
    pub retain_raw_html: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            description_class: defaults::description_class(),
            queue_class: defaults::queue_class(),
            subqueue_class: defaults::subqueue_class(),
            status_prefix: defaults::status_prefix(),
            retain_raw_html: defaults::retain_raw_html(),
        }
    }
}

/// Refresh cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,
}

impl WatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval(),
        }
    }
}

/// Snapshot file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the snapshot files
    #[serde(default = "defaults::storage_dir")]
    pub dir: PathBuf,

    /// File holding the serialized schedule
    #[serde(default = "defaults::schedule_key")]
    pub schedule_key: String,

    /// File holding the ISO-8601 timestamp of the last update
    #[serde(default = "defaults::updated_key")]
    pub updated_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: defaults::storage_dir(),
            schedule_key: defaults::schedule_key(),
            updated_key: defaults::updated_key(),
        }
    }
}

/// Notification delivery backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifierBackend {
    #[default]
    Log,
    Command,
}

/// Notification content and delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub backend: NotifierBackend,

    /// Program and leading arguments; title and body are appended
    #[serde(default = "defaults::command")]
    pub command: Vec<String>,

    #[serde(default = "defaults::title")]
    pub title: String,

    #[serde(default = "defaults::body")]
    pub body: String,

    #[serde(default = "defaults::icon")]
    pub icon: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            backend: NotifierBackend::default(),
            command: defaults::command(),
            title: defaults::title(),
            body: defaults::body(),
            icon: defaults::icon(),
        }
    }
}

/// Query surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::bind")]
    pub bind: String,

    /// Run a fresh cycle for every read instead of serving the last result
    #[serde(default = "defaults::refresh_on_request")]
    pub refresh_on_request: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: defaults::bind(),
            refresh_on_request: defaults::refresh_on_request(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use super::AlternativePath;

    // Fetcher defaults
    pub fn url() -> String {
        "https://www.poe.pl.ua/customs/dynamicgpv-info.php".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; PowerScheduleBot/1.0)".into()
    }
    pub fn timeout() -> u64 {
        20
    }
    pub fn min_body_chars() -> usize {
        1000
    }
    pub fn try_alternatives() -> bool {
        true
    }
    pub fn alternatives() -> Vec<AlternativePath> {
        vec![
            AlternativePath::new("allorigins", "https://api.allorigins.win/raw?url={url}"),
            AlternativePath::new("corsproxy", "https://corsproxy.io/?{url}"),
        ]
    }

    // Parser defaults
    pub fn description_class() -> String {
        "gpvinfodetail".into()
    }
    pub fn queue_class() -> String {
        "turnoff-scheduleui-table-queue".into()
    }
    pub fn subqueue_class() -> String {
        "turnoff-scheduleui-table-subqueue".into()
    }
    pub fn status_prefix() -> String {
        "light_".into()
    }
    pub fn retain_raw_html() -> bool {
        true
    }

    pub fn interval() -> u64 {
        600
    }

    // Storage defaults
    pub fn storage_dir() -> PathBuf {
        PathBuf::from("storage")
    }
    pub fn schedule_key() -> String {
        "last_schedule.json".into()
    }
    pub fn updated_key() -> String {
        "last_update".into()
    }

    // Notifier defaults
    pub fn command() -> Vec<String> {
        vec!["notify-send".into()]
    }
    pub fn title() -> String {
        "⚡ Графік відключень змінився!".into()
    }
    pub fn body() -> String {
        "Перевірте новий графік у додатку".into()
    }
    pub fn icon() -> String {
        "/icon-192x192.png".into()
    }

    // Server defaults
    pub fn bind() -> String {
        "127.0.0.1:3000".into()
    }
    pub fn refresh_on_request() -> bool {
        true
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
