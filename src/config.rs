//! Configuration types for the publishing daemon.
//!
//! Configuration is read once at startup from a TOML document; a restart is
//! required to pick up changes. The one exception is the session cookie: after
//! a successful browser refresh the new cookie string is written back into the
//! config file through [`write_back_cookie`], preserving the operator's
//! comments and layout.

use crate::error::{PosterError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the publishing daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Target blog identity and session material.
    pub site: SiteConfig,
    /// Category the posts are filed under.
    pub category: CategoryConfig,
    /// Daily posting window.
    pub schedule: ScheduleConfig,
    /// Automatic session refresh settings.
    pub refresh: RefreshConfig,
    /// Review generation API settings.
    pub generator: GeneratorConfig,
    /// Post composition settings.
    pub post: PostConfig,
}

/// Target blog identity and session material.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Blog name, i.e. the `example` in `example.tistory.com`.
    pub blog_name: String,
    /// Numeric blog id from the editor URL (`/manage/newpost/99` → `"99"`).
    pub blog_id: Option<String>,
    /// Session cookie header extracted from a logged-in browser
    /// (e.g. `"TSSESSION=...; _T_ANO=..."`). Rewritten after each refresh.
    pub cookies: String,
}

/// Category the posts are filed under.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Category name looked up on the editor page.
    pub name: String,
    /// Explicit category id; skips the name lookup when set.
    pub id: Option<String>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            name: "PaperReview".to_owned(),
            id: None,
        }
    }
}

/// Daily posting window.
///
/// One post per day at a uniformly random instant inside
/// `[start_hour:00:00, end_hour:end_minute:59]` in the configured zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Whether the daemon schedules at all. When `false` the process runs
    /// exactly one cycle immediately and exits.
    pub enabled: bool,
    /// First hour of the window (0-23).
    pub start_hour: u32,
    /// Last hour of the window (0-23).
    pub end_hour: u32,
    /// Last minute of the last hour (0-59).
    pub end_minute: u32,
    /// IANA time zone name the window is expressed in.
    pub timezone: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_hour: 18,
            end_hour: 23,
            end_minute: 59,
            timezone: "Asia/Seoul".to_owned(),
        }
    }
}

/// Automatic session refresh settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Refresh the session proactively when the stored cookie goes stale.
    /// The reactive path (refresh after an authentication failure) only
    /// needs `identity`/`secret` and ignores this flag.
    pub auto: bool,
    /// Identity-provider account (Kakao email).
    pub identity: String,
    /// Identity-provider password.
    pub secret: String,
    /// Run the browser headless. Interactive runs override this.
    pub headless: bool,
    /// WebDriver endpoint of a running chromedriver.
    pub webdriver_url: String,
    /// Freshness window: a cookie older than this is considered stale.
    pub max_cookie_age_days: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            auto: false,
            identity: String::new(),
            secret: String::new(),
            headless: true,
            webdriver_url: "http://127.0.0.1:9515".to_owned(),
            max_cookie_age_days: 7,
        }
    }
}

/// Review generation API settings (Anthropic Messages API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Base URL of the generation API.
    pub api_url: String,
    /// API key for the generation provider.
    pub api_key: String,
    /// Model identifier to request.
    pub api_model: String,
    /// Maximum tokens to generate per review.
    pub max_tokens: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com".to_owned(),
            api_key: String::new(),
            api_model: "claude-sonnet-4-20250514".to_owned(),
            max_tokens: 4096,
        }
    }
}

/// Post composition settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostConfig {
    /// Tags attached to every post.
    pub tags: Vec<String>,
    /// Directory for markdown backups. Defaults to `data_dir()/output/`.
    pub output_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PosterError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| PosterError::Config(format!("invalid {}: {e}", path.display())))
    }

    /// Validate the configuration for daemon startup.
    ///
    /// Startup validation is strict: an unusable configuration exits the
    /// process non-zero rather than running with undefined state.
    pub fn validate(&self) -> Result<()> {
        if self.site.blog_name.trim().is_empty() {
            return Err(PosterError::Config("site.blog_name is empty".to_owned()));
        }
        if self.site.cookies.trim().is_empty() && !self.refresh.has_credentials() {
            return Err(PosterError::Config(
                "no session material: set site.cookies or refresh.identity/secret".to_owned(),
            ));
        }
        if self.generator.api_key.trim().is_empty() {
            return Err(PosterError::Config("generator.api_key is empty".to_owned()));
        }
        if self.schedule.start_hour > 23 || self.schedule.end_hour > 23 {
            return Err(PosterError::Config(
                "schedule hours must be within 0-23".to_owned(),
            ));
        }
        if self.schedule.end_minute > 59 {
            return Err(PosterError::Config(
                "schedule.end_minute must be within 0-59".to_owned(),
            ));
        }
        if self.schedule.start_hour > self.schedule.end_hour {
            return Err(PosterError::Config(
                "schedule.start_hour must not be after schedule.end_hour".to_owned(),
            ));
        }
        self.schedule.tz()?;
        Ok(())
    }
}

impl ScheduleConfig {
    /// Parse the configured time zone name.
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse()
            .map_err(|_| PosterError::Config(format!("unknown time zone: {}", self.timezone)))
    }
}

impl RefreshConfig {
    /// Returns `true` when identity-provider credentials are configured.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.identity.trim().is_empty() && !self.secret.trim().is_empty()
    }
}

/// Rewrite `site.cookies` in the config document, preserving comments and
/// layout.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or written.
pub fn write_back_cookie(path: &Path, cookie: &str) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| PosterError::Config(format!("cannot read {}: {e}", path.display())))?;

    let mut doc: toml_edit::DocumentMut = raw
        .parse()
        .map_err(|e| PosterError::Config(format!("invalid {}: {e}", path.display())))?;

    doc["site"]["cookies"] = toml_edit::value(cookie);

    std::fs::write(path, doc.to_string())
        .map_err(|e| PosterError::Config(format!("cannot write {}: {e}", path.display())))?;
    Ok(())
}
