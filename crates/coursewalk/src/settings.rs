//! Crawl settings and their defaults.

use std::time::Duration;

/// Platform the original tooling was written against.
pub const DEFAULT_ROOT_URL: &str = "https://lernplattform.mebis.bayern.de";

/// Title of the identity provider's login page.
pub const DEFAULT_LOGIN_TITLE: &str = "Mebis Login Service";

/// Label of the platform's logout link.
pub const DEFAULT_LOGOUT_TEXT: &str = "Logout";

const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const DEFAULT_DOWNLOAD_ATTEMPTS: u32 = 3;

/// Tunables for a crawl run.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub root_url: String,
    pub login_title: String,
    pub logout_text: String,
    pub navigation_timeout: Duration,
    pub poll_interval: Duration,
    pub download_timeout: Duration,
    /// Attempts per browser-saved download before giving up on an activity.
    pub download_attempts: u32,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            root_url: DEFAULT_ROOT_URL.to_string(),
            login_title: DEFAULT_LOGIN_TITLE.to_string(),
            logout_text: DEFAULT_LOGOUT_TEXT.to_string(),
            navigation_timeout: Duration::from_secs(DEFAULT_NAVIGATION_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            download_timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
            download_attempts: DEFAULT_DOWNLOAD_ATTEMPTS,
        }
    }
}

impl CrawlSettings {
    /// Defaults, with `COURSEWALK_ROOT_URL`, `COURSEWALK_LOGIN_TITLE` and
    /// `COURSEWALK_LOGOUT_TEXT` applied.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(url) = std::env::var("COURSEWALK_ROOT_URL") {
            settings.root_url = url;
        }
        if let Ok(title) = std::env::var("COURSEWALK_LOGIN_TITLE") {
            settings.login_title = title;
        }
        if let Ok(text) = std::env::var("COURSEWALK_LOGOUT_TEXT") {
            settings.logout_text = text;
        }
        settings
    }
}
