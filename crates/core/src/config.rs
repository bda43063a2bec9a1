use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub environment: EnvironmentConfig,
    pub api: ApiConfig,
    pub mailbox: MailboxConfig,
    pub browser: BrowserConfig,
    pub activation: ActivationConfig,
}

/// Which deployment of the product the run targets ("staging-us",
/// "prod-us", ...). The name also selects the fixture file.
#[derive(Debug, Deserialize, Clone)]
pub struct EnvironmentConfig {
    pub name: String,
    pub base_url: String,
    pub region: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub client_id: String,
    pub client_secret: String,
    pub user_id: String,
    pub account_id: String,
    #[serde(default)]
    pub second_account_id: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailboxConfig {
    pub api_base: String,
    pub api_key: String,
    pub server_id: String,
    /// Domain invited addresses are generated under, e.g. "srv123.mailbox.example".
    pub email_domain: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_message_timeout_ms")]
    pub invitation_timeout_ms: u64,
    #[serde(default = "default_message_timeout_ms")]
    pub passcode_timeout_ms: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    /// Upper bound on the post-navigation settle loop.
    #[serde(default = "default_settle_timeout")]
    pub settle_timeout_seconds: u64,
    /// Bound for "wait until this field/control shows up" DOM waits.
    #[serde(default = "default_dom_wait")]
    pub dom_wait_seconds: u64,
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ActivationConfig {
    #[serde(default = "default_password")]
    pub password: String,
    /// Cap on how many fixture entries one batch run processes.
    #[serde(default = "default_max_accounts")]
    pub max_accounts: usize,
    #[serde(default = "default_fixture_dir")]
    pub fixture_dir: String,
}

impl ActivationConfig {
    pub fn fixture_path(&self, environment: &str) -> std::path::PathBuf {
        std::path::Path::new(&self.fixture_dir)
            .join(format!("invited-emails-{}.json", environment))
    }
}

fn default_request_timeout() -> u64 {
    30
}
fn default_poll_interval_ms() -> u64 {
    5_000
}
fn default_message_timeout_ms() -> u64 {
    60_000
}
fn default_headless() -> bool {
    true
}
fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    720
}
fn default_settle_timeout() -> u64 {
    30
}
fn default_dom_wait() -> u64 {
    10
}
fn default_screenshot_dir() -> String {
    "test-results".to_string()
}
fn default_password() -> String {
    "Autodesk1!".to_string()
}
fn default_max_accounts() -> usize {
    8
}
fn default_fixture_dir() -> String {
    "test-data".to_string()
}
