use serde::Deserialize;

/// Browser-like identification sent with every request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/54.0.2840.99 Safari/537.36";

/// Main configuration structure for Site-Cartographer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of workers draining the frontier concurrently
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Whole-request timeout (seconds)
    #[serde(default = "default_request_timeout", rename = "request-timeout")]
    pub request_timeout: u64,

    /// TCP/TLS connect timeout (seconds)
    #[serde(default = "default_connect_timeout", rename = "connect-timeout")]
    pub connect_timeout: u64,

    /// Stop fetching new documents once this many exist (0 = unlimited)
    #[serde(default, rename = "max-documents")]
    pub max_documents: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            max_documents: 0,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Full User-Agent header value
    #[serde(default = "default_user_agent")]
    pub value: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            value: default_user_agent(),
        }
    }
}

fn default_workers() -> u32 {
    1
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
