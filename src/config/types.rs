use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for site-harvest
///
/// Every section is optional in the TOML file; missing sections fall back to
/// the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    pub transform: TransformConfig,
}

/// Which engine renders pages for the crawler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetchEngine {
    /// Plain HTTP GET via reqwest
    #[default]
    Http,
    /// Headless Chromium (requires the `browser` feature)
    Browser,
}

/// How far the same-origin filter reaches from the seed host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OriginScope {
    /// Exact host and explicit port of the seed
    #[default]
    Host,
    /// The seed host (minus a leading `www.`) and all of its subdomains
    Subdomains,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of pages stored per run
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Maximum link depth from the seed (seed is depth 0)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Hard bound on a single page fetch (seconds)
    #[serde(rename = "fetch-timeout-secs")]
    pub fetch_timeout_secs: u64,

    /// Page rendering engine
    pub engine: FetchEngine,

    /// Same-origin filter granularity
    #[serde(rename = "origin-scope")]
    pub origin_scope: OriginScope,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 20,
            max_depth: 2,
            fetch_timeout_secs: 30,
            engine: FetchEngine::Http,
            origin_scope: OriginScope::Host,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "site-harvest".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://github.com/site-harvest/site-harvest".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory under which per-site output folders are allocated
    #[serde(rename = "base-dir")]
    pub base_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
        }
    }
}

/// Transform stage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Generative model name
    pub model: String,

    /// Sampling temperature passed to the model
    pub temperature: f32,

    /// Base URL of the generative API
    #[serde(rename = "api-base")]
    pub api_base: String,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.7,
            api_base: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}
