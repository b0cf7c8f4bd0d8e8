use serde::Deserialize;

/// Main configuration structure for Listing-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

/// Which directory to harvest
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Built-in site profile name ("trustoo" or "werkspot")
    pub profile: String,

    /// Category page the run starts from
    #[serde(rename = "target-url")]
    pub target_url: String,
}

/// Browser launch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Explicit Chromium binary; `CHROME_BIN` is consulted when unset
    #[serde(rename = "chrome-path", default)]
    pub chrome_path: Option<String>,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "launch-timeout-secs", default = "default_launch_timeout")]
    pub launch_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            user_agent: default_user_agent(),
            launch_timeout_secs: default_launch_timeout(),
        }
    }
}

/// Pagination and persistence behavior
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Maximum number of "load more" advances (including resumed ones)
    #[serde(rename = "max-advances", default)]
    pub max_advances: Option<u32>,

    /// Flush both output files every time this many records accumulate
    #[serde(rename = "save-interval", default = "default_save_interval")]
    pub save_interval: usize,

    /// Consecutive failures that end the run as failed
    #[serde(rename = "failure-threshold", default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Consecutive advances without a new record that end the run
    #[serde(rename = "max-idle-advances", default)]
    pub max_idle_advances: Option<u32>,

    /// Emit one progress line per newly added record
    #[serde(default)]
    pub verbose: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_advances: None,
            save_interval: default_save_interval(),
            failure_threshold: default_failure_threshold(),
            max_idle_advances: None,
            verbose: false,
        }
    }
}

/// Delays used around page interactions (milliseconds)
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TimingConfig {
    pub initial_settle_ms: u64,
    pub lazy_load_ms: u64,
    pub pre_click_min_ms: u64,
    pub pre_click_max_ms: u64,
    pub scroll_settle_min_ms: u64,
    pub scroll_settle_max_ms: u64,
    pub post_click_min_ms: u64,
    pub post_click_max_ms: u64,
    pub render_settle_min_ms: u64,
    pub render_settle_max_ms: u64,
    pub backoff_min_ms: u64,
    pub backoff_max_ms: u64,
    pub fast_forward_ms: u64,
    pub ready_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            initial_settle_ms: 3000,
            lazy_load_ms: 1000,
            pre_click_min_ms: 1000,
            pre_click_max_ms: 2000,
            scroll_settle_min_ms: 500,
            scroll_settle_max_ms: 1000,
            post_click_min_ms: 5000,
            post_click_max_ms: 7000,
            render_settle_min_ms: 2000,
            render_settle_max_ms: 3000,
            backoff_min_ms: 2000,
            backoff_max_ms: 3000,
            fast_forward_ms: 2000,
            ready_timeout_ms: 10_000,
        }
    }
}

impl TimingConfig {
    /// All delays set to zero, for driving scripted pages in tests
    pub fn immediate() -> Self {
        Self {
            initial_settle_ms: 0,
            lazy_load_ms: 0,
            pre_click_min_ms: 0,
            pre_click_max_ms: 0,
            scroll_settle_min_ms: 0,
            scroll_settle_max_ms: 0,
            post_click_min_ms: 0,
            post_click_max_ms: 0,
            render_settle_min_ms: 0,
            render_settle_max_ms: 0,
            backoff_min_ms: 0,
            backoff_max_ms: 0,
            fast_forward_ms: 0,
            ready_timeout_ms: 0,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Delimited-text output (also the first resume source)
    #[serde(rename = "csv-path", default = "default_csv_path")]
    pub csv_path: String,

    /// Spreadsheet output (resume fallback)
    #[serde(rename = "xlsx-path", default = "default_xlsx_path")]
    pub xlsx_path: String,

    /// File holding the advance count of the previous run
    #[serde(rename = "checkpoint-path", default = "default_checkpoint_path")]
    pub checkpoint_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            xlsx_path: default_xlsx_path(),
            checkpoint_path: default_checkpoint_path(),
        }
    }
}

/// Third-party enrichment lookup configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(rename = "base-url", default = "default_enrichment_url")]
    pub base_url: String,

    /// API key; `AD_HOC_DATA_API_KEY` is consulted when unset
    #[serde(rename = "api-key", default)]
    pub api_key: Option<String>,

    /// Pause between lookups
    #[serde(rename = "delay-ms", default = "default_enrichment_delay")]
    pub delay_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_enrichment_url(),
            api_key: None,
            delay_ms: default_enrichment_delay(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_launch_timeout() -> u64 {
    30
}

fn default_save_interval() -> usize {
    10
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_csv_path() -> String {
    "listings.csv".to_string()
}

fn default_xlsx_path() -> String {
    "listings.xlsx".to_string()
}

fn default_checkpoint_path() -> String {
    "checkpoint.txt".to_string()
}

fn default_enrichment_url() -> String {
    "https://api.adhocdata.nl".to_string()
}

fn default_enrichment_delay() -> u64 {
    500
}
