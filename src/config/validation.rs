use crate::config::types::{
    Config, EnrichmentConfig, HarvestConfig, OutputConfig, SiteConfig, TimingConfig,
};
use crate::site::PROFILE_NAMES;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_harvest_config(&config.harvest)?;
    validate_timing_config(&config.timing)?;
    validate_output_config(&config.output)?;
    validate_enrichment_config(&config.enrichment)?;
    Ok(())
}

fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if !PROFILE_NAMES.contains(&config.profile.as_str()) {
        return Err(ConfigError::UnknownProfile(config.profile.clone()));
    }
    validate_http_url("target-url", &config.target_url)
}

fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.save_interval < 1 {
        return Err(ConfigError::Validation(
            "save-interval must be >= 1".to_string(),
        ));
    }

    if config.failure_threshold < 1 || config.failure_threshold > 100 {
        return Err(ConfigError::Validation(format!(
            "failure-threshold must be between 1 and 100, got {}",
            config.failure_threshold
        )));
    }

    if config.max_idle_advances == Some(0) {
        return Err(ConfigError::Validation(
            "max-idle-advances must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Every randomized delay needs `min <= max`
fn validate_timing_config(config: &TimingConfig) -> Result<(), ConfigError> {
    let pairs = [
        ("pre-click", config.pre_click_min_ms, config.pre_click_max_ms),
        ("scroll-settle", config.scroll_settle_min_ms, config.scroll_settle_max_ms),
        ("post-click", config.post_click_min_ms, config.post_click_max_ms),
        ("render-settle", config.render_settle_min_ms, config.render_settle_max_ms),
        ("backoff", config.backoff_min_ms, config.backoff_max_ms),
    ];

    for (name, min, max) in pairs {
        if min > max {
            return Err(ConfigError::Validation(format!(
                "{}-min-ms ({}) must not exceed {}-max-ms ({})",
                name, min, name, max
            )));
        }
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (key, value) in [
        ("csv-path", &config.csv_path),
        ("xlsx-path", &config.xlsx_path),
        ("checkpoint-path", &config.checkpoint_path),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", key)));
        }
    }
    Ok(())
}

fn validate_enrichment_config(config: &EnrichmentConfig) -> Result<(), ConfigError> {
    if config.delay_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "enrichment delay-ms must be <= 60000, got {}",
            config.delay_ms
        )));
    }

    if config.enabled {
        validate_http_url("base-url", &config.base_url)?;
    }

    Ok(())
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", key, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            key, other
        ))),
    }
}
