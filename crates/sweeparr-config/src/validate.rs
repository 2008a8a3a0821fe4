//! Validation rules applied to every loaded configuration document.

use std::collections::HashSet;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    AppConfig, ArrConfig, ContentBlockerConfig, DownloadCleanerConfig, DownloadClientConfig,
    QueueCleanerConfig,
};

const MIN_ENABLED_STRIKES: u32 = 3;

/// Validate a configuration document, reporting the first violation.
///
/// # Errors
///
/// Returns `ConfigError::InvalidField` naming the offending section and field.
pub fn validate_config(config: &AppConfig) -> ConfigResult<()> {
    validate_queue_cleaner(&config.queue_cleaner)?;
    validate_content_blocker(&config.content_blocker)?;
    validate_download_cleaner(&config.download_cleaner)?;
    validate_download_clients(&config.download_clients)?;
    validate_arr("sonarr", &config.sonarr)?;
    validate_arr("radarr", &config.radarr)?;
    validate_arr("lidarr", &config.lidarr)?;
    Ok(())
}

fn validate_interval(section: &str, interval_secs: u64) -> ConfigResult<()> {
    if interval_secs == 0 {
        return Err(ConfigError::invalid(
            section,
            "interval_secs",
            Some("0".into()),
            "must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_strikes(section: &str, field: &str, value: u32) -> ConfigResult<()> {
    if value != 0 && value < MIN_ENABLED_STRIKES {
        return Err(ConfigError::invalid(
            section,
            field,
            Some(value.to_string()),
            "must be 0 (disabled) or at least 3",
        ));
    }
    Ok(())
}

fn validate_queue_cleaner(config: &QueueCleanerConfig) -> ConfigResult<()> {
    const SECTION: &str = "queue_cleaner";
    validate_interval(SECTION, config.interval_secs)?;
    validate_strikes(
        SECTION,
        "failed_import.max_strikes",
        config.failed_import.max_strikes,
    )?;
    validate_strikes(SECTION, "stalled.max_strikes", config.stalled.max_strikes)?;
    validate_strikes(
        SECTION,
        "stalled.downloading_metadata_max_strikes",
        config.stalled.downloading_metadata_max_strikes,
    )?;
    validate_strikes(SECTION, "slow.max_strikes", config.slow.max_strikes)?;

    let slow = &config.slow;
    if !slow.max_time_hours.is_finite() || slow.max_time_hours < 0.0 {
        return Err(ConfigError::invalid(
            SECTION,
            "slow.max_time_hours",
            Some(slow.max_time_hours.to_string()),
            "must be zero or positive",
        ));
    }
    if slow.max_strikes > 0 && slow.min_speed.is_zero() && slow.max_time_hours == 0.0 {
        return Err(ConfigError::invalid(
            SECTION,
            "slow",
            None,
            "min_speed or max_time_hours must be set when slow strikes are enabled",
        ));
    }
    Ok(())
}

fn validate_content_blocker(config: &ContentBlockerConfig) -> ConfigResult<()> {
    const SECTION: &str = "content_blocker";
    validate_interval(SECTION, config.interval_secs)?;
    for (field, settings) in [
        ("sonarr.path", &config.sonarr),
        ("radarr.path", &config.radarr),
        ("lidarr.path", &config.lidarr),
    ] {
        let missing = settings
            .path
            .as_deref()
            .is_none_or(|path| path.trim().is_empty());
        if settings.enabled && missing {
            return Err(ConfigError::invalid(
                SECTION,
                field,
                None,
                "blocklist path is required when enabled",
            ));
        }
    }
    Ok(())
}

fn validate_download_cleaner(config: &DownloadCleanerConfig) -> ConfigResult<()> {
    const SECTION: &str = "download_cleaner";
    validate_interval(SECTION, config.interval_secs)?;

    let mut seen = HashSet::new();
    for category in &config.categories {
        let name = category.name.trim();
        if name.is_empty() {
            return Err(ConfigError::invalid(
                SECTION,
                "categories.name",
                None,
                "category name must not be empty",
            ));
        }
        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(ConfigError::invalid(
                SECTION,
                "categories.name",
                Some(name.to_string()),
                "duplicate category name",
            ));
        }
        if category.max_ratio < 0.0 && category.max_seed_time < 0.0 {
            return Err(ConfigError::invalid(
                SECTION,
                "categories",
                Some(name.to_string()),
                "max_ratio and max_seed_time cannot both be disabled",
            ));
        }
        if category.min_seed_time < 0.0 {
            return Err(ConfigError::invalid(
                SECTION,
                "categories.min_seed_time",
                Some(category.min_seed_time.to_string()),
                "must be zero or positive",
            ));
        }
    }

    let unlinked = &config.unlinked;
    if unlinked.enabled {
        let target = unlinked.target_category.trim();
        if target.is_empty() {
            return Err(ConfigError::invalid(
                SECTION,
                "unlinked.target_category",
                None,
                "target category is required when unlinked handling is enabled",
            ));
        }
        if unlinked.categories.is_empty() {
            return Err(ConfigError::invalid(
                SECTION,
                "unlinked.categories",
                None,
                "at least one source category is required",
            ));
        }
        if unlinked
            .categories
            .iter()
            .any(|category| category.trim().eq_ignore_ascii_case(target))
        {
            return Err(ConfigError::invalid(
                SECTION,
                "unlinked.categories",
                Some(target.to_string()),
                "target category cannot be a source category",
            ));
        }
    }
    Ok(())
}

fn validate_download_clients(clients: &[DownloadClientConfig]) -> ConfigResult<()> {
    const SECTION: &str = "download_clients";
    let mut seen = HashSet::new();
    for client in clients {
        let name = client.name.trim();
        if name.is_empty() {
            return Err(ConfigError::invalid(
                SECTION,
                "name",
                None,
                "client name must not be empty",
            ));
        }
        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(ConfigError::invalid(
                SECTION,
                "name",
                Some(name.to_string()),
                "duplicate client name",
            ));
        }
        if client.enabled && client.host.is_none() {
            return Err(ConfigError::invalid(
                SECTION,
                "host",
                Some(name.to_string()),
                "host is required for enabled clients",
            ));
        }
    }
    Ok(())
}

fn validate_arr(section: &str, config: &ArrConfig) -> ConfigResult<()> {
    if config.failed_import_max_strikes < -1 {
        return Err(ConfigError::invalid(
            section,
            "failed_import_max_strikes",
            Some(config.failed_import_max_strikes.to_string()),
            "must be -1 (inherit), 0 (disabled), or at least 3",
        ));
    }
    if let Ok(strikes) = u32::try_from(config.failed_import_max_strikes) {
        validate_strikes(section, "failed_import_max_strikes", strikes)?;
    }
    for instance in &config.instances {
        if instance.name.trim().is_empty() {
            return Err(ConfigError::invalid(
                section,
                "instances.name",
                Some(instance.url.to_string()),
                "instance name must not be empty",
            ));
        }
        if instance.api_key.trim().is_empty() {
            return Err(ConfigError::invalid(
                section,
                "instances.api_key",
                Some(instance.name.clone()),
                "api key is required",
            ));
        }
    }
    Ok(())
}
