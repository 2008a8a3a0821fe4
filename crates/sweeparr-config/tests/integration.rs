use std::fs;
use std::time::{Duration, SystemTime};

use sweeparr_config::{ConfigError, ConfigService, load_config};

const VALID: &str = r#"{
    "general": { "dry_run": true, "ignored_downloads": ["readarr"] },
    "queue_cleaner": {
        "enabled": true,
        "interval_secs": 120,
        "stalled": { "max_strikes": 3 },
        "slow": { "max_strikes": 3, "min_speed": "1KB" }
    },
    "download_cleaner": {
        "categories": [
            { "name": "tv", "max_ratio": 2.0, "min_seed_time": 10, "max_seed_time": -1 }
        ]
    },
    "download_clients": [
        { "name": "qbit", "type": "qbittorrent", "host": "http://127.0.0.1:8080" }
    ],
    "sonarr": {
        "search_type": "season",
        "instances": [
            { "name": "sonarr", "url": "http://127.0.0.1:8989", "api_key": "key" }
        ]
    }
}"#;

fn touch_later(path: &std::path::Path) -> anyhow::Result<()> {
    let file = fs::File::options().write(true).open(path)?;
    file.set_modified(SystemTime::now() + Duration::from_secs(5))?;
    Ok(())
}

#[test]
fn loads_a_complete_document() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sweeparr.json");
    fs::write(&path, VALID)?;

    let config = load_config(&path)?;
    assert!(config.general.dry_run);
    assert_eq!(config.queue_cleaner.interval_secs, 120);
    assert_eq!(config.download_cleaner.categories[0].name, "tv");
    assert_eq!(config.sonarr.instances.len(), 1);
    Ok(())
}

#[test]
fn missing_file_reports_io_error() {
    let result = load_config(std::path::Path::new("/nonexistent/sweeparr.json"));
    assert!(matches!(result, Err(ConfigError::Io { .. })));
}

#[test]
fn malformed_document_reports_path() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json")?;
    match load_config(&path) {
        Err(ConfigError::Parse { path: Some(reported), .. }) => assert_eq!(reported, path),
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}

#[test]
fn refresh_swaps_valid_documents_and_keeps_previous_on_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sweeparr.json");
    fs::write(&path, VALID)?;
    let service = ConfigService::load(&path)?;
    assert!(!service.refresh());

    fs::write(&path, VALID.replace("\"interval_secs\": 120", "\"interval_secs\": 60"))?;
    touch_later(&path)?;
    assert!(service.refresh());
    assert_eq!(service.snapshot().queue_cleaner.interval_secs, 60);

    fs::write(&path, VALID.replace("\"interval_secs\": 120", "\"interval_secs\": 0"))?;
    let file = fs::File::options().write(true).open(&path)?;
    file.set_modified(SystemTime::now() + Duration::from_secs(10))?;
    assert!(!service.refresh());
    assert_eq!(service.snapshot().queue_cleaner.interval_secs, 60);
    Ok(())
}
