//! Every driver reports a download whose files are all unwanted the same way.

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use sweeparr_clients::build_client;
use sweeparr_config::{DownloadClientConfig, QueueCleanerConfig};
use sweeparr_core::{ClientKind, DeleteReason, DryRun, Striker};
use sweeparr_events::EventBus;
use sweeparr_service::{DownloadService, IgnoreRules};

fn service(server: &MockServer, kind: ClientKind) -> anyhow::Result<DownloadService> {
    let config = DownloadClientConfig {
        name: format!("{kind:?}").to_ascii_lowercase(),
        kind,
        enabled: true,
        host: Some(server.base_url().parse()?),
        username: None,
        password: None,
        url_base: None,
    };
    Ok(DownloadService::new(
        build_client(&config, Duration::from_secs(5))?,
        Arc::new(Striker::new(Duration::from_secs(3_600))),
        DryRun::disabled(),
        EventBus::new(),
    ))
}

async fn check(service: &DownloadService) -> anyhow::Result<DeleteReason> {
    let result = service
        .should_remove_from_queue("ABC", &IgnoreRules::default(), &QueueCleanerConfig::default())
        .await?;
    assert!(result.found);
    assert!(result.should_remove);
    Ok(result.delete_reason)
}

#[tokio::test]
async fn qbittorrent_all_skipped() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/v2/torrents/info");
        then.status(200).json_body(json!([{
            "hash": "abc",
            "name": "Show.S01E01",
            "state": "downloading",
            "dlspeed": 0,
            "eta": 8_640_000,
            "size": 1_000,
            "downloaded": 100
        }]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/v2/torrents/properties");
        then.status(200).json_body(json!({ "is_private": false }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/v2/torrents/trackers");
        then.status(200).json_body(json!([]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/v2/torrents/files");
        then.status(200).json_body(json!([
            { "index": 0, "name": "Show/sample.mkv", "size": 1, "priority": 0 },
            { "index": 1, "name": "Show/episode.mkv", "size": 10, "priority": 0 }
        ]));
    });

    let service = service(&server, ClientKind::QBittorrent)?;
    assert_eq!(check(&service).await?, DeleteReason::AllFilesSkipped);
    Ok(())
}

#[tokio::test]
async fn deluge_all_skipped() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/json").body_includes(r#""id":1,"#);
        then.status(200).json_body(json!({
            "id": 1,
            "result": {
                "hash": "abc",
                "name": "Show.S01E01",
                "state": "Downloading",
                "download_payload_rate": 0.0,
                "eta": 0,
                "total_wanted": 1_000,
                "total_done": 100,
                "seeding_time": 0,
                "ratio": 0.0,
                "private": false,
                "label": "",
                "save_path": "/downloads",
                "tracker_host": ""
            },
            "error": null
        }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/json").body_includes(r#""id":2,"#);
        then.status(200).json_body(json!({
            "id": 2,
            "result": {
                "files": [
                    { "index": 0, "path": "Show/sample.mkv", "size": 1 },
                    { "index": 1, "path": "Show/episode.mkv", "size": 10 }
                ],
                "file_priorities": [0, 0]
            },
            "error": null
        }));
    });

    let service = service(&server, ClientKind::Deluge)?;
    assert_eq!(check(&service).await?, DeleteReason::AllFilesSkipped);
    Ok(())
}

#[tokio::test]
async fn transmission_all_skipped() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST)
            .path("/transmission/rpc")
            .body_includes("fileStats");
        then.status(200).json_body(json!({
            "result": "success",
            "arguments": { "torrents": [{
                "files": [
                    { "name": "Show/sample.mkv", "length": 1 },
                    { "name": "Show/episode.mkv", "length": 10 }
                ],
                "fileStats": [
                    { "wanted": false, "priority": 0 },
                    { "wanted": false, "priority": 0 }
                ]
            }] }
        }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/transmission/rpc");
        then.status(200).json_body(json!({
            "result": "success",
            "arguments": { "torrents": [{
                "hashString": "abc",
                "name": "Show.S01E01",
                "status": 4,
                "rateDownload": 0,
                "eta": -1,
                "sizeWhenDone": 1_000,
                "downloadedEver": 100,
                "secondsSeeding": 0,
                "uploadRatio": 0.0,
                "isPrivate": false,
                "labels": [],
                "downloadDir": "/downloads/tv",
                "metadataPercentComplete": 1.0,
                "trackers": []
            }] }
        }));
    });

    let service = service(&server, ClientKind::Transmission)?;
    assert_eq!(check(&service).await?, DeleteReason::AllFilesSkipped);
    Ok(())
}
