//! Driver selection from configuration.

use std::sync::Arc;
use std::time::Duration;

use sweeparr_config::DownloadClientConfig;
use sweeparr_core::{ClientKind, DownloadClient};

use crate::deluge::DelugeClient;
use crate::error::ClientError;
use crate::qbittorrent::QBittorrentClient;
use crate::transmission::TransmissionClient;

/// Build the driver described by `config`.
///
/// # Errors
///
/// Fails when the host is missing or the HTTP client cannot be built.
pub fn build_client(
    config: &DownloadClientConfig,
    timeout: Duration,
) -> Result<Arc<dyn DownloadClient>, ClientError> {
    let host = config.host.as_ref().ok_or_else(|| ClientError::InvalidUrl {
        client: config.name.clone(),
    })?;
    let client: Arc<dyn DownloadClient> = match config.kind {
        ClientKind::QBittorrent => Arc::new(QBittorrentClient::new(
            config.name.clone(),
            host.clone(),
            config.url_base.clone(),
            config.username.clone(),
            config.password.clone(),
            timeout,
        )?),
        ClientKind::Deluge => Arc::new(DelugeClient::new(
            config.name.clone(),
            host,
            config.url_base.as_deref(),
            config.password.clone(),
            timeout,
        )?),
        ClientKind::Transmission => Arc::new(TransmissionClient::new(
            config.name.clone(),
            host,
            config.url_base.as_deref(),
            config.username.clone(),
            config.password.clone(),
            timeout,
        )?),
    };
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(kind: ClientKind, host: Option<&str>) -> anyhow::Result<DownloadClientConfig> {
        Ok(DownloadClientConfig {
            name: "primary".to_string(),
            kind,
            enabled: true,
            host: host.map(str::parse).transpose()?,
            username: None,
            password: None,
            url_base: None,
        })
    }

    #[test]
    fn selects_driver_by_kind() -> anyhow::Result<()> {
        for kind in [
            ClientKind::QBittorrent,
            ClientKind::Deluge,
            ClientKind::Transmission,
        ] {
            let client = build_client(
                &config(kind, Some("http://localhost:8080"))?,
                Duration::from_secs(1),
            )?;
            assert_eq!(client.kind(), kind);
            assert_eq!(client.name(), "primary");
        }
        Ok(())
    }

    #[test]
    fn missing_host_is_rejected() -> anyhow::Result<()> {
        let result = build_client(&config(ClientKind::Deluge, None)?, Duration::from_secs(1));
        assert!(matches!(result, Err(ClientError::InvalidUrl { .. })));
        Ok(())
    }
}
