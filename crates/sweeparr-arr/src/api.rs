//! Shared HTTP transport for every arr client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sweeparr_config::ArrInstanceConfig;
use sweeparr_core::{DryRun, Striker};
use sweeparr_events::EventBus;

use crate::error::ArrError;

const API_KEY_HEADER: &str = "x-api-key";

/// HTTP client plus the shared striker, dry-run switch, and event bus.
#[derive(Clone)]
pub struct ArrApi {
    http: Client,
    striker: Arc<Striker>,
    dry_run: DryRun,
    events: EventBus,
}

impl ArrApi {
    /// Construct the transport.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(
        timeout: Duration,
        striker: Arc<Striker>,
        dry_run: DryRun,
        events: EventBus,
    ) -> Result<Self, ArrError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ArrError::ClientBuild { source })?;
        Ok(Self {
            http,
            striker,
            dry_run,
            events,
        })
    }

    /// Shared strike counter.
    #[must_use]
    pub fn striker(&self) -> &Striker {
        &self.striker
    }

    /// Dry-run switch.
    #[must_use]
    pub const fn dry_run(&self) -> DryRun {
        self.dry_run
    }

    /// Event bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// `{instance}/api/{version}/{path}`.
    #[must_use]
    pub fn url(instance: &ArrInstanceConfig, version: &str, path: &str) -> String {
        format!(
            "{}/api/{version}/{}",
            instance.url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// GET and decode a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures, non-success statuses, or
    /// undecodable bodies.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        instance: &ArrInstanceConfig,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ArrError> {
        let response = self
            .send(operation, url, self.http.get(url).query(query), instance)
            .await?;
        response.json().await.map_err(|source| ArrError::Decode {
            operation,
            url: url.to_string(),
            source,
        })
    }

    /// POST a JSON body and discard the reply.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or non-success statuses.
    pub async fn post_json(
        &self,
        operation: &'static str,
        instance: &ArrInstanceConfig,
        url: &str,
        body: &Value,
    ) -> Result<(), ArrError> {
        self.send(operation, url, self.http.post(url).json(body), instance)
            .await?;
        Ok(())
    }

    /// DELETE with query parameters.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or non-success statuses.
    pub async fn delete(
        &self,
        operation: &'static str,
        instance: &ArrInstanceConfig,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<(), ArrError> {
        self.send(operation, url, self.http.delete(url).query(query), instance)
            .await?;
        Ok(())
    }

    async fn send(
        &self,
        operation: &'static str,
        url: &str,
        request: RequestBuilder,
        instance: &ArrInstanceConfig,
    ) -> Result<Response, ArrError> {
        let response = request
            .header(API_KEY_HEADER, &instance.api_key)
            .send()
            .await
            .map_err(|source| ArrError::Http {
                operation,
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ArrError::HttpStatus {
                operation,
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

impl std::fmt::Debug for ArrApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrApi")
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}
