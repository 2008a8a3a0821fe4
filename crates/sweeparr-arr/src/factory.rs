//! Arr client selection.

use std::sync::Arc;

use sweeparr_config::SearchType;
use sweeparr_core::InstanceType;

use crate::api::ArrApi;
use crate::client::ArrClient;
use crate::lidarr::LidarrClient;
use crate::radarr::RadarrClient;
use crate::sonarr::SonarrClient;

/// Client for `instance_type` on top of the shared transport.
///
/// `search_type` only affects Sonarr.
#[must_use]
pub fn build_arr_client(
    instance_type: InstanceType,
    api: ArrApi,
    search_type: SearchType,
) -> Arc<dyn ArrClient> {
    match instance_type {
        InstanceType::Sonarr => Arc::new(SonarrClient::new(api, search_type)),
        InstanceType::Radarr => Arc::new(RadarrClient::new(api)),
        InstanceType::Lidarr => Arc::new(LidarrClient::new(api)),
    }
}
