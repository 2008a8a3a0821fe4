#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! Sonarr, Radarr and Lidarr queue clients.
//!
//! Layout: `api.rs` (HTTP transport with `x-api-key`), `model.rs` (queue
//! records, search targets), `client.rs` (`ArrClient` trait with the shared
//! failed-import, delete and queue logic), one module per arr, `pager.rs`
//! (queue pagination), `factory.rs`.

pub mod api;
pub mod client;
pub mod error;
pub mod factory;
pub mod lidarr;
pub mod model;
pub mod pager;
pub mod radarr;
pub mod sonarr;

pub use api::ArrApi;
pub use client::{ArrClient, QUEUE_PAGE_SIZE};
pub use error::ArrError;
pub use factory::build_arr_client;
pub use lidarr::LidarrClient;
pub use model::{QueueListResponse, QueueRecord, SearchItem, StatusMessage};
pub use pager::{MAX_QUEUE_PAGES, QueuePager};
pub use radarr::RadarrClient;
pub use sonarr::SonarrClient;
