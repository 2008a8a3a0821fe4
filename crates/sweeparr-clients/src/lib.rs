#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! Download client drivers behind the `DownloadClient` trait.
//!
//! Layout: `http.rs` (shared transport helpers), one module per client
//! (`qbittorrent.rs`, `deluge.rs`, `transmission.rs`), and `factory.rs`
//! selecting the implementation from configuration. Callers never branch on
//! the client type.

pub mod deluge;
pub mod error;
pub mod factory;
mod http;
pub mod qbittorrent;
pub mod transmission;

pub use deluge::DelugeClient;
pub use error::ClientError;
pub use factory::build_client;
pub use qbittorrent::QBittorrentClient;
pub use transmission::TransmissionClient;
