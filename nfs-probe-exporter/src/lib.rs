//! Prometheus probe exporter for NFS exports.
//!
//! Each scrape names the exports to check in its query string; the exporter
//! runs an external tool against them and answers with two gauges,
//! `probe_success` and `probe_duration_seconds`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   Prometheus    │────>│   HTTP Server   │────>│     Prober      │
//! │ ?target=h:/path │     │ (per-request    │     │ (nfs-ls or      │
//! │                 │<────│  registry)      │<────│  showmount -e)  │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! nfs-probe-exporter 0.0.0.0:9586 --strategy export-list
//! curl 'http://localhost:9586/?target=filer01:/export/home'
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod config;
pub mod error;
pub mod http;
pub mod probe;
pub mod runner;
pub mod snapshot;
pub mod target;

pub use config::ExporterConfig;
pub use http::HttpServer;
pub use probe::Prober;
pub use runner::{CommandOutput, CommandRunner, SystemRunner};
pub use snapshot::MetricsSnapshot;
pub use target::{ScrapeRequest, Target, TargetSet};
