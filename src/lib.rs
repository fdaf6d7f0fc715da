//! Lotus Prometheus Exporter
//!
//! A Prometheus metrics exporter for a Filecoin storage provider running Lotus.
//!
//! # Overview
//!
//! On every scrape the exporter opens JSON-RPC sessions to the Lotus full-node
//! daemon and to the storage-provider process, reads chain, provider, wallet,
//! mempool and worker state pinned to one tipset, and renders it in Prometheus
//! text format. Nothing is cached between scrapes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐      WebSocket       ┌──────────────┐
//! │   lotus     │ ◄─────────────────►  │   Exporter   │
//! │   daemon    │   JSON-RPC 2.0       │              │
//! └─────────────┘                      │  ┌────────┐  │      HTTP      ┌────────────┐
//! ┌─────────────┐      WebSocket       │  │Collect │  │ ◄────────────► │ Prometheus │
//! │ lotus-miner │ ◄─────────────────►  │  └────────┘  │   /metrics     └────────────┘
//! └─────────────┘   JSON-RPC 2.0       │  ┌────────┐  │
//!                                      │  │Metrics │  │
//!                                      │  └────────┘  │
//!                                      └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`lotus`] - API info parsing, WebSocket sessions, API traits and type definitions
//! - [`collectors`] - One collection pass producing a [`snapshot::Snapshot`]
//! - [`actors`] - Actor code decoding and method name lookup
//! - [`derive`] - Pure value derivations (sync lag, FIL scaling, worker memory)
//! - [`snapshot`] - Per-pass data model
//! - [`metrics`] - Prometheus metric definitions and emitter
//! - [`flight`] - Single-flight guard for concurrent scrapes
//! - [`server`] - HTTP server and scrape handling
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use lotus_exporter::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("/etc/lotus_exporter/.env"))?;
//!     server::start(config).await?;
//!     Ok(())
//! }
//! ```

pub mod actors;
pub mod collectors;
pub mod config;
pub mod derive;
pub mod error;
pub mod flight;
pub mod lotus;
pub mod metrics;
pub mod server;
pub mod snapshot;
