pub mod api;
pub mod api_info;
pub mod client;
pub mod connection;
pub mod types;

pub use api::{Connector, FullNodeApi, MinerApi};
pub use api_info::{parse_api_info, ApiEndpoint};
pub use client::{DaemonClient, LotusConnector, MinerClient};
pub use connection::{RpcSession, SessionOptions};
