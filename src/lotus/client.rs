//! Lotus JSON-RPC Clients
//!
//! Concrete implementations of [`FullNodeApi`] and [`MinerApi`] on top of an
//! [`RpcSession`], plus the [`LotusConnector`] that opens both sessions for a pass.
//!
//! # Example
//!
//! ```no_run
//! use lotus_exporter::lotus::{parse_api_info, Connector, LotusConnector, SessionOptions};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let connector = LotusConnector::new(
//!     parse_api_info("/ip4/127.0.0.1/tcp/1234/http")?,
//!     parse_api_info("/ip4/127.0.0.1/tcp/2345/http")?,
//!     SessionOptions::default(),
//! );
//!
//! let daemon = connector.open_daemon().await?;
//! let head = daemon.chain_head().await?;
//! println!("height {}", head.height);
//! daemon.close().await;
//! # Ok(())
//! # }
//! ```

use crate::config::LotusConfig;
use crate::error::Result;
use crate::lotus::api::{Connector, FullNodeApi, MinerApi};
use crate::lotus::api_info::{parse_api_info, ApiEndpoint};
use crate::lotus::connection::{RpcSession, SessionOptions};
use crate::lotus::types::*;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

/// Client for the Lotus full-node daemon
pub struct DaemonClient {
    session: RpcSession,
}

impl DaemonClient {
    pub async fn connect(endpoint: &ApiEndpoint, options: SessionOptions) -> Result<Self> {
        let session = RpcSession::open("lotus daemon", endpoint, options).await?;
        Ok(Self { session })
    }
}

#[async_trait]
impl FullNodeApi for DaemonClient {
    async fn chain_head(&self) -> Result<TipSet> {
        self.session.call("ChainHead", json!([])).await
    }

    async fn network_name(&self) -> Result<String> {
        self.session.call("StateNetworkName", json!([])).await
    }

    async fn network_version(&self, tsk: &TipSetKey) -> Result<u32> {
        self.session.call("StateNetworkVersion", json!([tsk])).await
    }

    async fn version(&self) -> Result<VersionInfo> {
        self.session.call("Version", json!([])).await
    }

    async fn miner_info(&self, miner: &str, tsk: &TipSetKey) -> Result<MinerInfo> {
        self.session.call("StateMinerInfo", json!([miner, tsk])).await
    }

    async fn account_key(&self, actor: &str, tsk: &TipSetKey) -> Result<String> {
        self.session.call("StateAccountKey", json!([actor, tsk])).await
    }

    async fn miner_power(&self, miner: &str, tsk: &TipSetKey) -> Result<MinerPower> {
        self.session.call("StateMinerPower", json!([miner, tsk])).await
    }

    async fn mining_base_info(
        &self,
        miner: &str,
        epoch: i64,
        tsk: &TipSetKey,
    ) -> Result<Option<MiningBaseInfo>> {
        self.session.call("MinerGetBaseInfo", json!([miner, epoch, tsk])).await
    }

    async fn sync_state(&self) -> Result<SyncStatus> {
        self.session.call("SyncState", json!([])).await
    }

    async fn pending_messages(&self, tsk: &TipSetKey) -> Result<Vec<SignedMessage>> {
        // Lotus answers `null` for an empty pool
        let pending: Option<Vec<SignedMessage>> =
            self.session.call("MpoolPending", json!([tsk])).await?;
        Ok(pending.unwrap_or_default())
    }

    async fn actor(&self, address: &str, tsk: &TipSetKey) -> Result<Actor> {
        self.session.call("StateGetActor", json!([address, tsk])).await
    }

    async fn wallet_balance(&self, address: &str) -> Result<String> {
        self.session.call("WalletBalance", json!([address])).await
    }

    async fn miner_state(
        &self,
        miner: &str,
        tsk: &TipSetKey,
    ) -> Result<ActorState<MinerActorState>> {
        self.session.call("StateReadState", json!([miner, tsk])).await
    }

    async fn close(&self) {
        self.session.close().await;
    }
}

/// Client for the lotus-miner (storage provider) process
pub struct MinerClient {
    session: RpcSession,
}

impl MinerClient {
    pub async fn connect(endpoint: &ApiEndpoint, options: SessionOptions) -> Result<Self> {
        let session = RpcSession::open("lotus miner", endpoint, options).await?;
        Ok(Self { session })
    }
}

#[async_trait]
impl MinerApi for MinerClient {
    async fn actor_address(&self) -> Result<String> {
        self.session.call("ActorAddress", json!([])).await
    }

    async fn version(&self) -> Result<VersionInfo> {
        self.session.call("Version", json!([])).await
    }

    async fn worker_stats(&self) -> Result<BTreeMap<String, WorkerStats>> {
        let stats: Option<BTreeMap<String, WorkerStats>> =
            self.session.call("WorkerStats", json!([])).await?;
        Ok(stats.unwrap_or_default())
    }

    async fn worker_jobs(&self) -> Result<BTreeMap<String, Vec<WorkerJob>>> {
        let jobs: Option<BTreeMap<String, Option<Vec<WorkerJob>>>> =
            self.session.call("WorkerJobs", json!([])).await?;
        Ok(jobs
            .unwrap_or_default()
            .into_iter()
            .map(|(worker, jobs)| (worker, jobs.unwrap_or_default()))
            .collect())
    }

    async fn close(&self) {
        self.session.close().await;
    }
}

/// Opens a daemon and a miner session per collection pass
#[derive(Debug, Clone)]
pub struct LotusConnector {
    daemon: ApiEndpoint,
    miner: ApiEndpoint,
    options: SessionOptions,
}

impl LotusConnector {
    pub fn new(daemon: ApiEndpoint, miner: ApiEndpoint, options: SessionOptions) -> Self {
        Self {
            daemon,
            miner,
            options,
        }
    }

    /// Build a connector from the `lotus` config section
    pub fn from_config(config: &LotusConfig) -> Result<Self> {
        let daemon = parse_api_info(config.fullnode_api_info.expose_secret())?;
        let miner = parse_api_info(config.miner_api_info.expose_secret())?;
        let options = SessionOptions {
            request_timeout: Duration::from_secs(config.request_timeout_seconds),
            verify_tls: config.verify_tls,
        };
        Ok(Self::new(daemon, miner, options))
    }

    pub fn daemon_url(&self) -> &str {
        &self.daemon.url
    }

    pub fn miner_url(&self) -> &str {
        &self.miner.url
    }
}

#[async_trait]
impl Connector for LotusConnector {
    async fn open_daemon(&self) -> Result<Box<dyn FullNodeApi>> {
        let client = DaemonClient::connect(&self.daemon, self.options).await?;
        Ok(Box::new(client))
    }

    async fn open_miner(&self) -> Result<Box<dyn MinerApi>> {
        let client = MinerClient::connect(&self.miner, self.options).await?;
        Ok(Box::new(client))
    }
}
