//! Remote Read Contract
//!
//! The collector only talks to Lotus through these traits. The concrete
//! WebSocket clients live in [`crate::lotus::client`]; tests supply in-memory
//! doubles.
//!
//! Every method is one round trip and independently fallible. Methods that read
//! chain state take the [`TipSetKey`] resolved once at the start of the pass.

use crate::error::Result;
use crate::lotus::types::*;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Read operations against the full-chain daemon
#[async_trait]
pub trait FullNodeApi: Send + Sync {
    async fn chain_head(&self) -> Result<TipSet>;

    async fn network_name(&self) -> Result<String>;

    async fn network_version(&self, tsk: &TipSetKey) -> Result<u32>;

    async fn version(&self) -> Result<VersionInfo>;

    async fn miner_info(&self, miner: &str, tsk: &TipSetKey) -> Result<MinerInfo>;

    /// Resolve an actor id (`f0...`) to its account key address
    async fn account_key(&self, actor: &str, tsk: &TipSetKey) -> Result<String>;

    async fn miner_power(&self, miner: &str, tsk: &TipSetKey) -> Result<MinerPower>;

    /// `None` when the miner has no base info at `epoch` (e.g. no power yet)
    async fn mining_base_info(
        &self,
        miner: &str,
        epoch: i64,
        tsk: &TipSetKey,
    ) -> Result<Option<MiningBaseInfo>>;

    async fn sync_state(&self) -> Result<SyncStatus>;

    async fn pending_messages(&self, tsk: &TipSetKey) -> Result<Vec<SignedMessage>>;

    async fn actor(&self, address: &str, tsk: &TipSetKey) -> Result<Actor>;

    /// Balance in attoFIL, as a decimal string
    async fn wallet_balance(&self, address: &str) -> Result<String>;

    async fn miner_state(
        &self,
        miner: &str,
        tsk: &TipSetKey,
    ) -> Result<ActorState<MinerActorState>>;

    /// Release the session
    async fn close(&self) {}
}

/// Read operations against the storage-provider process
#[async_trait]
pub trait MinerApi: Send + Sync {
    /// The provider's actor address, e.g. `f01234`
    async fn actor_address(&self) -> Result<String>;

    async fn version(&self) -> Result<VersionInfo>;

    /// Worker stats keyed by worker id
    async fn worker_stats(&self) -> Result<BTreeMap<String, WorkerStats>>;

    /// Assigned jobs keyed by worker id
    async fn worker_jobs(&self) -> Result<BTreeMap<String, Vec<WorkerJob>>>;

    /// Release the session
    async fn close(&self) {}
}

/// Opens fresh sessions for one collection pass
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open_daemon(&self) -> Result<Box<dyn FullNodeApi>>;

    async fn open_miner(&self) -> Result<Box<dyn MinerApi>>;
}
