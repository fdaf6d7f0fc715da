//! Lotus API Type Definitions
//!
//! Rust structs for the Lotus JSON-RPC payloads read by the exporter.
//!
//! # Design Notes
//!
//! - **Partial models**: only the fields the exporter reads are modelled; serde ignores the rest.
//! - **Big integers**: token amounts and power values travel as decimal strings and stay
//!   strings here. [`crate::derive`] turns them into numbers.
//! - **Serde Defaults**: `#[serde(default)]` covers fields older Lotus releases omit.
//!
//! # API Methods Covered
//!
//! - `Filecoin.ChainHead` → [`TipSet`], [`BlockHeader`]
//! - `Filecoin.Version` → [`VersionInfo`]
//! - `Filecoin.StateMinerInfo` → [`MinerInfo`]
//! - `Filecoin.StateMinerPower` → [`MinerPower`], [`PowerClaim`]
//! - `Filecoin.MinerGetBaseInfo` → [`MiningBaseInfo`]
//! - `Filecoin.SyncState` → [`SyncStatus`], [`ActiveSync`]
//! - `Filecoin.MpoolPending` → [`SignedMessage`], [`Message`]
//! - `Filecoin.StateGetActor` → [`Actor`]
//! - `Filecoin.StateReadState` → [`ActorState`], [`MinerActorState`]
//! - `Filecoin.WorkerStats` → [`WorkerStats`]
//! - `Filecoin.WorkerJobs` → [`WorkerJob`]
//!
//! # JSON-RPC Protocol
//!
//! - [`JsonRpcRequest`] - Outgoing method calls
//! - [`JsonRpcResponse`] - Incoming responses

use serde::{Deserialize, Deserializer, Serialize};

/// JSON-RPC 2.0 request
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: serde_json::Value,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// IPLD link as encoded by Lotus: `{"/": "bafy..."}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cid {
    #[serde(rename = "/")]
    pub root: String,
}

impl Cid {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }
}

/// Tipset key: the ordered block CIDs identifying one tipset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TipSetKey(pub Vec<Cid>);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TipSet {
    pub cids: Vec<Cid>,
    #[serde(default)]
    pub blocks: Vec<BlockHeader>,
    pub height: i64,
}

impl TipSet {
    pub fn key(&self) -> TipSetKey {
        TipSetKey(self.cids.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlockHeader {
    #[serde(default)]
    pub miner: String,
    pub parent_base_fee: String,
    #[serde(default)]
    pub height: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "APIVersion", default)]
    pub api_version: u64,
    #[serde(rename = "BlockDelay", default)]
    pub block_delay: u64,
}

/// Sector size as sent on the wire. Lotus emits a JSON number; some proxies
/// re-encode it as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SectorSizeRepr {
    Number(u64),
    Text(String),
}

impl SectorSizeRepr {
    pub fn as_text(&self) -> String {
        match self {
            SectorSizeRepr::Number(n) => n.to_string(),
            SectorSizeRepr::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MinerInfo {
    pub owner: String,
    pub worker: String,
    #[serde(default)]
    pub control_addresses: Option<Vec<String>>,
    pub sector_size: SectorSizeRepr,
    #[serde(default)]
    pub peer_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PowerClaim {
    pub raw_byte_power: String,
    pub quality_adj_power: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MinerPower {
    pub miner_power: PowerClaim,
    pub total_power: PowerClaim,
    #[serde(default)]
    pub has_min_power: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MiningBaseInfo {
    #[serde(default)]
    pub eligible_for_mining: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SyncStatus {
    #[serde(default)]
    pub active_syncs: Vec<ActiveSync>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActiveSync {
    #[serde(rename = "WorkerID", default)]
    pub worker_id: u64,
    #[serde(default)]
    pub base: Option<TipSet>,
    #[serde(default)]
    pub target: Option<TipSet>,
    #[serde(default)]
    pub stage: i64,
    #[serde(default)]
    pub height: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignedMessage {
    pub message: Message,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    pub to: String,
    pub from: String,
    pub nonce: u64,
    pub value: String,
    pub gas_limit: i64,
    pub gas_fee_cap: String,
    pub gas_premium: String,
    pub method: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Actor {
    pub code: Cid,
    #[serde(default)]
    pub nonce: u64,
    #[serde(default)]
    pub balance: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActorState<S> {
    #[serde(default)]
    pub balance: String,
    pub code: Cid,
    pub state: S,
}

/// Fund buckets of the storage miner actor state.
///
/// Each bucket is optional so a state schema that drops or renames one is
/// reported as a missing bucket instead of failing the whole decode.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MinerActorState {
    #[serde(default)]
    pub pre_commit_deposits: Option<String>,
    #[serde(default)]
    pub locked_funds: Option<String>,
    #[serde(default)]
    pub fee_debt: Option<String>,
    #[serde(default)]
    pub initial_pledge: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkerResources {
    #[serde(default)]
    pub mem_physical: u64,
    #[serde(default)]
    pub mem_used: u64,
    #[serde(default)]
    pub mem_swap: u64,
    #[serde(default)]
    pub mem_swap_used: u64,
    #[serde(rename = "CPUs", default)]
    pub cpus: u64,
    #[serde(rename = "GPUs", default)]
    pub gpus: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkerInfo {
    pub hostname: String,
    pub resources: WorkerResources,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkerStats {
    pub info: WorkerInfo,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub mem_used_min: u64,
    #[serde(default)]
    pub mem_used_max: u64,
    #[serde(default, deserialize_with = "gpu_usage")]
    pub gpu_used: f64,
    #[serde(default)]
    pub cpu_use: u64,
}

fn enabled_by_default() -> bool {
    true
}

// Older lotus-miner releases report GpuUsed as a bool, newer ones as a fraction.
fn gpu_usage<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum GpuUsage {
        Flag(bool),
        Amount(f64),
    }

    Ok(match GpuUsage::deserialize(deserializer)? {
        GpuUsage::Flag(true) => 1.0,
        GpuUsage::Flag(false) => 0.0,
        GpuUsage::Amount(amount) => amount,
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SectorRef {
    #[serde(default)]
    pub miner: u64,
    pub number: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkerJob {
    pub sector: SectorRef,
    pub task: String,
    #[serde(default)]
    pub run_wait: i64,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub hostname: String,
}
