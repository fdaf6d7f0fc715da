//! In-memory Lotus test doubles
//!
//! [`Fixture`] describes what the fake daemon and miner answer; [`Recorder`]
//! captures what the collector asked for so tests can check call counts, the
//! tipset keys used, and that sessions were released.

#![allow(dead_code)]

use async_trait::async_trait;
use lotus_exporter::error::{ExporterError, Result};
use lotus_exporter::lotus::types::*;
use lotus_exporter::lotus::{Connector, FullNodeApi, MinerApi};
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const MINER_ID: &str = "f01234";
pub const OWNER_ID: &str = "f0100";
pub const OWNER_KEY: &str = "f3owner";
pub const WORKER_ID: &str = "f0101";
pub const WORKER_KEY: &str = "f3worker";
pub const CONTROL_ID: &str = "f0102";
pub const CONTROL_KEY: &str = "f3control";

pub const STORAGE_MINER_CODE: &str = "bafkqaetgnfwc6mjpon2g64tbm5sw22lomvza";
pub const ACCOUNT_CODE: &str = "bafkqadlgnfwc6mjpmfrwg33vnz2a";
pub const STORAGE_POWER_V10_CODE: &str = "bafkqae3gnfwc6mjqf5zxi33smftwk4dpo5sxe";

pub const ONE_FIL: &str = "1000000000000000000";

/// Scripted answers of the fake daemon and miner
#[derive(Debug, Clone)]
pub struct Fixture {
    /// `None` makes `ActorAddress` fail
    pub miner_id: Option<String>,
    pub head_height: i64,
    pub base_fee: String,
    /// Advance the head by one epoch on every `ChainHead` call
    pub advance_head: bool,
    pub network: String,
    pub daemon_version: String,
    pub network_version: u32,
    pub miner_version: String,
    pub owner: String,
    pub worker: String,
    pub controls: Vec<String>,
    pub sector_size: serde_json::Value,
    /// Actor id → account key; ids absent here fail `StateAccountKey`
    pub account_keys: HashMap<String, String>,
    pub miner_raw_power: String,
    pub miner_qa_power: String,
    pub network_raw_power: String,
    pub network_qa_power: String,
    /// `None` makes `MinerGetBaseInfo` answer null
    pub eligible: Option<bool>,
    /// (base height, target height, stage) per active sync
    pub syncs: Vec<(Option<i64>, Option<i64>, i64)>,
    pub pending: Vec<serde_json::Value>,
    /// Address → actor code CID; addresses absent here fail `StateGetActor`
    pub actor_codes: HashMap<String, String>,
    /// Address → attoFIL; addresses absent here fail `WalletBalance`
    pub balances: HashMap<String, String>,
    pub miner_state_code: String,
    pub miner_state: serde_json::Value,
    pub worker_stats: serde_json::Value,
    pub worker_jobs: serde_json::Value,
    /// Lotus method names (without namespace) that answer with an RPC error
    pub failing: HashSet<&'static str>,
    pub fail_open_daemon: bool,
    pub fail_open_miner: bool,
    /// Delay before a daemon session opens
    pub open_delay: Option<Duration>,
}

impl Default for Fixture {
    fn default() -> Self {
        let account_keys = HashMap::from([
            (OWNER_ID.to_string(), OWNER_KEY.to_string()),
            (WORKER_ID.to_string(), WORKER_KEY.to_string()),
            (CONTROL_ID.to_string(), CONTROL_KEY.to_string()),
        ]);
        let actor_codes = HashMap::from([
            (MINER_ID.to_string(), STORAGE_MINER_CODE.to_string()),
            ("f04".to_string(), STORAGE_POWER_V10_CODE.to_string()),
            ("f1recipient".to_string(), ACCOUNT_CODE.to_string()),
        ]);
        let balances = HashMap::from([
            (MINER_ID.to_string(), "5500000000000000000".to_string()),
            (OWNER_KEY.to_string(), "2000000000000000000".to_string()),
            (WORKER_KEY.to_string(), "999999999999999999".to_string()),
            (CONTROL_KEY.to_string(), "3000000000000000000".to_string()),
        ]);

        Self {
            miner_id: Some(MINER_ID.to_string()),
            head_height: 1000,
            base_fee: "100".to_string(),
            advance_head: false,
            network: "calibrationnet".to_string(),
            daemon_version: "1.25.2+calibnet".to_string(),
            network_version: 21,
            miner_version: "1.25.2+calibnet+git.abc".to_string(),
            owner: OWNER_ID.to_string(),
            worker: WORKER_ID.to_string(),
            controls: vec![CONTROL_ID.to_string()],
            sector_size: json!(34359738368u64),
            account_keys,
            miner_raw_power: "1099511627776".to_string(),
            miner_qa_power: "10995116277760".to_string(),
            network_raw_power: "25000000000000000000".to_string(),
            network_qa_power: "30000000000000000000".to_string(),
            eligible: Some(true),
            syncs: vec![(Some(990), Some(1000), 3), (Some(1000), Some(995), 5)],
            pending: vec![
                message(WORKER_KEY, MINER_ID, 7, 5),
                message(CONTROL_ID, "f04", 8, 1),
                message("f3stranger", MINER_ID, 1, 5),
            ],
            actor_codes,
            balances,
            miner_state_code: STORAGE_MINER_CODE.to_string(),
            miner_state: json!({
                "PreCommitDeposits": "1500000000000000000",
                "LockedFunds": "250000000000000000",
                "FeeDebt": "0",
                "InitialPledge": "4000000000000000000",
            }),
            worker_stats: json!({
                "uuid-a": worker_stats_json("worker-a", 64, 32, 8, 4),
                "uuid-b": worker_stats_json("worker-b", 128, 16, 0, 0),
            }),
            worker_jobs: json!({
                "uuid-a": [
                    job_json("seal/v0/precommit/1", "worker-a"),
                    job_json("seal/v0/precommit/1", "worker-a"),
                    job_json("seal/v0/commit/2", "worker-a"),
                ],
                "uuid-b": [job_json("seal/v0/addpiece", "")],
            }),
            failing: HashSet::new(),
            fail_open_daemon: false,
            fail_open_miner: false,
            open_delay: None,
        }
    }
}

/// A pending message as Lotus encodes it
pub fn message(from: &str, to: &str, nonce: u64, method: u64) -> serde_json::Value {
    json!({
        "Message": {
            "Version": 0,
            "To": to,
            "From": from,
            "Nonce": nonce,
            "Value": "1000",
            "GasLimit": 2000000,
            "GasFeeCap": "150",
            "GasPremium": "100",
            "Method": method,
            "Params": null,
        },
        "Signature": { "Type": 1, "Data": "" },
    })
}

/// Worker stats with memory given in GiB
pub fn worker_stats_json(
    hostname: &str,
    ram_gib: u64,
    used_gib: u64,
    min_gib: u64,
    cpu_use: u64,
) -> serde_json::Value {
    const GIB: u64 = 1 << 30;
    let gpu_used = if cpu_use > 0 { 1.0 } else { 0.0 };
    json!({
        "Info": {
            "Hostname": hostname,
            "IgnoreResources": false,
            "Resources": {
                "MemPhysical": ram_gib * GIB,
                "MemUsed": used_gib * GIB,
                "MemSwap": 16 * GIB,
                "MemSwapUsed": GIB,
                "CPUs": 32,
                "GPUs": ["NVIDIA GeForce RTX 3090"],
                "Resources": {},
            },
        },
        "Tasks": null,
        "Enabled": true,
        "MemUsedMin": min_gib * GIB,
        "MemUsedMax": 2 * min_gib * GIB,
        "GpuUsed": gpu_used,
        "CpuUse": cpu_use,
    })
}

pub fn job_json(task: &str, hostname: &str) -> serde_json::Value {
    json!({
        "ID": { "Sector": { "Miner": 1234, "Number": 1 }, "ID": "00000000-0000-0000-0000-000000000000" },
        "Sector": { "Miner": 1234, "Number": 1 },
        "Task": task,
        "RunWait": 0,
        "Start": "2024-01-01T00:00:00Z",
        "Hostname": hostname,
    })
}

/// What the collector asked for
#[derive(Debug, Default)]
pub struct Recorder {
    pub chain_head_calls: AtomicUsize,
    pub daemon_opened: AtomicUsize,
    pub miner_opened: AtomicUsize,
    pub daemon_closed: AtomicUsize,
    pub miner_closed: AtomicUsize,
    /// Every (method, tipset key) pair of a pinned read
    pub pinned_reads: Mutex<Vec<(&'static str, TipSetKey)>>,
    pub actor_lookups: Mutex<Vec<String>>,
    pub balance_reads: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn pinned_reads(&self) -> Vec<(&'static str, TipSetKey)> {
        self.pinned_reads.lock().unwrap().clone()
    }

    pub fn opened(&self) -> usize {
        self.daemon_opened.load(Ordering::SeqCst) + self.miner_opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.daemon_closed.load(Ordering::SeqCst) + self.miner_closed.load(Ordering::SeqCst)
    }
}

pub fn head_key(height: i64) -> TipSetKey {
    TipSetKey(vec![Cid::new(format!("bafy2bzaceahead{}", height))])
}

fn rpc_failure(method: &str) -> ExporterError {
    ExporterError::Rpc {
        code: 1,
        message: format!("{} unavailable", method),
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: &serde_json::Value) -> Result<T> {
    Ok(serde_json::from_value(value.clone())?)
}

pub struct MockDaemon {
    fixture: Fixture,
    recorder: Arc<Recorder>,
}

impl MockDaemon {
    pub fn new(fixture: Fixture, recorder: Arc<Recorder>) -> Self {
        Self { fixture, recorder }
    }

    fn check(&self, method: &'static str) -> Result<()> {
        if self.fixture.failing.contains(method) {
            Err(rpc_failure(method))
        } else {
            Ok(())
        }
    }

    fn pinned(&self, method: &'static str, tsk: &TipSetKey) -> Result<()> {
        self.recorder
            .pinned_reads
            .lock()
            .unwrap()
            .push((method, tsk.clone()));
        self.check(method)
    }
}

#[async_trait]
impl FullNodeApi for MockDaemon {
    async fn chain_head(&self) -> Result<TipSet> {
        let calls = self.recorder.chain_head_calls.fetch_add(1, Ordering::SeqCst) as i64;
        self.check("ChainHead")?;

        let height = if self.fixture.advance_head {
            self.fixture.head_height + calls
        } else {
            self.fixture.head_height
        };
        decode(&json!({
            "Cids": head_key(height),
            "Blocks": [{
                "Miner": "f01000",
                "ParentBaseFee": self.fixture.base_fee,
                "Height": height,
            }],
            "Height": height,
        }))
    }

    async fn network_name(&self) -> Result<String> {
        self.check("StateNetworkName")?;
        Ok(self.fixture.network.clone())
    }

    async fn network_version(&self, tsk: &TipSetKey) -> Result<u32> {
        self.pinned("StateNetworkVersion", tsk)?;
        Ok(self.fixture.network_version)
    }

    async fn version(&self) -> Result<VersionInfo> {
        self.check("Version")?;
        decode(&json!({
            "Version": self.fixture.daemon_version,
            "APIVersion": 131840,
            "BlockDelay": 30,
        }))
    }

    async fn miner_info(&self, _miner: &str, tsk: &TipSetKey) -> Result<MinerInfo> {
        self.pinned("StateMinerInfo", tsk)?;
        decode(&json!({
            "Owner": self.fixture.owner,
            "Worker": self.fixture.worker,
            "ControlAddresses": self.fixture.controls,
            "SectorSize": self.fixture.sector_size,
            "PeerId": "12D3KooW",
        }))
    }

    async fn account_key(&self, actor: &str, tsk: &TipSetKey) -> Result<String> {
        self.pinned("StateAccountKey", tsk)?;
        self.fixture
            .account_keys
            .get(actor)
            .cloned()
            .ok_or_else(|| rpc_failure("StateAccountKey"))
    }

    async fn miner_power(&self, _miner: &str, tsk: &TipSetKey) -> Result<MinerPower> {
        self.pinned("StateMinerPower", tsk)?;
        decode(&json!({
            "MinerPower": {
                "RawBytePower": self.fixture.miner_raw_power,
                "QualityAdjPower": self.fixture.miner_qa_power,
            },
            "TotalPower": {
                "RawBytePower": self.fixture.network_raw_power,
                "QualityAdjPower": self.fixture.network_qa_power,
            },
            "HasMinPower": true,
        }))
    }

    async fn mining_base_info(
        &self,
        _miner: &str,
        _epoch: i64,
        tsk: &TipSetKey,
    ) -> Result<Option<MiningBaseInfo>> {
        self.pinned("MinerGetBaseInfo", tsk)?;
        Ok(self.fixture.eligible.map(|eligible| MiningBaseInfo {
            eligible_for_mining: eligible,
        }))
    }

    async fn sync_state(&self) -> Result<SyncStatus> {
        self.check("SyncState")?;
        let syncs: Vec<serde_json::Value> = self
            .fixture
            .syncs
            .iter()
            .enumerate()
            .map(|(i, (base, target, stage))| {
                json!({
                    "WorkerID": i,
                    "Base": base.map(|h| json!({ "Cids": head_key(h), "Blocks": [], "Height": h })),
                    "Target": target.map(|h| json!({ "Cids": head_key(h), "Blocks": [], "Height": h })),
                    "Stage": stage,
                    "Height": target.unwrap_or_default(),
                })
            })
            .collect();
        decode(&json!({ "ActiveSyncs": syncs, "VMApplied": 0 }))
    }

    async fn pending_messages(&self, tsk: &TipSetKey) -> Result<Vec<SignedMessage>> {
        self.pinned("MpoolPending", tsk)?;
        decode(&json!(self.fixture.pending))
    }

    async fn actor(&self, address: &str, tsk: &TipSetKey) -> Result<Actor> {
        self.pinned("StateGetActor", tsk)?;
        self.recorder
            .actor_lookups
            .lock()
            .unwrap()
            .push(address.to_string());
        let code = self
            .fixture
            .actor_codes
            .get(address)
            .ok_or_else(|| rpc_failure("StateGetActor"))?;
        decode(&json!({ "Code": { "/": code }, "Head": { "/": "bafyhead" }, "Nonce": 0, "Balance": "0" }))
    }

    async fn wallet_balance(&self, address: &str) -> Result<String> {
        self.check("WalletBalance")?;
        self.recorder
            .balance_reads
            .lock()
            .unwrap()
            .push(address.to_string());
        self.fixture
            .balances
            .get(address)
            .cloned()
            .ok_or_else(|| rpc_failure("WalletBalance"))
    }

    async fn miner_state(
        &self,
        _miner: &str,
        tsk: &TipSetKey,
    ) -> Result<ActorState<MinerActorState>> {
        self.pinned("StateReadState", tsk)?;
        decode(&json!({
            "Balance": "0",
            "Code": { "/": self.fixture.miner_state_code },
            "State": self.fixture.miner_state,
        }))
    }

    async fn close(&self) {
        self.recorder.daemon_closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockMiner {
    fixture: Fixture,
    recorder: Arc<Recorder>,
}

impl MockMiner {
    pub fn new(fixture: Fixture, recorder: Arc<Recorder>) -> Self {
        Self { fixture, recorder }
    }

    fn check(&self, method: &'static str) -> Result<()> {
        if self.fixture.failing.contains(method) {
            Err(rpc_failure(method))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MinerApi for MockMiner {
    async fn actor_address(&self) -> Result<String> {
        self.fixture
            .miner_id
            .clone()
            .ok_or_else(|| rpc_failure("ActorAddress"))
    }

    async fn version(&self) -> Result<VersionInfo> {
        self.check("MinerVersion")?;
        decode(&json!({ "Version": self.fixture.miner_version, "APIVersion": 67584 }))
    }

    async fn worker_stats(&self) -> Result<BTreeMap<String, WorkerStats>> {
        self.check("WorkerStats")?;
        decode(&self.fixture.worker_stats)
    }

    async fn worker_jobs(&self) -> Result<BTreeMap<String, Vec<WorkerJob>>> {
        self.check("WorkerJobs")?;
        decode(&self.fixture.worker_jobs)
    }

    async fn close(&self) {
        self.recorder.miner_closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockConnector {
    pub fixture: Fixture,
    pub recorder: Arc<Recorder>,
}

impl MockConnector {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            fixture,
            recorder: Arc::new(Recorder::default()),
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open_daemon(&self) -> Result<Box<dyn FullNodeApi>> {
        if let Some(delay) = self.fixture.open_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fixture.fail_open_daemon {
            return Err(ExporterError::Auth("lotus daemon rejected the API token".to_string()));
        }
        self.recorder.daemon_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockDaemon::new(
            self.fixture.clone(),
            self.recorder.clone(),
        )))
    }

    async fn open_miner(&self) -> Result<Box<dyn MinerApi>> {
        if self.fixture.fail_open_miner {
            return Err(ExporterError::LotusApi("lotus miner unreachable".to_string()));
        }
        self.recorder.miner_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockMiner::new(
            self.fixture.clone(),
            self.recorder.clone(),
        )))
    }
}
