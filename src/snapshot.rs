//! Snapshot Data Model
//!
//! A [`Snapshot`] is the immutable result of one collection pass. Values that every
//! pass must produce (provider identity, chain height and base fee) are plain
//! fields; every best-effort data group is wrapped in a [`Group`] so a failed read
//! blanks only that group's samples.

/// Outcome of one best-effort data group
#[derive(Debug, Clone, PartialEq)]
pub enum Group<T> {
    Collected(T),
    /// The group's read failed; carries the reason for logs and health metrics
    Missing(String),
}

impl<T> Group<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            Group::Collected(value) => Some(value),
            Group::Missing(_) => None,
        }
    }

    pub fn is_collected(&self) -> bool {
        matches!(self, Group::Collected(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Group<U> {
        match self {
            Group::Collected(value) => Group::Collected(f(value)),
            Group::Missing(reason) => Group::Missing(reason),
        }
    }
}

/// Daemon identity
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonInfo {
    pub network: String,
    pub version: String,
    pub network_version: u32,
}

/// An actor id together with its resolved account key address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRef {
    /// Actor id, e.g. `f01000`
    pub id: String,
    /// Account key address; the actor id itself when resolution failed
    pub address: String,
}

/// Provider control structure and sector size
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderInfo {
    /// Owner as displayed (operator override applied)
    pub owner: AccountRef,
    /// Owner actor id as read on chain, before any override
    pub chain_owner_id: String,
    /// Owner address as resolved on chain, before any override
    pub chain_owner_address: String,
    pub worker: AccountRef,
    /// First control address, when the provider has any
    pub control0: Option<AccountRef>,
    pub sector_size: u64,
}

/// Provider and network power, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerSample {
    pub miner_raw: u128,
    pub miner_quality_adjusted: u128,
    pub network_raw: u128,
    pub network_quality_adjusted: u128,
}

/// One active chain sync worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncState {
    pub worker: String,
    /// Target minus base height, or [`crate::derive::SYNC_ANOMALY`]
    pub height_delta: i64,
    pub stage: i64,
}

/// One pending message sent from a watched address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpoolMessage {
    pub from: String,
    pub to: String,
    pub nonce: u64,
    pub value: String,
    pub gas_limit: i64,
    pub gas_fee_cap: String,
    pub gas_premium: String,
    pub method: u64,
    pub method_name: String,
    pub to_actor_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpoolSummary {
    /// Every pending message in the pool
    pub total: usize,
    /// Messages from the watched address set; `None` when the provider's
    /// addresses are unknown and local messages cannot be told apart
    pub local: Option<Vec<MpoolMessage>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletBalance {
    pub address: String,
    /// Owning actor id shown as the `name` label
    pub name: String,
    /// Whole FIL, truncated
    pub balance_fil: u128,
}

/// Fund buckets of the miner actor state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockedKind {
    PreCommitDeposits,
    LockedFunds,
    FeeDebt,
    InitialPledge,
}

impl LockedKind {
    pub const ALL: [LockedKind; 4] = [
        LockedKind::PreCommitDeposits,
        LockedKind::LockedFunds,
        LockedKind::FeeDebt,
        LockedKind::InitialPledge,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            LockedKind::PreCommitDeposits => "PreCommitDeposits",
            LockedKind::LockedFunds => "LockedFunds",
            LockedKind::FeeDebt => "FeeDebt",
            LockedKind::InitialPledge => "InitialPledge",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LockedBucket {
    pub kind: LockedKind,
    /// FIL with fractional precision
    pub balance_fil: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LockedFunds {
    /// Actors version of the decoded state, when the code CID revealed it
    pub state_version: Option<u32>,
    pub buckets: Vec<LockedBucket>,
    /// Buckets absent from the decoded state
    pub missing: Vec<LockedKind>,
}

/// Resources of one storage worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerResource {
    pub host: String,
    pub cpus: u64,
    pub gpus: u64,
    pub ram_total: u64,
    pub ram_reserved: u64,
    pub ram_tasks: u64,
    pub vmem_total: u64,
    pub vmem_reserved: u64,
    pub vmem_tasks: u64,
    pub cpu_used: u64,
    pub gpu_used: u8,
}

/// Number of jobs of one task type on one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerJobCount {
    pub host: String,
    pub task: String,
    pub count: u64,
}

/// Everything one collection pass observed, pinned to a single tipset
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub miner_id: String,
    /// Unix seconds at the start of the pass
    pub local_time: i64,
    pub chain_height: i64,
    pub chain_base_fee: u128,
    pub daemon: Group<DaemonInfo>,
    pub miner_version: Group<String>,
    pub provider: Group<ProviderInfo>,
    pub power: Group<PowerSample>,
    pub eligibility: Group<bool>,
    pub sync: Group<Vec<SyncState>>,
    pub mpool: Group<MpoolSummary>,
    pub wallets: Group<Vec<WalletBalance>>,
    pub locked_funds: Group<LockedFunds>,
    pub workers: Group<Vec<WorkerResource>>,
    pub worker_jobs: Group<Vec<WorkerJobCount>>,
}

impl Snapshot {
    /// Per-group collection status, in emission order
    pub fn group_status(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("daemon", self.daemon.is_collected()),
            ("miner_version", self.miner_version.is_collected()),
            ("provider", self.provider.is_collected()),
            ("power", self.power.is_collected()),
            ("eligibility", self.eligibility.is_collected()),
            ("sync", self.sync.is_collected()),
            ("mpool", self.mpool.is_collected()),
            ("wallets", self.wallets.is_collected()),
            ("locked_funds", self.locked_funds.is_collected()),
            ("workers", self.workers.is_collected()),
            ("worker_jobs", self.worker_jobs.is_collected()),
        ]
    }
}
