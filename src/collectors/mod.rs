//! Snapshot Collector
//!
//! One collection pass turns two Lotus sessions into one [`Snapshot`].
//!
//! # Pass Structure
//!
//! 1. Open the daemon and miner sessions ([`run_pass`])
//! 2. Resolve the provider identity and a single [`ChainReference`] (critical)
//! 3. Fetch each data group against that one reference (best-effort)
//! 4. Assemble the immutable snapshot
//! 5. Close both sessions, whatever happened in between
//!
//! # Error Handling
//!
//! Identity and chain reference failures abort the pass, as do parse failures of
//! load-bearing numbers (chain height, sector size). Every other group is wrapped
//! by [`fetch_group`]: a failure is logged as a warning and recorded as
//! [`Group::Missing`], so only that group's samples disappear from the scrape.

use crate::config::LotusConfig;
use crate::error::Result;
use crate::lotus::{Connector, FullNodeApi, MinerApi};
use crate::snapshot::{Group, Snapshot};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

pub mod chain;
pub mod miner;
pub mod mpool;
pub mod wallet;
pub mod worker;

pub use chain::ChainReference;

/// Operator overrides applied while collecting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectOptions {
    /// Displayed owner actor id
    pub owner_id: Option<String>,
    /// Displayed owner address; also added to the watched address set
    pub owner_addr: Option<String>,
}

impl CollectOptions {
    pub fn from_config(config: &LotusConfig) -> Self {
        Self {
            owner_id: config.owner_id.clone(),
            owner_addr: config.owner_addr.clone(),
        }
    }
}

/// Shared context passed to every group fetch
///
/// All fields are immutable references; the chain reference in particular is
/// resolved once per pass and never replaced.
#[derive(Clone, Copy)]
pub struct CollectionContext<'a> {
    pub daemon: &'a dyn FullNodeApi,
    pub miner: &'a dyn MinerApi,
    pub chain: &'a ChainReference,
    pub miner_id: &'a str,
}

/// Await one best-effort group read.
///
/// - On success: logs, returns [`Group::Collected`]
/// - On error: logs a warning, returns [`Group::Missing`] with the reason
///
/// # Examples
///
/// ```no_run
/// # use lotus_exporter::collectors::*;
/// # async fn example(ctx: &CollectionContext<'_>) {
/// let sync = fetch_group("sync state", chain::sync_states(ctx)).await;
/// if let Some(workers) = sync.get() {
///     println!("{} active sync workers", workers.len());
/// }
/// # }
/// ```
pub async fn fetch_group<T, F, E>(name: &str, query: F) -> Group<T>
where
    F: std::future::Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    match query.await {
        Ok(value) => {
            debug!("Collected {}", name);
            Group::Collected(value)
        }
        Err(e) => {
            warn!("Failed to collect {}: {}", name, e);
            Group::Missing(e.to_string())
        }
    }
}

/// Run one full pass: open both sessions, collect, release both sessions.
///
/// Sessions are closed on every exit path, including collection failures.
pub async fn run_pass(connector: &dyn Connector, options: &CollectOptions) -> Result<Snapshot> {
    let daemon = connector.open_daemon().await?;
    let miner = match connector.open_miner().await {
        Ok(miner) => miner,
        Err(e) => {
            daemon.close().await;
            return Err(e);
        }
    };

    let result = collect_snapshot(daemon.as_ref(), miner.as_ref(), options).await;

    daemon.close().await;
    miner.close().await;

    result
}

/// Collect one snapshot from already-open sessions.
pub async fn collect_snapshot(
    daemon: &dyn FullNodeApi,
    miner: &dyn MinerApi,
    options: &CollectOptions,
) -> Result<Snapshot> {
    let local_time = unix_now();

    let miner_id = miner::resolve_identity(miner).await?;
    let chain = chain::resolve_reference(daemon).await?;

    let ctx = CollectionContext {
        daemon,
        miner,
        chain: &chain,
        miner_id: &miner_id,
    };

    let daemon_info = fetch_group("daemon info", chain::daemon_info(&ctx)).await;
    let miner_version = fetch_group("miner version", miner::miner_version(&ctx)).await;
    let provider = miner::provider_info(&ctx, options).await?;
    let power = fetch_group("power", miner::power(&ctx)).await;
    let eligibility = fetch_group("mining eligibility", miner::eligibility(&ctx)).await;
    let sync = fetch_group("sync state", chain::sync_states(&ctx)).await;

    let watched = wallet::watched_addresses(provider.get(), options);
    let mpool = fetch_group("mpool", mpool::pending(&ctx, watched.as_ref())).await;

    let targets = wallet::wallet_targets(&miner_id, provider.get(), options);
    let wallets = fetch_group("wallet balances", wallet::balances(&ctx, &targets)).await;

    let locked_funds = fetch_group("locked funds", miner::locked_funds(&ctx)).await;
    let workers = fetch_group("worker stats", worker::resources(&ctx)).await;
    let worker_jobs = fetch_group("worker jobs", worker::job_counts(&ctx)).await;

    let snapshot = Snapshot {
        miner_id,
        local_time,
        chain_height: chain.height(),
        chain_base_fee: chain.base_fee(),
        daemon: daemon_info,
        miner_version,
        provider,
        power,
        eligibility,
        sync,
        mpool,
        wallets,
        locked_funds,
        workers,
        worker_jobs,
    };

    let missing: Vec<&str> = snapshot
        .group_status()
        .into_iter()
        .filter(|(_, collected)| !collected)
        .map(|(name, _)| name)
        .collect();

    if missing.is_empty() {
        info!(
            "Collected snapshot for {} at height {}",
            snapshot.miner_id, snapshot.chain_height
        );
    } else {
        warn!(
            "Collected degraded snapshot for {} at height {} (missing: {})",
            snapshot.miner_id,
            snapshot.chain_height,
            missing.join(", ")
        );
    }

    Ok(snapshot)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
