//! Chain Collector
//!
//! Resolves the pass's chain reference and reads daemon-level state.
//!
//! # Metrics Fed
//! - `lotus_chain_height`, `lotus_chain_basefee` - from the [`ChainReference`]
//! - `lotus_info` - network name, daemon version, network version
//! - `lotus_chain_sync_diff`, `lotus_chain_sync_status` - per sync worker

use super::CollectionContext;
use crate::derive::{parse_token_amount, sync_height_delta};
use crate::error::{ExporterError, Result};
use crate::lotus::types::{TipSet, TipSetKey};
use crate::lotus::FullNodeApi;
use crate::snapshot::{DaemonInfo, SyncState};
use tracing::info;

/// The one tipset every read of a pass is pinned to
#[derive(Debug, Clone)]
pub struct ChainReference {
    key: TipSetKey,
    height: i64,
    base_fee: u128,
}

impl ChainReference {
    /// Build a reference from a chain head, extracting the parent base fee of
    /// its first block.
    pub fn from_tipset(tipset: TipSet) -> Result<Self> {
        let first = tipset.blocks.first().ok_or_else(|| {
            ExporterError::Parse(format!("tipset at height {} has no blocks", tipset.height))
        })?;
        let base_fee = parse_token_amount(&first.parent_base_fee)?;

        Ok(Self {
            key: tipset.key(),
            height: tipset.height,
            base_fee,
        })
    }

    pub fn key(&self) -> &TipSetKey {
        &self.key
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    /// Parent base fee in attoFIL
    pub fn base_fee(&self) -> u128 {
        self.base_fee
    }
}

/// Read the chain head once. Failure is fatal to the pass.
pub async fn resolve_reference(daemon: &dyn FullNodeApi) -> Result<ChainReference> {
    let head = daemon.chain_head().await?;
    let reference = ChainReference::from_tipset(head)?;
    info!("Pinned pass to chain height {}", reference.height());
    Ok(reference)
}

/// Network name, daemon version and network version at the reference
pub async fn daemon_info(ctx: &CollectionContext<'_>) -> Result<DaemonInfo> {
    let network = ctx.daemon.network_name().await?;
    let network_version = ctx.daemon.network_version(ctx.chain.key()).await?;
    let version = ctx.daemon.version().await?;

    Ok(DaemonInfo {
        network,
        version: version.version,
        network_version,
    })
}

/// One entry per active sync worker, labelled by its position.
///
/// Sync state is live daemon state and cannot be pinned to the reference.
pub async fn sync_states(ctx: &CollectionContext<'_>) -> Result<Vec<SyncState>> {
    let status = ctx.daemon.sync_state().await?;

    Ok(status
        .active_syncs
        .iter()
        .enumerate()
        .map(|(index, sync)| {
            let target = sync.target.as_ref().map(|t| t.height).unwrap_or_default();
            let base = sync.base.as_ref().map(|b| b.height).unwrap_or_default();
            SyncState {
                worker: index.to_string(),
                height_delta: sync_height_delta(target, base),
                stage: sync.stage,
            }
        })
        .collect())
}
