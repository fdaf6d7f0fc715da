//! Miner Collector
//!
//! Reads the storage provider's identity, control structure, power, mining
//! eligibility and locked funds.
//!
//! # Metrics Fed
//! - `lotus_miner_info` - owner/worker/control0 actors and addresses
//! - `lotus_miner_info_sector_size` - sector size in bytes
//! - `lotus_power` - provider and network power
//!   - Labels: scope (miner, network), power_type (RawBytePower, QualityAdjPower)
//! - `lotus_power_mining_eligibility` - 1 when eligible to produce a block
//! - `lotus_wallet_locked_balance` - locked fund buckets
//!   - Labels: locked_type

use super::{CollectOptions, CollectionContext};
use crate::actors::decode_actor_code;
use crate::derive::{atto_to_fil_decimal, parse_sector_size, parse_token_amount};
use crate::error::{ExporterError, Result};
use crate::lotus::types::MinerActorState;
use crate::lotus::MinerApi;
use crate::snapshot::{
    AccountRef, Group, LockedBucket, LockedFunds, LockedKind, PowerSample, ProviderInfo,
};
use tracing::{info, warn};

/// Provider actor address. Failure is fatal to the pass.
pub async fn resolve_identity(miner: &dyn MinerApi) -> Result<String> {
    let address = miner.actor_address().await?;
    let address = address.trim().to_string();
    if address.is_empty() {
        return Err(ExporterError::LotusApi(
            "lotus-miner returned an empty actor address".to_string(),
        ));
    }
    Ok(address)
}

pub async fn miner_version(ctx: &CollectionContext<'_>) -> Result<String> {
    Ok(ctx.miner.version().await?.version)
}

/// Provider control structure at the reference.
///
/// The read itself is best-effort, but an unparseable sector size aborts the
/// pass. Account-key lookups that fail fall back to the raw actor id.
pub async fn provider_info(
    ctx: &CollectionContext<'_>,
    options: &CollectOptions,
) -> Result<Group<ProviderInfo>> {
    let info = match ctx.daemon.miner_info(ctx.miner_id, ctx.chain.key()).await {
        Ok(info) => info,
        Err(e) => {
            warn!("Failed to collect provider info: {}", e);
            return Ok(Group::Missing(e.to_string()));
        }
    };

    let sector_size = parse_sector_size(&info.sector_size.as_text())?;

    let owner = resolve_account(ctx, "owner", &info.owner).await;
    let worker = resolve_account(ctx, "worker", &info.worker).await;
    let control0 = match info
        .control_addresses
        .as_deref()
        .and_then(|controls| controls.first())
    {
        Some(control) => Some(resolve_account(ctx, "control0", control).await),
        None => None,
    };

    let chain_owner_id = owner.id.clone();
    let chain_owner_address = owner.address.clone();
    let owner = AccountRef {
        id: options.owner_id.clone().unwrap_or(owner.id),
        address: options.owner_addr.clone().unwrap_or(owner.address),
    };

    info!(
        "Provider {}: owner {} worker {} sector size {}",
        ctx.miner_id, owner.id, worker.id, sector_size
    );

    Ok(Group::Collected(ProviderInfo {
        owner,
        chain_owner_id,
        chain_owner_address,
        worker,
        control0,
        sector_size,
    }))
}

async fn resolve_account(ctx: &CollectionContext<'_>, role: &str, actor: &str) -> AccountRef {
    let address = match ctx.daemon.account_key(actor, ctx.chain.key()).await {
        Ok(address) => address,
        Err(e) => {
            warn!(
                "Failed to resolve {} account key for {}, using actor id: {}",
                role, actor, e
            );
            actor.to_string()
        }
    };

    AccountRef {
        id: actor.to_string(),
        address,
    }
}

pub async fn power(ctx: &CollectionContext<'_>) -> Result<PowerSample> {
    let power = ctx.daemon.miner_power(ctx.miner_id, ctx.chain.key()).await?;

    Ok(PowerSample {
        miner_raw: parse_token_amount(&power.miner_power.raw_byte_power)?,
        miner_quality_adjusted: parse_token_amount(&power.miner_power.quality_adj_power)?,
        network_raw: parse_token_amount(&power.total_power.raw_byte_power)?,
        network_quality_adjusted: parse_token_amount(&power.total_power.quality_adj_power)?,
    })
}

/// Eligibility at the reference height. No base info means not eligible.
pub async fn eligibility(ctx: &CollectionContext<'_>) -> Result<bool> {
    let base_info = ctx
        .daemon
        .mining_base_info(ctx.miner_id, ctx.chain.height(), ctx.chain.key())
        .await?;
    Ok(base_info.is_some_and(|info| info.eligible_for_mining))
}

pub async fn locked_funds(ctx: &CollectionContext<'_>) -> Result<LockedFunds> {
    let state = ctx.daemon.miner_state(ctx.miner_id, ctx.chain.key()).await?;
    let state_version = decode_actor_code(&state.code.root).map(|code| code.version);

    let mut buckets = Vec::with_capacity(LockedKind::ALL.len());
    let mut missing = Vec::new();

    for kind in LockedKind::ALL {
        match bucket_amount(&state.state, kind) {
            Some(amount) => {
                let atto = parse_token_amount(amount)?;
                buckets.push(LockedBucket {
                    kind,
                    balance_fil: atto_to_fil_decimal(atto)?,
                });
            }
            None => missing.push(kind),
        }
    }

    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|kind| kind.label()).collect();
        warn!(
            "Miner state (actors v{}) has no {} bucket(s)",
            state_version.map_or_else(|| "?".to_string(), |v| v.to_string()),
            names.join(", ")
        );
    }

    Ok(LockedFunds {
        state_version,
        buckets,
        missing,
    })
}

fn bucket_amount(state: &MinerActorState, kind: LockedKind) -> Option<&str> {
    match kind {
        LockedKind::PreCommitDeposits => state.pre_commit_deposits.as_deref(),
        LockedKind::LockedFunds => state.locked_funds.as_deref(),
        LockedKind::FeeDebt => state.fee_debt.as_deref(),
        LockedKind::InitialPledge => state.initial_pledge.as_deref(),
    }
}
