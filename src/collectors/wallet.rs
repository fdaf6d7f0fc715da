//! Wallet Collector
//!
//! Builds the watched address set and reads wallet balances.
//!
//! # Metrics Fed
//! - `lotus_wallet_balance` - whole FIL, truncated
//!   - Labels: address, name (owning actor id)

use super::{CollectOptions, CollectionContext};
use crate::derive::{atto_to_fil_truncated, parse_token_amount};
use crate::error::{ExporterError, Result};
use crate::snapshot::{ProviderInfo, WalletBalance};
use std::collections::BTreeSet;
use tracing::warn;

/// One address whose balance is read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletTarget {
    pub address: String,
    pub name: String,
}

/// Addresses whose pending messages count as local.
///
/// Both actor ids and key addresses are included since pending messages may name
/// their sender either way. The owner is watched under its chain identity and
/// under any operator override. Without provider info the worker and control
/// addresses are unknown, so there is no usable set.
pub fn watched_addresses(
    provider: Option<&ProviderInfo>,
    options: &CollectOptions,
) -> Option<BTreeSet<String>> {
    let provider = provider?;
    let mut watched = BTreeSet::new();

    watched.insert(provider.chain_owner_id.clone());
    watched.insert(provider.chain_owner_address.clone());
    watched.insert(provider.owner.id.clone());
    watched.insert(provider.worker.id.clone());
    watched.insert(provider.worker.address.clone());
    if let Some(control) = &provider.control0 {
        watched.insert(control.id.clone());
        watched.insert(control.address.clone());
    }
    if let Some(address) = &options.owner_addr {
        watched.insert(address.clone());
    }

    watched.retain(|address| !address.is_empty());
    Some(watched)
}

/// Balances to read: the provider actor, then owner, worker and control0.
///
/// The owner is read at its chain-derived address; an operator override address
/// is read in addition when it differs. Duplicates are dropped.
pub fn wallet_targets(
    miner_id: &str,
    provider: Option<&ProviderInfo>,
    options: &CollectOptions,
) -> Vec<WalletTarget> {
    let mut targets = vec![WalletTarget {
        address: miner_id.to_string(),
        name: miner_id.to_string(),
    }];

    if let Some(provider) = provider {
        targets.push(WalletTarget {
            address: provider.chain_owner_address.clone(),
            name: provider.owner.id.clone(),
        });
        if let Some(address) = &options.owner_addr {
            targets.push(WalletTarget {
                address: address.clone(),
                name: provider.owner.id.clone(),
            });
        }
        targets.push(WalletTarget {
            address: provider.worker.address.clone(),
            name: provider.worker.id.clone(),
        });
        if let Some(control) = &provider.control0 {
            targets.push(WalletTarget {
                address: control.address.clone(),
                name: control.id.clone(),
            });
        }
    }

    let mut seen = BTreeSet::new();
    targets.retain(|target| !target.address.is_empty() && seen.insert(target.address.clone()));
    targets
}

/// Read every target's balance. Individual failures are skipped; the group
/// fails only when no balance could be read at all.
pub async fn balances(
    ctx: &CollectionContext<'_>,
    targets: &[WalletTarget],
) -> Result<Vec<WalletBalance>> {
    let mut balances = Vec::with_capacity(targets.len());
    let mut last_error = None;

    for target in targets {
        let balance = match ctx.daemon.wallet_balance(&target.address).await {
            Ok(text) => parse_token_amount(&text),
            Err(e) => Err(e),
        };

        match balance {
            Ok(atto) => balances.push(WalletBalance {
                address: target.address.clone(),
                name: target.name.clone(),
                balance_fil: atto_to_fil_truncated(atto),
            }),
            Err(e) => {
                warn!("Failed to read balance of {}: {}", target.address, e);
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if balances.is_empty() => Err(ExporterError::LotusApi(format!(
            "no wallet balance could be read: {}",
            e
        ))),
        _ => Ok(balances),
    }
}
