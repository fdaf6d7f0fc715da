//! Mempool Collector
//!
//! Counts pending messages and annotates those sent from the provider's own
//! addresses with their method and recipient actor type.
//!
//! # Metrics Fed
//! - `lotus_mpool_total` - all pending messages
//! - `lotus_mpool_local_total` - pending messages from watched addresses
//! - `lotus_mpool_local_message` - one sample per watched pending message

use super::CollectionContext;
use crate::actors::{classify, MessageClass, UNKNOWN};
use crate::error::Result;
use crate::snapshot::{MpoolMessage, MpoolSummary};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Count the pool and classify messages sent from `watched`.
///
/// With no watched set only the total is reported.
pub async fn pending(
    ctx: &CollectionContext<'_>,
    watched: Option<&BTreeSet<String>>,
) -> Result<MpoolSummary> {
    let pending = ctx.daemon.pending_messages(ctx.chain.key()).await?;
    let total = pending.len();

    let Some(watched) = watched else {
        warn!("Provider addresses unknown, skipping local mpool messages");
        return Ok(MpoolSummary { total, local: None });
    };

    // Recipient address → actor code; several messages usually share a recipient
    let mut codes: HashMap<String, Option<String>> = HashMap::new();
    let mut local = Vec::new();

    for message in pending.into_iter().map(|signed| signed.message) {
        if !watched.contains(&message.from) {
            continue;
        }

        let code = match codes.get(&message.to) {
            Some(code) => code.clone(),
            None => {
                let code = match ctx.daemon.actor(&message.to, ctx.chain.key()).await {
                    Ok(actor) => Some(actor.code.root),
                    Err(e) => {
                        warn!("Failed to look up recipient actor {}: {}", message.to, e);
                        None
                    }
                };
                codes.insert(message.to.clone(), code.clone());
                code
            }
        };

        let class = match code {
            Some(code) => classify(&code, message.method),
            None => MessageClass {
                actor_type: UNKNOWN.to_string(),
                method: UNKNOWN.to_string(),
            },
        };

        local.push(MpoolMessage {
            from: message.from,
            to: message.to,
            nonce: message.nonce,
            value: message.value,
            gas_limit: message.gas_limit,
            gas_fee_cap: message.gas_fee_cap,
            gas_premium: message.gas_premium,
            method: message.method,
            method_name: class.method,
            to_actor_type: class.actor_type,
        });
    }

    Ok(MpoolSummary {
        total,
        local: Some(local),
    })
}
