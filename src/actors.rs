//! Actor Method Classifier
//!
//! Turns a message's numeric method selector plus the recipient's actor code CID
//! into human-readable labels for the mempool metrics.
//!
//! Builtin actor code CIDs are identity-hashed: the CID bytes carry the actor path
//! (`fil/<version>/<kind>`) verbatim, so the actor kind can be read back without
//! any network lookup. The kind then selects a method list whose position is the
//! method selector (selector 0 is always `Constructor`).
//!
//! Classification is best-effort annotation: anything that cannot be resolved is
//! labelled [`UNKNOWN`] rather than failing the mempool fetch.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Label used for anything the classifier cannot resolve
pub const UNKNOWN: &str = "unknown";

const ACCOUNT: &[&str] = &["Constructor", "Constructor"];
const INIT: &[&str] = &["Constructor", "Exec"];
const CRON: &[&str] = &["Constructor", "EpochTick"];
const REWARD: &[&str] = &[
    "Constructor",
    "AwardBlockReward",
    "ThisEpochReward",
    "UpdateNetworkKPI",
];
const MULTISIG: &[&str] = &[
    "Constructor",
    "Propose",
    "Approve",
    "Cancel",
    "AddSigner",
    "RemoveSigner",
    "SwapSigner",
    "ChangeNumApprovalsThreshold",
    "LockBalance",
];
const PAYMENT_CHANNEL: &[&str] = &["Constructor", "UpdateChannelState", "Settle", "Collect"];
const STORAGE_MARKET: &[&str] = &[
    "Constructor",
    "AddBalance",
    "WithdrawBalance",
    "PublishStorageDeals",
    "VerifyDealsForActivation",
    "ActivateDeals",
    "OnMinerSectorsTerminate",
    "ComputeDataCommitment",
    "CronTick",
];
const STORAGE_POWER: &[&str] = &[
    "Constructor",
    "CreateMiner",
    "UpdateClaimedPower",
    "EnrollCronEvent",
    "OnEpochTickEnd",
    "UpdatePledgeTotal",
    "Deprecated1",
    "SubmitPoRepForBulkVerify",
    "CurrentTotalPower",
];
const STORAGE_MINER: &[&str] = &[
    "Constructor",
    "ControlAddresses",
    "ChangeWorkerAddress",
    "ChangePeerID",
    "SubmitWindowedPoSt",
    "PreCommitSector",
    "ProveCommitSector",
    "ExtendSectorExpiration",
    "TerminateSectors",
    "DeclareFaults",
    "DeclareFaultsRecovered",
    "OnDeferredCronEvent",
    "CheckSectorProven",
    "ApplyRewards",
    "ReportConsensusFault",
    "WithdrawBalance",
    "ConfirmSectorProofsValid",
    "ChangeMultiaddrs",
    "CompactPartitions",
    "CompactSectorNumbers",
    "ConfirmUpdateWorkerKey",
    "RepayDebt",
    "ChangeOwnerAddress",
    "DisputeWindowedPoSt",
];
const VERIFIED_REGISTRY: &[&str] = &[
    "Constructor",
    "AddVerifier",
    "RemoveVerifier",
    "AddVerifiedClient",
    "UseBytes",
    "RestoreBytes",
];

/// Actor kind → method names, indexed by method selector
static METHOD_TABLE: LazyLock<HashMap<&'static str, &'static [&'static str]>> =
    LazyLock::new(|| {
        HashMap::from([
            ("account", ACCOUNT),
            ("init", INIT),
            ("cron", CRON),
            ("reward", REWARD),
            ("multisig", MULTISIG),
            ("paymentchannel", PAYMENT_CHANNEL),
            ("storagemarket", STORAGE_MARKET),
            ("storagepower", STORAGE_POWER),
            ("storageminer", STORAGE_MINER),
            ("verifiedregistry", VERIFIED_REGISTRY),
        ])
    });

// CIDv1 header of an identity-hashed raw block: version, raw codec, identity hash
const CID_V1: u8 = 0x01;
const RAW_CODEC: u8 = 0x55;
const IDENTITY_HASH: u8 = 0x00;

/// Builtin actor identity decoded from a code CID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorCode {
    /// Actors version from the path (`fil/<version>/...`)
    pub version: u32,
    /// Actor kind, e.g. `storageminer`
    pub kind: String,
}

/// Labels attached to one pending message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageClass {
    pub actor_type: String,
    pub method: String,
}

/// Decode a builtin actor code CID string such as `bafkqaetgnfwc6mjpon2g64tbm5sw22lomvza`.
///
/// Returns `None` for CIDs that are not identity-hashed builtin actor paths.
pub fn decode_actor_code(code: &str) -> Option<ActorCode> {
    let (_, bytes) = multibase::decode(code).ok()?;

    if bytes.len() < 4 || bytes[0] != CID_V1 || bytes[1] != RAW_CODEC || bytes[2] != IDENTITY_HASH {
        return None;
    }

    let payload_len = bytes[3] as usize;
    let payload = bytes.get(4..4 + payload_len)?;
    let path = std::str::from_utf8(payload).ok()?;

    let mut segments = path.splitn(3, '/');
    if segments.next()? != "fil" {
        return None;
    }
    let version = segments.next()?.parse().ok()?;
    let kind = segments.next()?;
    if kind.is_empty() {
        return None;
    }

    Some(ActorCode {
        version,
        kind: kind.to_string(),
    })
}

/// Method name for `selector` on actors of `kind`
pub fn method_name(kind: &str, selector: u64) -> Option<&'static str> {
    let methods = METHOD_TABLE.get(kind)?;
    let index = usize::try_from(selector).ok()?;
    methods.get(index).copied()
}

/// Classify a message sent to an actor with code CID `code`.
pub fn classify(code: &str, selector: u64) -> MessageClass {
    match decode_actor_code(code) {
        Some(actor) => MessageClass {
            method: method_name(&actor.kind, selector)
                .unwrap_or(UNKNOWN)
                .to_string(),
            actor_type: actor.kind,
        },
        None => MessageClass {
            actor_type: UNKNOWN.to_string(),
            method: UNKNOWN.to_string(),
        },
    }
}
