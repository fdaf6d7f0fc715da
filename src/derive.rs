//! Derivation Functions
//!
//! Pure functions computing secondary values from raw chain and worker data.
//!
//! Two FIL scalings coexist on purpose:
//! - [`atto_to_fil_truncated`] backs the headline wallet balance and drops the
//!   sub-FIL remainder (integer division).
//! - [`atto_to_fil_decimal`] backs the locked-funds buckets and keeps the
//!   fractional part.

use crate::error::{ExporterError, Result};

/// attoFIL per FIL
pub const ATTO_PER_FIL: u128 = 1_000_000_000_000_000_000;

/// Reported instead of a lag when a sync worker's target is below its base
pub const SYNC_ANOMALY: i64 = -1;

/// Height difference between a sync worker's target and base.
///
/// Returns [`SYNC_ANOMALY`] when the target is behind the base; callers must
/// treat it as an anomaly code, not as "ahead by one".
pub fn sync_height_delta(target: i64, base: i64) -> i64 {
    if target >= base {
        target - base
    } else {
        SYNC_ANOMALY
    }
}

/// Mining eligibility as a gauge value
pub fn eligibility_flag(eligible: bool) -> u8 {
    if eligible {
        1
    } else {
        0
    }
}

/// Whole FIL from attoFIL, truncating toward zero
pub fn atto_to_fil_truncated(atto: u128) -> u128 {
    atto / ATTO_PER_FIL
}

/// FIL from attoFIL keeping the fractional part.
///
/// The amount is rendered as a unitless decimal string (`"1.5"`) and parsed,
/// so precision follows `f64` decimal parsing rather than float division.
pub fn atto_to_fil_decimal(atto: u128) -> Result<f64> {
    let whole = atto / ATTO_PER_FIL;
    let fraction = atto % ATTO_PER_FIL;

    let unitless = if fraction == 0 {
        whole.to_string()
    } else {
        let digits = format!("{:018}", fraction);
        format!("{}.{}", whole, digits.trim_end_matches('0'))
    };

    unitless
        .parse::<f64>()
        .map_err(|e| ExporterError::Parse(format!("FIL amount {}: {}", unitless, e)))
}

/// Parse a non-negative big-integer amount (attoFIL, bytes of power) sent as a
/// decimal string.
pub fn parse_token_amount(text: &str) -> Result<u128> {
    text.trim()
        .parse::<u128>()
        .map_err(|e| ExporterError::Parse(format!("amount {:?}: {}", text, e)))
}

/// Memory held beyond what in-flight tasks claim: `max(0, used - floor)`
pub fn reserved_memory(used: u64, task_floor: u64) -> u64 {
    used.saturating_sub(task_floor)
}

/// Sector size in bytes from its textual byte count, e.g. `"34359738368"`
pub fn parse_sector_size(text: &str) -> Result<u64> {
    text.trim()
        .parse::<u64>()
        .map_err(|e| ExporterError::Parse(format!("sector size {:?}: {}", text, e)))
}

/// GPU in-use flag from the worker's self-reported usage
pub fn gpu_used_flag(gpu_used: f64) -> u8 {
    if gpu_used > 0.0 {
        1
    } else {
        0
    }
}
