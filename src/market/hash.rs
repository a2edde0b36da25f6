//! Stable string hashing used to derive every pseudo-random input of the oracle.
//!
//! The oracle keeps no RNG state: phases, noise draws and event parameters are
//! all `unit(fnv1a(key))` for a key built from the seed, the symbol, a label and
//! optionally an hour bucket or event slot. The hash is 32-bit FNV-1a over the
//! UTF-8 bytes of the key and must not change, or every generated price moves.

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Seed mixed into every oracle key.
pub const ORACLE_SEED: &str = "farmhand-commodities-v1";

/// 32-bit FNV-1a.
#[must_use]
pub fn fnv1a(input: &str) -> u32 {
    input.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Maps a hash onto `[0, 1)`.
#[must_use]
pub fn unit(hash: u32) -> f64 {
    f64::from(hash) / 4_294_967_296.0
}

/// Draw for a bucket-independent key, e.g. the phase of a cycle.
#[must_use]
pub fn draw(symbol: &str, label: &str) -> f64 {
    unit(fnv1a(&format!("{ORACLE_SEED}|{symbol}|{label}")))
}

/// Draw for a key that also depends on a bucket or slot index.
#[must_use]
pub fn draw_at(symbol: &str, label: &str, index: i64) -> f64 {
    unit(fnv1a(&format!("{ORACLE_SEED}|{symbol}|{label}|{index}")))
}
