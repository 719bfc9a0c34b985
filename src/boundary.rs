// this_file: src/boundary.rs

//! The chunk boundary predicate.
//!
//! Given the key at a tentative split and the byte length accumulated
//! since the previous cut, decides whether to cut here. The key, not the
//! chunk's content, seeds the hash: this makes the cut point a property of
//! document *structure* at that position, so unrelated edits earlier in
//! the document don't shift later cut points and suffixes stay re-usable
//! (history independence).
//!
//! Anti-pattern this module deliberately avoids: re-hashing content bytes
//! to decide a cut. Only the key is hashed.

use xxhash_rust::xxh32::xxh32;

use crate::config::ChunkConfig;

/// Decides whether to cut a chunk at `key`, given `length` bytes
/// accumulated since the previous cut, for tree `level` (0 = leaves).
///
/// Pure function of `(key, length, level, config)`: the same inputs
/// always produce the same decision.
pub fn should_cut(config: &ChunkConfig, level: usize, key: &[u8], length: usize) -> bool {
    let (min, max, target) = config.bounds_for_level(level);
    if length < min {
        return false;
    }
    if length >= max {
        return true;
    }
    let salt = config.salt_for_level(level);
    let hash = xxh32(key, salt);
    weibull_accept(hash, length, min, target)
}

/// A Weibull-distributed acceptance test, seeded by a 32-bit hash of the
/// key rather than a true random draw: treat `hash` as a uniform sample in
/// `[0, 1)`, invert the Weibull CDF for a shape that makes chunk sizes
/// roughly exponential with a soft mean at `target`, and accept once the
/// inverted sample is at or below the distance already travelled past
/// `min` (normalized against `target - min`).
///
/// Shape parameter `k = 1.0` reduces the Weibull distribution to the
/// exponential distribution, which is the classical content-defined
/// chunking choice (memoryless splitting probability per byte).
fn weibull_accept(hash: u32, length: usize, min: usize, target: usize) -> bool {
    const SHAPE: f64 = 1.0;
    let scale = (target.saturating_sub(min)).max(1) as f64;
    let progressed = (length.saturating_sub(min)) as f64;

    // u in (0, 1]: avoid exactly 0.0 so ln() below stays finite.
    let u = (f64::from(hash) + 1.0) / (f64::from(u32::MAX) + 2.0);

    // Inverse Weibull CDF: x = scale * (-ln(1 - p))^(1/shape), evaluated at
    // p = 1 - u so that a uniformly distributed hash yields a
    // Weibull-distributed threshold directly.
    let threshold = scale * (-u.ln()).powf(1.0 / SHAPE);

    progressed >= threshold
}
