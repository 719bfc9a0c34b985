// this_file: src/config.rs

//! Process-wide tunables for the chunker.
//!
//! These are the "global salt table and min/max chunk size" constants
//! spec'd as build-time configuration: changing them changes on-disk
//! compatibility. [`ChunkConfig::PRODUCTION`] documents the values this
//! crate considers format-stable; tests may build other configs to
//! exercise splitting behavior without enormous fixtures.

/// Number of tree levels for which a distinct hash salt is pre-defined.
/// Levels beyond this derive their salt by folding the level index into
/// the last defined salt, so the predicate is still total over arbitrary
/// tree heights.
pub const SALT_TABLE_LEN: usize = 8;

/// Size bounds and hashing salts for the boundary predicate, per tree
/// level (level 0 is leaves, level >= 1 is interior nodes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Minimum chunk size in bytes at level 0. Below this, the boundary
    /// predicate never cuts.
    pub min_chunk_size: usize,
    /// Maximum chunk size in bytes at level 0. At or above this, the
    /// boundary predicate always cuts.
    pub max_chunk_size: usize,
    /// Target mean chunk size in bytes at level 0, used to parameterize
    /// the Weibull acceptance test.
    pub target_chunk_size: usize,
    /// Per-level hash salts, `level_salt[0]` for leaves, `level_salt[1]`
    /// for the first interior level, and so on.
    pub level_salt: [u32; SALT_TABLE_LEN],
    /// Multiplier applied to `min/max/target_chunk_size` at each interior
    /// level beyond the first, so higher levels have proportionally
    /// larger target fan-out.
    pub level_size_multiplier: usize,
}

impl ChunkConfig {
    /// The on-disk-format-stable configuration. Changing any field here
    /// changes how existing stores are interpreted; do not alter these
    /// without a format migration.
    pub const PRODUCTION: ChunkConfig = ChunkConfig {
        min_chunk_size: 1 << 11,
        max_chunk_size: 1 << 15,
        target_chunk_size: 1 << 12,
        level_salt: [
            0x5a2d_1b3f,
            0x9e17_4cd1,
            0x2f6a_88b3,
            0x7c3d_e145,
            0x1a9f_6622,
            0x4d8b_c037,
            0x63e2_9a5d,
            0x0b71_f4aa,
        ],
        level_size_multiplier: 4,
    };

    /// The bounds for a given tree level, scaling the level-0 bounds by
    /// [`ChunkConfig::level_size_multiplier`] for each level above the
    /// first interior level.
    pub fn bounds_for_level(&self, level: usize) -> (usize, usize, usize) {
        if level == 0 {
            return (self.min_chunk_size, self.max_chunk_size, self.target_chunk_size);
        }
        let scale = self.level_size_multiplier.saturating_pow(level as u32 - 1).max(1);
        (
            self.min_chunk_size.saturating_mul(scale),
            self.max_chunk_size.saturating_mul(scale),
            self.target_chunk_size.saturating_mul(scale),
        )
    }

    /// The hash salt for a given tree level, folding the level index into
    /// the last table entry once the level exceeds the table's length.
    pub fn salt_for_level(&self, level: usize) -> u32 {
        if level < SALT_TABLE_LEN {
            self.level_salt[level]
        } else {
            self.level_salt[SALT_TABLE_LEN - 1] ^ (level as u32).wrapping_mul(0x9e37_79b9)
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self::PRODUCTION
    }
}
