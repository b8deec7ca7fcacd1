//! Named random streams derived from one seed.
//!
//! Each `(stream, index)` pair hashes to its own `StdRng` seed, so drawing
//! from one stream never shifts another. Parameter sampling and synthetic
//! data both key off this.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngHierarchy {
    seed: u64,
}

impl RngHierarchy {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// First eight bytes of `blake3(seed || stream || index)`.
    pub fn sub_seed(&self, stream: &str, index: u64) -> u64 {
        let digest = blake3::Hasher::new()
            .update(&self.seed.to_le_bytes())
            .update(stream.as_bytes())
            .update(&index.to_le_bytes())
            .finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }

    pub fn rng_for(&self, stream: &str, index: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(stream, index))
    }
}
