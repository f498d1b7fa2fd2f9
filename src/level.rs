//! Randomized tower heights.
//!
//! Heights follow a geometric distribution: start at 1 and keep growing
//! while a 16-bit draw lands below [`CONTINUE_BELOW`]. With the threshold at
//! half the 16-bit range the continue probability is exactly 1/2, so the
//! expected height is 2 and a list of `n` entries uses about `log2(n)`
//! levels.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::MAX_LEVEL;

/// A 16-bit draw strictly below this value adds one more level.
const CONTINUE_BELOW: u16 = 0x8000;

/// Source of tower heights for newly inserted entries.
#[derive(Clone, Debug)]
pub(crate) struct LevelGenerator {
    rng: StdRng,
}

impl LevelGenerator {
    pub(crate) fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub(crate) fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw a tower height in `1..=MAX_LEVEL`.
    pub(crate) fn next_height(&mut self) -> usize {
        let mut height = 1;
        while height < MAX_LEVEL && self.rng.gen::<u16>() < CONTINUE_BELOW {
            height += 1;
        }
        height
    }
}
