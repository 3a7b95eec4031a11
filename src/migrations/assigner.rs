use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::database::UserRecord;
use crate::migrations::error::BackfillError;

/// Draws colours uniformly from a palette of `palette_size` entries.
///
/// The draw is not cryptographic; it only has to spread users evenly.
/// Seeded assigners repeat the same sequence, which tests rely on.
#[derive(Debug, Clone)]
pub struct ColorAssigner {
    palette_size: u32,
    rng: SmallRng,
}

impl ColorAssigner {
    pub fn seeded(palette_size: u32, seed: u64) -> Result<Self, BackfillError> {
        Self::with_rng(palette_size, SmallRng::seed_from_u64(seed))
    }

    pub fn from_entropy(palette_size: u32) -> Result<Self, BackfillError> {
        Self::with_rng(palette_size, SmallRng::from_rng(&mut rand::rng()))
    }

    fn with_rng(palette_size: u32, rng: SmallRng) -> Result<Self, BackfillError> {
        if palette_size == 0 {
            return Err(BackfillError::EmptyPalette);
        }
        Ok(Self { palette_size, rng })
    }

    pub fn palette_size(&self) -> u32 {
        self.palette_size
    }

    /// Uniform index in `[0, palette_size)`
    pub fn next_color(&mut self) -> u32 {
        self.rng.random_range(0..self.palette_size)
    }

    /// Write a fresh colour onto `user` and return it
    pub fn assign(&mut self, user: &mut UserRecord) -> u32 {
        let color_id = self.next_color();
        user.set_color_id(color_id);
        color_id
    }
}
