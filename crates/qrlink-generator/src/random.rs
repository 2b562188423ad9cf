use crate::Generator;
use parking_lot::Mutex;
use qrlink_core::ShortCode;
use rand::distr::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Length of generated codes.
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Draws codes uniformly from `[A-Za-z0-9]`.
#[derive(Debug)]
pub struct RandomGenerator {
    rng: Mutex<StdRng>,
    length: usize,
}

impl RandomGenerator {
    /// Creates a generator seeded from the operating system.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Creates a deterministic generator, for tests and reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    /// Overrides the code length.
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length.max(1);
        self
    }

    pub fn length(&self) -> usize {
        self.length
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            length: DEFAULT_CODE_LENGTH,
        }
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for RandomGenerator {
    type Output = ShortCode;

    fn generate(&self) -> ShortCode {
        let mut rng = self.rng.lock();
        let code: String = (&mut *rng)
            .sample_iter(Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect();
        ShortCode::new_unchecked(code)
    }
}
