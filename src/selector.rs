use rand::{RngCore, SeedableRng};

const OFFSET: u64 = 12345;
const MULTIPLIER: u64 = 1103515245;
const INCREMENT: u64 = 54321;

/// One step of the linear congruential generator.
fn step(seed: u64) -> u64 {
    OFFSET
        .wrapping_add(seed)
        .wrapping_mul(MULTIPLIER)
        .wrapping_add(INCREMENT)
}

/// Stateless draw: `((12345 + seed) * 1103515245 + 54321) mod max`.
///
/// Used for the imperfect-grid extra link and the wait jitter, where a single
/// reproducible value per seed is wanted. `max` must be non-zero.
pub fn next(max: usize, seed: u64) -> usize {
    debug_assert!(max > 0, "next() called with max = 0");
    if max == 0 {
        return 0;
    }
    (step(seed) % max as u64) as usize
}

/// Seedable pseudo-random generator with explicit state.
///
/// Every draw advances the state with the same recurrence as [`next`].
/// Indices are taken from bits 16 and up, because the lowest bit of this
/// recurrence is fixed by the parity of the seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    state: u64,
}

impl Selector {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Current state, i.e. the seed of the next draw.
    pub fn state(&self) -> u64 {
        self.state
    }

    /// Picks an index in `[0, len)`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "index() called with len = 0");
        if len == 0 {
            return 0;
        }
        self.state = step(self.state);
        ((self.state >> 16) % len as u64) as usize
    }

    /// Picks one element of `items`, or `None` if it is empty.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            let i = self.index(items.len());
            items.get(i)
        }
    }
}

impl RngCore for Selector {
    fn next_u32(&mut self) -> u32 {
        self.state = step(self.state);
        (self.state >> 16) as u32
    }

    fn next_u64(&mut self) -> u64 {
        let hi = u64::from(self.next_u32());
        let lo = u64::from(self.next_u32());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Selector {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }

    // The raw value is the state; no scrambling.
    fn seed_from_u64(state: u64) -> Self {
        Self::new(state)
    }
}
