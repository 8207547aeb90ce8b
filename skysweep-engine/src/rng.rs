//! Deterministic bundle of RNG streams segregated by overlay concern.
//!
//! The reveal shuffle and the final pick draw from independent seed-derived
//! streams, so replaying a session seed reproduces a scan bit-for-bit and the
//! two random decisions cannot perturb each other.

use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use sha2::Sha256;
use std::cell::{RefCell, RefMut};

/// Per-concern RNG streams derived from one user-visible seed.
#[derive(Debug, Clone)]
pub struct RngBundle {
    reveal: RefCell<CountingRng<SmallRng>>,
    pick: RefCell<CountingRng<SmallRng>>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        let reveal = CountingRng::new(derive_stream_seed(seed, b"reveal"));
        let pick = CountingRng::new(derive_stream_seed(seed, b"pick"));
        Self {
            reveal: RefCell::new(reveal),
            pick: RefCell::new(pick),
        }
    }

    /// Access the reveal-order shuffle stream.
    #[must_use]
    pub fn reveal(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.reveal.borrow_mut()
    }

    /// Access the final-pick stream.
    #[must_use]
    pub fn pick(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.pick.borrow_mut()
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let seed_bytes: [u8; 8] = digest[..8].try_into().expect("digest slice length");
    u64::from_le_bytes(seed_bytes)
}
