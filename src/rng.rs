use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::sync::{LazyLock, Mutex, PoisonError};

static DEFAULT_RNG: LazyLock<Mutex<ChaCha12Rng>> =
    LazyLock::new(|| Mutex::new(ChaCha12Rng::from_os_rng()));

/// Reseed the process-wide stream.
///
/// Affects all subsequent draws of every simulator using the default stream.
pub fn set_seed(seed: u64) {
    with_default_rng(|rng| *rng = ChaCha12Rng::seed_from_u64(seed));
}

/// Run `f` with exclusive access to the process-wide stream.
///
/// Draws from several threads interleave in arbitrary order; reproducible
/// multi-threaded runs need one seeded generator per thread.
pub fn with_default_rng<T>(f: impl FnOnce(&mut ChaCha12Rng) -> T) -> T {
    // A panic while holding the lock cannot leave the generator invalid.
    let mut rng = DEFAULT_RNG.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut rng)
}
