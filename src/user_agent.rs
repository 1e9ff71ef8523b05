//! Shared User-Agent pool for outbound lookup traffic.
//!
//! The target sites fingerprint repeated identical signatures, so every
//! attempt draws a fresh browser User-Agent from a fixed pool instead of
//! advertising a static string. Rotation is the only identity variation
//! performed; there is no proxy cycling or header spoofing beyond this.

use rand::Rng;

/// Browser User-Agent strings rotated across attempts.
const USER_AGENT_POOL: [&str; 4] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64; rv:132.0) Gecko/20100101 Firefox/132.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 \
     (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
];

/// Picks a User-Agent from the pool at random.
///
/// Each retry attempt calls this again, so consecutive attempts against the
/// same endpoint usually present different signatures.
#[must_use]
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENT_POOL[rng.gen_range(0..USER_AGENT_POOL.len())]
}
