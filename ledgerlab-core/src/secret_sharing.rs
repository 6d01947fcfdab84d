//! Secret-sharing stub for multi-trapdoor redaction (`spec.md` §4.1).
//!
//! The source models the share-propagation latency of a real threshold
//! scheme with a 5 ms sleep but never actually shards the key. Per §5's
//! guidance, this implementation keeps that observable latency but expresses
//! it as a `Duration` the caller feeds into `Statistics`/the event queue,
//! rather than blocking the thread — the simulator stays purely logical.

use crate::chameleon::ChameleonSecretKey;
use std::time::Duration;

/// One party's share of a secret key. Opaque: no implementation here
/// reconstructs the key from shares, matching the source's "side effect
/// only" stub (see `DESIGN.md`'s Open Question on threshold forgery).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share(pub Vec<u8>);

/// `spec.md` §4.1: "`SecretSharing.secret_share(SK, minimum, shares)` is a
/// stub interface returning a share list; an implementation may substitute
/// real Shamir sharing without altering semantics."
pub trait SecretSharing {
    /// Splits `sk` into `shares` shares of which `minimum` reconstruct it.
    /// Returns the shares plus the modeled latency of distributing them.
    fn secret_share(&self, sk: &ChameleonSecretKey, minimum: u32, shares: u32) -> (Vec<Share>, Duration);
}

/// The stub used by the simulator: placeholder shares, modeled latency only.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubSecretSharing;

const SHARE_PROPAGATION_LATENCY: Duration = Duration::from_millis(5);

impl SecretSharing for StubSecretSharing {
    fn secret_share(&self, sk: &ChameleonSecretKey, minimum: u32, shares: u32) -> (Vec<Share>, Duration) {
        let payload = sk.0.to_bytes_be();
        let out = (0..shares)
            .map(|i| Share(vec![i as u8; payload.len().max(1)]))
            .collect();
        debug_assert!(minimum <= shares, "threshold cannot exceed share count");
        (out, SHARE_PROPAGATION_LATENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chameleon::{Chameleon, ChameleonGroup};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn stub_returns_requested_share_count_and_fixed_latency() {
        let c = Chameleon::new(ChameleonGroup::simulation_default());
        let mut rng = StdRng::seed_from_u64(1);
        let keys = c.key_gen(&mut rng);
        let (shares, latency) = StubSecretSharing.secret_share(&keys.sk, 3, 5);
        assert_eq!(shares.len(), 5);
        assert_eq!(latency, SHARE_PROPAGATION_LATENCY);
    }
}
