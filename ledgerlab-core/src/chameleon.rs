//! Chameleon hash over a small prime-order subgroup of `Z_p*`.
//!
//! `spec.md` §4.1 is explicit that this is a simulation-only primitive (the
//! crate's Non-goals rule out production-grade cryptographic security), so
//! the group parameters below are deliberately tiny: `p = 23`, `q = 11`,
//! `g = 2`, a hand-verified safe-prime group (`p = 2q + 1`, both prime, `g`
//! of order exactly `q`). Swapping in a production-sized safe prime would
//! not change any call site — every operation goes through `BigUint`.

use crate::error::CoreError;
use crate::ids::{BlockId, MessageDigest};
use num_bigint::BigUint;
use num_traits::{One, ToPrimitive};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Public parameters of the chameleon-hash group, shared by every node in a
/// simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChameleonGroup {
    pub p: BigUint,
    pub q: BigUint,
    pub g: BigUint,
}

impl ChameleonGroup {
    /// The fixed toy group used by default. One instance is constructed at
    /// `Config` build time and shared (by clone; `BigUint` is cheap at this
    /// size) across every node's keypair.
    pub fn simulation_default() -> Self {
        ChameleonGroup {
            p: BigUint::from(23u32),
            q: BigUint::from(11u32),
            g: BigUint::from(2u32),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChameleonSecretKey(pub BigUint);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChameleonPublicKey(pub BigUint);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChameleonKeyPair {
    pub pk: ChameleonPublicKey,
    pub sk: ChameleonSecretKey,
}

/// The chameleon-hash operations of `spec.md` §4.1: `KeyGen`, `Hash`,
/// `Forge`. Bound to one `ChameleonGroup` so every call site threads the
/// same public parameters.
#[derive(Debug, Clone)]
pub struct Chameleon {
    group: ChameleonGroup,
}

impl Chameleon {
    pub fn new(group: ChameleonGroup) -> Self {
        Chameleon { group }
    }

    pub fn group(&self) -> &ChameleonGroup {
        &self.group
    }

    /// `KeyGen` — `SK ∈ [1, q-1]`, `PK = g^SK mod p`.
    pub fn key_gen(&self, rng: &mut impl Rng) -> ChameleonKeyPair {
        let q_minus_one: u64 = (&self.group.q - BigUint::one())
            .to_u64()
            .expect("toy group order fits in u64");
        let sk_value = rng.gen_range(1..=q_minus_one);
        let sk = BigUint::from(sk_value);
        let pk = self.group.g.modpow(&sk, &self.group.p);
        ChameleonKeyPair {
            pk: ChameleonPublicKey(pk),
            sk: ChameleonSecretKey(sk),
        }
    }

    /// Draws a fresh randomness `r ∈ [1, q]`, as `spec.md` §4.7 step 5
    /// requires before (re)computing a block's `id`.
    pub fn random_r(&self, rng: &mut impl Rng) -> BigUint {
        let q_value: u64 = self
            .group
            .q
            .to_u64()
            .expect("toy group order fits in u64");
        BigUint::from(rng.gen_range(1..=q_value))
    }

    /// `Hash(PK, m, r) = g^m · PK^r mod p`.
    pub fn hash(&self, pk: &ChameleonPublicKey, m: &MessageDigest, r: &BigUint) -> BlockId {
        let m_int = m.to_biguint();
        let left = self.group.g.modpow(&m_int, &self.group.p);
        let right = pk.0.modpow(r, &self.group.p);
        BlockId((left * right) % &self.group.p)
    }

    /// `Forge(SK, m1, r1, m2) -> r2` such that `Hash(PK, m1, r1) = Hash(PK,
    /// m2, r2)`. Solves `r2 = r1 + (m1 - m2) * SK^-1 mod q`.
    pub fn forge(
        &self,
        sk: &ChameleonSecretKey,
        m1: &MessageDigest,
        r1: &BigUint,
        m2: &MessageDigest,
    ) -> BigUint {
        let q = &self.group.q;
        let m1_mod = m1.to_biguint() % q;
        let m2_mod = m2.to_biguint() % q;
        let sk_inv = mod_inverse(&sk.0, q);
        let diff = mod_sub(&m1_mod, &m2_mod, q);
        let r1_mod = r1 % q;
        (r1_mod + diff * sk_inv) % q
    }

    /// Verifies the forge law from `spec.md` §8, asserting rather than
    /// returning a recoverable error: a mismatch here means the forging
    /// arithmetic has a bug, which is a `CryptoInvariantViolation`.
    pub fn assert_forge_preserves_digest(
        &self,
        pk: &ChameleonPublicKey,
        m1: &MessageDigest,
        r1: &BigUint,
        m2: &MessageDigest,
        r2: &BigUint,
    ) -> Result<(), CoreError> {
        let original = self.hash(pk, m1, r1);
        let forged = self.hash(pk, m2, r2);
        if original == forged {
            Ok(())
        } else {
            Err(CoreError::CryptoInvariantViolation)
        }
    }
}

/// Modular inverse via Fermat's little theorem (`q` is prime): `a^-1 =
/// a^(q-2) mod q`.
fn mod_inverse(a: &BigUint, q: &BigUint) -> BigUint {
    let exponent = q - BigUint::from(2u32);
    a.modpow(&exponent, q)
}

/// Subtraction mod `q` that stays non-negative (`BigUint` cannot represent
/// negative values).
fn mod_sub(a: &BigUint, b: &BigUint, q: &BigUint) -> BigUint {
    if a >= b {
        (a - b) % q
    } else {
        (a + q - b) % q
    }
}

impl Default for ChameleonGroup {
    fn default() -> Self {
        Self::simulation_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn chameleon() -> Chameleon {
        Chameleon::new(ChameleonGroup::simulation_default())
    }

    #[test]
    fn forge_law_holds_for_arbitrary_messages() {
        let c = chameleon();
        let mut rng = StdRng::seed_from_u64(42);
        let keys = c.key_gen(&mut rng);
        let m1 = MessageDigest::hash(b"original transactions");
        let m2 = MessageDigest::hash(b"redacted transactions");
        let r1 = c.random_r(&mut rng);

        let r2 = c.forge(&keys.sk, &m1, &r1, &m2);

        let original = c.hash(&keys.pk, &m1, &r1);
        let forged = c.hash(&keys.pk, &m2, &r2);
        assert_eq!(original, forged);
        c.assert_forge_preserves_digest(&keys.pk, &m1, &r1, &m2, &r2)
            .unwrap();
    }

    #[test]
    fn different_keypairs_produce_different_digests() {
        let c = chameleon();
        let mut rng = StdRng::seed_from_u64(7);
        let a = c.key_gen(&mut rng);
        let b = c.key_gen(&mut rng);
        let m = MessageDigest::hash(b"tx");
        let r = c.random_r(&mut rng);
        assert_ne!(a.pk.0, b.pk.0);
        let _ = (c.hash(&a.pk, &m, &r), c.hash(&b.pk, &m, &r));
    }
}
