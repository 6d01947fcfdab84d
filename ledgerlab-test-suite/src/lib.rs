//! Shared test fixtures: a seeded RNG constructor and a small "5-node
//! testing preset", pulled in as a dev-dependency by every other crate in
//! the workspace that needs reproducible fixtures.

use ledgerlab_core::{
    BlockId, Chameleon, ChameleonGroup, ChameleonKeyPair, NodeId, Permission, Role,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Builds a deterministic RNG so that test runs (and the end-to-end
/// scenarios named in `spec.md` §8) are reproducible.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// The group every test fixture shares; mirrors the `Config`-held instance
/// that a real run constructs once.
pub fn test_group() -> ChameleonGroup {
    ChameleonGroup::simulation_default()
}

/// `spec.md` §8 scenario 1 calls for a "5-node testing preset". Returns one
/// keypair per node id `0..count`, generated from the given seeded RNG so
/// the same seed always reproduces the same keys.
pub fn keypairs(count: u64, rng: &mut StdRng) -> Vec<(NodeId, ChameleonKeyPair)> {
    let chameleon = Chameleon::new(test_group());
    (0..count)
        .map(|id| (NodeId(id), chameleon.key_gen(rng)))
        .collect()
}

/// The role assignment the end-to-end scenarios assume: node 0 is the
/// admin, node 1 a regulator, the rest miners (`spec.md` §8 scenario 2:
/// "Admin (node 0) requests...").
pub fn default_role(id: NodeId) -> Role {
    match id.0 {
        0 => Role::Admin,
        1 => Role::Regulator,
        _ => Role::Miner,
    }
}

pub fn permissions_for(role: Role) -> Vec<Permission> {
    match role {
        Role::Admin => vec![
            Permission::Read,
            Permission::Write,
            Permission::Deploy,
            Permission::Redact,
            Permission::Approve,
            Permission::Audit,
        ],
        Role::Regulator => vec![
            Permission::Read,
            Permission::Audit,
            Permission::Redact,
            Permission::Approve,
        ],
        Role::Miner => vec![Permission::Read, Permission::Write, Permission::Mine, Permission::Validate],
        Role::User => vec![Permission::Read, Permission::Write, Permission::Transact],
        Role::Observer => vec![Permission::Read],
    }
}

pub fn genesis_block_id() -> BlockId {
    BlockId(num_bigint::BigUint::from(1u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_rng_is_deterministic() {
        let mut a = seeded_rng(99);
        let mut b = seeded_rng(99);
        let ka = keypairs(3, &mut a);
        let kb = keypairs(3, &mut b);
        assert_eq!(
            ka.iter().map(|(_, k)| k.pk.0.clone()).collect::<Vec<_>>(),
            kb.iter().map(|(_, k)| k.pk.0.clone()).collect::<Vec<_>>()
        );
    }
}
