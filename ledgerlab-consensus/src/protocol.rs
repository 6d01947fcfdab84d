//! `spec.md` §4.5 Consensus: per-miner next-block-time sampling and
//! longest-chain fork resolution across all nodes.

use ledgerlab_core::{Block, NodeId};
use rand::Rng;
use rand_distr::{Distribution, Exp};

/// `Protocol(node) = expovariate(1 / (Binterval * TotalHashPower /
/// node.hashPower))`: a miner with a larger share of total hash power mines
/// more frequently (smaller mean inter-block time), while the aggregate
/// inter-block interval across all miners tends to `b_interval`.
pub fn next_block_time(
    rng: &mut impl Rng,
    b_interval: f64,
    node_hash_power: f64,
    total_hash_power: f64,
) -> f64 {
    debug_assert!(node_hash_power > 0.0, "only miners sample a next block time");
    let mean = b_interval * total_hash_power / node_hash_power;
    let lambda = 1.0 / mean.max(f64::EPSILON);
    let t = Exp::new(lambda).expect("positive lambda").sample(rng);
    log::trace!("sampled next_block_time={t} for hash_power={node_hash_power}/{total_hash_power}");
    t
}

/// The result of resolving forks across every node's local chain view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkResolution {
    pub winner: NodeId,
    /// Length of the winning chain, genesis included.
    pub chain_length: u64,
}

/// `spec.md` §4.5 `fork_resolution()`: selects the single longest local
/// chain across all nodes, ties broken by lowest owner id.
///
/// Idempotent: re-running it over the same `chains` slice always returns
/// the same `ForkResolution` (the tie-break is deterministic), satisfying
/// the round-trip property in `spec.md` §8.
pub fn fork_resolution<'a>(chains: impl IntoIterator<Item = (NodeId, &'a [Block])>) -> Option<ForkResolution> {
    let resolution = chains
        .into_iter()
        .map(|(id, chain)| (id, chain.len() as u64))
        .max_by(|(id_a, len_a), (id_b, len_b)| {
            len_a
                .cmp(len_b)
                .then_with(|| id_b.0.cmp(&id_a.0)) // lower id wins ties
        })
        .map(|(winner, chain_length)| ForkResolution { winner, chain_length });
    if let Some(r) = &resolution {
        log::debug!("fork resolution: node {} wins with chain_length={}", r.winner, r.chain_length);
    }
    resolution
}
