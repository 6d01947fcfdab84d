//! End-to-end scenarios from `spec.md` §8 that need the node/simulation
//! layer rather than the pure governance primitives (see
//! `ledgerlab-governance/tests/integration_test.rs` for scenarios 2-5).

use ledgerlab_consensus::fork_resolution;
use ledgerlab_core::{Block, BlockId, BlockType, NodeId, RedactionPolicy, RedactionType, Role};
use ledgerlab_node::{BlockRow, Statistics};
use ledgerlab_test_suite::seeded_rng;
use num_bigint::BigUint;
use std::collections::BTreeMap;

fn bare_block(miner: NodeId, depth: u64, id: u64, previous: u64) -> Block {
    Block {
        depth,
        id: BlockId(BigUint::from(id)),
        previous: BlockId(BigUint::from(previous)),
        timestamp: depth as f64 * 600.0,
        miner,
        size_mb: 0.5,
        transactions: Vec::new(),
        r: BigUint::from(0u32),
        original_hash: BlockId(BigUint::from(id)),
        block_type: if depth == 0 { BlockType::Genesis } else { BlockType::Normal },
        redaction_history: Vec::new(),
        contract_calls: Vec::new(),
        smart_contracts: Vec::new(),
    }
}

fn chain(miner: NodeId, length: u64) -> Vec<Block> {
    let mut blocks = vec![bare_block(miner, 0, 0, 0)];
    for depth in 1..=length {
        blocks.push(bare_block(miner, depth, depth, depth - 1));
    }
    blocks
}

/// Scenario 6: two miners hold disjoint chains (depth 5 and depth 6, both
/// rooted at the same genesis). Fork resolution picks the depth-6 miner's
/// chain (length 7 including genesis); once that is finalized against the
/// combined block count seen across both branches, 5 of the 11 total
/// blocks committed during the run are stale.
#[test]
fn longest_chain_resolution_picks_seven_block_winner_with_five_stale() {
    let miner_a = NodeId(0);
    let miner_b = NodeId(1);
    let chain_a = chain(miner_a, 5);
    let chain_b = chain(miner_b, 6);

    let resolution = fork_resolution(vec![(miner_a, chain_a.as_slice()), (miner_b, chain_b.as_slice())])
        .expect("two non-empty chains must produce a winner");
    assert_eq!(resolution.winner, miner_b);
    assert_eq!(resolution.chain_length, 7);

    let mut stats = Statistics::new();
    for block in chain_a.iter().skip(1) {
        stats.record_block(
            BlockRow {
                depth: block.depth,
                id: block.id.clone(),
                previous: block.previous.clone(),
                timestamp: block.timestamp,
                miner: block.miner,
                tx_count: 0,
                size_mb: block.size_mb,
            },
            true,
        );
    }
    for block in chain_b.iter().skip(1) {
        stats.record_block(
            BlockRow {
                depth: block.depth,
                id: block.id.clone(),
                previous: block.previous.clone(),
                timestamp: block.timestamp,
                miner: block.miner,
                tx_count: 0,
                size_mb: block.size_mb,
            },
            true,
        );
    }
    assert_eq!(stats.total_blocks, 11);

    stats.finalize_fork_resolution(resolution.chain_length);
    assert_eq!(stats.main_blocks, 6);
    assert_eq!(stats.stale_blocks, 5);
}

/// Scenario 1: a run with `hasMulti = true` and a permissive DELETE policy
/// drives at least one multi-trapdoor delete through the full event loop.
/// Whenever that happens, every node's copy of the redacted block still
/// carries the same `id` as its peers (the invariant our miner-keyed forge
/// fix in `block_commit::execute_approved_redaction` exists to preserve).
#[test]
fn multi_trapdoor_delete_preserves_block_id_across_peers() {
    env_logger::builder().is_test(true).try_init().ok();
    let mut rng = seeded_rng(777);
    let policies = vec![RedactionPolicy {
        policy_id: "delete-everything".to_string(),
        policy_type: RedactionType::Delete,
        conditions: BTreeMap::new(),
        authorized_roles: vec![Role::Admin, Role::Regulator],
        min_approvals: 1,
        time_lock_secs: 0,
    }];

    let config = ledgerlab_node::SimulationConfig {
        num_nodes: 5,
        sim_time: 8_000.0,
        b_interval: 150.0,
        redact_runs: 6,
        has_multi: true,
        redaction_policies: policies,
        ..ledgerlab_node::SimulationConfig::default()
    };

    let mut simulation = ledgerlab_node::Simulation::new(config, &mut rng);
    simulation.run(&mut rng);

    let deletes: Vec<_> = simulation
        .statistics()
        .redaction_rows
        .iter()
        .filter(|row| row.kind == RedactionType::Delete)
        .collect();

    for row in &deletes {
        let depth = row.depth as usize;
        let ids: Vec<_> = simulation
            .nodes()
            .iter()
            .filter_map(|node| node.blockchain.get(depth))
            .map(|block| block.id.clone())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]), "every peer's copy of block {depth} must share one chameleon digest after a delete");
    }
}
