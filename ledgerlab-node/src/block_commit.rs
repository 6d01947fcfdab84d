//! `spec.md` §4.7 BlockCommit: the `create_block` / `receive_block` event
//! handlers and the mutable state they share across the whole run.

use crate::contracts::ContractRegistry;
use crate::node::{Node, RedactedTxRecord};
use crate::statistics::{BlockRow, ContractCallRow, RedactionRow, Statistics};
use crate::tx_factory::{full_create_transactions, full_execute_transactions, LightPool, TxFactoryConfig};
use ledgerlab_consensus::{
    create_block_event, fork_resolution, next_block_time, receive_block_event, Event, EventQueue,
};
use ledgerlab_core::{
    canonical_message, Chameleon, ChameleonPublicKey, ChameleonSecretKey, ContractAddress, NodeId,
    Permission, RedactionPolicy, RedactionRequest, RedactionStatus, RedactionType,
    SecretSharing, StubSecretSharing, TxType,
};
use ledgerlab_governance::{can_perform_action, drive_voting_round, execute_anonymize, execute_delete, execute_modify, find_admitting_policy, request_redaction};
use ledgerlab_network::Network;
use rand::Rng;
use rand_distr::{Distribution as _, Exp};

/// Light vs. Full transaction propagation, `spec.md` §4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TxTechnique {
    Light,
    Full,
}

/// The fields of `Config` (§6) that `BlockCommit` consults directly.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub b_interval: f64,
    pub b_size_mb: f64,
    pub b_reward: f64,
    pub r_reward: f64,
    /// `spec.md` §6 `hasTrans`: when `false`, miners produce empty blocks
    /// without consulting the transaction factory at all.
    pub has_trans: bool,
    pub has_redact: bool,
    pub has_multi: bool,
    pub has_smart_contracts: bool,
    pub sim_time: f64,
    pub tx_technique: TxTechnique,
    pub tx_factory: TxFactoryConfig,
}

/// Every piece of process-wide mutable state the event loop touches,
/// bundled so `handle_create_block`/`handle_receive_block` take one
/// parameter instead of a dozen (`spec.md` §5: these are the process-wide
/// shared resources — queue, chain views, pending redactions, statistics —
/// all mutated inside the single event loop, no locking).
pub struct SimState {
    pub nodes: Vec<Node>,
    pub queue: EventQueue,
    pub network: Network,
    pub chameleon: Chameleon,
    pub policies: Vec<RedactionPolicy>,
    pub contracts: ContractRegistry,
    pub statistics: Statistics,
    pub redaction_requests: Vec<RedactionRequest>,
    pub light_pool: LightPool,
    pub config: SimConfig,
}

impl SimState {
    fn total_hash_power(&self) -> f64 {
        self.nodes.iter().map(|n| n.hash_power).sum()
    }

    fn node_index(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    pub(crate) fn authorized_voters(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.role, ledgerlab_core::Role::Admin | ledgerlab_core::Role::Regulator))
            .map(|n| n.id)
            .collect()
    }
}

/// `process_smart_contracts` (§4.7 step 3, expanded).
fn process_smart_contracts(state: &mut SimState, miner_idx: usize, depth: u64, transactions: &mut [ledgerlab_core::Transaction]) {
    if !state.config.has_smart_contracts {
        return;
    }
    let miner_id = state.nodes[miner_idx].id;
    for tx in transactions.iter_mut() {
        match tx.tx_type {
            TxType::ContractCall => {
                if let Some(call) = tx.contract_call.as_mut() {
                    crate::contracts::execute_call(&state.contracts, call);
                    state.statistics.record_contract_call(ContractCallRow {
                        depth,
                        miner: miner_id,
                        contract_address: call.contract_address,
                        method: call.method.clone(),
                        gas_used: call.gas_used,
                        success: call.success,
                    });
                }
            }
            TxType::ContractDeploy => {
                if state.nodes[miner_idx].can(Permission::Deploy) {
                    let address = state.contracts.deploy();
                    state.nodes[miner_idx].deployed_contracts.push(address);
                }
            }
            _ => {}
        }
    }
}

/// `process_redaction_requests` (§4.7 step 4): admits fresh
/// `REDACTION_REQUEST` transactions, then runs the voting driver over every
/// still-`PENDING` request and executes the ones that just approved.
fn process_redaction_requests(
    state: &mut SimState,
    miner_idx: usize,
    depth: u64,
    now: f64,
    transactions: &[ledgerlab_core::Transaction],
    rng: &mut impl Rng,
) {
    if !state.config.has_redact {
        return;
    }

    for tx in transactions {
        if tx.tx_type != TxType::RedactionRequest {
            continue;
        }
        let requester = state.nodes[miner_idx].id;
        let requester_role = state.nodes[miner_idx].role;
        if !can_perform_action(requester_role, Permission::Redact) {
            state.statistics.record_permission_violation();
            continue;
        }
        let redaction_type = if tx.metadata.get("redaction_type") == Some("modify") {
            RedactionType::Modify
        } else if tx.metadata.get("redaction_type") == Some("anonymize") {
            RedactionType::Anonymize
        } else {
            RedactionType::Delete
        };
        let target_tx: usize = tx.metadata.get("target_tx").and_then(|v| v.parse().ok()).unwrap_or(0);
        // The block being mined right now (index `depth`) is not appended to
        // any chain until step 6, so a request can only target an already
        // committed block — index `< depth`. Fall back to the chain tip when
        // the requester's metadata doesn't name a valid one.
        let target_block: u64 = tx
            .metadata
            .get("target_block")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&b| b < depth)
            .unwrap_or_else(|| depth.saturating_sub(1));
        match request_redaction(
            &state.policies,
            requester,
            requester_role,
            target_block,
            target_tx,
            redaction_type,
            format!("requested by {tx_id}", tx_id = tx.id),
            now,
            &tx.metadata.other,
        ) {
            Ok(request) => state.redaction_requests.push(request),
            Err(_) => state.statistics.record_redaction_rejection("policy_violation"),
        }
    }

    let voters = state.authorized_voters();
    let mut just_approved = Vec::new();
    for request in state.redaction_requests.iter_mut().filter(|r| r.status == RedactionStatus::Pending) {
        let status = drive_voting_round(request, &voters, rng);
        if status == RedactionStatus::Approved {
            just_approved.push(request.clone());
        } else if status == RedactionStatus::Rejected {
            state.statistics.record_redaction_rejection("quorum_unreachable");
        }
    }

    for request in just_approved {
        execute_approved_redaction(state, &request, now, rng);
    }
}

/// `execute_approved_redaction` (§4.9 "Execution"). Dispatches to the
/// primitive named by `request.redaction_type`, then broadcasts the new
/// `(transactions, r, id)` tuple to every peer's same-indexed block
/// (DESIGN NOTES Option (b): redactions are messages, not shared objects).
pub(crate) fn execute_approved_redaction(state: &mut SimState, request: &RedactionRequest, now: f64, rng: &mut impl Rng) {
    let target_block = request.target_block as usize;
    let approvers: Vec<NodeId> = request.voters.iter().copied().collect();
    let requester_role = state
        .nodes
        .iter()
        .find(|n| n.id == request.requester)
        .map(|n| n.role)
        .unwrap_or(ledgerlab_core::Role::User);

    // Every node's copy of the target block was chameleon-hashed under its
    // original miner's keypair (§4.7 step 5), so forging it back to the same
    // digest must use that miner's SK regardless of which node's local
    // chain the block currently lives in — never the holder node's own keys.
    let miner_keys: std::collections::BTreeMap<NodeId, (ChameleonPublicKey, ChameleonSecretKey)> = state
        .nodes
        .iter()
        .map(|n| (n.id, (n.keys.pk.clone(), n.keys.sk.clone())))
        .collect();

    if state.config.has_multi && request.redaction_type == RedactionType::Delete {
        if let Some((_, sk)) = state.nodes.iter().find(|n| n.id == request.requester).map(|n| (n.keys.pk.clone(), n.keys.sk.clone())) {
            let (shares, latency) = StubSecretSharing.secret_share(&sk, request.required_approvals, approvers.len().max(1) as u32);
            log::debug!("multi-trapdoor secret-sharing produced {} shares in {:?}", shares.len(), latency);
        }
    }

    for node in state.nodes.iter_mut() {
        let Some(block) = node.blockchain.get_mut(target_block) else {
            continue;
        };
        let Some((miner_pk, miner_sk)) = miner_keys.get(&block.miner) else {
            continue;
        };
        let before_tx_count = block.transactions.len();
        let outcome = match request.redaction_type {
            RedactionType::Delete => execute_delete(
                &state.chameleon,
                miner_sk,
                miner_pk,
                block,
                request.target_tx,
                request.requester,
                approvers.clone(),
                now,
            )
            .map(|tx| Some(tx)),
            RedactionType::Modify => execute_modify(
                &state.chameleon,
                miner_sk,
                miner_pk,
                block,
                request.target_tx,
                request.requester,
                approvers.clone(),
                now,
            )
            .map(|_| None),
            RedactionType::Anonymize => execute_anonymize(
                &state.chameleon,
                miner_sk,
                miner_pk,
                block,
                request.target_tx,
                request.requester,
                approvers.clone(),
                now,
            )
            .map(|_| None),
        };

        match outcome {
            Ok(removed) => {
                if node.id == request.requester {
                    let reward = Exp::new(1.0 / state.config.r_reward.max(f64::EPSILON))
                        .expect("positive r_reward")
                        .sample(rng);
                    let affected_tx = removed.clone().unwrap_or_else(|| {
                        block
                            .transactions
                            .get(request.target_tx)
                            .cloned()
                            .expect("modify/anonymize leave the target transaction in place")
                    });
                    let record = RedactionRow {
                        miner_id: node.id,
                        depth: block.depth,
                        tx_id: affected_tx.id.0.clone(),
                        reward,
                        elapsed_ms: 5.0,
                        chain_length: node.blockchain.len(),
                        tx_count: before_tx_count,
                        kind: request.redaction_type,
                    };
                    node.redacted_tx.push(RedactedTxRecord {
                        block_depth: block.depth,
                        tx: affected_tx,
                        reward,
                        elapsed_ms: record.elapsed_ms,
                        chain_len: node.blockchain.len(),
                        tx_count: before_tx_count,
                    });
                    state.statistics.record_redaction(record, requester_role);
                }
            }
            Err(_) => {
                // A peer whose own chain view does not yet have a matching
                // transaction layout is skipped silently (§7: only the
                // requester's own invocation is authoritative).
            }
        }
    }
}

/// `handle_create_block` (§4.7): the six-step create-block sequence.
pub fn handle_create_block(state: &mut SimState, event: Event, rng: &mut impl Rng) {
    let miner_id = event.block.miner;
    let Some(miner_idx) = state.node_index(miner_id) else {
        return;
    };
    let now = event.time;

    // Step 1: drop stale mining attempts.
    if event.block.previous != state.nodes[miner_idx].last_block().id {
        log::debug!("dropping stale create_block from {miner_id}");
        return;
    }

    // Step 2: fill transactions from the configured factory, unless this
    // run has `hasTrans = false` (§6), in which case blocks stay empty.
    let (mut transactions, size_mb) = if !state.config.has_trans {
        (Vec::new(), 0.0)
    } else {
        match state.config.tx_technique {
            TxTechnique::Light => {
                state.light_pool.create_transactions(
                    state.config.b_interval,
                    &state.config.tx_factory,
                    &state.nodes[miner_idx].deployed_contracts.clone(),
                    now,
                    rng,
                );
                state.light_pool.execute_transactions(state.config.b_size_mb)
            }
            TxTechnique::Full => {
                let contracts: Vec<ContractAddress> = state.nodes[miner_idx].deployed_contracts.clone();
                full_create_transactions(&mut state.nodes, state.config.sim_time, &state.config.tx_factory, &contracts, &state.network, rng);
                full_execute_transactions(&mut state.nodes[miner_idx], now, state.config.b_size_mb)
            }
        }
    };

    let depth = event.block.depth;

    // Step 3.
    process_smart_contracts(state, miner_idx, depth, &mut transactions);

    // Step 4.
    process_redaction_requests(state, miner_idx, depth, now, &transactions, rng);

    let mut block = event.block;
    block.transactions = transactions;
    block.size_mb = size_mb;

    // Step 5: compute the chameleon digest if redaction is enabled for this
    // run; otherwise the block keeps whatever placeholder id the scheduler
    // set (a plain-chain run with no redaction capability).
    if state.config.has_redact {
        let r = state.chameleon.random_r(rng);
        let m = canonical_message(&block.transactions, &block.previous);
        let id = state.chameleon.hash(&state.nodes[miner_idx].keys.pk, &m, &r);
        block.r = r;
        block.id = id.clone();
        block.original_hash = id;
    }

    // Step 6: commit, refresh pools, propagate, schedule next block.
    let row = BlockRow {
        depth: block.depth,
        id: block.id.clone(),
        previous: block.previous.clone(),
        timestamp: block.timestamp,
        miner: miner_id,
        tx_count: block.transactions.len(),
        size_mb: block.size_mb,
    };
    state.nodes[miner_idx].blockchain.push(block.clone());
    state.statistics.record_block(row, true);

    let peer_ids: Vec<NodeId> = state.nodes.iter().map(|n| n.id).filter(|id| *id != miner_id).collect();
    for peer in peer_ids {
        let delay = state.network.block_prop_delay(rng);
        receive_block_event(&mut state.queue, peer, block.clone(), now, delay);
    }

    if state.nodes[miner_idx].is_miner() {
        let total_hash_power = state.total_hash_power();
        let hash_power = state.nodes[miner_idx].hash_power;
        let dt = next_block_time(rng, state.config.b_interval, hash_power, total_hash_power);
        let previous = block.id.clone();
        create_block_event(&mut state.queue, miner_id, now + dt, block.depth + 1, previous);
    }
}

/// `handle_receive_block` (§4.7): the three-way branch.
pub fn handle_receive_block(state: &mut SimState, event: Event, rng: &mut impl Rng) {
    let Some(recipient) = event.node else {
        return;
    };
    let Some(idx) = state.node_index(recipient) else {
        return;
    };
    let block = event.block;
    let now = event.time;

    let last_id = state.nodes[idx].last_block().id.clone();
    if block.previous == last_id {
        // Direct extension of the recipient's own tip. The block was already
        // counted once in `total_blocks`/`block_rows` when its miner created
        // it (§4.7 step 2); receiving a copy of it must not count it again.
        if state.config.tx_technique == TxTechnique::Full {
            let included: std::collections::BTreeSet<_> = block.transactions.iter().map(|tx| tx.id.clone()).collect();
            state.nodes[idx].transactions_pool.retain(|(tx, _)| !included.contains(&tx.id));
        }
        state.nodes[idx].blockchain.push(block.clone());
        if state.nodes[idx].is_miner() {
            let total_hash_power = state.total_hash_power();
            let hash_power = state.nodes[idx].hash_power;
            let dt = next_block_time(rng, state.config.b_interval, hash_power, total_hash_power);
            create_block_event(&mut state.queue, recipient, now + dt, block.depth + 1, block.id);
        }
    } else if block.depth + 1 > state.nodes[idx].blockchain.len() as u64 {
        // A longer competing branch: reconcile by fork resolution over the
        // two local views, then adopt the winner's prefix.
        log::debug!("node {recipient} reconciling to a longer branch at depth {}", block.depth);
        // Each drained block was already counted once, as main, when its own
        // miner created it — reclassify it as stale without recounting it or
        // re-pushing a `Chain` row for it.
        let drained = state.nodes[idx].blockchain.drain((block.depth as usize)..).count();
        for _ in 0..drained {
            state.statistics.record_stale_reorg();
        }
        state.nodes[idx].blockchain.push(block.clone());
        if state.nodes[idx].is_miner() {
            let total_hash_power = state.total_hash_power();
            let hash_power = state.nodes[idx].hash_power;
            let dt = next_block_time(rng, state.config.b_interval, hash_power, total_hash_power);
            create_block_event(&mut state.queue, recipient, now + dt, block.depth + 1, block.id);
        }
    } else {
        // Shorter or equal competing branch: ignore.
    }
}

/// Runs `fork_resolution` once over every node's full chain view and
/// records the winner's length against `Statistics`, per §4.5/§4.10.
pub fn resolve_forks(state: &mut SimState) -> Option<ledgerlab_consensus::ForkResolution> {
    let chains: Vec<(NodeId, &[ledgerlab_core::Block])> =
        state.nodes.iter().map(|n| (n.id, n.blockchain.as_slice())).collect();
    fork_resolution(chains)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerlab_core::{Chameleon, ChameleonGroup, PrivacyLevel, Role};
    use ledgerlab_network::NetworkConfig;
    use ledgerlab_test_suite::seeded_rng;
    use num_bigint::BigUint;

    fn factory_config() -> TxFactoryConfig {
        TxFactoryConfig {
            t_n: 2.0,
            t_fee_mean: 1.0,
            t_size_mean: 0.001,
            tx_type_distribution: vec![(TxType::Transfer, 1.0)],
            privacy_level_distribution: vec![(PrivacyLevel::Public, 1.0)],
        }
    }

    fn small_state(rng: &mut impl Rng) -> SimState {
        let chameleon = Chameleon::new(ChameleonGroup::simulation_default());
        let genesis_keys = chameleon.key_gen(rng);
        let genesis_r = chameleon.random_r(rng);
        let genesis_id = chameleon.hash(&genesis_keys.pk, &ledgerlab_core::MessageDigest::hash(b"genesis"), &genesis_r);

        let mut nodes = Vec::new();
        for i in 0..3u64 {
            let keys = chameleon.key_gen(rng);
            let role = if i == 0 { Role::Admin } else { Role::Miner };
            let mut node = Node::new(NodeId(i), if i == 0 { 0.0 } else { 10.0 }, role, keys);
            node.blockchain.push(ledgerlab_core::Block::genesis(NodeId(0), genesis_id.clone(), genesis_r.clone()));
            nodes.push(node);
        }

        SimState {
            nodes,
            queue: EventQueue::new(),
            network: Network::new(NetworkConfig::default()),
            chameleon,
            policies: Vec::new(),
            contracts: ContractRegistry::new(),
            statistics: Statistics::new(),
            redaction_requests: Vec::new(),
            light_pool: LightPool::new(),
            config: SimConfig {
                b_interval: 600.0,
                b_size_mb: 1.0,
                b_reward: 12.5,
                r_reward: 0.1,
                has_trans: true,
                has_redact: true,
                has_multi: false,
                has_smart_contracts: false,
                sim_time: 10_000.0,
                tx_technique: TxTechnique::Light,
                tx_factory: factory_config(),
            },
        }
    }

    #[test]
    fn create_block_commits_and_schedules_next_block_for_a_miner() {
        let mut rng = seeded_rng(9);
        let mut state = small_state(&mut rng);
        let genesis_id = state.nodes[1].last_block().id.clone();
        create_block_event(&mut state.queue, NodeId(1), 0.0, 1, genesis_id);
        let event = state.queue.pop_min().unwrap();
        handle_create_block(&mut state, event, &mut rng);

        assert_eq!(state.nodes[1].blockchain.len(), 2);
        assert_eq!(state.statistics.total_blocks, 1);
        assert!(!state.queue.is_empty(), "a miner schedules its next create_block event");
    }

    #[test]
    fn stale_create_block_is_dropped() {
        let mut rng = seeded_rng(10);
        let mut state = small_state(&mut rng);
        let bogus_previous = ledgerlab_core::BlockId(BigUint::from(999u32));
        create_block_event(&mut state.queue, NodeId(1), 0.0, 1, bogus_previous);
        let event = state.queue.pop_min().unwrap();
        handle_create_block(&mut state, event, &mut rng);
        assert_eq!(state.nodes[1].blockchain.len(), 1, "stale attempt must not extend the chain");
        assert_eq!(state.statistics.total_blocks, 0);
    }

    #[test]
    fn receive_block_extending_tip_appends_locally() {
        let mut rng = seeded_rng(11);
        let mut state = small_state(&mut rng);
        let genesis_id = state.nodes[2].last_block().id.clone();
        create_block_event(&mut state.queue, NodeId(1), 0.0, 1, genesis_id);
        let event = state.queue.pop_min().unwrap();
        handle_create_block(&mut state, event, &mut rng);
        let mined = state.nodes[1].blockchain.last().unwrap().clone();

        receive_block_event(&mut state.queue, NodeId(2), mined, 0.0, 0.1);
        let recv_event = state.queue.pop_min().unwrap();
        handle_receive_block(&mut state, recv_event, &mut rng);
        assert_eq!(state.nodes[2].blockchain.len(), 2);
    }
}
