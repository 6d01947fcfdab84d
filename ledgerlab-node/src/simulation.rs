//! The top-level driver (`spec.md` §2 "Control flow"): initializes nodes and
//! genesis blocks, seeds one `create_block` event per miner, drains the
//! event queue until it is empty or the clock exceeds `sim_time`, resolves
//! forks, optionally runs a batch of redaction proposals, distributes block
//! rewards, and leaves `Statistics` ready for the caller to report.

use crate::block_commit::{handle_create_block, handle_receive_block, SimConfig, SimState, TxTechnique};
use crate::contracts::ContractRegistry;
use crate::node::Node;
use crate::statistics::Statistics;
use crate::tx_factory::{LightPool, TxFactoryConfig};
use ledgerlab_consensus::{create_block_event, next_block_time, Event};
use ledgerlab_consensus::EventQueue;
use ledgerlab_core::{
    Block, BlockId, Chameleon, ChameleonGroup, NodeId, PrivacyLevel, RedactionPolicy,
    RedactionStatus, RedactionType, Role, TxType,
};
use ledgerlab_governance::{drive_voting_round, request_redaction};
use ledgerlab_network::{DelayDistribution, Network, NetworkConfig};
use rand::{Rng, RngCore};

/// A proposer strategy for the post-drain batch redaction runs (`spec.md`
/// §9 DESIGN NOTES open question: "whether `generate_redaction_event`'s
/// random choice between redact and delete is production policy or test
/// scaffolding is unclear... expose a configurable proposer strategy").
pub trait RedactionProposer {
    /// Picks a target block depth (`1..chain_len`, genesis excluded) and a
    /// redaction kind for the next batch proposal.
    fn propose(&self, rng: &mut dyn RngCore, chain_len: u64) -> (u64, RedactionType);
}

/// The default strategy, preserving the source's observable behavior: an
/// even coin flip between DELETE and MODIFY over a uniformly chosen block.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomProposer;

impl RedactionProposer for RandomProposer {
    fn propose(&self, rng: &mut dyn RngCore, chain_len: u64) -> (u64, RedactionType) {
        let target_block = rng.gen_range(1..chain_len.max(2));
        let kind = if rng.gen_bool(0.5) { RedactionType::Delete } else { RedactionType::Modify };
        (target_block, kind)
    }
}

/// Every field of `Config` (§6) that `Simulation::new` consumes to build the
/// node population and wire the sub-crates together. Fields the chameleon
/// path does not use (`vote_period`, `rho` — reserved for the Deuber-style
/// on-chain-voting scheme, not implemented here per `spec.md` §4.9's
/// "implementers may choose either scheme") are still carried so a `Config`
/// built from `spec.md` §6's full field list round-trips without loss.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub num_nodes: u64,
    pub miners_portion: f64,
    pub max_hash_power: f64,
    pub admin_node: NodeId,
    /// Explicit per-node role assignment (`spec.md` §6 `NODE_ROLES`).
    /// `None` falls back to the default scheme: `admin_node` is ADMIN, the
    /// next node id is REGULATOR, `miners_portion` of the remainder are
    /// MINER, the rest USER.
    pub node_roles: Option<Vec<Role>>,
    pub b_interval: f64,
    pub b_size_mb: f64,
    pub b_delay_mean: f64,
    pub b_reward: f64,
    pub r_reward: f64,
    pub has_trans: bool,
    pub tx_technique: TxTechnique,
    pub t_n: f64,
    pub t_fee_mean: f64,
    pub t_size_mean: f64,
    pub t_delay_mean: f64,
    pub sim_time: f64,
    pub redact_runs: u32,
    pub has_redact: bool,
    pub has_multi: bool,
    pub has_smart_contracts: bool,
    pub tx_type_distribution: Vec<(TxType, f64)>,
    pub privacy_level_distribution: Vec<(PrivacyLevel, f64)>,
    pub redaction_policies: Vec<RedactionPolicy>,
    /// Reserved for the Deuber-style scheme (`spec.md` §4.9 "Parallel
    /// variant"); unused by the Ateniese chameleon path this crate
    /// implements.
    pub vote_period: u32,
    pub rho: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            num_nodes: 5,
            miners_portion: 0.5,
            max_hash_power: 100.0,
            admin_node: NodeId(0),
            node_roles: None,
            b_interval: 600.0,
            b_size_mb: 1.0,
            b_delay_mean: 0.42,
            b_reward: 12.5,
            r_reward: 0.1,
            has_trans: true,
            tx_technique: TxTechnique::Light,
            t_n: 5.0,
            t_fee_mean: 2.0,
            t_size_mean: 0.02,
            t_delay_mean: 5.1,
            sim_time: 3600.0,
            redact_runs: 0,
            has_redact: true,
            has_multi: false,
            has_smart_contracts: false,
            tx_type_distribution: vec![
                (TxType::Transfer, 0.6),
                (TxType::ContractCall, 0.15),
                (TxType::ContractDeploy, 0.05),
                (TxType::RedactionRequest, 0.1),
                (TxType::MedicalRecord, 0.1),
            ],
            privacy_level_distribution: vec![
                (PrivacyLevel::Public, 0.7),
                (PrivacyLevel::Private, 0.2),
                (PrivacyLevel::Confidential, 0.1),
            ],
            redaction_policies: Vec::new(),
            vote_period: 5,
            rho: 0.5,
        }
    }
}

fn default_roles(config: &SimulationConfig) -> Vec<Role> {
    if let Some(roles) = &config.node_roles {
        return roles.clone();
    }
    let n = config.num_nodes;
    let regulator = NodeId((config.admin_node.0 + 1) % n.max(1));
    let remaining: Vec<NodeId> = (0..n).map(NodeId).filter(|id| *id != config.admin_node && *id != regulator).collect();
    let miner_count = ((remaining.len() as f64) * config.miners_portion).round() as usize;
    (0..n)
        .map(|i| {
            let id = NodeId(i);
            if id == config.admin_node {
                Role::Admin
            } else if id == regulator {
                Role::Regulator
            } else if remaining.iter().position(|r| *r == id).map(|pos| pos < miner_count).unwrap_or(false) {
                Role::Miner
            } else {
                Role::User
            }
        })
        .collect()
}

/// The simulation run as a whole: owns `SimState` plus the redaction
/// proposer used for the post-drain batch and the construction-time config
/// fields `SimState` itself does not need to retain.
pub struct Simulation {
    state: SimState,
    proposer: Box<dyn RedactionProposer>,
}

impl Simulation {
    pub fn new(config: SimulationConfig, rng: &mut impl Rng) -> Self {
        let roles = default_roles(&config);
        assert_eq!(roles.len() as u64, config.num_nodes, "node_roles must cover every node");

        let group = ChameleonGroup::simulation_default();
        let chameleon = Chameleon::new(group);

        let genesis_keys = chameleon.key_gen(rng);
        let genesis_r = chameleon.random_r(rng);
        let genesis_id = chameleon.hash(&genesis_keys.pk, &ledgerlab_core::MessageDigest::hash(b"genesis"), &genesis_r);

        let mut nodes = Vec::with_capacity(config.num_nodes as usize);
        for i in 0..config.num_nodes {
            let id = NodeId(i);
            let role = roles[i as usize];
            let keys = chameleon.key_gen(rng);
            let hash_power = if role == Role::Miner { rng.gen_range(1.0..=config.max_hash_power) } else { 0.0 };
            let mut node = Node::new(id, hash_power, role, keys);
            node.blockchain.push(genesis_block(id, genesis_id.clone(), genesis_r.clone()));
            nodes.push(node);
        }

        let network = Network::new(NetworkConfig {
            block_delay: DelayDistribution::Exponential { mean: config.b_delay_mean },
            tx_delay: DelayDistribution::Exponential { mean: config.t_delay_mean },
        });

        let mut queue = EventQueue::new();
        let total_hash_power: f64 = nodes.iter().map(|n| n.hash_power).sum();
        for node in nodes.iter().filter(|n| n.is_miner()) {
            let dt = next_block_time(rng, config.b_interval, node.hash_power, total_hash_power);
            create_block_event(&mut queue, node.id, dt, 1, node.last_block().id.clone());
        }

        let tx_factory = TxFactoryConfig {
            t_n: config.t_n,
            t_fee_mean: config.t_fee_mean,
            t_size_mean: config.t_size_mean,
            tx_type_distribution: config.tx_type_distribution.clone(),
            privacy_level_distribution: config.privacy_level_distribution.clone(),
        };

        let sim_config = SimConfig {
            b_interval: config.b_interval,
            b_size_mb: config.b_size_mb,
            b_reward: config.b_reward,
            r_reward: config.r_reward,
            has_trans: config.has_trans,
            has_redact: config.has_redact,
            has_multi: config.has_multi,
            has_smart_contracts: config.has_smart_contracts,
            sim_time: config.sim_time,
            tx_technique: config.tx_technique,
            tx_factory,
        };

        let state = SimState {
            nodes,
            queue,
            network,
            chameleon,
            policies: config.redaction_policies,
            contracts: ContractRegistry::new(),
            statistics: Statistics::new(),
            redaction_requests: Vec::new(),
            light_pool: LightPool::new(),
            config: sim_config,
        };

        Simulation { state, proposer: Box::new(RandomProposer) }
    }

    /// Swaps in a different redaction-proposal strategy for the post-drain
    /// batch (`spec.md` §9's open question on proposer semantics).
    pub fn with_proposer(mut self, proposer: Box<dyn RedactionProposer>) -> Self {
        self.proposer = proposer;
        self
    }

    pub fn statistics(&self) -> &Statistics {
        &self.state.statistics
    }

    pub fn nodes(&self) -> &[Node] {
        &self.state.nodes
    }

    /// Drains the event queue until it is empty or the next event's time
    /// exceeds `sim_time` (`spec.md` §2/§5), then resolves forks, runs the
    /// configured batch of redaction proposals, and distributes rewards.
    pub fn run(&mut self, rng: &mut impl Rng) {
        let sim_time = self.state.config.sim_time;
        while !self.state.queue.is_empty() {
            let Some(event) = self.state.queue.pop_min() else { break };
            if event.time > sim_time {
                log::debug!("discarding event at t={} past sim_time={}", event.time, sim_time);
                break;
            }
            match event.kind {
                ledgerlab_core::EventKind::CreateBlock => handle_create_block(&mut self.state, event, rng),
                ledgerlab_core::EventKind::ReceiveBlock => handle_receive_block(&mut self.state, event, rng),
            }
        }

        let resolution = crate::block_commit::resolve_forks(&mut self.state);
        if let Some(resolution) = resolution {
            self.state.statistics.finalize_fork_resolution(resolution.chain_length);
            self.run_redaction_batch(rng);
            self.distribute_rewards(resolution.winner);
        }

        log::info!(
            "run complete: total_blocks={} main_blocks={} stale_blocks={} stale_rate={:.4} redactions={}",
            self.state.statistics.total_blocks,
            self.state.statistics.main_blocks,
            self.state.statistics.stale_blocks,
            self.state.statistics.stale_rate(),
            self.state.statistics.redaction_rows.len(),
        );
    }

    /// The optional post-drain redaction batch (`spec.md` §2: "optionally a
    /// batch of redaction operations is executed"). Each run proposes one
    /// request from the admin node, drives a single voting round
    /// immediately (there is no further block-creation cycle to carry it),
    /// and executes it if approved.
    fn run_redaction_batch(&mut self, rng: &mut impl Rng) {
        if !self.state.config.has_redact || self.state.policies.is_empty() {
            return;
        }
        let admin_idx = match self.state.nodes.iter().position(|n| n.role == Role::Admin) {
            Some(idx) => idx,
            None => return,
        };
        let admin_id = self.state.nodes[admin_idx].id;
        let admin_role = self.state.nodes[admin_idx].role;
        let chain_len = self.state.nodes[admin_idx].blockchain.len() as u64;
        if chain_len < 2 {
            return;
        }

        for _ in 0..self.state.config.redact_runs {
            let (target_block, redaction_type) = self.proposer.propose(rng, chain_len);
            let target_tx_count = self.state.nodes[admin_idx]
                .blockchain
                .get(target_block as usize)
                .map(|b| b.transactions.len())
                .unwrap_or(0);
            if target_tx_count == 0 {
                continue;
            }
            let target_tx = rng.gen_range(0..target_tx_count);

            let request = match request_redaction(
                &self.state.policies,
                admin_id,
                admin_role,
                target_block,
                target_tx,
                redaction_type,
                "post-drain batch proposal".to_string(),
                self.state.queue.clock(),
                &std::collections::BTreeMap::new(),
            ) {
                Ok(req) => req,
                Err(_) => {
                    self.state.statistics.record_redaction_rejection("policy_violation");
                    continue;
                }
            };

            let voters = self.state.authorized_voters();
            let mut request = request;
            let now = self.state.queue.clock();
            let status = drive_voting_round(&mut request, &voters, rng);
            match status {
                RedactionStatus::Approved => {
                    crate::block_commit::execute_approved_redaction(&mut self.state, &request, now, rng);
                }
                RedactionStatus::Rejected => self.state.statistics.record_redaction_rejection("quorum_unreachable"),
                RedactionStatus::Pending => self.state.redaction_requests.push(request),
            }
        }
    }

    fn distribute_rewards(&mut self, winner: NodeId) {
        if !self.state.config.has_redact && self.state.config.b_reward == 0.0 {
            return;
        }
        let Some(winner_idx) = self.state.nodes.iter().position(|n| n.id == winner) else { return };
        let chain = self.state.nodes[winner_idx].blockchain.clone();
        for block in chain.iter().filter(|b| b.depth > 0) {
            if let Some(miner) = self.state.nodes.iter_mut().find(|n| n.id == block.miner) {
                miner.balance += self.state.config.b_reward;
            }
        }
    }
}

fn genesis_block(miner: NodeId, id: BlockId, r: num_bigint::BigUint) -> Block {
    Block::genesis(miner, id, r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerlab_core::{RedactionType, Role};
    use ledgerlab_test_suite::seeded_rng;
    use std::collections::BTreeMap;

    fn policy(kind: RedactionType, min_approvals: u32) -> RedactionPolicy {
        RedactionPolicy {
            policy_id: format!("{kind:?}"),
            policy_type: kind,
            conditions: BTreeMap::new(),
            authorized_roles: vec![Role::Admin, Role::Regulator],
            min_approvals,
            time_lock_secs: 0,
        }
    }

    fn testing_preset() -> SimulationConfig {
        SimulationConfig {
            num_nodes: 5,
            sim_time: 5_000.0,
            b_interval: 200.0,
            redaction_policies: vec![policy(RedactionType::Delete, 2), policy(RedactionType::Modify, 2), policy(RedactionType::Anonymize, 2)],
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn run_produces_a_longer_than_genesis_chain_with_consistent_stats() {
        let mut rng = seeded_rng(100);
        let mut sim = Simulation::new(testing_preset(), &mut rng);
        sim.run(&mut rng);

        let stats = sim.statistics();
        assert!(stats.total_blocks > 0, "a 5-node 5000s run should mine at least one block");
        assert!(stats.total_blocks >= stats.main_blocks);
        assert_eq!(stats.total_blocks, stats.main_blocks + stats.stale_blocks);

        // `total_blocks` must count create-block commits only, never a
        // receiving node's copy of one. With 2 miners racing at
        // `b_interval = 200` for 5000s, the aggregate block rate stays near
        // `sim_time / b_interval = 25`, regardless of `num_nodes = 5`; a
        // regression that recounts every receive would inflate this toward
        // `25 * num_nodes`.
        assert!(
            stats.total_blocks < 75,
            "total_blocks={} is far above the ~25 expected from sim_time/b_interval — each block is probably being counted once per receiving node instead of once at creation",
            stats.total_blocks
        );
        // With only 2 of 5 nodes mining, most received blocks are plain tip
        // extensions rather than reorgs, so the stale share of a near-linear
        // chain should stay well under half.
        assert!(stats.stale_rate() < 0.5, "stale_rate={:.3} is implausibly high for a 2-miner run", stats.stale_rate());
    }

    #[test]
    fn miners_accrue_balance_from_block_rewards() {
        let mut rng = seeded_rng(101);
        let mut sim = Simulation::new(testing_preset(), &mut rng);
        sim.run(&mut rng);
        let total_balance: f64 = sim.nodes().iter().map(|n| n.balance).sum();
        if sim.statistics().main_blocks > 0 {
            assert!(total_balance > 0.0, "mined main-chain blocks should pay out rewards");
        }
    }
}
