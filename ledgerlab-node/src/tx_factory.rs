//! `spec.md` §4.6 TransactionFactory: synthesizes pending transactions in
//! Light mode (one shared global pool) and Full mode (per-node propagated
//! pools with explicit delay).

use crate::node::Node;
use ledgerlab_core::{
    ContractAddress, ContractCall, NodeId, PrivacyLevel, Transaction, TxId, TxMetadata,
    TxTimestamp, TxType,
};
use ledgerlab_network::Network;
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution as _;
use rand::Rng;
use rand_distr::Exp;

/// Weighted-distribution configuration shared by both modes.
#[derive(Debug, Clone)]
pub struct TxFactoryConfig {
    /// Mean transaction generation rate used as `Tn · Binterval` (Light) or
    /// `Tn · simTime` (Full).
    pub t_n: f64,
    pub t_fee_mean: f64,
    pub t_size_mean: f64,
    pub tx_type_distribution: Vec<(TxType, f64)>,
    pub privacy_level_distribution: Vec<(PrivacyLevel, f64)>,
}

fn sample_fee(cfg: &TxFactoryConfig, rng: &mut impl Rng) -> f64 {
    Exp::new(1.0 / cfg.t_fee_mean.max(f64::EPSILON)).unwrap().sample(rng)
}

fn sample_size(cfg: &TxFactoryConfig, rng: &mut impl Rng) -> f64 {
    Exp::new(1.0 / cfg.t_size_mean.max(f64::EPSILON)).unwrap().sample(rng)
}

fn sample_tx_type(cfg: &TxFactoryConfig, rng: &mut impl Rng) -> TxType {
    let weights: Vec<f64> = cfg.tx_type_distribution.iter().map(|(_, w)| *w).collect();
    let idx = WeightedIndex::new(&weights).expect("non-empty, non-negative weights").sample(rng);
    cfg.tx_type_distribution[idx].0
}

fn sample_privacy(cfg: &TxFactoryConfig, rng: &mut impl Rng) -> PrivacyLevel {
    let weights: Vec<f64> = cfg.privacy_level_distribution.iter().map(|(_, w)| *w).collect();
    let idx = WeightedIndex::new(&weights).expect("non-empty, non-negative weights").sample(rng);
    cfg.privacy_level_distribution[idx].0
}

fn build_transaction(
    next_id: u64,
    sender: NodeId,
    to: NodeId,
    timestamp: TxTimestamp,
    cfg: &TxFactoryConfig,
    contracts: &[ContractAddress],
    rng: &mut impl Rng,
) -> Transaction {
    let tx_type = sample_tx_type(cfg, rng);
    let privacy_level = sample_privacy(cfg, rng);
    let contract_call = if tx_type == TxType::ContractCall && !contracts.is_empty() {
        let address = contracts[rng.gen_range(0..contracts.len())];
        Some(ContractCall {
            contract_address: address,
            method: "call".to_string(),
            gas_limit: 21_000,
            gas_used: None,
            success: None,
        })
    } else {
        None
    };
    // REDACTION_REQUEST transactions are themselves non-redactable
    // (spec.md §3 invariant); CONFIDENTIAL implies is_redactable = true.
    let is_redactable = match tx_type {
        TxType::RedactionRequest => false,
        _ => privacy_level == PrivacyLevel::Confidential,
    };
    Transaction {
        id: TxId(format!("tx-{next_id}")),
        sender,
        to,
        value: format!("{:.4}", rng.gen_range(0.0..1000.0)),
        size_mb: sample_size(cfg, rng),
        fee: sample_fee(cfg, rng),
        timestamp,
        tx_type,
        contract_call,
        metadata: TxMetadata::default(),
        is_redactable,
        privacy_level,
    }
}

/// Light mode (§4.6): one global pending pool, no per-node propagation.
#[derive(Debug, Default)]
pub struct LightPool {
    pool: Vec<Transaction>,
    next_id: u64,
}

impl LightPool {
    pub fn new() -> Self {
        LightPool::default()
    }

    pub fn create_transactions(
        &mut self,
        b_interval: f64,
        cfg: &TxFactoryConfig,
        contracts: &[ContractAddress],
        now: f64,
        rng: &mut impl Rng,
    ) {
        let count = (cfg.t_n * b_interval).round().max(0.0) as u64;
        for _ in 0..count {
            self.next_id += 1;
            let tx = build_transaction(
                self.next_id,
                NodeId(0),
                NodeId(1),
                TxTimestamp::Scalar(now),
                cfg,
                contracts,
                rng,
            );
            self.pool.push(tx);
        }
    }

    /// Sorts by fee descending, greedily includes transactions that still
    /// fit the remaining `Bsize` budget while preserving fee-order, and
    /// consumes the pool of everything it returns.
    pub fn execute_transactions(&mut self, b_size_mb: f64) -> (Vec<Transaction>, f64) {
        self.pool.sort_by(|a, b| b.fee.partial_cmp(&a.fee).unwrap());
        let mut selected = Vec::new();
        let mut total_size = 0.0;
        let mut remaining = Vec::new();
        for tx in self.pool.drain(..) {
            if total_size + tx.size_mb <= b_size_mb {
                total_size += tx.size_mb;
                selected.push(tx);
            } else {
                remaining.push(tx);
            }
        }
        self.pool = remaining;
        (selected, total_size)
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}

/// Full mode (§4.6): generates transactions upfront, assigns a sender, and
/// deep-copies each one into every other node's pool with a per-link
/// propagation delay added to the receive time.
pub fn full_create_transactions(
    nodes: &mut [Node],
    sim_time: f64,
    cfg: &TxFactoryConfig,
    contracts: &[ContractAddress],
    network: &Network,
    rng: &mut impl Rng,
) {
    if nodes.is_empty() {
        return;
    }
    let count = (cfg.t_n * sim_time).round().max(0.0) as u64;
    let n = nodes.len();
    let mut next_id = nodes
        .iter()
        .map(|node| node.transactions_pool.len() as u64)
        .sum::<u64>();
    for _ in 0..count {
        next_id += 1;
        let sender_idx = rng.gen_range(0..n);
        let to_idx = rng.gen_range(0..n);
        let created = rng.gen_range(0.0..sim_time.max(f64::EPSILON));
        let tx = build_transaction(
            next_id,
            nodes[sender_idx].id,
            nodes[to_idx].id,
            TxTimestamp::CreatedReceived {
                created,
                received: created,
            },
            cfg,
            contracts,
            rng,
        );
        nodes[sender_idx].transactions_pool.push_back((tx.clone(), created));
        for (idx, peer) in nodes.iter_mut().enumerate() {
            if idx == sender_idx {
                continue;
            }
            let delay = network.tx_prop_delay(rng);
            let mut copy = tx.clone();
            copy.timestamp = TxTimestamp::CreatedReceived {
                created,
                received: created + delay,
            };
            peer.transactions_pool.push_back((copy, created + delay));
        }
    }
}

/// Selects by fee descending from `miner`'s pool, constrained both by size
/// and by `receive_time <= now`; consumes the selected transactions.
pub fn full_execute_transactions(miner: &mut Node, now: f64, b_size_mb: f64) -> (Vec<Transaction>, f64) {
    let mut available: Vec<(Transaction, f64)> = miner
        .transactions_pool
        .iter()
        .filter(|(_, receive_time)| *receive_time <= now)
        .cloned()
        .collect();
    available.sort_by(|(a, _), (b, _)| b.fee.partial_cmp(&a.fee).unwrap());

    let mut selected = Vec::new();
    let mut total_size = 0.0;
    for (tx, _) in &available {
        if total_size + tx.size_mb <= b_size_mb {
            total_size += tx.size_mb;
            selected.push(tx.clone());
        }
    }

    let selected_ids: std::collections::BTreeSet<_> = selected.iter().map(|tx| tx.id.clone()).collect();
    miner.transactions_pool.retain(|(tx, _)| !selected_ids.contains(&tx.id));
    (selected, total_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerlab_core::{Chameleon, ChameleonGroup, Role};
    use ledgerlab_network::NetworkConfig;
    use ledgerlab_test_suite::seeded_rng;

    fn default_config() -> TxFactoryConfig {
        TxFactoryConfig {
            t_n: 5.0,
            t_fee_mean: 2.0,
            t_size_mean: 0.01,
            tx_type_distribution: vec![
                (TxType::Transfer, 0.7),
                (TxType::ContractCall, 0.2),
                (TxType::RedactionRequest, 0.1),
            ],
            privacy_level_distribution: vec![
                (PrivacyLevel::Public, 0.8),
                (PrivacyLevel::Private, 0.15),
                (PrivacyLevel::Confidential, 0.05),
            ],
        }
    }

    #[test]
    fn empty_pool_executes_to_empty_selection() {
        let mut pool = LightPool::new();
        let (selected, total_size) = pool.execute_transactions(10.0);
        assert!(selected.is_empty());
        assert_eq!(total_size, 0.0);
    }

    #[test]
    fn execute_transactions_never_exceeds_block_budget() {
        let mut pool = LightPool::new();
        let cfg = default_config();
        let mut rng = seeded_rng(11);
        pool.create_transactions(600.0, &cfg, &[], 0.0, &mut rng);
        let (selected, total_size) = pool.execute_transactions(0.05);
        assert!(total_size <= 0.05 + 1e-9);
        let recomputed: f64 = selected.iter().map(|tx| tx.size_mb).sum();
        assert!((recomputed - total_size).abs() < 1e-9);
    }

    #[test]
    fn redaction_request_transactions_are_never_redactable() {
        let cfg = default_config();
        let mut rng = seeded_rng(22);
        let mut pool = LightPool::new();
        pool.create_transactions(2000.0, &cfg, &[], 0.0, &mut rng);
        let (selected, _) = pool.execute_transactions(1_000_000.0);
        for tx in &selected {
            assert!(tx.is_redactable_invariant_holds());
        }
    }

    #[test]
    fn full_mode_respects_receive_time_constraint() {
        let chameleon = Chameleon::new(ChameleonGroup::simulation_default());
        let mut rng = seeded_rng(33);
        let k0 = chameleon.key_gen(&mut rng);
        let k1 = chameleon.key_gen(&mut rng);
        let mut nodes = vec![
            Node::new(NodeId(0), 10.0, Role::Miner, k0),
            Node::new(NodeId(1), 10.0, Role::Miner, k1),
        ];
        let cfg = default_config();
        let network = Network::new(NetworkConfig::default());
        full_create_transactions(&mut nodes, 100.0, &cfg, &[], &network, &mut rng);

        let (selected, _) = full_execute_transactions(&mut nodes[0], 0.0, 1_000_000.0);
        for tx in &selected {
            assert!(tx.timestamp.received() <= 0.0);
        }
    }
}
