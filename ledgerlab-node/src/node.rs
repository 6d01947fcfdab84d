//! `spec.md` §3 Node: per-node state carried through the whole simulation.

use ledgerlab_core::{
    Block, ChameleonKeyPair, ContractAddress, NodeId, Permission, RedactionRequest, RequestId,
    Role, Transaction,
};
use ledgerlab_governance::{can_perform_action, role_permissions};
use std::collections::{BTreeSet, VecDeque};

/// One `redacted_tx` bookkeeping row, per `spec.md` §3: `[block_depth, tx,
/// reward, elapsed_ms, chain_len, tx_count]`.
#[derive(Debug, Clone)]
pub struct RedactedTxRecord {
    pub block_depth: u64,
    pub tx: Transaction,
    pub reward: f64,
    pub elapsed_ms: f64,
    pub chain_len: usize,
    pub tx_count: usize,
}

/// `spec.md` §3 Node.
pub struct Node {
    pub id: NodeId,
    pub hash_power: f64,
    pub balance: f64,
    pub blockchain: Vec<Block>,
    /// Full-mode only: a queue of `(transaction, receive_time)` pairs
    /// propagated from peers (§4.6 Full mode).
    pub transactions_pool: VecDeque<(Transaction, f64)>,
    pub keys: ChameleonKeyPair,
    pub role: Role,
    pub deployed_contracts: Vec<ContractAddress>,
    pub redaction_requests: Vec<RedactionRequest>,
    /// `request_id -> approve?` for requests this node has voted on, kept
    /// distinct from `RedactionRequest::voters` so a node can answer "have
    /// I voted" without walking every live request.
    pub voted_redactions: BTreeSet<RequestId>,
    pub redacted_tx: Vec<RedactedTxRecord>,
}

impl Node {
    pub fn new(id: NodeId, hash_power: f64, role: Role, keys: ChameleonKeyPair) -> Self {
        Node {
            id,
            hash_power,
            balance: 0.0,
            blockchain: Vec::new(),
            transactions_pool: VecDeque::new(),
            keys,
            role,
            deployed_contracts: Vec::new(),
            redaction_requests: Vec::new(),
            voted_redactions: BTreeSet::new(),
            redacted_tx: Vec::new(),
        }
    }

    pub fn is_miner(&self) -> bool {
        self.hash_power > 0.0
    }

    pub fn last_block(&self) -> &Block {
        self.blockchain.last().expect("chain always has a genesis block")
    }

    pub fn permissions(&self) -> &'static [Permission] {
        role_permissions(self.role)
    }

    pub fn can(&self, action: Permission) -> bool {
        can_perform_action(self.role, action)
    }

    /// Invariant: a node records at most one vote per request id.
    pub fn has_voted(&self, request_id: &RequestId) -> bool {
        self.voted_redactions.contains(request_id)
    }

    pub fn record_vote(&mut self, request_id: RequestId) -> bool {
        self.voted_redactions.insert(request_id)
    }
}
