//! The simulator's data model (`spec.md` §3): `Block`, `Transaction`,
//! `RedactionRequest`, `RedactionPolicy`, and the role/permission vocabulary
//! shared by `ledgerlab-governance` and `ledgerlab-node`.

use crate::ids::{BlockId, ContractAddress, MessageDigest, NodeId, RequestId};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `spec.md` §3 Block.block_type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockType {
    Genesis,
    Normal,
    Audit,
}

/// A single append-only entry in `Block::redaction_history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionRecord {
    pub kind: RedactionType,
    pub target_tx: usize,
    pub requester: NodeId,
    pub approvers: Vec<NodeId>,
    pub timestamp: f64,
}

/// A result of dispatching a `CONTRACT_CALL` transaction through the stub
/// execution engine (`ledgerlab_node::contracts`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    pub contract_address: ContractAddress,
    pub method: String,
    pub gas_limit: u64,
    pub gas_used: Option<u64>,
    pub success: Option<bool>,
}

/// `spec.md` §3 Block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub depth: u64,
    pub id: BlockId,
    pub previous: BlockId,
    pub timestamp: f64,
    pub miner: NodeId,
    pub size_mb: f64,
    pub transactions: Vec<Transaction>,
    /// Chameleon randomness. Mutable under redaction; every forge
    /// recomputes `id` from a new value of `r`.
    pub r: BigUint,
    /// Immutable snapshot of `id` at mining time, kept for audit even
    /// though `id` itself never actually changes value (only its
    /// `(m, r)` witness does).
    pub original_hash: BlockId,
    pub block_type: BlockType,
    pub redaction_history: Vec<RedactionRecord>,
    pub contract_calls: Vec<ContractCall>,
    pub smart_contracts: Vec<ContractAddress>,
}

impl Block {
    pub fn genesis(miner: NodeId, id: BlockId, r: BigUint) -> Self {
        Block {
            depth: 0,
            id: id.clone(),
            previous: id.clone(),
            timestamp: 0.0,
            miner,
            size_mb: 0.0,
            transactions: Vec::new(),
            r,
            original_hash: id,
            block_type: BlockType::Genesis,
            redaction_history: Vec::new(),
            contract_calls: Vec::new(),
            smart_contracts: Vec::new(),
        }
    }

    /// The canonical byte encoding hashed to produce `m` in Invariant A:
    /// `m = SHA256(canonical(transactions, previous))`.
    pub fn canonical_message(&self) -> MessageDigest {
        canonical_message(&self.transactions, &self.previous)
    }
}

/// Shared by block construction and by `RedactionEngine` when it must
/// recompute `m` before and after mutating the transaction list.
pub fn canonical_message(transactions: &[Transaction], previous: &BlockId) -> MessageDigest {
    let mut buf = Vec::new();
    for tx in transactions {
        buf.extend_from_slice(tx.id.0.as_bytes());
        buf.push(b'|');
        buf.extend_from_slice(&tx.sender.0.to_le_bytes());
        buf.extend_from_slice(&tx.to.0.to_le_bytes());
        buf.extend_from_slice(tx.value.as_bytes());
        buf.push(if tx.metadata.redacted { 1 } else { 0 });
        buf.push(if tx.metadata.anonymized { 1 } else { 0 });
        buf.push(b';');
    }
    buf.extend_from_slice(previous.to_string().as_bytes());
    MessageDigest::hash(&buf)
}

/// `spec.md` §3 Transaction.tx_type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxType {
    Transfer,
    ContractCall,
    ContractDeploy,
    RedactionRequest,
    MedicalRecord,
}

/// `spec.md` §3 Transaction.privacy_level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrivacyLevel {
    Public,
    Private,
    Confidential,
}

/// `spec.md` §3 Transaction.timestamp: a scalar in Light mode, a
/// `(created, received)` pair in Full mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TxTimestamp {
    Scalar(f64),
    CreatedReceived { created: f64, received: f64 },
}

impl TxTimestamp {
    pub fn created(&self) -> f64 {
        match self {
            TxTimestamp::Scalar(t) => *t,
            TxTimestamp::CreatedReceived { created, .. } => *created,
        }
    }

    pub fn received(&self) -> f64 {
        match self {
            TxTimestamp::Scalar(t) => *t,
            TxTimestamp::CreatedReceived { received, .. } => *received,
        }
    }
}

/// A typed replacement for the source's duck-typed transaction metadata
/// (DESIGN NOTES). Dedicated fields cover the redaction bookkeeping the
/// spec names explicitly; `Other` remains for policy-condition matching
/// against arbitrary key/value pairs (`spec.md` §4.8).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxMetadata {
    pub redacted: bool,
    pub anonymized: bool,
    pub other: BTreeMap<String, String>,
}

impl TxMetadata {
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "redacted" if self.redacted => Some("true"),
            "anonymized" if self.anonymized => Some("true"),
            _ => self.other.get(key).map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(pub String);

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `spec.md` §3 Transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxId,
    pub sender: NodeId,
    pub to: NodeId,
    pub value: String,
    pub size_mb: f64,
    pub fee: f64,
    pub timestamp: TxTimestamp,
    pub tx_type: TxType,
    pub contract_call: Option<ContractCall>,
    pub metadata: TxMetadata,
    pub is_redactable: bool,
    pub privacy_level: PrivacyLevel,
}

impl Transaction {
    /// Invariant: a `REDACTION_REQUEST` transaction is itself
    /// non-redactable (`spec.md` §3).
    pub fn is_redactable_invariant_holds(&self) -> bool {
        !(self.tx_type == TxType::RedactionRequest && self.is_redactable)
    }
}

/// `spec.md` §3 RedactionRequest.redaction_type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedactionType {
    Delete,
    Modify,
    Anonymize,
}

/// `spec.md` §3 RedactionRequest.status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedactionStatus {
    Pending,
    Approved,
    Rejected,
}

/// `spec.md` §3 RedactionRequest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionRequest {
    pub request_id: RequestId,
    pub requester: NodeId,
    pub target_block: u64,
    pub target_tx: usize,
    pub redaction_type: RedactionType,
    pub reason: String,
    pub timestamp: f64,
    pub status: RedactionStatus,
    pub approvals: u32,
    pub required_approvals: u32,
    /// Voters already counted toward `approvals` or a disapproval, so that
    /// `Node`'s "at most once per request id" invariant (§3) holds even
    /// when enforced at the request rather than at the voting node.
    pub voters: std::collections::BTreeSet<NodeId>,
}

impl RedactionRequest {
    pub fn remaining_eligible_voters(&self, total_voters: u32) -> u32 {
        total_voters.saturating_sub(self.voters.len() as u32)
    }
}

/// `spec.md` §3 RedactionPolicy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionPolicy {
    pub policy_id: String,
    pub policy_type: RedactionType,
    pub conditions: BTreeMap<String, String>,
    pub authorized_roles: Vec<Role>,
    pub min_approvals: u32,
    pub time_lock_secs: u64,
}

/// `spec.md` §3 Node.role and §4.8's fixed role table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Regulator,
    Miner,
    User,
    Observer,
}

/// `spec.md` §4.8's permission vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    Read,
    Write,
    Deploy,
    Redact,
    Approve,
    Audit,
    Mine,
    Validate,
    Transact,
}

/// `spec.md` §3 Event.type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    CreateBlock,
    ReceiveBlock,
}
