//! `spec.md` §4.9 RedactionEngine: request admission, multi-party voting,
//! and execution of the three redaction primitives (DELETE, MODIFY,
//! ANONYMIZE), each preserving a block's chameleon-hash digest through
//! trapdoor forgery.

use crate::error::GovernanceError;
use crate::permissions::can_perform_action;
use crate::policy::find_admitting_policy;
use ledgerlab_core::{
    Block, Chameleon, ChameleonPublicKey, ChameleonSecretKey, NodeId, Permission,
    RedactionPolicy, RedactionRecord, RedactionRequest, RedactionStatus, RedactionType, Role,
    Transaction, TxId,
};
use rand::Rng;
use std::collections::BTreeMap;
use uuid::Uuid;

/// `Node.request_redaction`: requires `REDACT` permission and an admitting
/// policy. On success, a fresh `PENDING` request with `approvals = 0`.
pub fn request_redaction(
    policies: &[RedactionPolicy],
    requester: NodeId,
    requester_role: Role,
    target_block: u64,
    target_tx: usize,
    redaction_type: RedactionType,
    reason: String,
    timestamp: f64,
    metadata: &BTreeMap<String, String>,
) -> Result<RedactionRequest, GovernanceError> {
    if !can_perform_action(requester_role, Permission::Redact) {
        log::warn!("node {requester} denied redaction request: role {requester_role:?} lacks REDACT");
        return Err(GovernanceError::PermissionDenied);
    }
    let policy = find_admitting_policy(policies, redaction_type, requester_role, metadata).ok_or_else(|| {
        log::warn!("no policy admits a {redaction_type:?} request from node {requester}");
        GovernanceError::PolicyViolation
    })?;
    Ok(RedactionRequest {
        request_id: Uuid::new_v4(),
        requester,
        target_block,
        target_tx,
        redaction_type,
        reason,
        timestamp,
        status: RedactionStatus::Pending,
        approvals: 0,
        required_approvals: policy.min_approvals.max(1),
        voters: Default::default(),
    })
}

/// `Node.vote_on_redaction`: requires `APPROVE` permission. Rejects a
/// second vote from the same voter on the same request (first write wins).
pub fn vote_on_redaction(
    request: &mut RedactionRequest,
    voter: NodeId,
    voter_role: Role,
    approve: bool,
) -> Result<(), GovernanceError> {
    if !can_perform_action(voter_role, Permission::Approve) {
        return Err(GovernanceError::PermissionDenied);
    }
    if !request.voters.insert(voter) {
        return Err(GovernanceError::DuplicateVote);
    }
    if approve {
        request.approvals += 1;
    }
    Ok(())
}

/// The voting driver that runs once per `create_block` event (`spec.md`
/// §4.9 "Voting driver"). Only touches requests still `PENDING`.
///
/// `authorized_voters` is the full roster of nodes with role ADMIN or
/// REGULATOR (step 1); the caller builds this list once per call from the
/// live node population.
pub fn drive_voting_round(
    request: &mut RedactionRequest,
    authorized_voters: &[NodeId],
    rng: &mut impl Rng,
) -> RedactionStatus {
    if request.status != RedactionStatus::Pending {
        return request.status;
    }
    let votes_needed = request.required_approvals;
    let total_voters = authorized_voters.len() as u32;

    if total_voters > 0 {
        let lo = votes_needed.min(total_voters.saturating_sub(1));
        let hi = total_voters.saturating_sub(1);
        let k = if hi == 0 { total_voters } else { rng.gen_range(lo..=hi).max(1) };
        for voter in authorized_voters.iter().take(k as usize) {
            if request.voters.contains(voter) {
                continue;
            }
            let approve = rng.gen_bool(0.7);
            request.voters.insert(*voter);
            if approve {
                request.approvals += 1;
            }
        }
    }

    request.status = if request.approvals >= votes_needed {
        RedactionStatus::Approved
    } else if total_voters.saturating_sub(request.approvals) < votes_needed {
        RedactionStatus::Rejected
    } else {
        RedactionStatus::Pending
    };
    request.status
}

/// The record appended on execution, independent of which primitive ran.
fn record(kind: RedactionType, target_tx: usize, requester: NodeId, approvers: Vec<NodeId>, timestamp: f64) -> RedactionRecord {
    RedactionRecord {
        kind,
        target_tx,
        requester,
        approvers,
        timestamp,
    }
}

/// Forges `block.r` so that the digest computed from `block`'s *new*
/// transaction list is unchanged, and aborts (per §7
/// `CryptoInvariantViolation`) if the forge law fails to hold — that would
/// indicate a bug in the forging arithmetic, not a recoverable condition.
fn forge_after_mutation(
    chameleon: &Chameleon,
    sk: &ChameleonSecretKey,
    pk: &ChameleonPublicKey,
    block: &mut Block,
    m1: ledgerlab_core::MessageDigest,
) {
    let m2 = block.canonical_message();
    let r2 = chameleon.forge(sk, &m1, &block.r, &m2);
    if let Err(e) = chameleon.assert_forge_preserves_digest(pk, &m1, &block.r, &m2, &r2) {
        panic!("{e}");
    }
    block.r = r2;
}

/// `delete_tx`: pops the target transaction and forges `r` so `block.id`
/// is unchanged.
pub fn execute_delete(
    chameleon: &Chameleon,
    sk: &ChameleonSecretKey,
    pk: &ChameleonPublicKey,
    block: &mut Block,
    target_tx: usize,
    requester: NodeId,
    approvers: Vec<NodeId>,
    timestamp: f64,
) -> Result<Transaction, GovernanceError> {
    if target_tx >= block.transactions.len() {
        return Err(GovernanceError::RedactionTargetInvalid);
    }
    let m1 = block.canonical_message();
    let removed = block.transactions.remove(target_tx);
    forge_after_mutation(chameleon, sk, pk, block, m1);
    block
        .redaction_history
        .push(record(RedactionType::Delete, target_tx, requester, approvers, timestamp));
    Ok(removed)
}

/// `redact_tx` (MODIFY): mutates the target transaction's value in place
/// and forges `r`.
pub fn execute_modify(
    chameleon: &Chameleon,
    sk: &ChameleonSecretKey,
    pk: &ChameleonPublicKey,
    block: &mut Block,
    target_tx: usize,
    requester: NodeId,
    approvers: Vec<NodeId>,
    timestamp: f64,
) -> Result<(), GovernanceError> {
    if target_tx >= block.transactions.len() {
        return Err(GovernanceError::RedactionTargetInvalid);
    }
    let m1 = block.canonical_message();
    {
        let tx = &mut block.transactions[target_tx];
        tx.value = "REDACTED".to_string();
        tx.metadata.redacted = true;
        tx.id = TxId(format!("{}-redacted", tx.id.0));
    }
    forge_after_mutation(chameleon, sk, pk, block, m1);
    block
        .redaction_history
        .push(record(RedactionType::Modify, target_tx, requester, approvers, timestamp));
    Ok(())
}

/// ANONYMIZE: clears the sender/recipient and flags the transaction, then
/// forges `r`.
pub fn execute_anonymize(
    chameleon: &Chameleon,
    sk: &ChameleonSecretKey,
    pk: &ChameleonPublicKey,
    block: &mut Block,
    target_tx: usize,
    requester: NodeId,
    approvers: Vec<NodeId>,
    timestamp: f64,
) -> Result<(), GovernanceError> {
    if target_tx >= block.transactions.len() {
        return Err(GovernanceError::RedactionTargetInvalid);
    }
    let m1 = block.canonical_message();
    {
        let tx = &mut block.transactions[target_tx];
        tx.sender = NodeId(0);
        tx.to = NodeId(0);
        tx.metadata.anonymized = true;
    }
    forge_after_mutation(chameleon, sk, pk, block, m1);
    block
        .redaction_history
        .push(record(RedactionType::Anonymize, target_tx, requester, approvers, timestamp));
    Ok(())
}
