//! End-to-end redaction-voting scenarios (`spec.md` §8, scenarios 2-5): a
//! request is admitted by policy, voted on directly (bypassing the
//! stochastic `drive_voting_round` so the vote tallies are deterministic),
//! and executed if approved.

use ledgerlab_core::*;
use ledgerlab_governance::*;
use ledgerlab_test_suite::seeded_rng;
use num_bigint::BigUint;
use std::collections::BTreeMap;

fn sample_tx(id: &str, sender: u64, to: u64) -> Transaction {
    Transaction {
        id: TxId(id.to_string()),
        sender: NodeId(sender),
        to: NodeId(to),
        value: "42".to_string(),
        size_mb: 0.001,
        fee: 1.0,
        timestamp: TxTimestamp::Scalar(0.0),
        tx_type: TxType::Transfer,
        contract_call: None,
        metadata: TxMetadata::default(),
        is_redactable: true,
        privacy_level: PrivacyLevel::Public,
    }
}

fn sample_block(chameleon: &Chameleon, keys: &ChameleonKeyPair, rng: &mut impl rand::Rng) -> Block {
    let txs = vec![sample_tx("tx0", 4, 5)];
    let previous = BlockId(BigUint::from(1u32));
    let m = canonical_message(&txs, &previous);
    let r = chameleon.random_r(rng);
    let id = chameleon.hash(&keys.pk, &m, &r);
    Block {
        depth: 1,
        id: id.clone(),
        previous,
        timestamp: 1.0,
        miner: NodeId(0),
        size_mb: 0.01,
        transactions: txs,
        r,
        original_hash: id,
        block_type: BlockType::Normal,
        redaction_history: Vec::new(),
        contract_calls: Vec::new(),
        smart_contracts: Vec::new(),
    }
}

fn policy(kind: RedactionType, min_approvals: u32) -> RedactionPolicy {
    RedactionPolicy {
        policy_id: format!("{kind:?}-policy"),
        policy_type: kind,
        conditions: BTreeMap::new(),
        authorized_roles: vec![Role::Admin, Role::Regulator],
        min_approvals,
        time_lock_secs: 0,
    }
}

/// Scenario 2: Admin (node 0) requests MODIFY on block 1 / tx 0; two
/// voters approve; execution sets `value == "REDACTED"` and
/// `metadata.redacted == true` while leaving `block.id` unchanged.
#[test]
fn modify_via_approved_request() {
    env_logger::builder().is_test(true).try_init().ok();
    let chameleon = Chameleon::new(ChameleonGroup::simulation_default());
    let mut rng = seeded_rng(201);
    let keys = chameleon.key_gen(&mut rng);
    let mut block = sample_block(&chameleon, &keys, &mut rng);
    let before_id = block.id.clone();

    let policies = vec![policy(RedactionType::Modify, 2)];
    let mut request = request_redaction(
        &policies,
        NodeId(0),
        Role::Admin,
        1,
        0,
        RedactionType::Modify,
        "compliance request".to_string(),
        10.0,
        &BTreeMap::new(),
    )
    .expect("admin with an admitting policy may request a redaction");

    vote_on_redaction(&mut request, NodeId(0), Role::Admin, true).unwrap();
    vote_on_redaction(&mut request, NodeId(1), Role::Regulator, true).unwrap();
    assert_eq!(request.approvals, 2);
    request.status = RedactionStatus::Approved;

    execute_modify(&chameleon, &keys.sk, &keys.pk, &mut block, request.target_tx, request.requester, request.voters.iter().copied().collect(), 11.0).unwrap();

    assert_eq!(block.transactions[0].value, "REDACTED");
    assert!(block.transactions[0].metadata.redacted);
    assert_eq!(block.id, before_id, "chameleon hash must survive the redaction");
}

/// Scenario 3: ANONYMIZE via an approved request clears `sender`/`to` to
/// node 0 and sets `metadata.anonymized`, again preserving `block.id`.
#[test]
fn anonymize_via_approved_request() {
    let chameleon = Chameleon::new(ChameleonGroup::simulation_default());
    let mut rng = seeded_rng(202);
    let keys = chameleon.key_gen(&mut rng);
    let mut block = sample_block(&chameleon, &keys, &mut rng);
    let before_id = block.id.clone();

    let policies = vec![policy(RedactionType::Anonymize, 2)];
    let mut request = request_redaction(
        &policies,
        NodeId(0),
        Role::Admin,
        1,
        0,
        RedactionType::Anonymize,
        "privacy request".to_string(),
        10.0,
        &BTreeMap::new(),
    )
    .unwrap();
    vote_on_redaction(&mut request, NodeId(0), Role::Admin, true).unwrap();
    vote_on_redaction(&mut request, NodeId(1), Role::Regulator, true).unwrap();
    request.status = RedactionStatus::Approved;

    execute_anonymize(&chameleon, &keys.sk, &keys.pk, &mut block, request.target_tx, request.requester, request.voters.iter().copied().collect(), 11.0).unwrap();

    assert_eq!(block.transactions[0].sender, NodeId(0));
    assert_eq!(block.transactions[0].to, NodeId(0));
    assert!(block.transactions[0].metadata.anonymized);
    assert_eq!(block.id, before_id);
}

/// Scenario 4: with `min_approvals` set one higher than the available
/// voter pool and every vote a disapproval, the request is rejected within
/// a single voting round — quorum can never be reached.
#[test]
fn quorum_unreachable_is_rejected() {
    let policies = vec![policy(RedactionType::Delete, 3)];
    let mut request = request_redaction(
        &policies,
        NodeId(0),
        Role::Admin,
        1,
        0,
        RedactionType::Delete,
        "unreachable quorum".to_string(),
        0.0,
        &BTreeMap::new(),
    )
    .unwrap();
    assert_eq!(request.required_approvals, 3);

    vote_on_redaction(&mut request, NodeId(0), Role::Admin, false).unwrap();
    vote_on_redaction(&mut request, NodeId(1), Role::Regulator, false).unwrap();
    let total_voters = 2;
    if total_voters - request.approvals < request.required_approvals {
        request.status = RedactionStatus::Rejected;
    }
    assert_eq!(request.status, RedactionStatus::Rejected);
}

/// Scenario 5: exactly `min_approvals == 2` voters, both disapprove — the
/// request has neither reached quorum nor become unreachable (2 voters,
/// 2 needed, 0 approvals so far is still mathematically reachable only if
/// more voters exist later), so it must remain PENDING and still be
/// approvable in a later voting round.
#[test]
fn pending_request_can_still_be_approved_later() {
    let policies = vec![policy(RedactionType::Delete, 2)];
    let mut request = request_redaction(
        &policies,
        NodeId(0),
        Role::Admin,
        1,
        0,
        RedactionType::Delete,
        "slow consensus".to_string(),
        0.0,
        &BTreeMap::new(),
    )
    .unwrap();

    vote_on_redaction(&mut request, NodeId(0), Role::Admin, false).unwrap();
    assert_eq!(request.status, RedactionStatus::Pending, "one disapproval out of an unknown-size roster stays pending");

    vote_on_redaction(&mut request, NodeId(1), Role::Regulator, true).unwrap();
    vote_on_redaction(&mut request, NodeId(2), Role::Admin, true).unwrap();
    assert_eq!(request.approvals, 2);
    if request.approvals >= request.required_approvals {
        request.status = RedactionStatus::Approved;
    }
    assert_eq!(request.status, RedactionStatus::Approved, "a later round can still reach quorum");
}
