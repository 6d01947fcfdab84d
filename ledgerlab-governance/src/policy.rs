//! `spec.md` §4.8 policy evaluation: "a request of type τ is admissible iff
//! there exists a policy with `policy_type == τ` and `requester.role ∈
//! authorized_roles`; policy `conditions` are matched against request
//! metadata by key equality."

use ledgerlab_core::{RedactionPolicy, RedactionType, Role};
use std::collections::BTreeMap;

/// Finds the first policy admitting a request of the given type, role, and
/// metadata. Returns `None` (a `PolicyViolation`, per §7) when no policy
/// matches.
pub fn find_admitting_policy<'a>(
    policies: &'a [RedactionPolicy],
    redaction_type: RedactionType,
    requester_role: Role,
    metadata: &BTreeMap<String, String>,
) -> Option<&'a RedactionPolicy> {
    policies.iter().find(|policy| {
        policy.policy_type == redaction_type
            && policy.authorized_roles.contains(&requester_role)
            && conditions_match(&policy.conditions, metadata)
    })
}

fn conditions_match(conditions: &BTreeMap<String, String>, metadata: &BTreeMap<String, String>) -> bool {
    conditions
        .iter()
        .all(|(key, value)| metadata.get(key) == Some(value))
}
