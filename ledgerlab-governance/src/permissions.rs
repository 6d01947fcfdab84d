//! `spec.md` §4.8 PermissionManager: a fixed role-to-permission map and the
//! authorization check every governed action goes through.

use ledgerlab_core::{Permission, Role};

/// The fixed role→permission table of `spec.md` §4.8. A `match` rather than
/// a runtime-mutable map, since the table itself is not configurable.
pub fn role_permissions(role: Role) -> &'static [Permission] {
    use Permission::*;
    match role {
        Role::Admin => &[Read, Write, Deploy, Redact, Approve, Audit],
        Role::Regulator => &[Read, Audit, Redact, Approve],
        Role::Miner => &[Read, Write, Mine, Validate],
        Role::User => &[Read, Write, Transact],
        Role::Observer => &[Read],
    }
}

/// `can_perform_action(node, action) = action ∈ node.permissions`.
pub fn can_perform_action(role: Role, action: Permission) -> bool {
    role_permissions(role).contains(&action)
}
