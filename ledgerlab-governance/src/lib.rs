//! Permission management and the redaction-request/voting/execution engine
//! (`spec.md` §4.8, §4.9).

pub mod error;
pub mod permissions;
pub mod policy;
pub mod redaction;

pub use error::GovernanceError;
pub use permissions::{can_perform_action, role_permissions};
pub use policy::find_admitting_policy;
pub use redaction::{
    drive_voting_round, execute_anonymize, execute_delete, execute_modify, request_redaction,
    vote_on_redaction,
};
