use thiserror::Error;

/// `spec.md` §7's non-fatal error kinds. Every variant here is recovered at
/// the call site (logged, counted in `Statistics`) rather than propagated
/// with `?` past the caller that can handle it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("node lacks permission for this action")]
    PermissionDenied,
    #[error("no redaction policy authorizes this request")]
    PolicyViolation,
    #[error("redaction target is out of range")]
    RedactionTargetInvalid,
    #[error("voter has already voted on this request")]
    DuplicateVote,
}
