use thiserror::Error;

/// Errors raised by the cryptographic core. Per the simulator's error
/// taxonomy, a `CryptoInvariantViolation` indicates a bug in the forging
/// logic and is fatal; callers should `assert!`/`panic!` rather than
/// propagate it as ordinary control flow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("chameleon hash invariant violated: forged randomness does not reproduce the original digest")]
    CryptoInvariantViolation,
    #[error("invalid group parameters: {0}")]
    InvalidGroupParameters(String),
}
