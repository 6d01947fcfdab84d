//! Core data model and chameleon-hash cryptography shared by every crate in
//! the redactable-chain simulator.

pub mod chameleon;
pub mod error;
pub mod ids;
pub mod secret_sharing;
pub mod types;

pub use chameleon::{Chameleon, ChameleonGroup, ChameleonKeyPair, ChameleonPublicKey, ChameleonSecretKey};
pub use error::CoreError;
pub use ids::{BlockId, ContractAddress, MessageDigest, NodeId, RequestId};
pub use secret_sharing::{SecretSharing, Share, StubSecretSharing};
pub use types::*;
