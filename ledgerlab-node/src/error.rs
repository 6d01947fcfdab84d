use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)]
    Governance(#[from] ledgerlab_governance::GovernanceError),
    #[error(transparent)]
    Consensus(#[from] ledgerlab_consensus::ConsensusError),
    #[error("node {0} not found")]
    UnknownNode(ledgerlab_core::NodeId),
}
