use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsensusError {
    #[error("event queue is empty")]
    QueueEmpty,
}
