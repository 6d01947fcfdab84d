//! Event queue, scheduler, and consensus (per-miner timing + longest-chain
//! fork resolution) for the redactable-chain simulator.

pub mod error;
pub mod event;
pub mod protocol;
pub mod queue;
pub mod scheduler;

pub use error::ConsensusError;
pub use event::Event;
pub use protocol::{fork_resolution, next_block_time, ForkResolution};
pub use queue::EventQueue;
pub use scheduler::{create_block_event, receive_block_event};
