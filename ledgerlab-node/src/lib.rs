//! Per-node state, the transaction factory, block-commit event handling,
//! and the top-level simulation driver (`spec.md` §2-§6).
//!
//! The following modules together implement one simulated node and the
//! machinery that drives a full run:
//!
//! - [`node`] - per-node state carried through the simulation.
//! - [`tx_factory`] - Light/Full transaction generation and block-fill.
//! - [`contracts`] - the gas-metered smart-contract registry stub.
//! - [`block_commit`] - the `CreateBlock`/`ReceiveBlock` event handlers,
//!   fork resolution, and approved-redaction execution.
//! - [`statistics`] - per-run and cross-run accumulators.
//! - [`simulation`] - `Simulation`, the top-level control-flow driver.

pub mod block_commit;
pub mod contracts;
pub mod error;
pub mod node;
pub mod simulation;
pub mod statistics;
pub mod tx_factory;

pub use block_commit::{handle_create_block, handle_receive_block, resolve_forks, SimConfig, SimState, TxTechnique};
pub use contracts::ContractRegistry;
pub use error::NodeError;
pub use node::{Node, RedactedTxRecord};
pub use simulation::{RandomProposer, RedactionProposer, Simulation, SimulationConfig};
pub use statistics::{BlockRow, ContractCallRow, RedactionRow, Statistics};
pub use tx_factory::{full_create_transactions, full_execute_transactions, LightPool, TxFactoryConfig};
