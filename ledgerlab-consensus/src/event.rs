//! `spec.md` §3 Event: `{ type, time, block, node }`, where `node` is the
//! receiving node for `receive_block` events and is absent for
//! `create_block` events (the block's own `miner` field is the actor).

use ledgerlab_core::{Block, EventKind, NodeId};

#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub time: f64,
    pub block: Block,
    /// Recipient of a `receive_block` event. `None` for `create_block`.
    pub node: Option<NodeId>,
}

impl Event {
    pub fn create_block(time: f64, block: Block) -> Self {
        Event {
            kind: EventKind::CreateBlock,
            time,
            block,
            node: None,
        }
    }

    pub fn receive_block(time: f64, block: Block, recipient: NodeId) -> Self {
        Event {
            kind: EventKind::ReceiveBlock,
            time,
            block,
            node: Some(recipient),
        }
    }
}
