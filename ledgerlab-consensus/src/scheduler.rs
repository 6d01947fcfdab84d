//! `spec.md` §4.4 Scheduler: constructs events and pushes them onto the
//! queue. Does not decide timing itself (that is `protocol::next_block_time`
//! and `Network::block_prop_delay`) — it only shapes events.

use crate::event::Event;
use crate::queue::EventQueue;
use ledgerlab_core::{Block, BlockId, NodeId};
use num_bigint::BigUint;

/// Constructs a new, empty block owned by `node` and schedules a
/// `create_block` event at `time`. The block's `id`/`r` are placeholders
/// until `BlockCommit::handle_create_block` fills them in.
pub fn create_block_event(queue: &mut EventQueue, node: NodeId, time: f64, depth: u64, previous: BlockId) {
    let block = Block {
        depth,
        id: previous.clone(),
        previous,
        timestamp: time,
        miner: node,
        size_mb: 0.0,
        transactions: Vec::new(),
        r: BigUint::from(0u32),
        original_hash: BlockId::default(),
        block_type: ledgerlab_core::BlockType::Normal,
        redaction_history: Vec::new(),
        contract_calls: Vec::new(),
        smart_contracts: Vec::new(),
    };
    queue.push(Event::create_block(time, block));
}

/// Posts a `receive_block` event `delay` seconds after `now`, per §4.4:
/// "The 'now' used here is the current event's time".
pub fn receive_block_event(queue: &mut EventQueue, recipient: NodeId, block: Block, now: f64, delay: f64) {
    queue.push(Event::receive_block(now + delay, block, recipient));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receive_event_time_is_now_plus_delay() {
        let mut q = EventQueue::new();
        let block = Block::genesis(NodeId(0), BlockId::default(), BigUint::from(0u32));
        receive_block_event(&mut q, NodeId(1), block, 10.0, 0.42);
        let event = q.pop_min().unwrap();
        assert!((event.time - 10.42).abs() < 1e-9);
    }
}
