//! `spec.md` §4.10 Statistics: per-run accumulators plus the cross-run
//! counters `reset2()` is responsible for.

use ledgerlab_core::{BlockId, NodeId, RedactionType, Role};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct BlockRow {
    pub depth: u64,
    pub id: BlockId,
    pub previous: BlockId,
    pub timestamp: f64,
    pub miner: NodeId,
    pub tx_count: usize,
    pub size_mb: f64,
}

#[derive(Debug, Clone)]
pub struct ContractCallRow {
    pub depth: u64,
    pub miner: NodeId,
    pub contract_address: ledgerlab_core::ContractAddress,
    pub method: String,
    pub gas_used: Option<u64>,
    pub success: Option<bool>,
}

/// `spec.md` §4.10: `[miner_id, depth, tx_id, reward, elapsed_ms,
/// chain_length, tx_count]`.
#[derive(Debug, Clone)]
pub struct RedactionRow {
    pub miner_id: NodeId,
    pub depth: u64,
    pub tx_id: String,
    pub reward: f64,
    pub elapsed_ms: f64,
    pub chain_length: usize,
    pub tx_count: usize,
    pub kind: RedactionType,
}

/// `spec.md` §4.10 accumulators. `reset()` clears the per-run tables;
/// `reset2()` clears the cross-run aggregates a multi-`Runs` invocation
/// would otherwise carry forward indefinitely.
#[derive(Debug, Default)]
pub struct Statistics {
    pub total_blocks: u64,
    pub main_blocks: u64,
    pub stale_blocks: u64,
    pub block_rows: Vec<BlockRow>,
    pub contract_call_rows: Vec<ContractCallRow>,
    pub redaction_rows: Vec<RedactionRow>,

    pub redactions_by_type: BTreeMap<&'static str, u64>,
    pub redactions_by_role: BTreeMap<Role, u64>,
    pub permission_violations: u64,
    pub redaction_rejections_by_reason: BTreeMap<&'static str, u64>,
}

impl Statistics {
    pub fn new() -> Self {
        Statistics::default()
    }

    pub fn stale_rate(&self) -> f64 {
        if self.total_blocks == 0 {
            0.0
        } else {
            self.stale_blocks as f64 / self.total_blocks as f64
        }
    }

    pub fn record_block(&mut self, row: BlockRow, is_main: bool) {
        self.total_blocks += 1;
        if is_main {
            self.main_blocks += 1;
        } else {
            self.stale_blocks += 1;
        }
        self.block_rows.push(row);
    }

    /// A block already counted by `record_block` at its creation turns out
    /// to sit on a losing branch once a peer reorgs past it. Reclassifies it
    /// from main to stale without touching `total_blocks` or `block_rows` —
    /// the block was created exactly once, so it must be counted exactly
    /// once.
    pub fn record_stale_reorg(&mut self) {
        self.main_blocks = self.main_blocks.saturating_sub(1);
        self.stale_blocks += 1;
    }

    pub fn record_contract_call(&mut self, row: ContractCallRow) {
        self.contract_call_rows.push(row);
    }

    pub fn record_redaction(&mut self, row: RedactionRow, requester_role: Role) {
        let kind_name = match row.kind {
            RedactionType::Delete => "delete",
            RedactionType::Modify => "modify",
            RedactionType::Anonymize => "anonymize",
        };
        *self.redactions_by_type.entry(kind_name).or_insert(0) += 1;
        *self.redactions_by_role.entry(requester_role).or_insert(0) += 1;
        self.redaction_rows.push(row);
    }

    pub fn record_permission_violation(&mut self) {
        self.permission_violations += 1;
    }

    pub fn record_redaction_rejection(&mut self, reason: &'static str) {
        *self.redaction_rejections_by_reason.entry(reason).or_insert(0) += 1;
    }

    /// `spec.md` §4.5: once fork resolution has picked the canonical chain,
    /// `mainBlocks = len(global_chain) - 1` and `staleBlocks = totalBlocks -
    /// mainBlocks`, superseding whatever the incremental per-event
    /// bookkeeping in `record_block` guessed while the chain was still
    /// forking.
    pub fn finalize_fork_resolution(&mut self, main_chain_length: u64) {
        self.main_blocks = main_chain_length.saturating_sub(1);
        self.stale_blocks = self.total_blocks.saturating_sub(self.main_blocks);
    }

    pub fn average_redaction_time_ms(&self) -> f64 {
        if self.redaction_rows.is_empty() {
            0.0
        } else {
            self.redaction_rows.iter().map(|r| r.elapsed_ms).sum::<f64>() / self.redaction_rows.len() as f64
        }
    }

    /// Zeros per-run state (called between successive runs in `Config.runs`).
    pub fn reset(&mut self) {
        self.total_blocks = 0;
        self.main_blocks = 0;
        self.stale_blocks = 0;
        self.block_rows.clear();
        self.contract_call_rows.clear();
        self.redaction_rows.clear();
    }

    /// Zeros the cross-run aggregates `reset()` leaves untouched.
    pub fn reset2(&mut self) {
        self.redactions_by_type.clear();
        self.redactions_by_role.clear();
        self.permission_violations = 0;
        self.redaction_rejections_by_reason.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerlab_core::BlockId;
    use num_bigint::BigUint;

    fn row(depth: u64) -> BlockRow {
        BlockRow {
            depth,
            id: BlockId(BigUint::from(depth + 1)),
            previous: BlockId(BigUint::from(depth)),
            timestamp: depth as f64,
            miner: NodeId(0),
            tx_count: 2,
            size_mb: 0.01,
        }
    }

    #[test]
    fn total_blocks_is_sum_of_main_and_stale() {
        let mut stats = Statistics::new();
        stats.record_block(row(1), true);
        stats.record_block(row(2), false);
        stats.record_block(row(3), true);
        assert_eq!(stats.total_blocks, 3);
        assert_eq!(stats.main_blocks, 2);
        assert_eq!(stats.stale_blocks, 1);
        assert!((stats.stale_rate() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn finalize_fork_resolution_overrides_incremental_guesses() {
        let mut stats = Statistics::new();
        for d in 0..7 {
            stats.record_block(row(d), true);
        }
        stats.finalize_fork_resolution(6);
        assert_eq!(stats.main_blocks, 5);
        assert_eq!(stats.stale_blocks, 2);
        assert_eq!(stats.total_blocks, stats.main_blocks + stats.stale_blocks);
    }

    #[test]
    fn reset_clears_per_run_rows_but_reset2_clears_aggregates() {
        let mut stats = Statistics::new();
        stats.record_block(row(1), true);
        stats.record_permission_violation();
        stats.reset();
        assert_eq!(stats.total_blocks, 0);
        assert!(stats.block_rows.is_empty());
        assert_eq!(stats.permission_violations, 1, "reset() must not touch cross-run counters");
        stats.reset2();
        assert_eq!(stats.permission_violations, 0);
    }
}
