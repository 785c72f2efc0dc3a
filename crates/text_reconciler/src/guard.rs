use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, Result};

/// Bounds a recursive tree walk by total visits and by depth.
///
/// Malformed snapshots (cycles in child lists) and pathologically deep
/// documents fail fast with a diagnosable error instead of overflowing the
/// call stack.
#[derive(Debug)]
pub(crate) struct TraversalGuard {
    budget: usize,
    remaining: usize,
    depth: usize,
    max_depth: usize,
    visited: usize,
}

impl TraversalGuard {
    pub(crate) fn new(config: &ReconcileConfig, node_count: usize) -> Self {
        let budget = config.traversal_budget(node_count);
        Self {
            budget,
            remaining: budget,
            depth: 0,
            max_depth: config.max_depth,
            visited: 0,
        }
    }

    pub(crate) fn enter(&mut self) -> Result<()> {
        if self.remaining == 0 {
            return Err(ReconcileError::TraversalBudgetExceeded {
                budget: self.budget,
            });
        }
        if self.depth >= self.max_depth {
            return Err(ReconcileError::DepthLimitExceeded {
                limit: self.max_depth,
            });
        }
        self.remaining -= 1;
        self.depth += 1;
        self.visited += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        debug_assert!(self.depth > 0, "unbalanced traversal guard");
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn visited(&self) -> usize {
        self.visited
    }
}
