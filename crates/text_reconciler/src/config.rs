use serde::Deserialize;

/// Tunables for reconciliation passes and position queries.
///
/// Deserializable with every field optional, so it can be embedded as a
/// `[config]` table in scenario files.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Node visits allowed per node in the snapshots involved.
    pub budget_per_node: usize,
    /// Visits allowed on top of the per-node budget.
    pub budget_floor: usize,
    /// Maximum recursion depth of any tree walk.
    pub max_depth: usize,
    /// Check length conservation for every node before committing a pass.
    pub verify_lengths: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            budget_per_node: 8,
            budget_floor: 256,
            max_depth: 2048,
            verify_lengths: cfg!(debug_assertions),
        }
    }
}

impl ReconcileConfig {
    /// Total node visits allowed for a walk over `node_count` nodes.
    pub fn traversal_budget(&self, node_count: usize) -> usize {
        self.budget_per_node
            .saturating_mul(node_count)
            .saturating_add(self.budget_floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_scales_with_node_count() {
        let config = ReconcileConfig {
            budget_per_node: 2,
            budget_floor: 10,
            ..ReconcileConfig::default()
        };
        assert_eq!(config.traversal_budget(0), 10);
        assert_eq!(config.traversal_budget(5), 20);
    }

    #[test]
    fn budget_saturates() {
        let config = ReconcileConfig {
            budget_per_node: usize::MAX,
            ..ReconcileConfig::default()
        };
        assert_eq!(config.traversal_budget(3), usize::MAX);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ReconcileConfig = toml::from_str("max_depth = 16").expect("parse config");
        assert_eq!(config.max_depth, 16);
        assert_eq!(config.budget_per_node, ReconcileConfig::default().budget_per_node);
    }
}
