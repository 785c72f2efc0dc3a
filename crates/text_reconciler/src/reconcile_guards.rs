//! Process-wide pass counters, compiled in with the `reconcile-guards`
//! feature. Tests use them to assert that clean subtrees take the fast path.

use std::sync::atomic::{AtomicU64, Ordering};

static PASSES: AtomicU64 = AtomicU64::new(0);
static FAST_PATH_SKIPS: AtomicU64 = AtomicU64::new(0);
static DIRTY_NODES: AtomicU64 = AtomicU64::new(0);
static CREATED_NODES: AtomicU64 = AtomicU64::new(0);
static DESTROYED_NODES: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReconcileGuardCounts {
    pub passes: u64,
    pub fast_path_skips: u64,
    pub dirty_nodes: u64,
    pub created_nodes: u64,
    pub destroyed_nodes: u64,
}

pub fn reset() {
    PASSES.store(0, Ordering::Relaxed);
    FAST_PATH_SKIPS.store(0, Ordering::Relaxed);
    DIRTY_NODES.store(0, Ordering::Relaxed);
    CREATED_NODES.store(0, Ordering::Relaxed);
    DESTROYED_NODES.store(0, Ordering::Relaxed);
}

pub fn record_pass() {
    PASSES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_fast_path() {
    FAST_PATH_SKIPS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_dirty_node() {
    DIRTY_NODES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_created_node() {
    CREATED_NODES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_destroyed_node() {
    DESTROYED_NODES.fetch_add(1, Ordering::Relaxed);
}

pub fn counts() -> ReconcileGuardCounts {
    ReconcileGuardCounts {
        passes: PASSES.load(Ordering::Relaxed),
        fast_path_skips: FAST_PATH_SKIPS.load(Ordering::Relaxed),
        dirty_nodes: DIRTY_NODES.load(Ordering::Relaxed),
        created_nodes: CREATED_NODES.load(Ordering::Relaxed),
        destroyed_nodes: DESTROYED_NODES.load(Ordering::Relaxed),
    }
}
