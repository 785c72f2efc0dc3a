//! # doc_model
//!
//! Hierarchical document model consumed by the flat-text reconciler.
//!
//! - [`Snapshot`]: immutable map from [`NodeKey`] to shared [`Node`] payloads.
//! - [`DirtySet`]: which nodes changed between two snapshots.
//! - [`DocumentWriter`]: copy-on-write mutation API producing [`Transition`]s.
//!
//! Unchanged nodes are the same `Arc` in consecutive snapshots, so identity
//! checks between snapshots are pointer comparisons.

mod dirty;
mod snapshot;
mod types;
mod writer;

pub use dirty::DirtySet;
pub use snapshot::Snapshot;
pub use types::{Node, NodeKey, NodeKind};
pub use writer::{DocumentError, DocumentWriter, Transition};
