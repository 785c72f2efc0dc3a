//! # text_reconciler
//!
//! Synchronizes a hierarchical document ([`doc_model::Snapshot`]) with an
//! external flat-text surface that only understands character offsets and two
//! primitives: insert a string at an offset, delete a range.
//!
//! - [`reconcile`]: diff two snapshots into an [`EditScript`] and the next [`RangeCache`].
//! - [`locate_offset`] / [`map_offset_to_point`]: flat offset -> document position.
//! - [`map_point_to_offset`] / [`map_selection_to_range`]: document position -> flat offset.
//! - [`TextSession`]: owns the committed cache and applies passes buffer-then-commit.
//!
//! All offsets and lengths are counted in `char`s.

mod children;
mod config;
mod edit_script;
mod error;
mod frontend;
mod guard;
mod locate;
mod range_cache;
mod reconcile;
#[cfg(feature = "reconcile-guards")]
pub mod reconcile_guards;
mod selection;
mod session;

pub use children::{ChildListOps, ChildOp, ChildOpRecorder, classify_children, diff_children};
pub use config::ReconcileConfig;
pub use edit_script::{EditScript, Insertion, NodePart, TextEdit};
pub use error::{ReconcileError, Result, Side};
pub use frontend::{FrontendCall, RecordingFrontend, TextBuffer, TextFrontend};
pub use locate::{LocateKind, LocatedOffset, locate_offset, map_offset_to_point};
pub use range_cache::{RangeCache, RangeCacheItem, TextRange};
pub use reconcile::{ReconcileOutput, reconcile, reconcile_from_empty};
pub use selection::{
    Point, PointKind, Selection, map_point_to_offset, map_selection_to_range,
    selection_from_native_range,
};
pub use session::{PassReport, TextSession};
