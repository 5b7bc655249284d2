//! A page-oriented, write-back cache controller for a generic backing
//! store. Grounded on `examples/original_source/Source/
//! PageCacheController.{h,cpp}` (the original `CacheController`), expressed
//! with the concurrency idioms of `acorn/src/cache/*` — a single
//! `parking_lot::Mutex`-guarded state machine plus a pluggable
//! [`ReplacementPolicy`].
//!
//! A client implements [`BackingStore`] for their storage medium and drives
//! the cache through [`PageCacheController::read`]/[`PageCacheController::
//! write`]; everything else (page loading/unloading, dirty tracking,
//! eviction) happens underneath.

mod backing_store;
mod buffer;
mod config;
mod controller;
mod debug;
mod error;
mod iter;
mod locator;
mod policy;
mod slot;
mod stats;

pub use backing_store::BackingStore;
pub use config::{LocatorType, ReplaceAlgorithm, Settings, WriteMissPolicy, WritePolicy};
pub use controller::PageCacheController;
pub use debug::{DebugInfoKind, TracePoint};
pub use error::{Error, ErrorCode};
pub use stats::Statistics;
