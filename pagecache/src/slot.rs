//! The per-slot state machine and its wake channels. Grounded on
//! `examples/original_source/Source/PageSlot.{h,cpp}`.
//!
//! The mutable state (this module's [`SlotState`]) lives inside the
//! controller's single `parking_lot::Mutex`-guarded [`crate::controller::
//! State`]. The condition variables (this module's [`SlotSync`]) live in a
//! sibling, lock-free array on the controller itself, so that
//! `Condvar::wait` can be called with the state mutex guard without
//! borrowing through the data it protects.

use std::sync::Arc;

use parking_lot::Condvar;

/// `PageSlot::State` in the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotPhase {
	Free,
	Ready,
	Load,
	Unload,
}

impl SlotPhase {
	/// The numeric encoding used by [`crate::debug::DebugInfoKind::
	/// DescriptorState`], matching `PageSlot::State`'s `0..=3` values.
	pub fn as_u64(self) -> u64 {
		match self {
			SlotPhase::Free => 0,
			SlotPhase::Ready => 1,
			SlotPhase::Load => 2,
			SlotPhase::Unload => 3,
		}
	}
}

pub(crate) struct SlotState<E> {
	pub phase: SlotPhase,
	pub page: Option<u64>,
	pub unload_page: Option<u64>,
	pub is_dirty: bool,
	pub captured: u32,
	pub waiting: u32,
	/// Set by `notify_exception` iff a thread is parked on this slot when a
	/// backing-store failure occurs; cleared by the last waiter to observe
	/// it, exactly as `PageSlot::waitUnload`/`waitLoad` do with
	/// `exception_ptr`.
	pub pending_exception: Option<Arc<E>>,
}

impl<E> Default for SlotState<E> {
	fn default() -> Self {
		Self {
			phase: SlotPhase::Free,
			page: None,
			unload_page: None,
			is_dirty: false,
			captured: 0,
			waiting: 0,
			pending_exception: None,
		}
	}
}

impl<E> SlotState<E> {
	pub fn reset(&mut self) {
		self.phase = SlotPhase::Free;
		self.page = None;
		self.unload_page = None;
		self.is_dirty = false;
	}

	pub fn is_available(&self) -> bool {
		matches!(self.phase, SlotPhase::Free | SlotPhase::Ready) && self.waiting == 0
	}

	pub fn is_page_unload(&self, page: u64) -> bool {
		self.phase == SlotPhase::Unload && self.unload_page == Some(page)
	}

	pub fn is_loading(&self) -> bool {
		matches!(self.phase, SlotPhase::Load | SlotPhase::Unload)
	}

	pub fn can_flush(&self) -> bool {
		self.phase == SlotPhase::Ready && self.is_dirty
	}

	pub fn add_capture(&mut self) {
		self.captured += 1;
	}

	/// Returns `true` if this was the capture that brought the count to
	/// zero (the caller should then notify `cv_capture`).
	pub fn release_capture(&mut self) -> bool {
		debug_assert!(self.captured > 0, "release_capture with no outstanding capture");
		self.captured -= 1;
		self.captured == 0
	}
}

/// The three condition variables attached to one slot. Lives outside the
/// controller's mutex; see module docs.
#[derive(Default)]
pub(crate) struct SlotSync {
	pub cv_unload: Condvar,
	pub cv_load: Condvar,
	pub cv_capture: Condvar,
}

/// The operation a `PageSlot` access is performed for, forwarded to the
/// active [`crate::policy::ReplacementPolicy`]. `PageOperation` in the
/// original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PageOp {
	Read,
	Write,
	Replace,
	Reset,
	Flush,
}
