//! Debug observability surface: trace points and debug-info categories,
//! mirroring `CacheTypes.h`'s `DebugInformation`/`DebugTracePoint`.

/// Fired at the corresponding design event inside the controller. Wired up
/// with [`crate::PageCacheController::set_trace_callback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TracePoint {
	Hit,
	Miss,
	Replace,
	Load,
	Unload,
	WaitLoad,
	WaitUnload,
	AddCapture,
	ReleaseCapture,
	Read,
	Write,
	ReadPage,
	WritePage,
}

/// Which per-slot debug table to read via
/// [`crate::PageCacheController::get_debug_info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugInfoKind {
	/// `(page, slot)` pairs currently known to the locator.
	LocationTable,
	/// `(slot, page)` for every slot.
	DescriptorPage,
	/// `(slot, state)` for every slot (`state` encoded as `0..=3`, matching
	/// `PageSlot::State`).
	DescriptorState,
	/// `(slot, is_dirty)` for every slot (`0` or `1`).
	DescriptorChange,
	/// `(slot, unload_page)` for every slot.
	DescriptorUnloadPage,
	/// `(slot, waiting_count)` for every slot.
	DescriptorWaitingCount,
}
