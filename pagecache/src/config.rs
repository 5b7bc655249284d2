//! Configuration knobs and their stable enumerations, mirroring
//! `CacheTypes.h` in the original `CacheController`.

/// Whether a successful cached write is also forwarded to the backing store
/// immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
	#[default]
	WriteBack,
	WriteThrough,
}

/// Whether a write that misses the cache allocates a slot or bypasses
/// straight to the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMissPolicy {
	#[default]
	WriteAllocate,
	WriteAround,
}

/// Which [`crate::locator::PageLocator`] backend is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocatorType {
	#[default]
	Direct,
	Tree,
}

/// Which replacement policy is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplaceAlgorithm {
	#[default]
	Lru,
	Fifo,
	Lfu,
	Mru,
	Clock,
	Nru,
	Random,
}

/// A point-in-time snapshot of the controller's configuration, returned by
/// [`crate::PageCacheController::get_settings`].
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
	pub page_count: usize,
	pub page_size: usize,
	pub start_page_offset: u64,
	pub write_policy: WritePolicy,
	pub write_miss_policy: WriteMissPolicy,
	pub replace_algorithm: ReplaceAlgorithm,
	pub locator_type: LocatorType,
	pub is_enabled: bool,
	pub is_clean_before_load: bool,
	pub hash_memory_limit: Option<usize>,
}
