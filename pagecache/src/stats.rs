/// A snapshot of the controller's running counters, mirroring
/// `CacheTypes.h`'s `CacheStatistic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Statistics {
	/// Total `open_page` calls (hits + misses).
	pub operations: u64,
	/// Calls that found an existing slot for the requested page.
	pub hits: u64,
	/// Calls that found no slot for the requested page.
	pub misses: u64,
	/// Misses that bypassed the cache entirely because no slot was
	/// available for replacement (all slots busy loading/unloading).
	pub direct: u64,
	/// Estimated memory footprint of the page locator, in bytes.
	pub locator_memory: usize,
}
