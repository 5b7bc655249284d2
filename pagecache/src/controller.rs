//! The concurrent orchestrator tying together the buffer, locator,
//! replacement policy and per-slot state machine. Grounded line-for-line on
//! `examples/original_source/Source/PageCacheController.{h,cpp}` for
//! control flow; grounded on `acorn/src/cache/mod.rs` for the Rust shape
//! (a struct wrapping a `Mutex`-guarded state plus a generic storage
//! backend).

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock};
use static_assertions::assert_impl_all;

use crate::{
	backing_store::BackingStore,
	buffer::CacheBuffer,
	config::{LocatorType, ReplaceAlgorithm, Settings, WriteMissPolicy, WritePolicy},
	debug::{DebugInfoKind, TracePoint},
	error::Error,
	iter::{IterError, PageRangeIterator},
	locator::PageLocator,
	policy::{ParamError, Policy, ReplacementPolicy},
	slot::{PageOp, SlotPhase, SlotState, SlotSync},
	stats::Statistics,
};

fn map_iter_err<E>(err: IterError) -> Error<E> {
	match err {
		IterError::AddressOffset {
			address,
			start_page_offset,
		} => Error::AddressOffset {
			address,
			start_page_offset,
		},
		IterError::PageOverloaded => Error::PageOverloaded,
	}
}

fn map_param_err<E>(err: ParamError) -> Error<E> {
	match err {
		ParamError::UnknownParameter(name) => Error::ParameterName(name),
		ParamError::InvalidValue { name, value } => Error::ParameterValue { name, value },
	}
}

fn calc_page_address(page: u64, page_size: u64, start_page_offset: u64) -> u64 {
	page * page_size + start_page_offset
}

struct State<E> {
	page_size: usize,
	start_page_offset: u64,
	is_enabled: bool,
	is_clean_before_load: bool,
	write_policy: WritePolicy,
	write_miss_policy: WriteMissPolicy,
	buffer: Option<Arc<CacheBuffer>>,
	slots: Vec<SlotState<E>>,
	locator: PageLocator,
	policy: Policy,
	stats: Statistics,
}

impl<E> State<E> {
	fn new() -> Self {
		Self {
			page_size: 0,
			start_page_offset: 0,
			is_enabled: true,
			is_clean_before_load: false,
			write_policy: WritePolicy::default(),
			write_miss_policy: WriteMissPolicy::default(),
			buffer: None,
			slots: Vec::new(),
			locator: PageLocator::new(),
			policy: Policy::new(ReplaceAlgorithm::default()),
			stats: Statistics::default(),
		}
	}
}

type TraceCallback = dyn Fn(TracePoint) + Send + Sync;
type LogCallback = dyn Fn(&str) + Send + Sync;

/// The page-oriented write-back cache controller. Generic over the
/// client-supplied [`BackingStore`].
pub struct PageCacheController<S: BackingStore> {
	storage: S,
	state: Mutex<State<S::Error>>,
	/// The three condition variables per slot, held outside the state
	/// mutex so `Condvar::wait` can be called with the state guard without
	/// the condvar being borrowed through the data it protects. See
	/// `crate::slot` module docs.
	waiters: RwLock<Vec<SlotSync>>,
	trace_callback: Mutex<Option<Box<TraceCallback>>>,
	log_callback: Mutex<Option<Box<LogCallback>>>,
}

assert_impl_all!(SlotSync: Send, Sync);

impl<S> PageCacheController<S>
where
	S: BackingStore,
{
	pub fn new(storage: S) -> Self {
		Self {
			storage,
			state: Mutex::new(State::new()),
			waiters: RwLock::new(Vec::new()),
			trace_callback: Mutex::new(None),
			log_callback: Mutex::new(None),
		}
	}

	// ---- configuration -----------------------------------------------

	pub fn setup_pages(&self, page_count: usize, page_size: usize) -> Result<(), Error<S::Error>> {
		if page_count == 0 || page_size == 0 {
			return Err(Error::PageCountSize {
				page_count,
				page_size,
			});
		}

		let requested_bytes = page_count
			.checked_mul(page_size)
			.ok_or(Error::AllocateBuffer {
				requested_bytes: usize::MAX,
			})?;
		let buffer = CacheBuffer::try_new(page_size, page_count)
			.ok_or(Error::AllocateBuffer { requested_bytes })?;

		let mut state = self.state.lock();
		state.page_size = page_size;
		state.slots = (0..page_count).map(|_| SlotState::default()).collect();
		state.locator.clear();
		state.policy.set_page_count(page_count);
		state.buffer = Some(Arc::new(buffer));
		drop(state);

		*self.waiters.write() = (0..page_count).map(|_| SlotSync::default()).collect();

		Ok(())
	}

	pub fn set_start_page_offset(&self, offset: u64) {
		self.state.lock().start_page_offset = offset;
	}

	pub fn enable(&self, is_enabled: bool) {
		self.state.lock().is_enabled = is_enabled;
	}

	pub fn set_clean_before_load(&self, is_clean_before_load: bool) {
		self.state.lock().is_clean_before_load = is_clean_before_load;
	}

	pub fn set_write_policy(&self, policy: WritePolicy) {
		self.state.lock().write_policy = policy;
	}

	pub fn set_write_miss_policy(&self, policy: WriteMissPolicy) {
		self.state.lock().write_miss_policy = policy;
	}

	/// Replaces the active policy, calling `set_page_count` on the fresh
	/// instance with the current slot count, per spec.md §4.4.
	pub fn set_replace_algorithm(&self, algorithm: ReplaceAlgorithm) {
		let mut state = self.state.lock();
		let count = state.slots.len();
		state.policy = Policy::new(algorithm);
		state.policy.set_page_count(count);
	}

	pub fn set_algorithm_parameter(&self, name: &str, value: f64) -> Result<(), Error<S::Error>> {
		self.state
			.lock()
			.policy
			.set_parameter(name, value)
			.map_err(map_param_err)
	}

	pub fn get_algorithm_parameter(&self, name: &str) -> Result<f64, Error<S::Error>> {
		self.state.lock().policy.get_parameter(name).map_err(map_param_err)
	}

	pub fn set_locator_type(&self, kind: LocatorType) {
		self.state.lock().locator.set_type(kind);
	}

	pub fn set_hash_memory_limit(&self, limit: Option<usize>) {
		self.state.lock().locator.set_hash_memory_limit(limit);
	}

	// ---- inspection ----------------------------------------------------

	pub fn get_statistic(&self) -> Statistics {
		let state = self.state.lock();
		let mut stats = state.stats;
		stats.locator_memory = state.locator.memory_size();
		stats
	}

	pub fn reset_statistic(&self) {
		self.state.lock().stats = Statistics::default();
	}

	pub fn get_settings(&self) -> Settings {
		let state = self.state.lock();
		Settings {
			page_count: state.slots.len(),
			page_size: state.page_size,
			start_page_offset: state.start_page_offset,
			write_policy: state.write_policy,
			write_miss_policy: state.write_miss_policy,
			replace_algorithm: state.policy.kind(),
			locator_type: state.locator.kind(),
			is_enabled: state.is_enabled,
			is_clean_before_load: state.is_clean_before_load,
			hash_memory_limit: state.locator.hash_memory_limit(),
		}
	}

	/// Returns `(index, value)` pairs per spec.md §4.5. `page`/`unload_page`
	/// absent states are encoded as `u64::MAX`, the Rust analogue of the
	/// original's `INVALID_PAGE` sentinel in this introspection-only API.
	pub fn get_debug_info(&self, what: DebugInfoKind) -> Vec<(u64, u64)> {
		let state = self.state.lock();
		match what {
			DebugInfoKind::LocationTable => state.locator.iter().collect(),
			DebugInfoKind::DescriptorPage => state
				.slots
				.iter()
				.enumerate()
				.map(|(i, s)| (i as u64, s.page.unwrap_or(u64::MAX)))
				.collect(),
			DebugInfoKind::DescriptorState => state
				.slots
				.iter()
				.enumerate()
				.map(|(i, s)| (i as u64, s.phase.as_u64()))
				.collect(),
			DebugInfoKind::DescriptorChange => state
				.slots
				.iter()
				.enumerate()
				.map(|(i, s)| (i as u64, s.is_dirty as u64))
				.collect(),
			DebugInfoKind::DescriptorUnloadPage => state
				.slots
				.iter()
				.enumerate()
				.map(|(i, s)| (i as u64, s.unload_page.unwrap_or(u64::MAX)))
				.collect(),
			DebugInfoKind::DescriptorWaitingCount => state
				.slots
				.iter()
				.enumerate()
				.map(|(i, s)| (i as u64, s.waiting as u64))
				.collect(),
		}
	}

	pub fn set_trace_callback<F>(&self, callback: F)
	where
		F: Fn(TracePoint) + Send + Sync + 'static,
	{
		*self.trace_callback.lock() = Some(Box::new(callback));
	}

	pub fn set_log_callback<F>(&self, callback: F)
	where
		F: Fn(&str) + Send + Sync + 'static,
	{
		*self.log_callback.lock() = Some(Box::new(callback));
	}

	fn trace(&self, point: TracePoint) {
		log::trace!("cache trace point {point:?}");
		if let Some(callback) = self.trace_callback.lock().as_ref() {
			callback(point);
		}
	}

	fn emit_log(&self, message: &str) {
		log::debug!("{message}");
		if let Some(callback) = self.log_callback.lock().as_ref() {
			callback(message);
		}
	}

	// ---- byte-range I/O --------------------------------------------------

	pub fn read(
		&self,
		address: u64,
		size: usize,
		buf: &mut [u8],
		meta: &S::Meta,
	) -> Result<(), Error<S::Error>> {
		let (is_enabled, page_size, start_page_offset) = {
			let state = self.state.lock();
			(state.is_enabled, state.page_size, state.start_page_offset)
		};

		if !is_enabled {
			return self
				.storage
				.read_storage(address, size, buf, meta)
				.map_err(|e| Error::Storage(Arc::new(e)));
		}

		if self.state.lock().buffer.is_none() {
			return Err(Error::BufferNotAllocated);
		}

		let iter = PageRangeIterator::new(page_size, start_page_offset, address, size)
			.map_err(map_iter_err)?;

		let mut consumed = 0usize;
		for slice in iter {
			let slice = slice.map_err(map_iter_err)?;
			let dst = &mut buf[consumed..consumed + slice.size];
			consumed += slice.size;

			match self.open_page(slice.page, PageOp::Read, meta)? {
				Some(slot_idx) => {
					self.trace(TracePoint::ReadPage);
					let buffer = self
						.state
						.lock()
						.buffer
						.clone()
						.expect("buffer allocated for an open slot");
					let offset = slice.page_offset as usize;
					{
						let src = buffer.read_slot(slot_idx);
						dst.copy_from_slice(&src[offset..offset + slice.size]);
					}
					self.close_page(slot_idx, PageOp::Read);
				}
				None => {
					self.storage
						.read_storage(slice.address, slice.size, dst, meta)
						.map_err(|e| Error::Storage(Arc::new(e)))?;
				}
			}
		}

		Ok(())
	}

	pub fn write(
		&self,
		address: u64,
		size: usize,
		buf: &[u8],
		meta: &S::Meta,
	) -> Result<(), Error<S::Error>> {
		let (is_enabled, page_size, start_page_offset) = {
			let state = self.state.lock();
			(state.is_enabled, state.page_size, state.start_page_offset)
		};

		if !is_enabled {
			return self
				.storage
				.write_storage(address, size, buf, meta)
				.map_err(|e| Error::Storage(Arc::new(e)));
		}

		if self.state.lock().buffer.is_none() {
			return Err(Error::BufferNotAllocated);
		}

		let iter = PageRangeIterator::new(page_size, start_page_offset, address, size)
			.map_err(map_iter_err)?;

		let mut consumed = 0usize;
		for slice in iter {
			let slice = slice.map_err(map_iter_err)?;
			let src = &buf[consumed..consumed + slice.size];
			consumed += slice.size;

			match self.open_page(slice.page, PageOp::Write, meta)? {
				Some(slot_idx) => {
					self.trace(TracePoint::WritePage);
					let buffer = self
						.state
						.lock()
						.buffer
						.clone()
						.expect("buffer allocated for an open slot");
					let offset = slice.page_offset as usize;
					{
						let mut dst = buffer.write_slot(slot_idx);
						dst[offset..offset + slice.size].copy_from_slice(src);
					}
					self.close_page(slot_idx, PageOp::Write);

					let write_through = self.state.lock().write_policy == WritePolicy::WriteThrough;
					if write_through {
						self.storage
							.write_storage(slice.address, slice.size, src, meta)
							.map_err(|e| Error::Storage(Arc::new(e)))?;
					}
				}
				None => {
					self.storage
						.write_storage(slice.address, slice.size, src, meta)
						.map_err(|e| Error::Storage(Arc::new(e)))?;
				}
			}
		}

		Ok(())
	}

	pub fn flush(&self, meta: &S::Meta) -> Result<(), Error<S::Error>> {
		let slot_count = self.state.lock().slots.len();
		for idx in 0..slot_count {
			let mut guard = self.state.lock();
			if guard.slots[idx].can_flush() {
				self.flush_page(&mut guard, idx, meta)?;
			}
		}
		Ok(())
	}

	pub fn flush_range(
		&self,
		address: u64,
		size: usize,
		meta: &S::Meta,
	) -> Result<(), Error<S::Error>> {
		let (page_size, start_page_offset) = {
			let state = self.state.lock();
			(state.page_size, state.start_page_offset)
		};
		if page_size == 0 {
			return Err(Error::BufferNotAllocated);
		}

		let iter = PageRangeIterator::new(page_size, start_page_offset, address, size)
			.map_err(map_iter_err)?;

		for slice in iter {
			let slice = slice.map_err(map_iter_err)?;
			let mut guard = self.state.lock();
			if let Some(idx) = guard.locator.get(slice.page) {
				if guard.slots[idx].can_flush() {
					self.flush_page(&mut guard, idx, meta)?;
				}
			}
		}
		Ok(())
	}

	pub fn clear(&self) -> Result<(), Error<S::Error>> {
		let mut guard = self.state.lock();
		let buffer = guard.buffer.clone().ok_or(Error::BufferNotAllocated)?;

		for slot in guard.slots.iter_mut() {
			slot.reset();
		}
		for i in 0..buffer.length() {
			buffer.zero_slot(i);
		}
		guard.policy.reset();
		guard.locator.clear();

		Ok(())
	}

	// ---- hit / miss / replace, under the state mutex --------------------

	/// The hit-path re-entry is a loop rather than the original's recursive
	/// self-call on wake from `wait_unload`, per spec.md §9's explicit
	/// instruction.
	fn open_page(
		&self,
		page: u64,
		op: PageOp,
		meta: &S::Meta,
	) -> Result<Option<usize>, Error<S::Error>> {
		let mut guard = self.state.lock();
		guard.stats.operations += 1;

		loop {
			match guard.locator.get(page) {
				None => return self.miss(&mut guard, page, op, meta),
				Some(idx) => {
					self.trace(TracePoint::Hit);
					guard.stats.hits += 1;

					if guard.slots[idx].is_page_unload(page) {
						self.trace(TracePoint::WaitUnload);
						self.wait_unload(&mut guard, idx)?;
						// Re-enter the hit path: another thread may already
						// have relocated the page, or it may still be
						// loading into its own slot.
						continue;
					}

					self.trace(TracePoint::WaitLoad);
					if guard.slots[idx].is_loading() {
						self.wait_load(&mut guard, idx)?;
					}
					self.mark_capture(&mut guard, idx, op);
					return Ok(Some(idx));
				}
			}
		}
	}

	fn close_page(&self, slot_idx: usize, op: PageOp) {
		let mut guard = self.state.lock();
		if guard.write_policy != WritePolicy::WriteThrough && op == PageOp::Write {
			guard.slots[slot_idx].is_dirty = true;
		}
		let released = guard.slots[slot_idx].release_capture();
		self.trace(TracePoint::ReleaseCapture);
		if released {
			self.notify_capture(slot_idx);
		}
	}

	fn mark_capture(&self, guard: &mut MutexGuard<'_, State<S::Error>>, idx: usize, op: PageOp) {
		guard.slots[idx].add_capture();
		self.trace(TracePoint::AddCapture);
		guard.policy.on_page_operation(idx, op);
	}

	fn miss(
		&self,
		guard: &mut MutexGuard<'_, State<S::Error>>,
		page: u64,
		op: PageOp,
		meta: &S::Meta,
	) -> Result<Option<usize>, Error<S::Error>> {
		self.trace(TracePoint::Miss);
		guard.stats.misses += 1;

		if guard.write_miss_policy == WriteMissPolicy::WriteAround && op == PageOp::Write {
			return Ok(None);
		}

		let victim = guard.policy.get_replace_page();

		if guard.slots[victim].is_available() {
			self.replace_page(guard, victim, page, op, meta)?;
			self.mark_capture(guard, victim, op);
			Ok(Some(victim))
		} else {
			guard.stats.direct += 1;
			Ok(None)
		}
	}

	fn replace_page(
		&self,
		guard: &mut MutexGuard<'_, State<S::Error>>,
		slot_idx: usize,
		new_page: u64,
		_op: PageOp,
		meta: &S::Meta,
	) -> Result<(), Error<S::Error>> {
		self.trace(TracePoint::Replace);

		guard.locator.set(new_page, Some(slot_idx))?;
		guard.policy.on_page_operation(slot_idx, PageOp::Replace);

		let outcome = self.try_replace(guard, slot_idx, new_page, meta);

		if let Err(e) = &outcome {
			let _ = guard.locator.set::<S::Error>(new_page, None);
			self.notify_exception(guard, slot_idx, Arc::clone(e));
		}

		outcome.map_err(Error::Storage)
	}

	fn try_replace(
		&self,
		guard: &mut MutexGuard<'_, State<S::Error>>,
		slot_idx: usize,
		new_page: u64,
		meta: &S::Meta,
	) -> Result<(), Arc<S::Error>> {
		if guard.slots[slot_idx].phase != SlotPhase::Free {
			guard.slots[slot_idx].unload_page = guard.slots[slot_idx].page;
			guard.slots[slot_idx].phase = SlotPhase::Unload;

			self.wait_capture_free(guard, slot_idx);
			self.unload_page(guard, slot_idx, meta)?;
		}

		guard.slots[slot_idx].unload_page = None;
		guard.slots[slot_idx].phase = SlotPhase::Load;
		guard.slots[slot_idx].page = Some(new_page);

		self.load_page(guard, slot_idx, meta)
	}

	fn unload_page(
		&self,
		guard: &mut MutexGuard<'_, State<S::Error>>,
		slot_idx: usize,
		meta: &S::Meta,
	) -> Result<(), Arc<S::Error>> {
		self.trace(TracePoint::Unload);

		let unload_page = guard.slots[slot_idx]
			.unload_page
			.expect("unload_page set before entering unload");

		if guard.slots[slot_idx].is_dirty {
			let buffer = guard.buffer.clone().expect("buffer allocated");
			let page_size = guard.page_size;
			let start_page_offset = guard.start_page_offset;
			let address = calc_page_address(unload_page, page_size as u64, start_page_offset);

			let result = {
				let data = buffer.read_slot(slot_idx);
				self.execute_write(guard, address, page_size, &data, meta)
			};

			if let Err(e) = result {
				guard.slots[slot_idx].phase = SlotPhase::Ready;
				guard.slots[slot_idx].unload_page = None;
				return Err(e);
			}

			guard.slots[slot_idx].is_dirty = false;
		}

		let _ = guard.locator.set::<S::Error>(unload_page, None);
		self.notify_unload(slot_idx);

		Ok(())
	}

	fn load_page(
		&self,
		guard: &mut MutexGuard<'_, State<S::Error>>,
		slot_idx: usize,
		meta: &S::Meta,
	) -> Result<(), Arc<S::Error>> {
		self.trace(TracePoint::Load);

		let buffer = guard.buffer.clone().expect("buffer allocated");
		let page_size = guard.page_size;
		let start_page_offset = guard.start_page_offset;
		let page = guard.slots[slot_idx].page.expect("page set before load");
		let address = calc_page_address(page, page_size as u64, start_page_offset);

		if guard.is_clean_before_load {
			buffer.zero_slot(slot_idx);
		}

		let result = {
			let mut data = buffer.write_slot(slot_idx);
			self.execute_read(guard, address, page_size, &mut data, meta)
		};

		if let Err(e) = result {
			guard.slots[slot_idx].reset();
			guard.policy.on_page_operation(slot_idx, PageOp::Reset);
			return Err(e);
		}

		guard.slots[slot_idx].phase = SlotPhase::Ready;
		self.notify_load(slot_idx);

		Ok(())
	}

	fn flush_page(
		&self,
		guard: &mut MutexGuard<'_, State<S::Error>>,
		slot_idx: usize,
		meta: &S::Meta,
	) -> Result<(), Error<S::Error>> {
		guard.slots[slot_idx].is_dirty = false;
		guard.slots[slot_idx].add_capture();
		self.trace(TracePoint::AddCapture);

		let buffer = guard.buffer.clone().expect("buffer allocated");
		let page_size = guard.page_size;
		let start_page_offset = guard.start_page_offset;
		let page = guard.slots[slot_idx]
			.page
			.expect("flush only called on a populated slot");
		let address = calc_page_address(page, page_size as u64, start_page_offset);

		let result = {
			let data = buffer.read_slot(slot_idx);
			self.execute_write(guard, address, page_size, &data, meta)
		};

		let released = guard.slots[slot_idx].release_capture();
		self.trace(TracePoint::ReleaseCapture);
		if released {
			self.notify_capture(slot_idx);
		}

		match result {
			Ok(()) => {
				guard.policy.on_page_operation(slot_idx, PageOp::Flush);
				Ok(())
			}
			Err(e) => {
				guard.slots[slot_idx].is_dirty = true;
				Err(Error::Storage(e))
			}
		}
	}

	/// Releases the state mutex around the backing-store call and
	/// reacquires it before returning, even on error — the critical
	/// concurrency choice described in spec.md §4.4/§5. `acorn`'s
	/// `PageCache` holds its lock for the full access path (its storage
	/// calls are expected to be fast page I/O against a local file); this
	/// crate's backing store is an arbitrary client implementation that may
	/// block indefinitely, so the lock is explicitly dropped here via
	/// `parking_lot::MutexGuard::unlocked`.
	fn execute_write(
		&self,
		guard: &mut MutexGuard<'_, State<S::Error>>,
		address: u64,
		size: usize,
		data: &[u8],
		meta: &S::Meta,
	) -> Result<(), Arc<S::Error>> {
		self.trace(TracePoint::Write);
		let storage = &self.storage;
		MutexGuard::unlocked(guard, || storage.write_storage(address, size, data, meta))
			.map_err(Arc::new)
	}

	fn execute_read(
		&self,
		guard: &mut MutexGuard<'_, State<S::Error>>,
		address: u64,
		size: usize,
		out: &mut [u8],
		meta: &S::Meta,
	) -> Result<(), Arc<S::Error>> {
		self.trace(TracePoint::Read);
		let storage = &self.storage;
		MutexGuard::unlocked(guard, || storage.read_storage(address, size, out, meta))
			.map_err(Arc::new)
	}

	// ---- wait / notify, grounded on PageSlot.{h,cpp} --------------------

	fn wait_capture_free(&self, guard: &mut MutexGuard<'_, State<S::Error>>, idx: usize) {
		let waiters = self.waiters.read();
		waiters[idx]
			.cv_capture
			.wait_while(guard, |state| state.slots[idx].captured != 0);
	}

	fn wait_unload(
		&self,
		guard: &mut MutexGuard<'_, State<S::Error>>,
		idx: usize,
	) -> Result<(), Error<S::Error>> {
		guard.slots[idx].waiting += 1;
		{
			let waiters = self.waiters.read();
			waiters[idx]
				.cv_unload
				.wait_while(guard, |state| state.slots[idx].phase == SlotPhase::Unload);
		}
		guard.slots[idx].waiting -= 1;

		let pending = if guard.slots[idx].waiting == 0 {
			guard.slots[idx].pending_exception.take()
		} else {
			guard.slots[idx].pending_exception.clone()
		};

		match pending {
			Some(e) => Err(Error::Storage(e)),
			None => Ok(()),
		}
	}

	fn wait_load(
		&self,
		guard: &mut MutexGuard<'_, State<S::Error>>,
		idx: usize,
	) -> Result<(), Error<S::Error>> {
		guard.slots[idx].waiting += 1;
		{
			let waiters = self.waiters.read();
			waiters[idx]
				.cv_load
				.wait_while(guard, |state| state.slots[idx].is_loading());
		}
		guard.slots[idx].waiting -= 1;

		let pending = if guard.slots[idx].waiting == 0 {
			guard.slots[idx].pending_exception.take()
		} else {
			guard.slots[idx].pending_exception.clone()
		};

		match pending {
			Some(e) => Err(Error::Storage(e)),
			None => Ok(()),
		}
	}

	fn notify_unload(&self, idx: usize) {
		self.waiters.read()[idx].cv_unload.notify_all();
	}

	fn notify_load(&self, idx: usize) {
		self.waiters.read()[idx].cv_load.notify_all();
	}

	fn notify_capture(&self, idx: usize) {
		self.waiters.read()[idx].cv_capture.notify_all();
	}

	fn notify_exception(
		&self,
		guard: &mut MutexGuard<'_, State<S::Error>>,
		idx: usize,
		exception: Arc<S::Error>,
	) {
		if guard.slots[idx].waiting > 0 {
			guard.slots[idx].pending_exception = Some(exception);
		}
		let waiters = self.waiters.read();
		waiters[idx].cv_unload.notify_all();
		waiters[idx].cv_load.notify_all();
	}
}

#[cfg(test)]
mod tests {
	use mockall::predicate::*;

	use super::*;
	use crate::backing_store::MockBackingStore;

	#[test]
	fn simple_write_read_round_trip() {
		let mut storage = MockBackingStore::new();
		storage
			.expect_read_storage()
			.with(eq(0u64), eq(8usize), always(), always())
			.times(1)
			.returning(|_, size, out, _| {
				out[..size].fill(0xAA);
				Ok(())
			});
		storage.expect_write_storage().never();

		let cache = PageCacheController::new(storage);
		cache.setup_pages(2, 8).unwrap();

		cache.write(0, 8, &[69u8; 8], &()).unwrap();

		let mut buf = [0u8; 8];
		cache.read(0, 8, &mut buf, &()).unwrap();
		assert_eq!(buf, [69u8; 8]);

		let stats = cache.get_statistic();
		assert_eq!(stats.misses, 1);
		assert_eq!(stats.hits, 1);
	}

	#[test]
	fn replace_under_full_cache_unloads_dirty_victim() {
		let mut storage = MockBackingStore::new();
		storage
			.expect_read_storage()
			.with(eq(0u64), eq(8usize), always(), always())
			.times(1)
			.returning(|_, size, out, _| {
				out[..size].fill(0);
				Ok(())
			});
		storage
			.expect_read_storage()
			.with(eq(8u64), eq(8usize), always(), always())
			.times(1)
			.returning(|_, size, out, _| {
				out[..size].fill(0);
				Ok(())
			});
		storage
			.expect_write_storage()
			.with(eq(0u64), eq(8usize), always(), always())
			.times(1)
			.returning(|_, _, data, _| {
				assert_eq!(data, &[1u8; 8][..]);
				Ok(())
			});

		let cache = PageCacheController::new(storage);
		cache.setup_pages(1, 8).unwrap();

		cache.write(0, 8, &[1u8; 8], &()).unwrap();
		// Only one slot: writing page 1 forces the dirty page 0 to unload.
		cache.write(8, 8, &[2u8; 8], &()).unwrap();

		let stats = cache.get_statistic();
		assert_eq!(stats.misses, 2);
	}

	#[test]
	fn write_through_forwards_immediately() {
		let mut storage = MockBackingStore::new();
		storage
			.expect_read_storage()
			.times(1)
			.returning(|_, size, out, _| {
				out[..size].fill(0);
				Ok(())
			});
		storage
			.expect_write_storage()
			.with(eq(0u64), eq(8usize), always(), always())
			.times(1)
			.returning(|_, _, data, _| {
				assert_eq!(data, &[7u8; 8][..]);
				Ok(())
			});

		let cache = PageCacheController::new(storage);
		cache.setup_pages(1, 8).unwrap();
		cache.set_write_policy(WritePolicy::WriteThrough);

		cache.write(0, 8, &[7u8; 8], &()).unwrap();

		// Write-through pages are never dirty, so flush has nothing to do
		// (no further storage expectations are set above).
		cache.flush(&()).unwrap();
	}

	#[test]
	fn write_around_bypasses_cache_on_miss() {
		let mut storage = MockBackingStore::new();
		storage.expect_read_storage().never();
		storage
			.expect_write_storage()
			.with(eq(0u64), eq(8usize), always(), always())
			.times(1)
			.returning(|_, _, _, _| Ok(()));

		let cache = PageCacheController::new(storage);
		cache.setup_pages(1, 8).unwrap();
		cache.set_write_miss_policy(WriteMissPolicy::WriteAround);

		cache.write(0, 8, &[9u8; 8], &()).unwrap();

		let stats = cache.get_statistic();
		assert_eq!(stats.misses, 1);
		assert_eq!(stats.hits, 0);
	}

	#[test]
	fn storage_failure_surfaces_as_storage_error() {
		let mut storage = MockBackingStore::new();
		storage
			.expect_read_storage()
			.returning(|_, _, _, _| Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone")));

		let cache = PageCacheController::new(storage);
		cache.setup_pages(1, 8).unwrap();

		let mut buf = [0u8; 8];
		let result = cache.read(0, 8, &mut buf, &());
		assert!(matches!(result, Err(Error::Storage(_))));

		// The slot resets on load failure, so a following access retries
		// cleanly rather than wedging in `Load` forever.
		let debug = cache.get_debug_info(DebugInfoKind::DescriptorState);
		assert_eq!(debug[0], (0, SlotPhase::Free.as_u64()));
	}

	#[test]
	fn flush_writes_back_dirty_slot() {
		let mut storage = MockBackingStore::new();
		storage
			.expect_read_storage()
			.returning(|_, size, out, _| {
				out[..size].fill(0);
				Ok(())
			});
		storage
			.expect_write_storage()
			.with(eq(0u64), eq(8usize), always(), always())
			.times(1)
			.returning(|_, _, data, _| {
				assert_eq!(data, &[3u8; 8][..]);
				Ok(())
			});

		let cache = PageCacheController::new(storage);
		cache.setup_pages(1, 8).unwrap();

		cache.write(0, 8, &[3u8; 8], &()).unwrap();
		cache.flush(&()).unwrap();

		let debug = cache.get_debug_info(DebugInfoKind::DescriptorChange);
		assert_eq!(debug[0], (0, 0));
	}

	#[test]
	fn clear_resets_slots_and_locator() {
		let mut storage = MockBackingStore::new();
		storage
			.expect_read_storage()
			.returning(|_, size, out, _| {
				out[..size].fill(0);
				Ok(())
			});
		storage.expect_write_storage().never();

		let cache = PageCacheController::new(storage);
		cache.setup_pages(1, 8).unwrap();
		cache.write(0, 8, &[5u8; 8], &()).unwrap();

		cache.clear().unwrap();

		let debug = cache.get_debug_info(DebugInfoKind::DescriptorPage);
		assert_eq!(debug[0], (0, u64::MAX));
		assert_eq!(cache.get_debug_info(DebugInfoKind::LocationTable), Vec::new());
	}

	#[test]
	fn setup_pages_rejects_zero_size() {
		let storage = MockBackingStore::new();
		let cache = PageCacheController::new(storage);
		assert!(matches!(
			cache.setup_pages(0, 8),
			Err(Error::PageCountSize { .. })
		));
		assert!(matches!(
			cache.setup_pages(8, 0),
			Err(Error::PageCountSize { .. })
		));
	}

	#[test]
	fn unconfigured_controller_reports_buffer_not_allocated() {
		let storage = MockBackingStore::new();
		let cache = PageCacheController::new(storage);
		let mut buf = [0u8; 8];
		assert!(matches!(
			cache.read(0, 8, &mut buf, &()),
			Err(Error::BufferNotAllocated)
		));
	}
}
