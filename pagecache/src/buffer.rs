//! The shared cache buffer: `page_count * page_size` contiguous bytes,
//! addressed by slot index. Grounded on `acorn/src/cache/buffer.rs`'s
//! `PageBuffer`, simplified because occupancy here is already tracked by
//! `PageSlot::state` rather than a separate freelist.

use std::{
	cell::UnsafeCell,
	ops::{Deref, DerefMut},
};

use parking_lot::{lock_api::RawRwLock as _, RawRwLock};
use static_assertions::assert_impl_all;

/// A shared read view into one slot's page bytes. Dropping it releases the
/// slot's read lock.
pub struct PageReadGuard<'a> {
	lock: &'a RawRwLock,
	page: &'a [u8],
}

impl<'a> Drop for PageReadGuard<'a> {
	fn drop(&mut self) {
		// Safety: this guard's existence proves we hold the shared lock.
		unsafe { self.lock.unlock_shared() };
	}
}

impl<'a> Deref for PageReadGuard<'a> {
	type Target = [u8];

	#[inline]
	fn deref(&self) -> &Self::Target {
		self.page
	}
}

/// A shared mutable view into one slot's page bytes. Dropping it releases
/// the slot's write lock.
pub struct PageWriteGuard<'a> {
	lock: &'a RawRwLock,
	page: &'a mut [u8],
}

impl<'a> Drop for PageWriteGuard<'a> {
	fn drop(&mut self) {
		// Safety: this guard's existence proves we hold the exclusive lock.
		unsafe { self.lock.unlock_exclusive() };
	}
}

impl<'a> Deref for PageWriteGuard<'a> {
	type Target = [u8];

	#[inline]
	fn deref(&self) -> &Self::Target {
		self.page
	}
}

impl<'a> DerefMut for PageWriteGuard<'a> {
	#[inline]
	fn deref_mut(&mut self) -> &mut Self::Target {
		self.page
	}
}

/// The cache's backing memory, `length` slots of `page_size` bytes each.
///
/// Safety contract: a caller must only request a guard for slot `index`
/// while holding a capture on that slot (see `crate::slot`), which the
/// controller guarantees never overlaps with the slot being freed or
/// reused for a different page.
pub(crate) struct CacheBuffer {
	length: usize,
	page_size: usize,
	locks: Box<[RawRwLock]>,
	data: UnsafeCell<Box<[u8]>>,
}

// Safety: all access to `data` goes through `read_slot`/`write_slot`, which
// acquire the corresponding slot's `RawRwLock` before touching its region.
unsafe impl Sync for CacheBuffer {}

assert_impl_all!(CacheBuffer: Sync, Send);

impl CacheBuffer {
	/// Fails rather than aborting the process on an oversized or
	/// unsatisfiable allocation, so callers can surface
	/// `Error::AllocateBuffer` instead of a hard crash.
	pub fn try_new(page_size: usize, length: usize) -> Option<Self> {
		let total = page_size.checked_mul(length)?;
		let mut data = Vec::new();
		data.try_reserve_exact(total).ok()?;
		data.resize(total, 0);
		let locks = std::iter::repeat_with(|| RawRwLock::INIT)
			.take(length)
			.collect();
		Some(Self {
			length,
			page_size,
			locks,
			data: UnsafeCell::new(data.into_boxed_slice()),
		})
	}

	#[cfg(test)]
	pub fn new(page_size: usize, length: usize) -> Self {
		Self::try_new(page_size, length).expect("test allocation should not fail")
	}

	#[inline]
	pub fn page_size(&self) -> usize {
		self.page_size
	}

	#[inline]
	pub fn length(&self) -> usize {
		self.length
	}

	pub fn read_slot(&self, index: usize) -> PageReadGuard<'_> {
		assert!(index < self.length, "slot index {index} out of bounds");
		let lock = &self.locks[index];
		lock.lock_shared();
		// Safety: guarded by the shared lock just acquired; no writer can be
		// holding the exclusive lock concurrently.
		let page = unsafe { self.slot_slice(index) };
		PageReadGuard { lock, page }
	}

	pub fn write_slot(&self, index: usize) -> PageWriteGuard<'_> {
		assert!(index < self.length, "slot index {index} out of bounds");
		let lock = &self.locks[index];
		lock.lock_exclusive();
		// Safety: guarded by the exclusive lock just acquired.
		let page = unsafe { self.slot_slice_mut(index) };
		PageWriteGuard { lock, page }
	}

	/// Zeroes a slot's region. Caller must already hold the slot's write
	/// lock (e.g. via a live [`PageWriteGuard`]); exposed separately because
	/// `clean_before_load` zeroes before the guard is constructed for the
	/// load itself.
	pub fn zero_slot(&self, index: usize) {
		let mut guard = self.write_slot(index);
		guard.fill(0);
	}

	unsafe fn slot_slice(&self, index: usize) -> &[u8] {
		let base = (*self.data.get()).as_ptr();
		std::slice::from_raw_parts(base.add(index * self.page_size), self.page_size)
	}

	#[allow(clippy::mut_from_ref)]
	unsafe fn slot_slice_mut(&self, index: usize) -> &mut [u8] {
		let base = (*self.data.get()).as_mut_ptr();
		std::slice::from_raw_parts_mut(base.add(index * self.page_size), self.page_size)
	}
}
