//! Not-Recently-Used: per-slot (M, R) bits plus a lazily-started background
//! aging thread that periodically clears R. Grounded on `examples/
//! original_source/Source/AlgorithmImpl.cpp`'s `caNRU` / `threadTimer`.

use std::{
	sync::{
		atomic::{AtomicU8, AtomicUsize, Ordering},
		Arc,
	},
	thread::JoinHandle,
	time::Duration,
};

use parking_lot::{Condvar, Mutex};

use super::{ParamError, ReplacementPolicy};
use crate::slot::PageOp;

const R_BIT: u8 = 0b01;
const M_BIT: u8 = 0b10;

const DEFAULT_TIMEOUT_MS: u64 = 200;

/// Shared with the aging thread via `Arc` so clearing R bits never needs
/// the controller's lock. `bits` is the same `Arc` the policy itself holds,
/// not a copy, so clears are visible to `get_replace_page` immediately.
struct AgingShared {
	bits: Arc<Vec<AtomicU8>>,
	shutdown: Mutex<bool>,
	wake: Condvar,
	timeout_ms: AtomicUsize,
}

struct AgingHandle {
	shared: Arc<AgingShared>,
	thread: JoinHandle<()>,
}

impl AgingHandle {
	/// Cooperative shutdown: set the flag, wake the thread, join it.
	fn stop(self) {
		*self.shared.shutdown.lock() = true;
		self.shared.wake.notify_all();
		let _ = self.thread.join();
	}
}

fn aging_loop(shared: Arc<AgingShared>) {
	let mut guard = shared.shutdown.lock();
	loop {
		let timeout = Duration::from_millis(shared.timeout_ms.load(Ordering::Relaxed) as u64);
		let timed_out = shared.wake.wait_for(&mut guard, timeout).timed_out();
		if *guard {
			return;
		}
		if timed_out {
			for bit in shared.bits.iter() {
				bit.fetch_and(!R_BIT, Ordering::Relaxed);
			}
		}
	}
}

pub(crate) struct NruPolicy {
	bits: Arc<Vec<AtomicU8>>,
	timeout_ms: u64,
	aging: Option<AgingHandle>,
}

impl NruPolicy {
	pub fn new() -> Self {
		Self {
			bits: Arc::new(Vec::new()),
			timeout_ms: DEFAULT_TIMEOUT_MS,
			aging: None,
		}
	}

	fn stop_aging(&mut self) {
		if let Some(handle) = self.aging.take() {
			handle.stop();
		}
	}

	/// Starts the background aging thread on first use, per spec.md §9: "do
	/// not spawn the task at construction".
	fn ensure_aging_started(&mut self) {
		if self.aging.is_some() {
			return;
		}
		let shared = Arc::new(AgingShared {
			bits: Arc::clone(&self.bits),
			shutdown: Mutex::new(false),
			wake: Condvar::new(),
			timeout_ms: AtomicUsize::new(self.timeout_ms as usize),
		});
		let thread_shared = Arc::clone(&shared);
		let thread = std::thread::spawn(move || aging_loop(thread_shared));
		self.aging = Some(AgingHandle {
			shared,
			thread,
		});
	}
}

impl ReplacementPolicy for NruPolicy {
	fn set_page_count(&mut self, count: usize) {
		self.stop_aging();
		self.bits = Arc::new((0..count).map(|_| AtomicU8::new(0)).collect());
	}

	fn on_page_operation(&mut self, slot: usize, op: PageOp) {
		self.ensure_aging_started();
		let cur = self.bits[slot].load(Ordering::Relaxed);
		let next = match op {
			PageOp::Read => cur | R_BIT,
			PageOp::Write => M_BIT | R_BIT,
			PageOp::Replace => R_BIT,
			PageOp::Reset => 0,
			PageOp::Flush => cur & !M_BIT,
		};
		self.bits[slot].store(next, Ordering::Relaxed);
	}

	/// Smallest packed `(M, R)` value wins, scanning in slot order with a
	/// strict `<` update so the lowest index wins ties.
	fn get_replace_page(&mut self) -> usize {
		let mut best_slot = 0;
		let mut best_val = u8::MAX;
		for (slot, bit) in self.bits.iter().enumerate() {
			let val = bit.load(Ordering::Relaxed);
			if val < best_val {
				best_val = val;
				best_slot = slot;
				if val == 0 {
					break;
				}
			}
		}
		best_slot
	}

	fn reset(&mut self) {
		for bit in self.bits.iter() {
			bit.store(0, Ordering::Relaxed);
		}
	}

	fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), ParamError> {
		if name != "timeout" {
			return Err(ParamError::UnknownParameter(name.to_string()));
		}
		if value <= 0.0 || !value.is_finite() {
			return Err(ParamError::InvalidValue {
				name: name.to_string(),
				value,
			});
		}
		self.timeout_ms = value as u64;
		if let Some(handle) = &self.aging {
			handle
				.shared
				.timeout_ms
				.store(self.timeout_ms as usize, Ordering::Relaxed);
			handle.shared.wake.notify_all();
		}
		Ok(())
	}

	fn get_parameter(&self, name: &str) -> Result<f64, ParamError> {
		if name != "timeout" {
			return Err(ParamError::UnknownParameter(name.to_string()));
		}
		Ok(self.timeout_ms as f64)
	}
}

impl Drop for NruPolicy {
	fn drop(&mut self) {
		self.stop_aging();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn victim_is_smallest_packed_value_lowest_index_tiebreak() {
		let mut p = NruPolicy::new();
		p.set_page_count(4);
		p.set_parameter("timeout", 60_000.0).unwrap(); // effectively disabled

		p.on_page_operation(0, PageOp::Write);
		p.on_page_operation(1, PageOp::Read);
		p.on_page_operation(2, PageOp::Write);
		p.on_page_operation(3, PageOp::Write);
		assert_eq!(p.get_replace_page(), 1);

		p.on_page_operation(3, PageOp::Flush);
		assert_eq!(p.get_replace_page(), 1);
	}

	#[test]
	fn zero_timeout_rejected() {
		let mut p = NruPolicy::new();
		p.set_page_count(1);
		assert!(matches!(
			p.set_parameter("timeout", 0.0),
			Err(ParamError::InvalidValue { .. })
		));
	}

	#[test]
	fn reset_clears_bits() {
		let mut p = NruPolicy::new();
		p.set_page_count(2);
		p.on_page_operation(0, PageOp::Write);
		p.reset();
		assert_eq!(p.get_replace_page(), 0);
	}
}
