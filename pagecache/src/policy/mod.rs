//! The pluggable replacement-policy family. Grounded on
//! `examples/original_source/Source/AlgorithmImpl.{h,cpp}` for exact event
//! rules, expressed as a closed sum type rather than the original's virtual
//! `CacheAlgorithm` hierarchy (per spec.md §9's own recommendation for a
//! systems language).

mod clock;
mod nru;
mod queue;
mod random;

pub(crate) use clock::ClockPolicy;
pub(crate) use nru::NruPolicy;
pub(crate) use queue::{QueueKind, QueuePolicy};
pub(crate) use random::RandomPolicy;

use crate::{config::ReplaceAlgorithm, slot::PageOp};

/// Failure of a policy-specific parameter get/set, later folded into
/// [`crate::error::Error::ParameterName`] / `ParameterValue` by the
/// controller, which knows the backing store's error type `E` that
/// `Error<E>` is generic over and this module is not.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ParamError {
	UnknownParameter(String),
	InvalidValue { name: String, value: f64 },
}

/// Common surface for all seven algorithms. `get_replace_page` takes `&mut
/// self` because CLOCK's hand advances as a side effect of nomination; the
/// queue-based policies simply don't use the mutability.
pub(crate) trait ReplacementPolicy {
	fn set_page_count(&mut self, count: usize);
	fn on_page_operation(&mut self, slot: usize, op: PageOp);
	fn get_replace_page(&mut self) -> usize;
	fn reset(&mut self);
	fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), ParamError>;
	fn get_parameter(&self, name: &str) -> Result<f64, ParamError>;
}

/// The active replacement policy. One variant per algorithm in
/// `ReplaceAlgorithm`; dispatch is a hand-written `match` rather than a
/// vtable, so adding or removing an algorithm is a compile-time-checked,
/// exhaustive change.
pub(crate) enum Policy {
	Fifo(QueuePolicy),
	Lru(QueuePolicy),
	Lfu(QueuePolicy),
	Mru(QueuePolicy),
	Clock(ClockPolicy),
	Nru(NruPolicy),
	Random(RandomPolicy),
}

impl Policy {
	pub fn new(algorithm: ReplaceAlgorithm) -> Self {
		match algorithm {
			ReplaceAlgorithm::Fifo => Policy::Fifo(QueuePolicy::new(QueueKind::Fifo)),
			ReplaceAlgorithm::Lru => Policy::Lru(QueuePolicy::new(QueueKind::Lru)),
			ReplaceAlgorithm::Lfu => Policy::Lfu(QueuePolicy::new(QueueKind::Lfu)),
			ReplaceAlgorithm::Mru => Policy::Mru(QueuePolicy::new(QueueKind::Mru)),
			ReplaceAlgorithm::Clock => Policy::Clock(ClockPolicy::new()),
			ReplaceAlgorithm::Nru => Policy::Nru(NruPolicy::new()),
			ReplaceAlgorithm::Random => Policy::Random(RandomPolicy::new()),
		}
	}

	pub fn kind(&self) -> ReplaceAlgorithm {
		match self {
			Policy::Fifo(_) => ReplaceAlgorithm::Fifo,
			Policy::Lru(_) => ReplaceAlgorithm::Lru,
			Policy::Lfu(_) => ReplaceAlgorithm::Lfu,
			Policy::Mru(_) => ReplaceAlgorithm::Mru,
			Policy::Clock(_) => ReplaceAlgorithm::Clock,
			Policy::Nru(_) => ReplaceAlgorithm::Nru,
			Policy::Random(_) => ReplaceAlgorithm::Random,
		}
	}
}

impl ReplacementPolicy for Policy {
	fn set_page_count(&mut self, count: usize) {
		match self {
			Policy::Fifo(p) | Policy::Lru(p) | Policy::Lfu(p) | Policy::Mru(p) => {
				p.set_page_count(count)
			}
			Policy::Clock(p) => p.set_page_count(count),
			Policy::Nru(p) => p.set_page_count(count),
			Policy::Random(p) => p.set_page_count(count),
		}
	}

	fn on_page_operation(&mut self, slot: usize, op: PageOp) {
		match self {
			Policy::Fifo(p) | Policy::Lru(p) | Policy::Lfu(p) | Policy::Mru(p) => {
				p.on_page_operation(slot, op)
			}
			Policy::Clock(p) => p.on_page_operation(slot, op),
			Policy::Nru(p) => p.on_page_operation(slot, op),
			Policy::Random(p) => p.on_page_operation(slot, op),
		}
	}

	fn get_replace_page(&mut self) -> usize {
		match self {
			Policy::Fifo(p) | Policy::Lru(p) | Policy::Lfu(p) | Policy::Mru(p) => {
				p.get_replace_page()
			}
			Policy::Clock(p) => p.get_replace_page(),
			Policy::Nru(p) => p.get_replace_page(),
			Policy::Random(p) => p.get_replace_page(),
		}
	}

	fn reset(&mut self) {
		match self {
			Policy::Fifo(p) | Policy::Lru(p) | Policy::Lfu(p) | Policy::Mru(p) => p.reset(),
			Policy::Clock(p) => p.reset(),
			Policy::Nru(p) => p.reset(),
			Policy::Random(p) => p.reset(),
		}
	}

	fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), ParamError> {
		match self {
			Policy::Fifo(p) | Policy::Lru(p) | Policy::Lfu(p) | Policy::Mru(p) => {
				p.set_parameter(name, value)
			}
			Policy::Clock(p) => p.set_parameter(name, value),
			Policy::Nru(p) => p.set_parameter(name, value),
			Policy::Random(p) => p.set_parameter(name, value),
		}
	}

	fn get_parameter(&self, name: &str) -> Result<f64, ParamError> {
		match self {
			Policy::Fifo(p) | Policy::Lru(p) | Policy::Lfu(p) | Policy::Mru(p) => {
				p.get_parameter(name)
			}
			Policy::Clock(p) => p.get_parameter(name),
			Policy::Nru(p) => p.get_parameter(name),
			Policy::Random(p) => p.get_parameter(name),
		}
	}
}
