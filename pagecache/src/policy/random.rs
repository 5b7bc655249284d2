//! Uniform random victim selection. Grounded on `examples/original_source/
//! Source/AlgorithmImpl.cpp`'s `caRandom` (there backed by `std::mt19937`).
//!
//! **Resolved ambiguity**: this crate uses `rand::rngs::StdRng` rather than
//! hand-rolling MT19937 — see SPEC_FULL.md §4.1 / DESIGN.md.

use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{ParamError, ReplacementPolicy};
use crate::slot::PageOp;

pub(crate) struct RandomPolicy {
	page_count: usize,
	rng: StdRng,
	seed: u64,
}

impl RandomPolicy {
	pub fn new() -> Self {
		Self {
			page_count: 0,
			rng: StdRng::from_entropy(),
			seed: 0,
		}
	}
}

impl ReplacementPolicy for RandomPolicy {
	fn set_page_count(&mut self, count: usize) {
		self.page_count = count;
	}

	fn on_page_operation(&mut self, _slot: usize, _op: PageOp) {}

	fn get_replace_page(&mut self) -> usize {
		assert!(self.page_count > 0, "get_replace_page with zero slots");
		self.rng.gen_range(0..self.page_count)
	}

	fn reset(&mut self) {}

	fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), ParamError> {
		if name != "seed" {
			return Err(ParamError::UnknownParameter(name.to_string()));
		}
		if value < 0.0 || value.fract() != 0.0 {
			return Err(ParamError::InvalidValue {
				name: name.to_string(),
				value,
			});
		}

		let seed = value as u64;
		self.seed = seed;
		self.rng = if seed == 0 {
			StdRng::from_entropy()
		} else {
			StdRng::seed_from_u64(seed)
		};
		Ok(())
	}

	fn get_parameter(&self, name: &str) -> Result<f64, ParamError> {
		if name != "seed" {
			return Err(ParamError::UnknownParameter(name.to_string()));
		}
		Ok(self.seed as f64)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn samples_within_range() {
		let mut p = RandomPolicy::new();
		p.set_page_count(5);
		p.set_parameter("seed", 42.0).unwrap();
		for _ in 0..100 {
			assert!(p.get_replace_page() < 5);
		}
	}

	#[test]
	fn same_seed_is_deterministic() {
		let mut a = RandomPolicy::new();
		a.set_page_count(10);
		a.set_parameter("seed", 7.0).unwrap();

		let mut b = RandomPolicy::new();
		b.set_page_count(10);
		b.set_parameter("seed", 7.0).unwrap();

		let seq_a: Vec<_> = (0..20).map(|_| a.get_replace_page()).collect();
		let seq_b: Vec<_> = (0..20).map(|_| b.get_replace_page()).collect();
		assert_eq!(seq_a, seq_b);
	}

	#[test]
	fn negative_seed_rejected() {
		let mut p = RandomPolicy::new();
		p.set_page_count(1);
		assert!(matches!(
			p.set_parameter("seed", -1.0),
			Err(ParamError::InvalidValue { .. })
		));
	}
}
