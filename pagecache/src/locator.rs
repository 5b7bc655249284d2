//! The page→slot locator, with two interchangeable backends. Grounded on
//! `examples/original_source/Source/PageLocator.{h,cpp}`.

use std::collections::BTreeMap;

use crate::{config::LocatorType, error::Error};

const SLOT_INDEX_SIZE: usize = std::mem::size_of::<usize>();
/// 3 pointers + 1 color byte + key + value, matching the original's
/// documented guess for a red-black tree node's footprint.
const TREE_NODE_OVERHEAD: usize = 3 * std::mem::size_of::<usize>() + 1;

pub(crate) struct PageLocator {
	kind: LocatorType,
	direct: Vec<Option<usize>>,
	tree: BTreeMap<u64, usize>,
	hash_memory_limit: Option<usize>,
}

impl PageLocator {
	pub fn new() -> Self {
		Self {
			kind: LocatorType::Direct,
			direct: Vec::new(),
			tree: BTreeMap::new(),
			hash_memory_limit: None,
		}
	}

	pub fn kind(&self) -> LocatorType {
		self.kind
	}

	pub fn set_hash_memory_limit(&mut self, limit: Option<usize>) {
		self.hash_memory_limit = limit;
	}

	pub fn hash_memory_limit(&self) -> Option<usize> {
		self.hash_memory_limit
	}

	pub fn get(&self, page: u64) -> Option<usize> {
		match self.kind {
			LocatorType::Direct => {
				let idx = usize::try_from(page).ok()?;
				self.direct.get(idx).copied().flatten()
			}
			LocatorType::Tree => self.tree.get(&page).copied(),
		}
	}

	pub fn set<E>(&mut self, page: u64, slot: Option<usize>) -> Result<(), Error<E>> {
		match self.kind {
			LocatorType::Direct => {
				let idx = usize::try_from(page).map_err(|_| Error::PageOverloaded)?;
				if idx >= self.direct.len() {
					if let Some(limit) = self.hash_memory_limit {
						if (idx + 1) * SLOT_INDEX_SIZE > limit {
							return Err(Error::HashLimit);
						}
					}
					self.direct.resize(idx + 1, None);
				}
				self.direct[idx] = slot;
			}
			LocatorType::Tree => match slot {
				Some(s) => {
					self.tree.insert(page, s);
				}
				None => {
					self.tree.remove(&page);
				}
			},
		}
		Ok(())
	}

	/// Switches the active backend, migrating existing entries. A no-op if
	/// already on `kind`.
	pub fn set_type(&mut self, kind: LocatorType) {
		if self.kind == kind {
			return;
		}

		match kind {
			LocatorType::Tree => {
				for (page, slot) in self.direct.iter().enumerate() {
					if let Some(slot) = slot {
						self.tree.insert(page as u64, *slot);
					}
				}
				self.direct.clear();
			}
			LocatorType::Direct => {
				let max_page = self.tree.keys().next_back().copied();
				if let Some(max_page) = max_page {
					self.direct.resize(max_page as usize + 1, None);
					for (page, slot) in self.tree.iter() {
						self.direct[*page as usize] = Some(*slot);
					}
				}
				self.tree.clear();
			}
		}

		self.kind = kind;
	}

	pub fn clear(&mut self) {
		self.direct.clear();
		self.tree.clear();
	}

	pub fn memory_size(&self) -> usize {
		match self.kind {
			LocatorType::Direct => self.direct.capacity() * SLOT_INDEX_SIZE,
			LocatorType::Tree => {
				self.tree.len() * (TREE_NODE_OVERHEAD + std::mem::size_of::<u64>() + SLOT_INDEX_SIZE)
			}
		}
	}

	pub fn iter(&self) -> LocatorIter<'_> {
		match self.kind {
			LocatorType::Direct => LocatorIter::Direct(self.direct.iter().enumerate()),
			LocatorType::Tree => LocatorIter::Tree(self.tree.iter()),
		}
	}
}

/// Ascending-page-order iteration over the locator's live `(page, slot)`
/// pairs, with bidirectional traversal, per spec.md §4.2 / §9.
pub(crate) enum LocatorIter<'a> {
	Direct(std::iter::Enumerate<std::slice::Iter<'a, Option<usize>>>),
	Tree(std::collections::btree_map::Iter<'a, u64, usize>),
}

impl<'a> Iterator for LocatorIter<'a> {
	type Item = (u64, usize);

	fn next(&mut self) -> Option<Self::Item> {
		match self {
			LocatorIter::Direct(it) => {
				for (page, slot) in it.by_ref() {
					if let Some(slot) = slot {
						return Some((page as u64, *slot));
					}
				}
				None
			}
			LocatorIter::Tree(it) => it.next().map(|(p, s)| (*p, *s)),
		}
	}
}

impl<'a> DoubleEndedIterator for LocatorIter<'a> {
	fn next_back(&mut self) -> Option<Self::Item> {
		match self {
			LocatorIter::Direct(it) => {
				while let Some((page, slot)) = it.next_back() {
					if let Some(slot) = slot {
						return Some((page as u64, *slot));
					}
				}
				None
			}
			LocatorIter::Tree(it) => it.next_back().map(|(p, s)| (*p, *s)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn direct_set_get_roundtrip() {
		let mut loc = PageLocator::new();
		loc.set::<()>(3, Some(7)).unwrap();
		assert_eq!(loc.get(3), Some(7));
		assert_eq!(loc.get(0), None);
	}

	#[test]
	fn tree_set_none_removes() {
		let mut loc = PageLocator::new();
		loc.set_type(LocatorType::Tree);
		loc.set::<()>(3, Some(7)).unwrap();
		loc.set::<()>(3, None).unwrap();
		assert_eq!(loc.get(3), None);
	}

	#[test]
	fn switch_type_preserves_pairs() {
		let mut loc = PageLocator::new();
		loc.set::<()>(0, Some(1)).unwrap();
		loc.set::<()>(5, Some(2)).unwrap();

		loc.set_type(LocatorType::Tree);
		loc.set_type(LocatorType::Direct);

		assert_eq!(loc.get(0), Some(1));
		assert_eq!(loc.get(5), Some(2));
	}

	#[test]
	fn hash_limit_rejects_growth() {
		let mut loc = PageLocator::new();
		loc.set_hash_memory_limit(Some(SLOT_INDEX_SIZE)); // room for exactly 1 entry
		loc.set::<()>(0, Some(1)).unwrap();
		assert!(matches!(
			loc.set::<()>(1, Some(2)),
			Err(Error::HashLimit)
		));
	}

	#[test]
	fn iter_ascending_and_bidirectional() {
		let mut loc = PageLocator::new();
		loc.set::<()>(5, Some(1)).unwrap();
		loc.set::<()>(1, Some(2)).unwrap();
		loc.set::<()>(3, Some(3)).unwrap();

		let forward: Vec<_> = loc.iter().collect();
		assert_eq!(forward, vec![(1, 2), (3, 3), (5, 1)]);

		let backward: Vec<_> = loc.iter().rev().collect();
		assert_eq!(backward, vec![(5, 1), (3, 3), (1, 2)]);
	}
}
