/*
cfbread library & toolset
Copyright (C) 2018 Steve Muller <steve.muller@outlook.com>

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/

use log::trace;
use super::error::{CfbError, Result, Stage};
use super::structures::{describe_sector, is_regular_sector, ENDOFCHAIN};

/// Which allocation table a chain is followed through. Only used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
	Fat,
	MiniFat,
}

impl ChainKind {
	fn unit(self) -> &'static str {
		match self {
			ChainKind::Fat => "sector",
			ChainKind::MiniFat => "mini-sector",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
	/// The given index is next in line to be emitted.
	Following(u32),
	Ended,
	/// The given index was reached a second time.
	CycleDetected(u32),
	/// The given value is FREESECT, another sentinel, or lies outside the table.
	InvalidPointer(u32),
}

/// Follows a chain of sectors (or mini-sectors) through an allocation table.
///
/// Yields every index of the chain in order. The walk ends on ENDOFCHAIN; a repeated index
/// or a pointer that does not name an entry of the table yields one error and then stops.
/// Each table entry can be emitted at most once, so the walk always terminates.
pub struct ChainWalker<'a> {
	pointers: &'a [u32],
	kind: ChainKind,
	state: ChainState,
	visited: Vec<bool>,
	reported: bool,
}

impl<'a> ChainWalker<'a> {
	pub fn new(pointers: &'a [u32], start: u32, kind: ChainKind) -> ChainWalker<'a> {
		let mut walker = ChainWalker {
			pointers,
			kind,
			state: ChainState::Ended,
			visited: vec![false; pointers.len()],
			reported: false,
		};
		walker.state = walker.classify(start);
		walker
	}

	pub fn state(&self) -> ChainState {
		self.state
	}

	fn classify(&self, pointer: u32) -> ChainState {
		if pointer == ENDOFCHAIN {
			ChainState::Ended
		}
		else if !is_regular_sector(pointer) || pointer as usize >= self.pointers.len() {
			ChainState::InvalidPointer(pointer)
		}
		else if self.visited[pointer as usize] {
			ChainState::CycleDetected(pointer)
		}
		else {
			ChainState::Following(pointer)
		}
	}

	fn error(&self) -> Option<CfbError> {
		match self.state {
			ChainState::CycleDetected(index) => Some(CfbError::format(Stage::Chain, "chain-cycle", format!(
				"{} #{} appears twice in a {:?} chain", self.kind.unit(), index, self.kind))),
			ChainState::InvalidPointer(pointer) => Some(CfbError::format(Stage::Chain, "chain-invalid-pointer", format!(
				"{:?} chain points to {} (table has {} entries)", self.kind, describe_sector(pointer), self.pointers.len()))),
			_ => None,
		}
	}
}

impl Iterator for ChainWalker<'_> {
	type Item = Result<u32>;

	fn next(&mut self) -> Option<Result<u32>> {
		match self.state {
			ChainState::Following(current) => {
				self.visited[current as usize] = true;
				let next = self.pointers[current as usize];
				trace!("[walk_chain] {} #{} -> {}", self.kind.unit(), current, describe_sector(next));
				self.state = self.classify(next);
				Some(Ok(current))
			},
			ChainState::Ended => None,
			_ if self.reported => None,
			_ => {
				self.reported = true;
				self.error().map(Err)
			},
		}
	}
}

/// Collects a whole chain, failing on the first cycle or invalid pointer.
pub fn walk_chain(pointers: &[u32], start: u32, kind: ChainKind) -> Result<Vec<u32>> {
	ChainWalker::new(pointers, start, kind).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use crate::cfbf::structures::{FATSECT, FREESECT};

	#[test]
	fn follows_chain_to_end() {
		let pointers = [3, ENDOFCHAIN, FREESECT, 1];
		assert_eq!(walk_chain(&pointers, 0, ChainKind::Fat).unwrap(), vec![0, 3, 1]);
	}

	#[test]
	fn endofchain_start_is_empty_chain() {
		let pointers = [ENDOFCHAIN];
		assert!(walk_chain(&pointers, ENDOFCHAIN, ChainKind::Fat).unwrap().is_empty());
	}

	#[test]
	fn cycle_is_detected() {
		let mut pointers = vec![FREESECT; 8];
		pointers[2] = 5;
		pointers[5] = 2;
		let err = walk_chain(&pointers, 2, ChainKind::Fat).unwrap_err();
		assert_eq!(err.check(), Some("chain-cycle"));

		let mut walker = ChainWalker::new(&pointers, 2, ChainKind::Fat);
		assert_eq!(walker.next(), Some(Ok(2)));
		assert_eq!(walker.next(), Some(Ok(5)));
		assert_eq!(walker.state(), ChainState::CycleDetected(2));
		assert!(matches!(walker.next(), Some(Err(_))));
		assert_eq!(walker.next(), None);
	}

	#[test]
	fn self_loop_is_a_cycle() {
		let pointers = [0];
		assert_eq!(walk_chain(&pointers, 0, ChainKind::MiniFat).unwrap_err().check(), Some("chain-cycle"));
	}

	#[test]
	fn free_sector_in_chain_is_invalid() {
		let pointers = [1, FREESECT];
		let err = walk_chain(&pointers, 0, ChainKind::Fat).unwrap_err();
		assert_eq!(err.check(), Some("chain-invalid-pointer"));
		assert_eq!(err.stage(), Some(Stage::Chain));
	}

	#[test]
	fn out_of_table_pointer_is_invalid() {
		let pointers = [7, ENDOFCHAIN];
		assert_eq!(walk_chain(&pointers, 0, ChainKind::Fat).unwrap_err().check(), Some("chain-invalid-pointer"));
		assert_eq!(walk_chain(&pointers, 9, ChainKind::Fat).unwrap_err().check(), Some("chain-invalid-pointer"));
		assert_eq!(walk_chain(&pointers, FATSECT, ChainKind::Fat).unwrap_err().check(), Some("chain-invalid-pointer"));
	}

	proptest! {
		#[test]
		fn walk_always_terminates(
			pointers in proptest::collection::vec(
				prop_oneof![0u32..40, Just(ENDOFCHAIN), Just(FREESECT), Just(FATSECT)], 0..40),
			start in prop_oneof![0u32..40, Just(ENDOFCHAIN)],
		) {
			let mut emitted = Vec::new();
			let mut errors = 0;
			for step in ChainWalker::new(&pointers, start, ChainKind::Fat) {
				match step {
					Ok(index) => emitted.push(index),
					Err(_) => errors += 1,
				}
				prop_assert!(emitted.len() <= pointers.len());
			}
			prop_assert!(errors <= 1);
			let mut unique = emitted.clone();
			unique.sort_unstable();
			unique.dedup();
			prop_assert_eq!(unique.len(), emitted.len());
		}
	}
}
