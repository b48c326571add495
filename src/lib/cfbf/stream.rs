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

use std::cmp::min;
use log::{debug, warn};
use super::chain::{walk_chain, ChainKind};
use super::directory::DirectoryEntry;
use super::error::{CfbError, Result, Stage};
use super::sector::SectorReader;
use super::structures::{MINI_SECTOR_SIZE, MINI_STREAM_CUTOFF_SIZE};

/// The MiniFAT together with the mini stream its entries point into.
#[derive(Debug, Clone, Copy)]
pub struct MiniStorage<'a> {
	pub mini_fat: &'a [u32],
	pub mini_stream: &'a [u8],
}

/// Reconstructs the content of a stream.
///
/// Two cases: if the stream is small and the file has a MiniFAT, look for it in the mini stream;
/// otherwise read it from regular sectors. Either way the result is cut to the declared size,
/// since the last (mini-)sector is padded.
pub fn read_stream(entry: &DirectoryEntry, sectors: &SectorReader, fat: &[u32], mini: Option<MiniStorage>, strict: bool) -> Result<Vec<u8>> {
	match mini {
		Some(mini) if entry.size < MINI_STREAM_CUTOFF_SIZE => {
			debug!("[read_stream] Reading stream #{} ({} bytes) from the mini stream ...", entry.id, entry.size);
			read_mini_chain(mini, entry.starting_sector, entry.size, strict)
		},
		_ => {
			debug!("[read_stream] Reading stream #{} ({} bytes) from sectors ...", entry.id, entry.size);
			read_fat_chain(sectors, fat, entry.starting_sector, entry.size, strict, Stage::Stream)
		},
	}
}

/// Reads `size` bytes by following a FAT chain.
pub fn read_fat_chain(sectors: &SectorReader, fat: &[u32], start: u32, size: u64, strict: bool, stage: Stage) -> Result<Vec<u8>> {
	if size == 0 {
		return Ok(Vec::new());
	}
	let chain = walk_chain(fat, start, ChainKind::Fat)?;
	check_chain_length(chain.len(), sectors.sector_size(), size, strict, stage)?;
	let mut data = sectors.read_sectors(&chain)?;
	data.truncate(min(size, data.len() as u64) as usize);
	Ok(data)
}

/// Reads `size` bytes by following a MiniFAT chain through the mini stream.
pub fn read_mini_chain(mini: MiniStorage, start: u32, size: u64, strict: bool) -> Result<Vec<u8>> {
	if size == 0 {
		return Ok(Vec::new());
	}
	let chain = walk_chain(mini.mini_fat, start, ChainKind::MiniFat)?;
	check_chain_length(chain.len(), MINI_SECTOR_SIZE, size, strict, Stage::Stream)?;

	let mut data = Vec::with_capacity(chain.len() * MINI_SECTOR_SIZE);
	for minisector in chain {
		let offset = minisector as u64 * MINI_SECTOR_SIZE as u64;
		if offset >= mini.mini_stream.len() as u64 {
			return Err(CfbError::format(Stage::MiniStream, "mini-sector-out-of-range", format!(
				"mini-sector #{} starts at {:#X}, but the mini stream is only {:#X} bytes long", minisector, offset, mini.mini_stream.len())));
		}
		let offset = offset as usize;
		let end = min(offset + MINI_SECTOR_SIZE, mini.mini_stream.len());
		data.extend_from_slice(&mini.mini_stream[offset..end]);
	}
	data.truncate(min(size, data.len() as u64) as usize);
	Ok(data)
}

fn check_chain_length(chain_length: usize, unit: usize, size: u64, strict: bool, stage: Stage) -> Result<()> {
	// Sizes come straight from the file and may be anywhere up to u64::MAX
	let unit = unit as u64;
	let required = size / unit + (size % unit != 0) as u64;
	if (chain_length as u64) < required {
		if strict {
			return Err(CfbError::format(stage, "stream-size-mismatch", format!(
				"declared size {} needs {} units of {} bytes, chain has {}", size, required, unit, chain_length)));
		}
		warn!("[read_stream] Declared size {} needs {} units of {} bytes, chain only has {}; returning what is there.",
			size, required, unit, chain_length);
	}
	Ok(())
}
