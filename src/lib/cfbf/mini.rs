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

use log::debug;
use super::chain::{walk_chain, ChainKind};
use super::directory::DirectoryEntry;
use super::error::{CfbError, Result, Stage};
use super::fat::decode_pointers;
use super::sector::SectorReader;
use super::stream::read_fat_chain;
use super::structures::{describe_sector, CfbHeader, MINI_SECTOR_SIZE};

/// Reads the MiniFAT, which is itself stored as a chain of regular sectors.
/// Returns `None` if the file has no MiniFAT.
pub fn build_mini_fat(header: &CfbHeader, fat: &[u32], sectors: &SectorReader, strict: bool) -> Result<Option<Vec<u32>>> {
	if !header.has_mini_fat() {
		debug!("[build_mini_fat] No MiniFAT; all streams live in regular sectors.");
		return Ok(None);
	}

	let chain = walk_chain(fat, header.first_mini_fat_sector_location, ChainKind::Fat)?;
	if strict && chain.len() as u64 != header.number_of_mini_fat_sectors as u64 {
		return Err(CfbError::format(Stage::MiniFat, "minifat-count-mismatch", format!(
			"header declares {} MiniFAT sector(s), chain from {} has {}",
			header.number_of_mini_fat_sectors, describe_sector(header.first_mini_fat_sector_location), chain.len())));
	}
	let mini_fat = decode_pointers(&sectors.read_sectors(&chain)?);
	debug!("[build_mini_fat] {} MiniFAT entries from {} sector(s).", mini_fat.len(), chain.len());
	Ok(Some(mini_fat))
}

/// Reads the mini stream: the content of the root entry, which all mini-sector offsets are relative to.
pub fn read_mini_stream(root: &DirectoryEntry, fat: &[u32], sectors: &SectorReader, strict: bool) -> Result<Vec<u8>> {
	let mini_stream = read_fat_chain(sectors, fat, root.starting_sector, root.size, strict, Stage::MiniStream)?;
	debug!("[read_mini_stream] Mini stream is {} bytes ({} mini-sectors).", mini_stream.len(), mini_stream.len() / MINI_SECTOR_SIZE);
	Ok(mini_stream)
}
