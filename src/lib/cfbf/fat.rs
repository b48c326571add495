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

use log::{debug, warn};
use super::difat::Difat;
use super::error::{CfbError, Result, Stage};
use super::sector::SectorReader;
use super::structures::*;

/// Decodes a buffer of little-endian 32-bit allocation table entries. Trailing bytes that do not form a full entry are ignored.
pub fn decode_pointers(bytes: &[u8]) -> Vec<u32> {
	bytes
		.chunks_exact(4)
		.map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
		.collect()
}

/// Reads all FAT sectors listed by the DIFAT, in order, into one flat table indexed by sector number.
///
/// Only as many FAT sectors are read as it takes to describe every sector of the file; any
/// further ones could only describe sectors that do not exist.
pub fn build_fat(sectors: &SectorReader, difat: &Difat, strict: bool) -> Result<Vec<u32>> {
	let sector_count = sectors.sector_count();
	let entries_per_sector = sectors.sector_size() / 4;
	let needed = (sector_count as usize + entries_per_sector - 1) / entries_per_sector;
	let listed = &difat.fat_sectors[..needed.min(difat.fat_sectors.len())];
	if listed.len() < difat.fat_sectors.len() {
		warn!("[build_fat] DIFAT lists {} FAT sector(s), {} suffice for {} sector(s); ignoring the rest.",
			difat.fat_sectors.len(), needed, sector_count);
	}
	let fat = decode_pointers(&sectors.read_sectors(listed)?);
	debug!("[build_fat] {} FAT entries from {} sector(s); the file has {} sector(s).",
		fat.len(), listed.len(), sector_count);

	if strict {
		// Entries for sectors past the end of the file can only be padding.
		if let Some((index, &value)) = fat.iter().enumerate().skip(sector_count as usize).find(|&(_, &value)| value != FREESECT) {
			return Err(CfbError::format(Stage::Fat, "fat-tail-not-free", format!(
				"FAT entry #{} is {} but the file only has {} sector(s)", index, describe_sector(value), sector_count)));
		}
		check_marked(&fat, &difat.fat_sectors, FATSECT)?;
		check_marked(&fat, &difat.difat_sectors, DIFSECT)?;
	}

	Ok(fat)
}

fn check_marked(fat: &[u32], sectors: &[u32], marker: u32) -> Result<()> {
	for &sector in sectors {
		let value = fat.get(sector as usize).cloned().unwrap_or(FREESECT);
		if value != marker {
			return Err(CfbError::format(Stage::Fat, "fat-sector-not-marked", format!(
				"sector #{} should be marked {} in the FAT, found {}", sector, describe_sector(marker), describe_sector(value))));
		}
	}
	Ok(())
}
