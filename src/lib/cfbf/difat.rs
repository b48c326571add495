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

use std::collections::HashSet;
use log::{debug, warn};
use super::error::{CfbError, Result, Stage};
use super::sector::{read_u32, SectorReader};
use super::structures::*;

/// The DIFAT: the ordered list of sectors holding the FAT, plus the DIFAT sectors it was read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Difat {
	pub fat_sectors: Vec<u32>,
	pub difat_sectors: Vec<u32>,
}

/// Enumerates the FAT sectors.
///
/// The first 109 locations are listed right after the header, all subsequent ones are listed in the
/// chain of DIFAT sectors. Every DIFAT sector holds `sector_size / 4 - 1` locations followed by the
/// location of the next DIFAT sector. FREESECT entries are unused slots and are skipped.
pub fn build_difat(header: &CfbHeader, sectors: &SectorReader, strict: bool) -> Result<Difat> {
	let mut difat = Difat {
		fat_sectors: header.difat.iter().cloned().filter(|&sector| sector != FREESECT).collect(),
		difat_sectors: Vec::new(),
	};
	debug!("[build_difat] {} FAT sector location(s) in the header.", difat.fat_sectors.len());

	if header.number_of_difat_sectors > 0 {
		let entries_per_sector = sectors.sector_size() / 4 - 1;
		let mut visited = HashSet::new();
		let mut current = header.first_difat_sector_location;
		loop {
			if current == ENDOFCHAIN {
				break;
			}
			if current == FREESECT && !strict {
				warn!("[build_difat] DIFAT chain ends with FREESECT instead of ENDOFCHAIN, accepting.");
				break;
			}
			if !is_regular_sector(current) {
				return Err(CfbError::format(Stage::Difat, "chain-invalid-pointer", format!(
					"DIFAT chain points to {}", describe_sector(current))));
			}
			if !visited.insert(current) {
				return Err(CfbError::format(Stage::Difat, "chain-cycle", format!(
					"DIFAT sector #{} appears twice in the DIFAT chain", current)));
			}

			let data = sectors.sector(current)?;
			difat.difat_sectors.push(current);
			for i in 0..entries_per_sector {
				let location = read_u32(data, i * 4);
				if location != FREESECT {
					difat.fat_sectors.push(location);
				}
			}
			current = read_u32(data, entries_per_sector * 4);
		}
		debug!("[build_difat] Followed {} DIFAT sector(s).", difat.difat_sectors.len());
	}

	// Every FAT sector holds a distinct part of the table
	let mut listed = HashSet::new();
	if let Some(&sector) = difat.fat_sectors.iter().find(|&&sector| !listed.insert(sector)) {
		return Err(CfbError::format(Stage::Difat, "difat-duplicate-fat-sector", format!(
			"FAT sector {} is listed more than once in the DIFAT", describe_sector(sector))));
	}
	if strict {
		if difat.difat_sectors.len() as u64 != header.number_of_difat_sectors as u64 {
			return Err(CfbError::format(Stage::Difat, "difat-sector-count-mismatch", format!(
				"header declares {} DIFAT sector(s), chain has {}", header.number_of_difat_sectors, difat.difat_sectors.len())));
		}
		if difat.fat_sectors.len() as u64 != header.number_of_fat_sectors as u64 {
			return Err(CfbError::format(Stage::Difat, "difat-fat-count-mismatch", format!(
				"header declares {} FAT sector(s), DIFAT lists {}", header.number_of_fat_sectors, difat.fat_sectors.len())));
		}
	}
	else if difat.fat_sectors.len() as u64 != header.number_of_fat_sectors as u64 {
		warn!("[build_difat] Header declares {} FAT sector(s), DIFAT lists {}; using the DIFAT.",
			header.number_of_fat_sectors, difat.fat_sectors.len());
	}

	Ok(difat)
}
