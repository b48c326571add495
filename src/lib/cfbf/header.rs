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
use super::error::{CfbError, Result, Stage};
use super::sector::{read_u16, read_u32};
use super::structures::*;

/// Parses the fixed-size header at the beginning of the file.
///
/// Only the header region itself is looked at; nothing else in the file can make this fail.
pub fn parse_header(bytes: &[u8]) -> Result<CfbHeader> {
	if bytes.len() < HEADER_SIZE {
		return Err(CfbError::format(Stage::Header, "header-truncated", format!(
			"expected at least {} header bytes, got {}", HEADER_SIZE, bytes.len())));
	}
	let buffer = &bytes[..HEADER_SIZE];

	if buffer[0..8] != SIGNATURE {
		return Err(CfbError::format(Stage::Header, "signature", format!(
			"bad signature {:02X?}, expected {:02X?}", &buffer[0..8], SIGNATURE)));
	}

	// skip CLSID (16 bytes)
	let minor_version = read_u16(buffer, 0x18);
	let major_version = read_u16(buffer, 0x1A);
	let sector_size = match major_version {
		3 => 512,
		4 => 4096,
		other => return Err(CfbError::unsupported(Stage::Header, "header-version", format!(
			"major version {} (only 3 and 4 are defined)", other))),
	};

	let mut difat = [FREESECT; HEADER_DIFAT_ENTRIES];
	for (i, entry) in difat.iter_mut().enumerate() {
		*entry = read_u32(buffer, HEADER_DIFAT_OFFSET + i * 4);
	}

	// skip reserved (6 bytes) at 0x22
	let header = CfbHeader {
		minor_version,
		major_version,
		byte_order: read_u16(buffer, 0x1C),
		sector_shift: read_u16(buffer, 0x1E),
		sector_size,
		mini_sector_shift: read_u16(buffer, 0x20),
		mini_sector_size: MINI_SECTOR_SIZE,
		number_of_directory_sectors: read_u32(buffer, 0x28),
		number_of_fat_sectors: read_u32(buffer, 0x2C),
		first_directory_sector_location: read_u32(buffer, 0x30),
		transaction_signature_number: read_u32(buffer, 0x34),
		declared_mini_stream_cutoff_size: read_u32(buffer, 0x38),
		mini_stream_cutoff_size: MINI_STREAM_CUTOFF_SIZE,
		first_mini_fat_sector_location: read_u32(buffer, 0x3C),
		number_of_mini_fat_sectors: read_u32(buffer, 0x40),
		first_difat_sector_location: read_u32(buffer, 0x44),
		number_of_difat_sectors: read_u32(buffer, 0x48),
		difat,
	};
	debug!("[parse_header] Version {}.{}, {}-byte sectors, {} FAT sector(s), directory at {}, MiniFAT at {}, DIFAT at {}.",
		header.major_version, header.minor_version, header.sector_size, header.number_of_fat_sectors,
		describe_sector(header.first_directory_sector_location),
		describe_sector(header.first_mini_fat_sector_location),
		describe_sector(header.first_difat_sector_location));
	Ok(header)
}

/// Strict-mode checks of header fields that the parser itself does not rely on.
pub fn validate_header(header: &CfbHeader) -> Result<()> {
	if header.byte_order != 0xFFFE {
		return Err(CfbError::format(Stage::Header, "header-byte-order", format!(
			"byte order mark is {:#06X}, expected 0xFFFE", header.byte_order)));
	}
	let expected_shift = if header.major_version == 3 { 9 } else { 12 };
	if header.sector_shift != expected_shift {
		return Err(CfbError::format(Stage::Header, "header-sector-shift", format!(
			"sector shift {} does not match version {} (expected {})", header.sector_shift, header.major_version, expected_shift)));
	}
	if header.mini_sector_shift != 6 {
		return Err(CfbError::format(Stage::Header, "header-mini-sector-shift", format!(
			"mini sector shift is {}, expected 6", header.mini_sector_shift)));
	}
	if header.declared_mini_stream_cutoff_size as u64 != MINI_STREAM_CUTOFF_SIZE {
		return Err(CfbError::format(Stage::Header, "header-mini-stream-cutoff", format!(
			"mini stream cutoff is {}, expected {}", header.declared_mini_stream_cutoff_size, MINI_STREAM_CUTOFF_SIZE)));
	}
	if header.major_version == 3 && header.number_of_directory_sectors != 0 {
		return Err(CfbError::format(Stage::Header, "header-directory-sector-count", format!(
			"version 3 files must declare 0 directory sectors, found {}", header.number_of_directory_sectors)));
	}
	Ok(())
}
