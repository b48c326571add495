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

// Also see: [MS-CFB]: Compound File Binary File Format specifications, https://msdn.microsoft.com/en-us/library/dd942138.aspx

/// Magic number at the very beginning of every CFBF file.
pub const SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Number of header bytes that carry information. Version 4 files pad the header up to a full 4096-byte sector.
pub const HEADER_SIZE: usize = 0x200;

/// Number of DIFAT entries stored inline at the end of the header.
pub const HEADER_DIFAT_ENTRIES: usize = 109;

/// Offset of the inline DIFAT array within the header.
pub const HEADER_DIFAT_OFFSET: usize = 0x4C;

pub const DIRECTORY_ENTRY_SIZE: usize = 128;

pub const MINI_SECTOR_SIZE: usize = 64;
pub const MINI_STREAM_CUTOFF_SIZE: u64 = 4096;

/// Largest value that is a regular sector number.
pub const MAXREGSECT: u32 = 0xFFFF_FFFA;
pub const DIFSECT: u32 = 0xFFFF_FFFC;
pub const FATSECT: u32 = 0xFFFF_FFFD;
pub const ENDOFCHAIN: u32 = 0xFFFF_FFFE;
pub const FREESECT: u32 = 0xFFFF_FFFF;

/// Largest value that is a regular directory entry ID.
pub const MAXREGSID: u32 = 0xFFFF_FFFA;
/// "No sibling/child" marker in directory entries.
pub const NOSTREAM: u32 = 0xFFFF_FFFF;

/// Whether the given allocation table value names an actual sector (as opposed to one of the sentinels).
pub fn is_regular_sector(value: u32) -> bool {
	value <= MAXREGSECT
}

/// Human-readable form of an allocation table value, used in error details and log output.
pub fn describe_sector(value: u32) -> String {
	match value {
		FREESECT => "FREESECT".to_owned(),
		ENDOFCHAIN => "ENDOFCHAIN".to_owned(),
		FATSECT => "FATSECT".to_owned(),
		DIFSECT => "DIFSECT".to_owned(),
		other => format!("#{}", other),
	}
}

/// The header of a CFBF file, including the inline DIFAT entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfbHeader {
	pub minor_version: u16,
	pub major_version: u16,
	pub byte_order: u16,
	/// Sector shift as written in the file. The sector size itself is derived from the major version.
	pub sector_shift: u16,
	pub sector_size: usize, // virtual field; not actually contained in CFBF file
	/// Mini sector shift as written in the file.
	pub mini_sector_shift: u16,
	pub mini_sector_size: usize, // always MINI_SECTOR_SIZE
	pub number_of_directory_sectors: u32,
	pub number_of_fat_sectors: u32,
	pub first_directory_sector_location: u32,
	pub transaction_signature_number: u32,
	/// Cutoff as written in the file.
	pub declared_mini_stream_cutoff_size: u32,
	pub mini_stream_cutoff_size: u64, // always MINI_STREAM_CUTOFF_SIZE
	pub first_mini_fat_sector_location: u32,
	pub number_of_mini_fat_sectors: u32,
	pub first_difat_sector_location: u32,
	pub number_of_difat_sectors: u32,
	/// The first 109 FAT sector locations, exactly as stored (FREESECT included).
	pub difat: [u32; HEADER_DIFAT_ENTRIES],
}

impl CfbHeader {
	/// Whether the file has a MiniFAT at all. Without one, every stream lives in regular sectors.
	pub fn has_mini_fat(&self) -> bool {
		self.first_mini_fat_sector_location != ENDOFCHAIN
	}
}
