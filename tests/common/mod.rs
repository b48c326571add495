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

//! Hand-rolled container writer for tests. Produces well-formed files with a fixed, predictable
//! layout so that individual fields can be corrupted afterwards:
//!
//! sector 0: FAT | directory | MiniFAT | mini stream | large streams, in order | DIFAT sector

#![allow(dead_code)]

use std::io::{Cursor, Write};

pub const SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
pub const DIFSECT: u32 = 0xFFFF_FFFC;
pub const FATSECT: u32 = 0xFFFF_FFFD;
pub const ENDOFCHAIN: u32 = 0xFFFF_FFFE;
pub const FREESECT: u32 = 0xFFFF_FFFF;
pub const NOSTREAM: u32 = 0xFFFF_FFFF;

pub const HEADER_NUM_FAT_SECTORS: usize = 0x2C;
pub const HEADER_FIRST_DIR_SECTOR: usize = 0x30;

/// The ten bytes used by most scenarios.
pub const TEN_BYTES: [u8; 10] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9];

pub fn patterned(len: usize) -> Vec<u8> {
	(0..len).map(|i| (i * 7 % 251) as u8).collect()
}

pub struct Builder {
	version: u16,
	use_mini_fat: bool,
	difat_sector: bool,
	streams: Vec<(String, Vec<u8>)>,
}

pub struct Container {
	pub bytes: Vec<u8>,
	pub sector_size: usize,
	pub directory_sector: u32,
	pub mini_fat_sector: Option<u32>,
	pub mini_stream_sector: Option<u32>,
	pub difat_sector: Option<u32>,
	/// Starting sector (or mini-sector) of every stream, in the order they were added.
	pub stream_starts: Vec<u32>,
}

fn ceil_div(value: usize, unit: usize) -> usize {
	(value + unit - 1) / unit
}

fn link_chain(table: &mut [u32], start: usize, count: usize) {
	for i in 0..count {
		table[start + i] = if i + 1 < count { (start + i + 1) as u32 } else { ENDOFCHAIN };
	}
}

fn put_u16(bytes: &mut [u8], offset: usize, value: u16) {
	bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(bytes: &mut [u8], offset: usize, value: u32) {
	bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_u64(bytes: &mut [u8], offset: usize, value: u64) {
	bytes[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

fn put_entry(bytes: &mut [u8], offset: usize, name: &str, object_type: u8, right: u32, child: u32, start: u32, size: u64) {
	let units: Vec<u16> = name.encode_utf16().collect();
	for (i, unit) in units.iter().enumerate() {
		put_u16(bytes, offset + i * 2, *unit);
	}
	let name_length = if name.is_empty() { 0 } else { ((units.len() + 1) * 2) as u16 };
	put_u16(bytes, offset + 64, name_length);
	bytes[offset + 66] = object_type;
	bytes[offset + 67] = 1;
	put_u32(bytes, offset + 68, NOSTREAM);
	put_u32(bytes, offset + 72, right);
	put_u32(bytes, offset + 76, child);
	put_u32(bytes, offset + 116, start);
	put_u64(bytes, offset + 120, size);
}

impl Builder {
	pub fn new(version: u16) -> Builder {
		Builder { version, use_mini_fat: true, difat_sector: false, streams: Vec::new() }
	}

	/// Stores every stream in regular sectors, regardless of its size.
	pub fn without_mini_fat(mut self) -> Builder {
		self.use_mini_fat = false;
		self
	}

	/// Lists the FAT sector in a DIFAT sector instead of the header.
	pub fn with_difat_sector(mut self) -> Builder {
		self.difat_sector = true;
		self
	}

	/// Adds a stream below the root. Stream IDs are assigned from 1 in the order of addition.
	pub fn stream(mut self, name: &str, data: &[u8]) -> Builder {
		self.streams.push((name.to_owned(), data.to_vec()));
		self
	}

	pub fn build(&self) -> Container {
		let sector_size: usize = if self.version == 4 { 4096 } else { 512 };
		let is_mini = |data: &Vec<u8>| self.use_mini_fat && data.len() < 4096;

		// Mini stream layout
		let mut mini_fat: Vec<u32> = Vec::new();
		let mut mini_data: Vec<u8> = Vec::new();
		let mut mini_starts = Vec::new();
		for (_, data) in &self.streams {
			if is_mini(data) && !data.is_empty() {
				let start = mini_fat.len();
				let count = ceil_div(data.len(), 64);
				mini_fat.resize(start + count, FREESECT);
				link_chain(&mut mini_fat, start, count);
				mini_data.extend_from_slice(data);
				mini_data.resize((start + count) * 64, 0);
				mini_starts.push(start as u32);
			}
			else {
				mini_starts.push(ENDOFCHAIN);
			}
		}
		let has_mini_fat = !mini_fat.is_empty();

		// Sector layout
		let mut next = 1usize; // sector 0 is the FAT
		let entry_count = self.streams.len() + 1;
		let directory_sector = next;
		let directory_count = ceil_div(entry_count * 128, sector_size);
		next += directory_count;

		let (mut mini_fat_sector, mut mini_fat_count, mut mini_stream_sector, mut mini_stream_count) = (None, 0, None, 0);
		if has_mini_fat {
			mini_fat_sector = Some(next);
			mini_fat_count = ceil_div(mini_fat.len() * 4, sector_size);
			next += mini_fat_count;
			mini_stream_sector = Some(next);
			mini_stream_count = ceil_div(mini_data.len(), sector_size);
			next += mini_stream_count;
		}

		let mut stream_starts = Vec::new();
		let mut large_chains = Vec::new();
		for (i, (_, data)) in self.streams.iter().enumerate() {
			if is_mini(data) || data.is_empty() {
				stream_starts.push(mini_starts[i]);
			}
			else {
				let count = ceil_div(data.len(), sector_size);
				stream_starts.push(next as u32);
				large_chains.push((next, count, i));
				next += count;
			}
		}

		let difat_sector = if self.difat_sector {
			next += 1;
			Some(next - 1)
		}
		else {
			None
		};

		let total = next;
		assert!(total <= sector_size / 4, "fixture needs more than one FAT sector");

		// FAT
		let mut fat = vec![FREESECT; sector_size / 4];
		fat[0] = FATSECT;
		link_chain(&mut fat, directory_sector, directory_count);
		if let (Some(mf), Some(ms)) = (mini_fat_sector, mini_stream_sector) {
			link_chain(&mut fat, mf, mini_fat_count);
			link_chain(&mut fat, ms, mini_stream_count);
		}
		for &(start, count, _) in &large_chains {
			link_chain(&mut fat, start, count);
		}
		if let Some(ds) = difat_sector {
			fat[ds] = DIFSECT;
		}

		let mut bytes = vec![0u8; (total + 1) * sector_size];
		let offset = |sector: usize| (sector + 1) * sector_size;

		// Header
		bytes[0..8].copy_from_slice(&SIGNATURE);
		put_u16(&mut bytes, 0x18, 0x003E);
		put_u16(&mut bytes, 0x1A, self.version);
		put_u16(&mut bytes, 0x1C, 0xFFFE);
		put_u16(&mut bytes, 0x1E, if self.version == 4 { 12 } else { 9 });
		put_u16(&mut bytes, 0x20, 6);
		put_u32(&mut bytes, 0x28, if self.version == 4 { directory_count as u32 } else { 0 });
		put_u32(&mut bytes, HEADER_NUM_FAT_SECTORS, 1);
		put_u32(&mut bytes, HEADER_FIRST_DIR_SECTOR, directory_sector as u32);
		put_u32(&mut bytes, 0x38, 4096);
		put_u32(&mut bytes, 0x3C, mini_fat_sector.map_or(ENDOFCHAIN, |s| s as u32));
		put_u32(&mut bytes, 0x40, mini_fat_count as u32);
		put_u32(&mut bytes, 0x44, difat_sector.map_or(ENDOFCHAIN, |s| s as u32));
		put_u32(&mut bytes, 0x48, if difat_sector.is_some() { 1 } else { 0 });
		for i in 0..109 {
			let value = if i == 0 && difat_sector.is_none() { 0 } else { FREESECT };
			put_u32(&mut bytes, 0x4C + i * 4, value);
		}

		// FAT sector
		for (i, value) in fat.iter().enumerate() {
			put_u32(&mut bytes, offset(0) + i * 4, *value);
		}

		// DIFAT sector: FAT location, unused slots, next DIFAT sector
		if let Some(ds) = difat_sector {
			let entries = sector_size / 4 - 1;
			for i in 0..entries {
				put_u32(&mut bytes, offset(ds) + i * 4, if i == 0 { 0 } else { FREESECT });
			}
			put_u32(&mut bytes, offset(ds) + entries * 4, ENDOFCHAIN);
		}

		// Directory
		let directory_offset = offset(directory_sector);
		put_entry(&mut bytes, directory_offset, "Root Entry", 5, NOSTREAM,
			if self.streams.is_empty() { NOSTREAM } else { 1 },
			mini_stream_sector.map_or(ENDOFCHAIN, |s| s as u32),
			mini_data.len() as u64);
		for (i, (name, data)) in self.streams.iter().enumerate() {
			let id = i + 1;
			let right = if id < self.streams.len() { (id + 1) as u32 } else { NOSTREAM };
			put_entry(&mut bytes, directory_offset + id * 128, name, 2, right, NOSTREAM, stream_starts[i], data.len() as u64);
		}
		for id in entry_count..directory_count * sector_size / 128 {
			put_entry(&mut bytes, directory_offset + id * 128, "", 0, NOSTREAM, NOSTREAM, 0, 0);
		}

		// MiniFAT and mini stream
		if let (Some(mf), Some(ms)) = (mini_fat_sector, mini_stream_sector) {
			let mut padded = mini_fat.clone();
			padded.resize(mini_fat_count * sector_size / 4, FREESECT);
			for (i, value) in padded.iter().enumerate() {
				put_u32(&mut bytes, offset(mf) + i * 4, *value);
			}
			bytes[offset(ms)..offset(ms) + mini_data.len()].copy_from_slice(&mini_data);
		}

		// Large streams
		for &(start, _, i) in &large_chains {
			let data = &self.streams[i].1;
			bytes[offset(start)..offset(start) + data.len()].copy_from_slice(data);
		}

		Container {
			bytes,
			sector_size,
			directory_sector: directory_sector as u32,
			mini_fat_sector: mini_fat_sector.map(|s| s as u32),
			mini_stream_sector: mini_stream_sector.map(|s| s as u32),
			difat_sector: difat_sector.map(|s| s as u32),
			stream_starts,
		}
	}
}

impl Container {
	pub fn sector_offset(&self, sector: u32) -> usize {
		(sector as usize + 1) * self.sector_size
	}

	/// Offset of a directory entry; the directory is stored in consecutive sectors.
	pub fn entry_offset(&self, id: u32) -> usize {
		self.sector_offset(self.directory_sector) + id as usize * 128
	}

	pub fn set_u32(&mut self, offset: usize, value: u32) {
		put_u32(&mut self.bytes, offset, value);
	}

	pub fn set_u64(&mut self, offset: usize, value: u64) {
		put_u64(&mut self.bytes, offset, value);
	}

	pub fn set_fat(&mut self, sector: u32, value: u32) {
		let offset = self.sector_offset(0) + sector as usize * 4;
		self.set_u32(offset, value);
	}

	pub fn set_mini_fat(&mut self, minisector: u32, value: u32) {
		let sector = self.mini_fat_sector.expect("container has a MiniFAT");
		let offset = self.sector_offset(sector) + minisector as usize * 4;
		self.set_u32(offset, value);
	}

	pub fn set_entry_size(&mut self, id: u32, size: u64) {
		let offset = self.entry_offset(id) + 120;
		self.set_u64(offset, size);
	}
}

/// A container written by the `cfb` crate, holding `/Workbook` (small) and `/Storage/Inner` (large).
pub fn cfb_crate_container(version: cfb::Version, small: &[u8], large: &[u8]) -> Vec<u8> {
	let cursor = Cursor::new(Vec::new());
	let mut ole = cfb::CompoundFile::create_with_version(version, cursor).expect("create cfb");
	ole.create_storage("/Storage").expect("create storage");
	{
		let mut stream = ole.create_stream("/Workbook").expect("create Workbook stream");
		stream.write_all(small).expect("write Workbook");
		stream.flush().expect("flush Workbook");
	}
	{
		let mut stream = ole.create_stream("/Storage/Inner").expect("create Inner stream");
		stream.write_all(large).expect("write Inner");
		stream.flush().expect("flush Inner");
	}
	ole.flush().expect("flush cfb");
	ole.into_inner().into_inner()
}
