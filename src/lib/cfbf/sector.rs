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

use super::error::{CfbError, Result, Stage};

/// Read-only view of the sectors of an in-memory CFBF file.
///
/// Sector #0 starts right after the header, which always occupies exactly one sector
/// (512 bytes in version 3 files, 4096 bytes in version 4 files).
#[derive(Debug, Clone, Copy)]
pub struct SectorReader<'a> {
	bytes: &'a [u8],
	sector_size: usize,
}

impl<'a> SectorReader<'a> {
	pub fn new(bytes: &'a [u8], sector_size: usize) -> SectorReader<'a> {
		SectorReader { bytes, sector_size }
	}

	pub fn sector_size(&self) -> usize {
		self.sector_size
	}

	/// Number of complete sectors following the header. A trailing partial sector does not count.
	pub fn sector_count(&self) -> u32 {
		let count = (self.bytes.len() / self.sector_size).saturating_sub(1);
		count.min(u32::MAX as usize) as u32
	}

	/// Returns `(offset, length)` of the given sector within the file.
	pub fn byte_range(&self, sector: u32) -> Result<(usize, usize)> {
		let offset = (sector as u64 + 1) * self.sector_size as u64;
		let end = offset + self.sector_size as u64;
		if end > self.bytes.len() as u64 {
			return Err(CfbError::format(Stage::Sector, "sector-out-of-range", format!(
				"sector #{} would span bytes {:#X}..{:#X}, but the file is only {:#X} bytes long",
				sector, offset, end, self.bytes.len())));
		}
		Ok((offset as usize, self.sector_size))
	}

	/// Borrows the raw bytes of one sector.
	pub fn sector(&self, sector: u32) -> Result<&'a [u8]> {
		let (offset, length) = self.byte_range(sector)?;
		Ok(&self.bytes[offset..offset + length])
	}

	/// Concatenates the given sectors, in order.
	pub fn read_sectors(&self, sectors: &[u32]) -> Result<Vec<u8>> {
		let mut data = Vec::with_capacity(sectors.len() * self.sector_size);
		for &sector in sectors {
			data.extend_from_slice(self.sector(sector)?);
		}
		Ok(data)
	}
}

pub(crate) fn read_u16(buffer: &[u8], offset: usize) -> u16 {
	u16::from_le_bytes([buffer[offset], buffer[offset + 1]])
}

pub(crate) fn read_u32(buffer: &[u8], offset: usize) -> u32 {
	u32::from_le_bytes([buffer[offset], buffer[offset + 1], buffer[offset + 2], buffer[offset + 3]])
}

pub(crate) fn read_u64(buffer: &[u8], offset: usize) -> u64 {
	(read_u32(buffer, offset) as u64) | (read_u32(buffer, offset + 4) as u64) << 32
}
