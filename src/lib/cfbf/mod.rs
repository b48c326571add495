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

//! Reader for the Compound File Binary File Format (also known as OLE file, COM file, or Structured Storage file).
//!
//! The whole file is parsed eagerly from an in-memory buffer: header, DIFAT, FAT, directory, MiniFAT and
//! mini stream. Stream contents are reconstructed on demand. Nothing is ever written back.

pub mod chain;
pub mod difat;
pub mod directory;
pub mod error;
pub mod fat;
pub mod header;
pub mod mini;
pub mod sector;
pub mod stream;
pub mod structures;

pub use self::directory::{DirectoryEntry, EntryKind};
pub use self::error::{CfbError, Result, Stage};
pub use self::structures::CfbHeader;

use log::debug;
use self::sector::SectorReader;
use self::stream::MiniStorage;

/// Parsing options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenOptions {
	/// Enables the additional consistency checks (count cross-checks, tail padding, declared sizes,
	/// directory tree shape). Cycle detection and bounds checks are always on.
	pub strict: bool,
}

impl OpenOptions {
	pub fn new() -> OpenOptions {
		OpenOptions::default()
	}

	pub fn strict(mut self, strict: bool) -> OpenOptions {
		self.strict = strict;
		self
	}
}

/// A parsed compound file, borrowing the bytes it was parsed from.
#[derive(Debug, Clone)]
pub struct CfbFile<'a> {
	sectors: SectorReader<'a>,
	options: OpenOptions,
	header: CfbHeader,
	difat: Vec<u32>,
	fat: Vec<u32>,
	mini_fat: Option<Vec<u32>>,
	mini_stream: Option<Vec<u8>>,
	directory: Vec<DirectoryEntry>,
}

/// Parses a compound file. Same as [`CfbFile::open`].
pub fn open_cfb(bytes: &[u8], options: OpenOptions) -> Result<CfbFile<'_>> {
	CfbFile::open(bytes, options)
}

impl<'a> CfbFile<'a> {
	/// Parses everything up to the point where streams can be read, so that a malformed file is rejected right away.
	pub fn open(bytes: &'a [u8], options: OpenOptions) -> Result<CfbFile<'a>> {
		let strict = options.strict;
		debug!("[open] Parsing {} bytes ({} mode) ...", bytes.len(), if strict { "strict" } else { "lenient" });

		let header = header::parse_header(bytes)?;
		if strict {
			header::validate_header(&header)?;
		}
		let sectors = SectorReader::new(bytes, header.sector_size);

		let difat = difat::build_difat(&header, &sectors, strict)?;
		let fat = fat::build_fat(&sectors, &difat, strict)?;
		let directory = directory::parse_directory(&fat, &sectors, &header, strict)?;
		if strict {
			directory::validate_tree(&directory)?;
		}

		let mini_fat = mini::build_mini_fat(&header, &fat, &sectors, strict)?;
		let mini_stream = match mini_fat {
			Some(_) => Some(mini::read_mini_stream(&directory[0], &fat, &sectors, strict)?),
			None => None,
		};

		debug!("[open] Done: {} FAT entries, {} directory entries.", fat.len(), directory.len());
		Ok(CfbFile {
			sectors,
			options,
			header,
			difat: difat.fat_sectors,
			fat,
			mini_fat,
			mini_stream,
			directory,
		})
	}

	pub fn header(&self) -> &CfbHeader {
		&self.header
	}

	pub fn options(&self) -> OpenOptions {
		self.options
	}

	/// All directory entries, indexed by ID.
	pub fn directory(&self) -> &[DirectoryEntry] {
		&self.directory
	}

	/// The entry at index 0, which is the root storage in any well-formed file.
	pub fn root(&self) -> &DirectoryEntry {
		&self.directory[0]
	}

	/// Locations of the FAT sectors, in order.
	pub fn difat(&self) -> &[u32] {
		&self.difat
	}

	pub fn fat(&self) -> &[u32] {
		&self.fat
	}

	pub fn mini_fat(&self) -> Option<&[u32]> {
		self.mini_fat.as_deref()
	}

	pub fn mini_stream(&self) -> Option<&[u8]> {
		self.mini_stream.as_deref()
	}

	/// Number of complete sectors in the file, not counting the header.
	pub fn sector_count(&self) -> u32 {
		self.sectors.sector_count()
	}

	pub fn get_entry_by_id(&self, id: u32) -> Option<&DirectoryEntry> {
		self.directory.get(id as usize)
	}

	/// Reconstructs the content of a stream entry.
	pub fn read_stream_by_id(&self, id: u32) -> Result<Vec<u8>> {
		let entry = self.get_entry_by_id(id).ok_or(CfbError::NoSuchEntry { id })?;
		if entry.kind != EntryKind::Stream {
			return Err(CfbError::NotAStream { id, kind: entry.kind });
		}
		let mini = match (&self.mini_fat, &self.mini_stream) {
			(Some(mini_fat), Some(mini_stream)) => Some(MiniStorage { mini_fat, mini_stream }),
			_ => None,
		};
		stream::read_stream(entry, &self.sectors, &self.fat, mini, self.options.strict)
	}

	/// IDs of the children of a storage, in sibling tree order.
	pub fn children(&self, id: u32) -> Result<Vec<u32>> {
		directory::children(&self.directory, id)
	}

	/// Finds a direct child of a storage by name (case-insensitive).
	pub fn find_child(&self, parent_id: u32, name: &str) -> Result<Option<&DirectoryEntry>> {
		Ok(directory::find_child(&self.directory, parent_id, name)?.map(|id| &self.directory[id as usize]))
	}

	/// Finds an entry by its `/`-separated path below the root, e.g. `"_VBA_PROJECT_CUR/VBA/dir"`.
	pub fn find_path(&self, path: &str) -> Result<Option<&DirectoryEntry>> {
		Ok(directory::find_path(&self.directory, path)?.map(|id| &self.directory[id as usize]))
	}

	/// Reads the stream at the given path. Returns `Ok(None)` if there is no such entry.
	pub fn read_stream_by_path(&self, path: &str) -> Result<Option<Vec<u8>>> {
		match directory::find_path(&self.directory, path)? {
			Some(id) => self.read_stream_by_id(id).map(Some),
			None => Ok(None),
		}
	}

	/// Every entry reachable from the root, depth first, as `(path, id)` pairs.
	pub fn walk(&self) -> Result<Vec<(String, u32)>> {
		directory::walk(&self.directory)
	}
}
