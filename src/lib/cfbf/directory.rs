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

use std::char::{decode_utf16, REPLACEMENT_CHARACTER};
use log::{debug, warn};
use super::chain::{walk_chain, ChainKind};
use super::error::{CfbError, Result, Stage};
use super::sector::{read_u16, read_u32, read_u64, SectorReader};
use super::structures::*;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryKind {
	/// An empty slot in the directory.
	Unused,
	/// A folder.
	Storage,
	/// A file.
	Stream,
	/// The root folder. Its stream is the mini stream.
	Root,
}

impl EntryKind {
	pub fn from_byte(object_type: u8) -> Option<EntryKind> {
		match object_type {
			0 => Some(EntryKind::Unused),
			1 => Some(EntryKind::Storage),
			2 => Some(EntryKind::Stream),
			5 => Some(EntryKind::Root),
			_ => None,
		}
	}

	pub fn is_storage(self) -> bool {
		self == EntryKind::Storage || self == EntryKind::Root
	}
}

/// One 128-byte record of the directory.
///
/// Siblings and children are referenced by their ID, i.e. their index in the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
	pub id: u32,
	pub name: String,
	pub kind: EntryKind,
	/// Red-black tree color; 0 is red, 1 is black.
	pub color: u8,
	/// The ID of the left sibling object in the binary tree (in this folder).
	pub left_sibling_id: Option<u32>,
	/// The ID of the right sibling object in the binary tree (in this folder).
	pub right_sibling_id: Option<u32>,
	/// If this object is a folder: the ID of the root of its children's tree.
	pub child_id: Option<u32>,
	pub clsid: [u8; 16],
	pub state_bits: u32,
	pub creation_time: u64,
	pub modified_time: u64,
	/// First sector (or mini-sector, for small streams) of the content.
	pub starting_sector: u32,
	/// Length of the content in bytes. For version 3 files only the lower 32 bits are kept.
	pub size: u64,
}

/// Reads the directory stream through the FAT and decodes every record in it.
pub fn parse_directory(fat: &[u32], sectors: &SectorReader, header: &CfbHeader, strict: bool) -> Result<Vec<DirectoryEntry>> {
	let chain = walk_chain(fat, header.first_directory_sector_location, ChainKind::Fat)?;
	let data = sectors.read_sectors(&chain)?;
	debug!("[parse_directory] Directory spans {} sector(s), {} entries.", chain.len(), data.len() / DIRECTORY_ENTRY_SIZE);

	let entries = data
		.chunks_exact(DIRECTORY_ENTRY_SIZE)
		.enumerate()
		.map(|(id, record)| decode_entry(id as u32, record, header.major_version, strict))
		.collect::<Result<Vec<_>>>()?;

	match entries.first() {
		None => Err(CfbError::format(Stage::Directory, "missing-root-entry", "the directory is empty")),
		Some(root) if root.kind != EntryKind::Root && strict => Err(CfbError::format(Stage::Directory, "missing-root-entry", format!(
			"entry #0 is {:?}, expected Root", root.kind))),
		Some(root) => {
			if root.kind != EntryKind::Root {
				warn!("[parse_directory] Entry #0 is {:?} rather than Root, using it as root anyway.", root.kind);
			}
			Ok(entries)
		},
	}
}

/// Decodes one 128-byte directory record.
pub fn decode_entry(id: u32, record: &[u8], major_version: u16, strict: bool) -> Result<DirectoryEntry> {
	let name_length = read_u16(record, 64) as usize;
	let object_type = record[66];

	let kind = match EntryKind::from_byte(object_type) {
		Some(kind) => kind,
		None if strict => return Err(CfbError::format(Stage::Directory, "directory-entry-type", format!(
			"entry #{} has object type {:#04X}", id, object_type))),
		None => {
			warn!("[decode_entry] Entry #{} has unknown object type {:#04X}, treating it as unused.", id, object_type);
			EntryKind::Unused
		},
	};
	if strict && kind != EntryKind::Unused && (name_length > 64 || name_length % 2 != 0) {
		return Err(CfbError::format(Stage::Directory, "directory-name-length", format!(
			"entry #{} declares a name length of {} bytes", id, name_length)));
	}

	// The length is expressed in bytes and includes the trailing NUL character
	let name = decode_utf16(
			(0..(name_length / 2).min(32))
			.map(|i| read_u16(record, i * 2))
			.take_while(|&unit| unit != 0))
		.map(|r| r.unwrap_or(REPLACEMENT_CHARACTER))
		.collect::<String>();

	let mut clsid = [0u8; 16];
	clsid.copy_from_slice(&record[80..96]);

	let mut size = read_u64(record, 120);
	if major_version == 3 {
		// Writers of version 3 files may leave garbage in the upper half
		size &= 0xFFFF_FFFF;
	}

	Ok(DirectoryEntry {
		id,
		name,
		kind,
		color: record[67],
		left_sibling_id: link(read_u32(record, 68)),
		right_sibling_id: link(read_u32(record, 72)),
		child_id: link(read_u32(record, 76)),
		clsid,
		state_bits: read_u32(record, 96),
		creation_time: read_u64(record, 100),
		modified_time: read_u64(record, 108),
		starting_sector: read_u32(record, 116),
		size,
	})
}

fn link(value: u32) -> Option<u32> {
	if value == NOSTREAM { None } else { Some(value) }
}

fn resolve(entries: &[DirectoryEntry], from: u32, id: u32) -> Result<&DirectoryEntry> {
	entries.get(id as usize).ok_or_else(|| CfbError::format(Stage::Directory, "directory-link-out-of-range", format!(
		"entry #{} links to #{}, but the directory only has {} entries", from, id, entries.len())))
}

fn revisited(id: u32) -> CfbError {
	CfbError::format(Stage::Directory, "directory-tree-cycle", format!("entry #{} is reachable more than once", id))
}

/// Checks that the tree reachable from the root has only in-range links and reaches no entry twice.
/// Entries that are not reachable are not inspected.
pub fn validate_tree(entries: &[DirectoryEntry]) -> Result<()> {
	if entries.is_empty() {
		return Ok(());
	}
	let mut visited = vec![false; entries.len()];
	let mut pending = vec![0u32];
	visited[0] = true;
	while let Some(id) = pending.pop() {
		let entry = &entries[id as usize];
		// The root has no siblings of its own
		let links = if id == 0 {
			[None, None, entry.child_id]
		}
		else {
			[entry.left_sibling_id, entry.right_sibling_id, entry.child_id]
		};
		for next in links.iter().flatten().cloned() {
			resolve(entries, id, next)?;
			if visited[next as usize] {
				return Err(revisited(next));
			}
			visited[next as usize] = true;
			pending.push(next);
		}
	}
	debug!("[validate_tree] {} of {} entries reachable from the root.", visited.iter().filter(|&&v| v).count(), entries.len());
	Ok(())
}

/// Lists the children of a storage, in the (sorted) order of its sibling tree.
pub fn children(entries: &[DirectoryEntry], parent_id: u32) -> Result<Vec<u32>> {
	let parent = entries.get(parent_id as usize).ok_or(CfbError::NoSuchEntry { id: parent_id })?;
	let mut result = Vec::new();
	let mut visited = vec![false; entries.len()];
	let mut stack: Vec<u32> = Vec::new();
	let mut current = parent.child_id;
	let mut from = parent_id;

	// In-order traversal: left subtree, node, right subtree
	loop {
		while let Some(id) = current {
			let entry = resolve(entries, from, id)?;
			if visited[id as usize] {
				return Err(revisited(id));
			}
			visited[id as usize] = true;
			stack.push(id);
			from = id;
			current = entry.left_sibling_id;
		}
		match stack.pop() {
			Some(id) => {
				result.push(id);
				from = id;
				current = entries[id as usize].right_sibling_id;
			},
			None => break,
		}
	}
	Ok(result)
}

/// Finds a direct child of a storage by name. Names are compared case-insensitively.
pub fn find_child(entries: &[DirectoryEntry], parent_id: u32, name: &str) -> Result<Option<u32>> {
	let wanted = name.to_uppercase();
	Ok(children(entries, parent_id)?
		.into_iter()
		.find(|&id| entries[id as usize].name.to_uppercase() == wanted))
}

/// Resolves a `/`-separated path relative to the root storage. The empty path names the root.
pub fn find_path(entries: &[DirectoryEntry], path: &str) -> Result<Option<u32>> {
	let mut current = 0u32;
	for segment in path.split('/').filter(|segment| !segment.is_empty()) {
		match find_child(entries, current, segment)? {
			Some(id) => current = id,
			None => return Ok(None),
		}
	}
	Ok(Some(current))
}

/// Lists every entry reachable from the root, depth first, with its full path.
pub fn walk(entries: &[DirectoryEntry]) -> Result<Vec<(String, u32)>> {
	let mut result = Vec::new();
	if entries.is_empty() {
		return Ok(result);
	}
	let mut seen = vec![false; entries.len()];
	seen[0] = true;
	let mut pending = vec![(String::new(), 0u32)];
	while let Some((path, id)) = pending.pop() {
		let entry = &entries[id as usize];
		if id == 0 || entry.kind.is_storage() {
			// Reversed, so that the first child is popped first
			for child in children(entries, id)?.into_iter().rev() {
				if seen[child as usize] {
					return Err(revisited(child));
				}
				seen[child as usize] = true;
				pending.push((format!("{}/{}", path, entries[child as usize].name), child));
			}
		}
		result.push((if path.is_empty() { "/".to_owned() } else { path }, id));
	}
	Ok(result)
}
