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

use std::fmt;
use thiserror::Error;
use super::directory::EntryKind;

/// The parsing stage in which a problem was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
	Sector,
	Header,
	Difat,
	Fat,
	Chain,
	Directory,
	MiniFat,
	MiniStream,
	Stream,
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Stage::Sector => "sector",
			Stage::Header => "header",
			Stage::Difat => "difat",
			Stage::Fat => "fat",
			Stage::Chain => "chain",
			Stage::Directory => "directory",
			Stage::MiniFat => "minifat",
			Stage::MiniStream => "ministream",
			Stage::Stream => "stream",
		};
		f.write_str(name)
	}
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CfbError {
	/// The input violates a structural or value constraint of the format.
	#[error("malformed compound file [{stage}/{check}]: {detail}")]
	Format {
		stage: Stage,
		check: &'static str,
		detail: String,
	},
	/// The input is well-formed but uses a version or feature that is not implemented.
	#[error("unsupported compound file [{stage}/{check}]: {detail}")]
	Unsupported {
		stage: Stage,
		check: &'static str,
		detail: String,
	},
	#[error("no directory entry with ID {id}")]
	NoSuchEntry { id: u32 },
	#[error("directory entry #{id} is not a stream (it is {kind:?})")]
	NotAStream { id: u32, kind: EntryKind },
}

impl CfbError {
	pub(crate) fn format(stage: Stage, check: &'static str, detail: impl Into<String>) -> CfbError {
		CfbError::Format { stage, check, detail: detail.into() }
	}

	pub(crate) fn unsupported(stage: Stage, check: &'static str, detail: impl Into<String>) -> CfbError {
		CfbError::Unsupported { stage, check, detail: detail.into() }
	}

	/// The identifier of the violated check, e.g. `"chain-cycle"`.
	pub fn check(&self) -> Option<&'static str> {
		match self {
			CfbError::Format { check, .. } | CfbError::Unsupported { check, .. } => Some(check),
			_ => None,
		}
	}

	pub fn stage(&self) -> Option<Stage> {
		match self {
			CfbError::Format { stage, .. } | CfbError::Unsupported { stage, .. } => Some(*stage),
			_ => None,
		}
	}

	pub fn is_format_error(&self) -> bool {
		matches!(self, CfbError::Format { .. })
	}
}

pub type Result<T> = std::result::Result<T, CfbError>;
