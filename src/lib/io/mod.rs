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

use std::fs;
use std::io::{stdin, Read, Write};
use std::io::Error;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Reads a whole input file into memory. An empty path or `-` means STDIN.
pub fn read_input(path: &str) -> Result<Vec<u8>, Error> {
	match path {
		"" | "-" => {
			let mut data = Vec::new();
			stdin().read_to_end(&mut data)?;
			Ok(data)
		},
		_ => fs::read(path),
	}
}

/// Maps the number of `-v` flags to a log level.
pub fn level_for_verbosity(verbosity: u64) -> LevelFilter {
	match verbosity {
		0 => LevelFilter::Warn,
		1 => LevelFilter::Info,
		2 => LevelFilter::Debug,
		_ => LevelFilter::Trace,
	}
}

/// Writes log records to standard error (STDERR), one per line.
pub struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl StderrLogger {
	/// Installs the logger for the whole process. Can only be done once.
	pub fn init(verbosity: u64) -> Result<(), SetLoggerError> {
		log::set_logger(&LOGGER)?;
		log::set_max_level(level_for_verbosity(verbosity));
		Ok(())
	}
}

impl Log for StderrLogger {
	fn enabled(&self, metadata: &Metadata) -> bool {
		metadata.level() <= log::max_level()
	}

	fn log(&self, record: &Record) {
		if !self.enabled(record.metadata()) {
			return;
		}
		let label = match record.level() {
			Level::Error => "ERROR",
			Level::Warn => "WARNING",
			Level::Info => "INFO",
			Level::Debug => "DEBUG",
			Level::Trace => "TRACE",
		};
		// Nothing sensible to do if STDERR is gone
		let _ = writeln!(std::io::stderr(), "{}: {}", label, record.args());
	}

	fn flush(&self) {
		let _ = std::io::stderr().flush();
	}
}
