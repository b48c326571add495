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

#[macro_use] // enable value_t! macro
extern crate clap;

use std::fs::File;
use std::io::{stdout, Write};
use clap::{Arg, App, AppSettings, SubCommand, ArgMatches};
use thiserror::Error;
use cfbread::cfbf::structures::describe_sector;
use cfbread::io::{read_input, StderrLogger};
use cfbread::{CfbError, CfbFile, OpenOptions};

#[derive(Debug, Error)]
enum ToolError {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
	#[error("{0}")]
	Cfb(#[from] CfbError),
	#[error("no entry at path '{0}'")]
	NoSuchPath(String),
}

fn input_arg<'a, 'b>() -> Arg<'a, 'b> {
	Arg::with_name("input")
		.value_name("FILE")
		.help("A file in Compound File Binary File Format (CFBF). If omitted, the file will be read from STDIN instead.")
		.short("i")
		.long("input")
		.required(false)
}

fn main() {
	let matches = App::new("cfbfdump")
		.version("1.0")
		.author("Steve Muller <steve.muller@outlook.com>")
		.about("This utility reads a Compound File Binary File Format (also known as OLE file, COM file, or Structured Storage file) and dumps its contents.")
		.setting(AppSettings::SubcommandRequired)
		.arg(Arg::with_name("verbose")
			.short("v")
			.help("Increases the debug verbosity. This will print a lot of debug messages to standard error (STDERR). Can be used up to 3 times.")
			.multiple(true)
			.global(true)
			.takes_value(false))
		.arg(Arg::with_name("strict")
			.long("strict")
			.help("Rejects files that deviate from the format specification in ways that do not prevent reading them.")
			.global(true)
			.takes_value(false))
		.subcommand(SubCommand::with_name("list")
			.about("Lists all objects contained in the CFBF file. Each output line represents an object, and contains the internal object ID and the object path, separated by a space. Folders end with a slash.")
			.arg(input_arg())
		)
		.subcommand(SubCommand::with_name("dump")
			.about("Dumps a stream from the CFBF file.")
			.arg(Arg::with_name("id")
				.value_name("STREAMID")
				.help("The ID of the stream that shall be dumped.")
				.long("id")
				.required_unless("path")
				.conflicts_with("path"))
			.arg(Arg::with_name("path")
				.value_name("PATH")
				.help("The path of the stream that shall be dumped, e.g. 'Storage/Stream'.")
				.long("path"))
			.arg(Arg::with_name("output")
				.value_name("FILE")
				.help("The file where the stream shall be written to. If this parameter is not specified (or has the value '-'), the stream will be written to STDOUT instead.")
				.short("o")
				.long("output")
				.required(false))
			.arg(input_arg())
		)
		.subcommand(SubCommand::with_name("info")
			.about("Prints the header fields and the sizes of the allocation tables.")
			.arg(input_arg())
		)
	.get_matches();

	let verbose = matches.occurrences_of("verbose");
	if let Err(e) = StderrLogger::init(verbose) {
		eprintln!("WARNING: cannot install logger: {}", e);
	}

	if let Err(e) = dispatch(&matches) {
		eprintln!("ERROR: {}", e);
		std::process::exit(1);
	}
}

fn dispatch(matches: &ArgMatches) -> Result<(), ToolError> {
	match matches.subcommand() {
		("list", Some(submatches)) => dispatch_list(submatches),
		("dump", Some(submatches)) => dispatch_dump(submatches),
		("info", Some(submatches)) => dispatch_info(submatches),
		_ => unreachable!("clap enforces a subcommand"),
	}
}

fn options(matches: &ArgMatches) -> OpenOptions {
	OpenOptions::new().strict(matches.is_present("strict"))
}

fn dispatch_list(matches: &ArgMatches) -> Result<(), ToolError> {
	let data = read_input(matches.value_of("input").unwrap_or(""))?;
	let file = CfbFile::open(&data, options(matches))?;
	let out = stdout();
	let mut out = out.lock();
	for (path, id) in file.walk()? {
		let entry = &file.directory()[id as usize];
		if entry.kind.is_storage() && id != 0 {
			writeln!(out, "{} {}/", id, path)?;
		}
		else {
			writeln!(out, "{} {}", id, path)?;
		}
	}
	Ok(())
}

fn dispatch_dump(matches: &ArgMatches) -> Result<(), ToolError> {
	let data = read_input(matches.value_of("input").unwrap_or(""))?;
	let file = CfbFile::open(&data, options(matches))?;

	let content = match matches.value_of("path") {
		Some(path) => file.read_stream_by_path(path)?.ok_or_else(|| ToolError::NoSuchPath(path.to_owned()))?,
		None => {
			let id = value_t!(matches, "id", u32).unwrap_or_else(|e| e.exit());
			file.read_stream_by_id(id)?
		},
	};

	let mut output: Box<dyn Write> = match matches.value_of("output").unwrap_or("") {
		"" | "-" => Box::new(stdout()),
		outputfile => Box::new(File::create(outputfile)?),
	};
	output.write_all(&content)?;
	output.flush()?;
	Ok(())
}

fn dispatch_info(matches: &ArgMatches) -> Result<(), ToolError> {
	let data = read_input(matches.value_of("input").unwrap_or(""))?;
	let file = CfbFile::open(&data, options(matches))?;
	let header = file.header();

	println!("version:                  {}.{}", header.major_version, header.minor_version);
	println!("sector size:              {}", header.sector_size);
	println!("mini sector size:         {}", header.mini_sector_size);
	println!("mini stream cutoff:       {}", header.mini_stream_cutoff_size);
	println!("directory sectors:        {}", header.number_of_directory_sectors);
	println!("first directory sector:   {}", describe_sector(header.first_directory_sector_location));
	println!("FAT sectors:              {}", header.number_of_fat_sectors);
	println!("first MiniFAT sector:     {}", describe_sector(header.first_mini_fat_sector_location));
	println!("MiniFAT sectors:          {}", header.number_of_mini_fat_sectors);
	println!("first DIFAT sector:       {}", describe_sector(header.first_difat_sector_location));
	println!("DIFAT sectors:            {}", header.number_of_difat_sectors);
	println!("sectors in file:          {}", file.sector_count());
	println!("DIFAT entries:            {}", file.difat().len());
	println!("FAT entries:              {}", file.fat().len());
	println!("MiniFAT entries:          {}", file.mini_fat().map_or(0, |mini_fat| mini_fat.len()));
	println!("mini stream bytes:        {}", file.mini_stream().map_or(0, |mini_stream| mini_stream.len()));
	println!("directory entries:        {}", file.directory().len());
	Ok(())
}
