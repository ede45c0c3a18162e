use std::fs;
use std::io;
use std::io::Read;
use std::path::Path;

use flate2;

use super::error::{Error, Result};


pub fn magic_open<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn Read>> {
	let path = path.as_ref();
	match path.extension() {
		Some(x) if x == "gz" => {
			Ok(Box::new(flate2::read::GzDecoder::new(fs::File::open(path)?)))
		},
		_ => Ok(Box::new(fs::File::open(path)?)),
	}
}

/// Tab for `.tsv`/`.tab` (also below a `.gz`), comma for everything else.
pub fn delimiter_for<P: AsRef<Path>>(path: P) -> u8 {
	let path = path.as_ref();
	let ext = match path.extension() {
		Some(x) if x.eq_ignore_ascii_case("gz") => path.file_stem().and_then(|stem| Path::new(stem).extension()),
		other => other,
	};
	match ext.and_then(|x| x.to_str()) {
		Some(x) if x.eq_ignore_ascii_case("tsv") || x.eq_ignore_ascii_case("tab") => b'\t',
		_ => b',',
	}
}

pub fn table_reader<R: Read>(delimiter: u8, r: R) -> csv::Reader<R> {
	csv::ReaderBuilder::new()
		.delimiter(delimiter)
		.trim(csv::Trim::Headers)
		.from_reader(r)
}

pub fn open_table<P: AsRef<Path>>(path: P) -> io::Result<csv::Reader<Box<dyn Read>>> {
	let path = path.as_ref();
	Ok(table_reader(delimiter_for(path), magic_open(path)?))
}

pub fn table_writer<W: io::Write>(delimiter: u8, w: W) -> csv::Writer<W> {
	csv::WriterBuilder::new()
		.delimiter(delimiter)
		.from_writer(w)
}

pub fn create_table<P: AsRef<Path>>(path: P) -> io::Result<csv::Writer<fs::File>> {
	let path = path.as_ref();
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			fs::create_dir_all(parent)?;
		}
	}
	Ok(table_writer(delimiter_for(path), fs::File::create(path)?))
}

pub fn require_columns(table: &str, headers: &csv::StringRecord, columns: &[&str]) -> Result<Vec<usize>> {
	columns.iter().map(|column| {
		headers.iter().position(|h| h == *column).ok_or_else(|| Error::MissingColumn{
			table: table.into(),
			column: (*column).into(),
		})
	}).collect()
}
