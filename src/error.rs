use std::io;

use thiserror::Error;

use super::country::CountryCode;
use super::month::YearMonth;


#[derive(Debug, Error)]
pub enum Error {
	#[error("I/O error: {0}")]
	Io(#[from] io::Error),
	#[error("malformed delimited file: {0}")]
	Csv(#[from] csv::Error),
	#[error("malformed configuration: {0}")]
	Toml(#[from] toml::de::Error),
	#[error("invalid configuration: {0}")]
	Config(String),
	#[error("{table}: required column {column:?} is missing")]
	MissingColumn{table: String, column: String},
	#[error("{table}: invalid value {value:?} in column {column:?}")]
	InvalidValue{table: String, column: String, value: String},
	#[error("{table}: {rows} rows but only {distinct} distinct country codes")]
	DuplicateKeys{table: String, rows: usize, distinct: usize},
	#[error("case source has more than one observation for {country} in {month}")]
	DuplicateObservation{country: CountryCode, month: YearMonth},
	#[error("{table}: column {column:?} already exists in the merged table")]
	ColumnCollision{table: String, column: String},
}

pub type Result<T> = std::result::Result<T, Error>;
