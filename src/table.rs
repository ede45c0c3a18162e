use std::collections::HashSet;
use std::fmt;
use std::io;

use super::country::CountryCode;
use super::error::Result;
use super::ioutil::require_columns;


#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Missing,
	Number(f64),
	Text(String),
}

impl Value {
	/// Blank → `Missing`, numeric → `Number`, everything else verbatim.
	pub fn parse(s: &str) -> Self {
		let s = s.trim();
		if s.is_empty() {
			return Self::Missing
		}
		match s.parse::<f64>() {
			Ok(v) if v.is_finite() => Self::Number(v),
			Ok(_) => Self::Missing,
			Err(_) => Self::Text(s.into()),
		}
	}

	pub fn as_number(&self) -> Option<f64> {
		match self {
			Self::Number(v) => Some(*v),
			_ => None,
		}
	}

	pub fn is_missing(&self) -> bool {
		matches!(self, Self::Missing)
	}
}

impl Default for Value {
	fn default() -> Self {
		Self::Missing
	}
}

impl From<Option<f64>> for Value {
	fn from(other: Option<f64>) -> Self {
		match other {
			Some(v) => Self::Number(v),
			None => Self::Missing,
		}
	}
}

impl From<f64> for Value {
	fn from(other: f64) -> Self {
		Self::Number(other)
	}
}

impl fmt::Display for Value {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Missing => Ok(()),
			Self::Number(v) => fmt::Display::fmt(v, f),
			Self::Text(s) => f.write_str(s),
		}
	}
}


#[derive(Debug, Clone, PartialEq)]
pub struct Row {
	pub key: CountryCode,
	pub values: Vec<Value>,
}


/// Country-keyed table with a fixed set of named value columns. Keys are
/// not required to be unique; see [`Table::distinct_keys`].
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
	name: String,
	key_column: String,
	columns: Vec<String>,
	rows: Vec<Row>,
}

impl Table {
	pub fn new<N: Into<String>, K: Into<String>>(name: N, key_column: K, columns: Vec<String>) -> Self {
		Self{
			name: name.into(),
			key_column: key_column.into(),
			columns,
			rows: Vec::new(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn key_column(&self) -> &str {
		&self.key_column
	}

	pub fn columns(&self) -> &[String] {
		&self.columns[..]
	}

	pub fn rows(&self) -> &[Row] {
		&self.rows[..]
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	pub fn push(&mut self, key: CountryCode, values: Vec<Value>) {
		assert_eq!(values.len(), self.columns.len());
		self.rows.push(Row{key, values});
	}

	pub fn column_index(&self, column: &str) -> Option<usize> {
		self.columns.iter().position(|c| c == column)
	}

	pub fn get(&self, key: &str, column: &str) -> Option<&Value> {
		let i = self.column_index(column)?;
		let row = self.rows.iter().find(|r| r.key.as_str() == key)?;
		Some(&row.values[i])
	}

	pub fn distinct_keys(&self) -> usize {
		self.rows.iter().map(|r| &r.key).collect::<HashSet<_>>().len()
	}

	pub fn prefixed(mut self, prefix: &str) -> Self {
		for c in self.columns.iter_mut() {
			*c = format!("{}_{}", prefix, c);
		}
		self
	}

	/// Reads a delimited table whose key lives in `key_column`; every other
	/// column becomes a value column. Rows with a blank key are skipped.
	pub fn read<R: io::Read>(name: &str, key_column: &str, mut r: csv::Reader<R>) -> Result<Self> {
		let headers = r.headers()?.clone();
		let key_index = require_columns(name, &headers, &[key_column])?[0];
		let value_indices: Vec<usize> = (0..headers.len()).filter(|i| *i != key_index).collect();
		let mut result = Self::new(
			name,
			key_column,
			value_indices.iter().map(|i| headers[*i].to_string()).collect(),
		);
		for row in r.records() {
			let row = row?;
			let key = row.get(key_index).unwrap_or("").trim();
			if key.is_empty() {
				continue
			}
			let values = value_indices.iter().map(|i| Value::parse(row.get(*i).unwrap_or(""))).collect();
			result.push(key.into(), values);
		}
		Ok(result)
	}

	pub fn write<W: io::Write>(&self, w: &mut csv::Writer<W>) -> Result<()> {
		let mut header = Vec::with_capacity(self.columns.len() + 1);
		header.push(self.key_column.as_str());
		header.extend(self.columns.iter().map(|c| c.as_str()));
		w.write_record(&header)?;
		let mut buf = Vec::with_capacity(header.len());
		for row in self.rows.iter() {
			buf.clear();
			buf.push(row.key.to_string());
			buf.extend(row.values.iter().map(|v| v.to_string()));
			w.write_record(&buf)?;
		}
		w.flush()?;
		Ok(())
	}
}
