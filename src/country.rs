use std::collections::HashMap;
use std::io;
use std::path::Path;

use smartstring::alias::{String as SmartString};

use super::error::Result;
use super::ioutil::{open_table, require_columns};

/// ISO 3166-1 alpha-3 code, e.g. `BRA`.
pub type CountryCode = SmartString;


pub trait CountryLookup {
	fn lookup(&self, name: &str) -> Option<CountryCode>;
}

impl<F: Fn(&str) -> Option<CountryCode>> CountryLookup for F {
	fn lookup(&self, name: &str) -> Option<CountryCode> {
		self(name)
	}
}


fn normalize(name: &str) -> String {
	name.trim().to_lowercase()
}


/// In-memory name → alpha-3 table. Codes and every known name resolve
/// case-insensitively; on conflicting names the first entry wins.
#[derive(Debug, Clone, Default)]
pub struct CountryTable {
	by_name: HashMap<String, CountryCode>,
	codes: usize,
}

impl CountryTable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, alpha_3: &str, names: &[&str]) {
		let code: CountryCode = alpha_3.trim().to_uppercase().into();
		if code.is_empty() {
			return
		}
		self.codes += 1;
		self.by_name.entry(normalize(&code)).or_insert_with(|| code.clone());
		for name in names {
			let key = normalize(name);
			if key.is_empty() {
				continue
			}
			self.by_name.entry(key).or_insert_with(|| code.clone());
		}
	}

	/// Expects `alpha_3` and `name`; `alpha_2`, `official_name` and
	/// `common_name` are used when present.
	pub fn load<R: io::Read>(mut r: csv::Reader<R>) -> Result<Self> {
		let headers = r.headers()?.clone();
		let required = require_columns("countries", &headers, &["alpha_3", "name"])?;
		let optional: Vec<usize> = ["alpha_2", "official_name", "common_name"].iter()
			.filter_map(|c| headers.iter().position(|h| h == *c))
			.collect();
		let mut table = Self::new();
		for row in r.records() {
			let row = row?;
			let code = row.get(required[0]).unwrap_or("");
			let mut names = Vec::with_capacity(1 + optional.len());
			names.push(row.get(required[1]).unwrap_or(""));
			for i in optional.iter() {
				names.push(row.get(*i).unwrap_or(""));
			}
			table.insert(code, &names);
		}
		Ok(table)
	}

	pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
		Self::load(open_table(path)?)
	}

	pub fn len(&self) -> usize {
		self.codes
	}

	pub fn is_empty(&self) -> bool {
		self.codes == 0
	}
}

impl CountryLookup for CountryTable {
	fn lookup(&self, name: &str) -> Option<CountryCode> {
		self.by_name.get(&normalize(name)).cloned()
	}
}
