use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use serde::{Deserialize, Serialize};

use super::country::{CountryCode, CountryLookup};
use super::error::{Error, Result};
use super::ioutil::{open_table, require_columns};
use super::table::{Table, Value};

pub static COVARIATE_KEY_COLUMN: &str = "country_code";


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearWindow {
	pub first: i32,
	pub last: i32,
}

impl YearWindow {
	pub fn new(first: i32, last: i32) -> Result<Self> {
		if first > last {
			return Err(Error::Config(format!("year window {}..={} is empty", first, last)))
		}
		Ok(Self{first, last})
	}

	pub fn contains(&self, year: i32) -> bool {
		self.first <= year && year <= self.last
	}
}

impl Default for YearWindow {
	fn default() -> Self {
		Self{first: 2010, last: 2025}
	}
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "column", rename_all = "snake_case")]
pub enum KeySpec {
	/// already ISO3
	Code(String),
	/// free-text name, resolved through the country lookup
	Name(String),
}

impl KeySpec {
	pub fn column(&self) -> &str {
		match self {
			Self::Code(c) | Self::Name(c) => c,
		}
	}
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceShape {
	/// Already one row per country, no time axis. An empty column list
	/// takes every non-key column.
	Static {
		#[serde(default)]
		columns: Vec<String>,
	},
	/// One row per country and year.
	Yearly {
		year_column: String,
		value_columns: Vec<String>,
	},
	/// One row per country, year and indicator; each indicator becomes a
	/// column of its own.
	Indicator {
		year_column: String,
		indicator_column: String,
		value_column: String,
	},
	/// One row per country with a column per four-digit year.
	YearColumns {
		value_name: String,
	},
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
	#[default]
	Mean,
	Median,
	/// value of the most recent year in the window
	Latest,
}

impl Aggregation {
	fn apply(&self, samples: &mut [(i32, f64)]) -> Option<f64> {
		if samples.is_empty() {
			return None
		}
		match self {
			Self::Mean => Some(samples.iter().map(|(_, v)| *v).sum::<f64>() / samples.len() as f64),
			Self::Median => {
				samples.sort_by(|a, b| a.1.total_cmp(&b.1));
				let mid = samples.len() / 2;
				if samples.len() % 2 == 0 {
					Some((samples[mid - 1].1 + samples[mid].1) / 2.)
				} else {
					Some(samples[mid].1)
				}
			},
			Self::Latest => samples.iter().max_by_key(|(year, _)| *year).map(|(_, v)| *v),
		}
	}
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CovariateSource {
	pub name: String,
	pub path: PathBuf,
	/// defaults to `name`
	#[serde(default)]
	pub prefix: Option<String>,
	pub key: KeySpec,
	pub shape: SourceShape,
	/// renames applied to value columns before prefixing
	#[serde(default)]
	pub rename: BTreeMap<String, String>,
	/// overrides the pipeline-wide window
	#[serde(default)]
	pub window: Option<YearWindow>,
	#[serde(default)]
	pub aggregate: Aggregation,
}


#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CovariateReport {
	pub source: String,
	pub rows: usize,
	pub unresolved_keys: usize,
	pub outside_window: usize,
	pub invalid_numbers: usize,
	pub countries: usize,
}

impl CovariateReport {
	pub fn log(&self) {
		info!(
			"{}: {} rows, {} countries, {} outside window, {} unparsable numbers",
			self.source, self.rows, self.countries, self.outside_window, self.invalid_numbers,
		);
		if self.unresolved_keys > 0 {
			warn!("{}: {} rows with a country that could not be resolved", self.source, self.unresolved_keys);
		}
	}
}


/// Numbers in covariate exports may carry thousands separators.
fn parse_number(raw: &str, invalid: &mut usize) -> Option<f64> {
	let raw = raw.trim();
	if raw.is_empty() || raw == ".." {
		return None
	}
	match raw.replace(',', "").parse::<f64>() {
		Ok(v) if v.is_finite() => Some(v),
		_ => {
			*invalid += 1;
			None
		},
	}
}

fn parse_year(raw: &str) -> Option<i32> {
	let raw = raw.trim();
	if let Ok(y) = raw.parse::<i32>() {
		return Some(y)
	}
	let v = raw.parse::<f64>().ok()?;
	if v.fract() == 0. && v.abs() < 1e6 {
		Some(v as i32)
	} else {
		None
	}
}

fn is_year_column(name: &str) -> Option<i32> {
	if name.len() == 4 && name.bytes().all(|b| b.is_ascii_digit()) {
		name.parse().ok()
	} else {
		None
	}
}


type Samples = BTreeMap<CountryCode, BTreeMap<String, Vec<(i32, f64)>>>;


impl CovariateSource {
	pub fn prefix(&self) -> &str {
		self.prefix.as_deref().unwrap_or(&self.name)
	}

	pub fn load<L: CountryLookup + ?Sized>(&self, lookup: &L, window: YearWindow) -> Result<(Table, CovariateReport)> {
		self.reduce(open_table(&self.path)?, lookup, window)
	}

	/// Reduces the source to a country-keyed table with prefixed columns.
	/// Time-indexed shapes are filtered to the window and aggregated per
	/// country, which makes their keys unique; static shapes pass through
	/// unchanged and may still repeat a key.
	pub fn reduce<R: io::Read, L: CountryLookup + ?Sized>(
		&self,
		mut r: csv::Reader<R>,
		lookup: &L,
		window: YearWindow,
	) -> Result<(Table, CovariateReport)> {
		let window = self.window.unwrap_or(window);
		let headers = r.headers()?.clone();
		let key_index = require_columns(&self.name, &headers, &[self.key.column()])?[0];
		let mut report = CovariateReport{
			source: self.name.clone(),
			..CovariateReport::default()
		};

		let table = match &self.shape {
			SourceShape::Static{columns} => {
				let indices: Vec<usize> = if columns.is_empty() {
					(0..headers.len()).filter(|i| *i != key_index).collect()
				} else {
					let names: Vec<&str> = columns.iter().map(|c| c.as_str()).collect();
					require_columns(&self.name, &headers, &names)?
				};
				let mut table = Table::new(
					self.name.clone(),
					COVARIATE_KEY_COLUMN,
					indices.iter().map(|i| self.renamed(&headers[*i])).collect(),
				);
				for row in r.records() {
					let row = row?;
					report.rows += 1;
					let key = match self.resolve(lookup, row.get(key_index).unwrap_or("")) {
						Some(k) => k,
						None => {
							report.unresolved_keys += 1;
							continue
						},
					};
					table.push(key, indices.iter().map(|i| Value::parse(row.get(*i).unwrap_or(""))).collect());
				}
				table
			},
			SourceShape::Yearly{year_column, value_columns} => {
				let year_index = require_columns(&self.name, &headers, &[year_column.as_str()])?[0];
				let names: Vec<&str> = value_columns.iter().map(|c| c.as_str()).collect();
				let value_indices = require_columns(&self.name, &headers, &names)?;
				let mut samples = Samples::new();
				for row in r.records() {
					let row = row?;
					report.rows += 1;
					let key = match self.resolve(lookup, row.get(key_index).unwrap_or("")) {
						Some(k) => k,
						None => {
							report.unresolved_keys += 1;
							continue
						},
					};
					let year = match parse_year(row.get(year_index).unwrap_or("")) {
						Some(y) if window.contains(y) => y,
						_ => {
							report.outside_window += 1;
							continue
						},
					};
					let by_column = samples.entry(key).or_default();
					for (name, i) in value_columns.iter().zip(value_indices.iter()) {
						let column = by_column.entry(name.clone()).or_default();
						if let Some(v) = parse_number(row.get(*i).unwrap_or(""), &mut report.invalid_numbers) {
							column.push((year, v));
						}
					}
				}
				self.collapse(value_columns.clone(), samples)
			},
			SourceShape::Indicator{year_column, indicator_column, value_column} => {
				let indices = require_columns(&self.name, &headers, &[
					year_column.as_str(),
					indicator_column.as_str(),
					value_column.as_str(),
				])?;
				let mut samples = Samples::new();
				let mut indicators = BTreeSet::new();
				for row in r.records() {
					let row = row?;
					report.rows += 1;
					let key = match self.resolve(lookup, row.get(key_index).unwrap_or("")) {
						Some(k) => k,
						None => {
							report.unresolved_keys += 1;
							continue
						},
					};
					let year = match parse_year(row.get(indices[0]).unwrap_or("")) {
						Some(y) if window.contains(y) => y,
						_ => {
							report.outside_window += 1;
							continue
						},
					};
					let indicator = row.get(indices[1]).unwrap_or("").trim();
					if indicator.is_empty() {
						continue
					}
					indicators.insert(indicator.to_string());
					let column = samples.entry(key).or_default().entry(indicator.to_string()).or_default();
					if let Some(v) = parse_number(row.get(indices[2]).unwrap_or(""), &mut report.invalid_numbers) {
						column.push((year, v));
					}
				}
				self.collapse(indicators.into_iter().collect(), samples)
			},
			SourceShape::YearColumns{value_name} => {
				let years: Vec<(usize, i32)> = headers.iter().enumerate()
					.filter_map(|(i, h)| Some((i, is_year_column(h)?)))
					.collect();
				let mut samples = Samples::new();
				for row in r.records() {
					let row = row?;
					report.rows += 1;
					let key = match self.resolve(lookup, row.get(key_index).unwrap_or("")) {
						Some(k) => k,
						None => {
							report.unresolved_keys += 1;
							continue
						},
					};
					let column = samples.entry(key).or_default().entry(value_name.clone()).or_default();
					for (i, year) in years.iter() {
						if !window.contains(*year) {
							continue
						}
						if let Some(v) = parse_number(row.get(*i).unwrap_or(""), &mut report.invalid_numbers) {
							column.push((*year, v));
						}
					}
				}
				self.collapse(vec![value_name.clone()], samples)
			},
		};

		report.countries = table.distinct_keys();
		Ok((table.prefixed(self.prefix()), report))
	}

	fn resolve<L: CountryLookup + ?Sized>(&self, lookup: &L, raw: &str) -> Option<CountryCode> {
		let raw = raw.trim();
		if raw.is_empty() {
			return None
		}
		match &self.key {
			KeySpec::Code(_) => Some(raw.to_uppercase().into()),
			KeySpec::Name(_) => lookup.lookup(raw),
		}
	}

	fn renamed(&self, column: &str) -> String {
		self.rename.get(column).cloned().unwrap_or_else(|| column.to_string())
	}

	fn collapse(&self, columns: Vec<String>, mut samples: Samples) -> Table {
		let mut table = Table::new(
			self.name.clone(),
			COVARIATE_KEY_COLUMN,
			columns.iter().map(|c| self.renamed(c)).collect(),
		);
		for (key, by_column) in samples.iter_mut() {
			let values: Vec<Value> = columns.iter().map(|c| {
				Value::from(by_column.get_mut(c).and_then(|s| self.aggregate.apply(&mut s[..])))
			}).collect();
			table.push(key.clone(), values);
		}
		table
	}
}


/// Rejects empty windows, empty prefixes and sources configured twice.
pub fn validate_sources(sources: &[CovariateSource]) -> Result<()> {
	for source in sources.iter() {
		if let Some(w) = source.window {
			YearWindow::new(w.first, w.last)?;
		}
		if source.prefix().is_empty() {
			return Err(Error::Config(format!("source {:?} has an empty prefix", source.name)))
		}
	}
	let mut names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
	names.sort_unstable();
	if let Some(w) = names.windows(2).find(|w| w[0] == w[1]) {
		return Err(Error::Config(format!("source {:?} is configured twice", w[0])))
	}
	Ok(())
}


fn code(column: &str) -> KeySpec {
	KeySpec::Code(column.into())
}

fn source(dir: &Path, name: &str, file: &str, key: KeySpec, shape: SourceShape) -> CovariateSource {
	CovariateSource{
		name: name.into(),
		path: dir.join(file),
		prefix: None,
		key,
		shape,
		rename: BTreeMap::new(),
		window: None,
		aggregate: Aggregation::Mean,
	}
}

pub fn default_sources(dir: &Path) -> Vec<CovariateSource> {
	let strings = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
	vec![
		source(dir, "income", "income_classification_worldbank.tsv", code("code"), SourceShape::Static{columns: vec![]}),
		source(dir, "risk", "risk.csv", KeySpec::Name("Sovereignt".into()), SourceShape::Static{columns: vec![]}),
		source(dir, "rd", "R_D_expenditure.csv", code("geoUnit"), SourceShape::Yearly{
			year_column: "year".into(),
			value_columns: strings(&["value"]),
		}),
		source(dir, "gov", "government_effect.csv", code("code"), SourceShape::Indicator{
			year_column: "year".into(),
			indicator_column: "indicator".into(),
			value_column: "estimate".into(),
		}),
		source(dir, "physicians", "physicians.csv", code("Country Code"), SourceShape::YearColumns{
			value_name: "physicians_per_1000".into(),
		}),
		source(dir, "treatment", "treatment_seeking.csv", code("ISO3"), SourceShape::Yearly{
			year_column: "year".into(),
			value_columns: strings(&["Publicfrac_pred", "Publicfrac_pred_low", "Publicfrac_pred_high"]),
		}),
		source(dir, "gdp", "GDP.CSV", code("iso3"), SourceShape::Yearly{
			year_column: "year".into(),
			value_columns: strings(&["gdp_usd_mean", "gdp_ppp_mean"]),
		}),
	]
}
