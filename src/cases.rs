use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::io;

use log::{info, warn};

use serde::{Deserialize, Serialize};

use super::country::CountryCode;
use super::dates::parse_date;
use super::error::{Error, Result};
use super::ioutil::require_columns;
use super::matrix::DenseMatrix;
use super::month::YearMonth;
use super::progress::{CountMeter, ProgressSink};

pub type CaseMatrix = DenseMatrix<f64>;

pub static CASE_INDEX_COLUMN: &str = "iso3";
static CASE_COLUMNS: [&str; 3] = ["iso3", "date", "cases"];


#[derive(Debug, Clone, PartialEq)]
pub struct CaseObservation {
	pub country_code: CountryCode,
	pub period_date: YearMonth,
	pub cases: f64,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
	#[default]
	Sum,
	LastWins,
	Error,
}


#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseLoadReport {
	pub rows: usize,
	pub missing_country: usize,
	pub invalid_date: usize,
	pub invalid_cases: usize,
	pub negative_cases: usize,
	pub duplicates: usize,
}

impl CaseLoadReport {
	pub fn dropped(&self) -> usize {
		self.missing_country + self.invalid_date + self.invalid_cases + self.negative_cases
	}

	pub fn log(&self) {
		info!(
			"cases: {} rows read, {} dropped (no country: {}, bad date: {}, bad count: {}, negative: {}), {} duplicate observations combined",
			self.rows, self.dropped(), self.missing_country, self.invalid_date, self.invalid_cases, self.negative_cases, self.duplicates,
		);
		if self.duplicates > 0 {
			warn!("case source contains {} repeated (country, month) observations", self.duplicates);
		}
	}
}


#[derive(Debug, Clone, Deserialize)]
struct RawCaseRow {
	iso3: Option<String>,
	date: Option<String>,
	cases: Option<String>,
}


fn parse_count(s: &str) -> Option<f64> {
	let v = s.trim().replace(',', "").parse::<f64>().ok()?;
	if v.is_finite() {
		Some(v)
	} else {
		None
	}
}


/// Reads long-form `(iso3, date, cases)` rows. Dates are truncated to their
/// month. Rows that cannot be used are counted in `report` and skipped.
pub fn load_case_observations<R: io::Read, S: ProgressSink + ?Sized>(
	progress: &mut S,
	mut r: csv::Reader<R>,
	report: &mut CaseLoadReport,
) -> Result<Vec<CaseObservation>> {
	require_columns("cases", r.headers()?, &CASE_COLUMNS)?;
	let mut result = Vec::new();
	let mut pm = CountMeter::new(progress);
	for row in r.deserialize() {
		let rec: RawCaseRow = row?;
		report.rows += 1;
		pm.update(report.rows);

		let country_code: CountryCode = match rec.iso3.as_deref().map(str::trim) {
			Some(k) if !k.is_empty() => k.to_uppercase().into(),
			_ => {
				report.missing_country += 1;
				continue
			},
		};
		let period_date = match rec.date.as_deref().and_then(parse_date) {
			Some(d) => YearMonth::of(d),
			None => {
				report.invalid_date += 1;
				continue
			},
		};
		let cases = match rec.cases.as_deref().and_then(parse_count) {
			Some(v) if v < 0. => {
				report.negative_cases += 1;
				continue
			},
			Some(v) => v,
			None => {
				report.invalid_cases += 1;
				continue
			},
		};
		result.push(CaseObservation{country_code, period_date, cases});
	}
	pm.finish(report.rows);
	Ok(result)
}


/// Collapses observations to one value per `(country, month)` under
/// `policy` and densifies them into a zero-filled matrix.
pub fn build_case_matrix(
	observations: &[CaseObservation],
	policy: DuplicatePolicy,
	report: &mut CaseLoadReport,
) -> Result<CaseMatrix> {
	let mut collapsed: BTreeMap<(CountryCode, YearMonth), f64> = BTreeMap::new();
	for obs in observations.iter() {
		match collapsed.entry((obs.country_code.clone(), obs.period_date)) {
			Entry::Vacant(e) => {
				e.insert(obs.cases);
			},
			Entry::Occupied(mut e) => {
				report.duplicates += 1;
				match policy {
					DuplicatePolicy::Sum => *e.get_mut() += obs.cases,
					DuplicatePolicy::LastWins => *e.get_mut() = obs.cases,
					DuplicatePolicy::Error => return Err(Error::DuplicateObservation{
						country: obs.country_code.clone(),
						month: obs.period_date,
					}),
				}
			},
		}
	}
	Ok(CaseMatrix::from_cells(collapsed.into_iter().map(|((k, m), v)| (k, m, v))))
}


pub fn case_observations(matrix: &CaseMatrix) -> Vec<CaseObservation> {
	matrix.cells().map(|(k, m, v)| CaseObservation{
		country_code: k.clone(),
		period_date: m,
		cases: v,
	}).collect()
}
