use std::collections::BTreeMap;
use std::io;

use chrono::NaiveDate;

use log::{debug, info};

use serde::{Deserialize, Serialize};

use super::country::{CountryCode, CountryLookup};
use super::dates::parse_date;
use super::error::Result;
use super::ioutil::require_columns;
use super::matrix::DenseMatrix;
use super::month::YearMonth;
use super::progress::{CountMeter, ProgressSink};

pub type GenomeMatrix = DenseMatrix<u64>;

pub static GENOME_INDEX_COLUMN: &str = "country_code";
static RAW_METADATA_COLUMNS: [&str; 4] = ["Accession", "Collection_Date", "Release_Date", "Country"];
static CLEAN_METADATA_COLUMNS: [&str; 4] = ["strain", "collection_date", "submission_date", "country_code"];


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomicRecord {
	pub strain: String,
	pub collection_date: NaiveDate,
	pub submission_date: Option<NaiveDate>,
	pub country_code: CountryCode,
}

impl GenomicRecord {
	/// Days from collection to submission; negative when the submission
	/// predates the collection.
	pub fn turnaround_days(&self) -> Option<i64> {
		Some((self.submission_date? - self.collection_date).num_days())
	}
}


#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMetadataRow {
	#[serde(rename = "Accession", default)]
	pub strain: String,
	#[serde(rename = "Collection_Date")]
	pub collection_date: Option<String>,
	#[serde(rename = "Release_Date")]
	pub submission_date: Option<String>,
	#[serde(rename = "Country")]
	pub country: Option<String>,
}


#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizeReport {
	pub rows: usize,
	/// non-blank collection dates that failed to parse
	pub invalid_collection_dates: usize,
	/// non-blank submission dates that failed to parse
	pub invalid_submission_dates: usize,
	pub dropped_without_dates: usize,
	pub dropped_without_collection_date: usize,
	pub dropped_unmapped_country: usize,
	pub kept: usize,
	pub unmapped: BTreeMap<String, usize>,
}

impl SanitizeReport {
	pub fn dropped(&self) -> usize {
		self.dropped_without_dates + self.dropped_without_collection_date + self.dropped_unmapped_country
	}

	pub fn log(&self) {
		info!(
			"metadata: {} rows read, {} kept; dropped {} without any date, {} without collection date, {} with unmapped country",
			self.rows, self.kept, self.dropped_without_dates, self.dropped_without_collection_date, self.dropped_unmapped_country,
		);
		if self.invalid_collection_dates > 0 || self.invalid_submission_dates > 0 {
			info!(
				"metadata: {} collection and {} submission dates did not parse",
				self.invalid_collection_dates, self.invalid_submission_dates,
			);
		}
		let mut unmapped: Vec<_> = self.unmapped.iter().collect();
		unmapped.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
		for (name, n) in unmapped.into_iter().take(10) {
			debug!("unmapped country {:?}: {} rows", name, n);
		}
	}
}


fn parse_field(raw: Option<&str>, invalid: &mut usize) -> Option<NaiveDate> {
	let raw = raw?.trim();
	if raw.is_empty() {
		return None
	}
	let parsed = parse_date(raw);
	if parsed.is_none() {
		*invalid += 1;
	}
	parsed
}

/// GenBank qualifies countries with a region after a colon
/// (`Brazil: Sao Paulo`); fall back to the part before it.
fn resolve_country<L: CountryLookup + ?Sized>(lookup: &L, name: &str) -> Option<CountryCode> {
	let name = name.trim();
	if name.is_empty() {
		return None
	}
	lookup.lookup(name).or_else(|| {
		let (head, _) = name.split_once(':')?;
		lookup.lookup(head)
	})
}


/// Applies the validity gates to a single row, in order:
///
/// 1. both date fields are parsed independently, failures become null;
/// 2. a row with neither date is dropped;
/// 3. the country is mapped to ISO3 through `lookup`;
/// 4. a row without collection date or without country code is dropped.
pub fn sanitize_row<L: CountryLookup + ?Sized>(
	raw: RawMetadataRow,
	lookup: &L,
	report: &mut SanitizeReport,
) -> Option<GenomicRecord> {
	report.rows += 1;
	let collection_date = parse_field(raw.collection_date.as_deref(), &mut report.invalid_collection_dates);
	let submission_date = parse_field(raw.submission_date.as_deref(), &mut report.invalid_submission_dates);
	if collection_date.is_none() && submission_date.is_none() {
		report.dropped_without_dates += 1;
		return None
	}

	let country_name = raw.country.as_deref().unwrap_or("");
	let country_code = resolve_country(lookup, country_name);

	let collection_date = match collection_date {
		Some(d) => d,
		None => {
			report.dropped_without_collection_date += 1;
			return None
		},
	};
	let country_code = match country_code {
		Some(k) => k,
		None => {
			report.dropped_unmapped_country += 1;
			*report.unmapped.entry(country_name.trim().to_string()).or_insert(0) += 1;
			return None
		},
	};

	report.kept += 1;
	Some(GenomicRecord{
		strain: raw.strain,
		collection_date,
		submission_date,
		country_code,
	})
}


pub fn sanitize_metadata<R: io::Read, L: CountryLookup + ?Sized, S: ProgressSink + ?Sized>(
	progress: &mut S,
	mut r: csv::Reader<R>,
	lookup: &L,
	report: &mut SanitizeReport,
) -> Result<Vec<GenomicRecord>> {
	require_columns("metadata", r.headers()?, &RAW_METADATA_COLUMNS)?;
	let mut result = Vec::new();
	let mut pm = CountMeter::new(progress);
	for (i, row) in r.deserialize().enumerate() {
		let raw: RawMetadataRow = row?;
		if let Some(rec) = sanitize_row(raw, lookup, report) {
			result.push(rec);
		}
		pm.update(i + 1);
	}
	pm.finish(report.rows);
	Ok(result)
}


/// `strain, collection_date, submission_date, country_code` with ISO dates.
pub fn write_clean_metadata<W: io::Write>(records: &[GenomicRecord], w: &mut csv::Writer<W>) -> Result<()> {
	// serialize only emits the header along with the first record
	if records.is_empty() {
		w.write_record(&CLEAN_METADATA_COLUMNS)?;
	}
	for rec in records.iter() {
		w.serialize(rec)?;
	}
	w.flush()?;
	Ok(())
}

pub fn read_clean_metadata<R: io::Read>(mut r: csv::Reader<R>) -> Result<Vec<GenomicRecord>> {
	require_columns("clean metadata", r.headers()?, &CLEAN_METADATA_COLUMNS)?;
	let mut result = Vec::new();
	for row in r.deserialize() {
		result.push(row?);
	}
	Ok(result)
}


pub fn genome_matrix(records: &[GenomicRecord]) -> GenomeMatrix {
	let mut counts: BTreeMap<(CountryCode, YearMonth), u64> = BTreeMap::new();
	for rec in records.iter() {
		*counts.entry((rec.country_code.clone(), YearMonth::of(rec.collection_date))).or_insert(0) += 1;
	}
	GenomeMatrix::from_cells(counts.into_iter().map(|((k, m), v)| (k, m, v)))
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::Error;
	use crate::progress::Quiet;

	fn lookup(name: &str) -> Option<CountryCode> {
		match name {
			"Brazil" => Some("BRA".into()),
			"Viet Nam" => Some("VNM".into()),
			_ => None,
		}
	}

	fn d(y: i32, m: u32, day: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(y, m, day).unwrap()
	}

	fn raw(strain: &str, collection: &str, submission: &str, country: &str) -> RawMetadataRow {
		let opt = |s: &str| if s.is_empty() { None } else { Some(s.to_string()) };
		RawMetadataRow{
			strain: strain.into(),
			collection_date: opt(collection),
			submission_date: opt(submission),
			country: opt(country),
		}
	}

	#[test]
	fn keeps_rows_without_submission_date() {
		let mut report = SanitizeReport::default();
		let rec = sanitize_row(raw("A1", "2019-03-04", "", "Brazil"), &lookup, &mut report).unwrap();
		assert_eq!(rec.collection_date, d(2019, 3, 4));
		assert_eq!(rec.submission_date, None);
		assert_eq!(rec.country_code.as_str(), "BRA");
		assert_eq!(rec.turnaround_days(), None);
		assert_eq!(report.kept, 1);
	}

	#[test]
	fn gates_apply_in_order() {
		let mut report = SanitizeReport::default();
		// no date at all, even though the country is fine
		assert!(sanitize_row(raw("A1", "unknown", "", "Brazil"), &lookup, &mut report).is_none());
		// only a submission date survives the first gate but not the second
		assert!(sanitize_row(raw("A2", "", "2020-01-01", "Brazil"), &lookup, &mut report).is_none());
		// unmappable country
		assert!(sanitize_row(raw("A3", "2020-01-01", "2020-02-01", "Atlantis"), &lookup, &mut report).is_none());
		assert!(sanitize_row(raw("A4", "2020-01-01", "garbage", "Viet Nam"), &lookup, &mut report).is_some());
		assert_eq!(report.rows, 4);
		assert_eq!(report.dropped_without_dates, 1);
		assert_eq!(report.dropped_without_collection_date, 1);
		assert_eq!(report.dropped_unmapped_country, 1);
		assert_eq!(report.invalid_collection_dates, 1);
		assert_eq!(report.invalid_submission_dates, 1);
		assert_eq!(report.kept, 1);
		assert_eq!(report.dropped() + report.kept, report.rows);
		assert_eq!(report.unmapped.get("Atlantis"), Some(&1));
	}

	#[test]
	fn falls_back_to_country_before_colon() {
		let mut report = SanitizeReport::default();
		let rec = sanitize_row(raw("A1", "2019-03", "", "Brazil: Sao Paulo"), &lookup, &mut report).unwrap();
		assert_eq!(rec.country_code.as_str(), "BRA");
		assert_eq!(rec.collection_date, d(2019, 3, 1));
	}

	#[test]
	fn negative_turnaround_is_reported_as_is() {
		let mut report = SanitizeReport::default();
		let rec = sanitize_row(raw("A1", "2019-02-01", "2019-01-01", "Brazil"), &lookup, &mut report).unwrap();
		assert_eq!(rec.turnaround_days(), Some(-31));
	}

	#[test]
	fn reads_raw_export_and_writes_clean_tsv() {
		let data = "Accession,Collection_Date,Release_Date,Country,Host\n\
			OK1,2019-01-01,2019-03-01,Brazil,Homo sapiens\n\
			OK2,,,Brazil,Homo sapiens\n\
			OK3,2021-05-05,,Viet Nam,Homo sapiens\n";
		let mut report = SanitizeReport::default();
		let records = sanitize_metadata(&mut Quiet, csv::Reader::from_reader(data.as_bytes()), &lookup, &mut report).unwrap();
		assert_eq!(records.len(), 2);
		assert_eq!(report.dropped_without_dates, 1);

		let mut w = csv::WriterBuilder::new().delimiter(b'\t').from_writer(Vec::new());
		write_clean_metadata(&records, &mut w).unwrap();
		let out = String::from_utf8(w.into_inner().unwrap()).unwrap();
		assert_eq!(out, "strain\tcollection_date\tsubmission_date\tcountry_code\n\
			OK1\t2019-01-01\t2019-03-01\tBRA\n\
			OK3\t2021-05-05\t\tVNM\n");

		let back = read_clean_metadata(csv::ReaderBuilder::new().delimiter(b'\t').from_reader(out.as_bytes())).unwrap();
		assert_eq!(back, records);
	}

	#[test]
	fn missing_country_column_is_fatal() {
		let data = "Accession,Collection_Date,Release_Date\nOK1,2019-01-01,2019-03-01\n";
		let mut report = SanitizeReport::default();
		match sanitize_metadata(&mut Quiet, csv::Reader::from_reader(data.as_bytes()), &lookup, &mut report) {
			Err(Error::MissingColumn{table, column}) => {
				assert_eq!(table, "metadata");
				assert_eq!(column, "Country");
			},
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn counts_genomes_per_month() {
		let records = vec![
			GenomicRecord{strain: "a".into(), collection_date: d(2019, 1, 3), submission_date: None, country_code: "BRA".into()},
			GenomicRecord{strain: "b".into(), collection_date: d(2019, 1, 20), submission_date: None, country_code: "BRA".into()},
			GenomicRecord{strain: "c".into(), collection_date: d(2019, 3, 1), submission_date: None, country_code: "VNM".into()},
		];
		let m = genome_matrix(&records);
		assert_eq!(m.months().len(), 2);
		assert_eq!(m.row("BRA").unwrap(), &[2, 0]);
		assert_eq!(m.row("VNM").unwrap(), &[0, 1]);
	}

	#[test]
	fn empty_clean_metadata_keeps_its_header() {
		let mut w = csv::WriterBuilder::new().delimiter(b'\t').from_writer(Vec::new());
		write_clean_metadata(&[], &mut w).unwrap();
		let data = String::from_utf8(w.into_inner().unwrap()).unwrap();
		assert_eq!(data, "strain\tcollection_date\tsubmission_date\tcountry_code\n");
		let r = csv::ReaderBuilder::new().delimiter(b'\t').from_reader(data.as_bytes());
		assert!(read_clean_metadata(r).unwrap().is_empty());
	}
}
