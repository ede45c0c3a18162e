use std::collections::BTreeMap;
use std::io;

use chrono::NaiveDate;

use enum_map::EnumMap;

use log::{info, warn};

use serde::Serialize;

use super::cases::CaseObservation;
use super::country::CountryCode;
use super::error::Result;
use super::period::{classify, classify_month, Period};
use super::sanitize::GenomicRecord;
use super::table::{Table, Value};

pub static METRICS_KEY_COLUMN: &str = "country_code";
static LONG_COLUMNS: [&str; 6] = ["country_code", "period", "genome_count", "cases", "genomes_per_1000", "median_turnaround_days"];
static WIDE_METRICS: [&str; 4] = ["genome_count", "cases", "genomes_per_1000", "median_turnaround_days"];


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryPeriodMetric {
	pub country_code: CountryCode,
	pub period: Period,
	pub genome_count: u64,
	/// `None` when the case source has no month in this stratum.
	pub cases: Option<f64>,
	pub genomes_per_1000: Option<f64>,
	pub median_turnaround_days: Option<f64>,
}


#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnaroundReport {
	pub records: usize,
	pub without_submission_date: usize,
	/// submission before collection, excluded from every median
	pub negative: usize,
	pub valid: usize,
}

impl TurnaroundReport {
	pub fn log(&self) {
		info!(
			"turnaround: {} records, {} usable, {} without submission date, {} negative",
			self.records, self.valid, self.without_submission_date, self.negative,
		);
		if self.negative > 0 {
			warn!("{} records were submitted before they were collected; excluded from turnaround medians", self.negative);
		}
	}
}


/// Genomes per thousand cases. Undefined without cases, including zero.
pub fn genomes_per_1000(genome_count: u64, cases: Option<f64>) -> Option<f64> {
	match cases {
		Some(cases) if cases > 0. => Some(genome_count as f64 * 1000. / cases),
		_ => None,
	}
}

pub fn median(values: &mut [i64]) -> Option<f64> {
	if values.is_empty() {
		return None
	}
	values.sort_unstable();
	let mid = values.len() / 2;
	if values.len() % 2 == 0 {
		Some((values[mid - 1] as f64 + values[mid] as f64) / 2.)
	} else {
		Some(values[mid] as f64)
	}
}


#[derive(Debug, Clone, Default)]
struct Stratum {
	genome_count: u64,
	turnarounds: Vec<i64>,
}


pub struct PeriodAggregator {
	cutoff: NaiveDate,
}

impl PeriodAggregator {
	pub fn new(cutoff: NaiveDate) -> Self {
		Self{cutoff}
	}

	pub fn cutoff(&self) -> NaiveDate {
		self.cutoff
	}

	/// Stratifies records and case observations with the same cutoff and
	/// joins them on `(country, period)`. Only strata with at least one
	/// genome are emitted.
	pub fn aggregate(&self, records: &[GenomicRecord], cases: &[CaseObservation]) -> PeriodMetrics {
		let mut report = TurnaroundReport::default();
		let mut strata: BTreeMap<CountryCode, EnumMap<Period, Stratum>> = BTreeMap::new();
		for rec in records.iter() {
			report.records += 1;
			let period = classify(rec.collection_date, self.cutoff);
			let stratum = &mut strata.entry(rec.country_code.clone()).or_default()[period];
			stratum.genome_count += 1;
			match rec.turnaround_days() {
				None => report.without_submission_date += 1,
				Some(days) if days < 0 => report.negative += 1,
				Some(days) => {
					report.valid += 1;
					stratum.turnarounds.push(days);
				},
			}
		}

		let mut case_sums: BTreeMap<CountryCode, EnumMap<Period, Option<f64>>> = BTreeMap::new();
		for obs in cases.iter() {
			let period = classify_month(obs.period_date, self.cutoff);
			let slot = &mut case_sums.entry(obs.country_code.clone()).or_default()[period];
			*slot = Some(slot.unwrap_or(0.) + obs.cases);
		}

		let mut long = Vec::new();
		let mut overall = BTreeMap::new();
		for (country, by_period) in strata.iter_mut() {
			let mut all = Vec::new();
			for period in Period::ALL.iter().copied() {
				let stratum = &mut by_period[period];
				if stratum.genome_count == 0 {
					continue
				}
				all.extend_from_slice(&stratum.turnarounds);
				let cases = case_sums.get(country).and_then(|sums| sums[period]);
				long.push(CountryPeriodMetric{
					country_code: country.clone(),
					period,
					genome_count: stratum.genome_count,
					cases,
					genomes_per_1000: genomes_per_1000(stratum.genome_count, cases),
					median_turnaround_days: median(&mut stratum.turnarounds),
				});
			}
			overall.insert(country.clone(), median(&mut all));
		}

		PeriodMetrics{long, overall, report}
	}
}


#[derive(Debug, Clone)]
pub struct PeriodMetrics {
	long: Vec<CountryPeriodMetric>,
	overall: BTreeMap<CountryCode, Option<f64>>,
	report: TurnaroundReport,
}

impl PeriodMetrics {
	pub fn long(&self) -> &[CountryPeriodMetric] {
		&self.long[..]
	}

	pub fn get(&self, country: &str, period: Period) -> Option<&CountryPeriodMetric> {
		self.long.iter().find(|m| m.country_code.as_str() == country && m.period == period)
	}

	pub fn overall_median_turnaround_days(&self, country: &str) -> Option<f64> {
		*self.overall.get(country)?
	}

	pub fn report(&self) -> &TurnaroundReport {
		&self.report
	}

	pub fn wide_columns() -> Vec<String> {
		let mut columns = Vec::with_capacity(WIDE_METRICS.len() * Period::ALL.len() + 1);
		for metric in WIDE_METRICS.iter() {
			for period in Period::ALL.iter() {
				columns.push(format!("{}_{}", period, metric));
			}
		}
		columns.push("overall_median_turnaround_days".into());
		columns
	}

	/// One row per country. A period without genomes has a genome count of
	/// zero and null everywhere else.
	pub fn wide(&self) -> Table {
		let mut table = Table::new("metrics", METRICS_KEY_COLUMN, Self::wide_columns());
		let mut by_country: BTreeMap<&CountryCode, EnumMap<Period, Option<&CountryPeriodMetric>>> = BTreeMap::new();
		for m in self.long.iter() {
			by_country.entry(&m.country_code).or_default()[m.period] = Some(m);
		}
		for (country, by_period) in by_country.into_iter() {
			let mut values = Vec::with_capacity(table.columns().len());
			for metric in WIDE_METRICS.iter() {
				for period in Period::ALL.iter().copied() {
					let m = by_period[period];
					values.push(match (*metric, m) {
						("genome_count", m) => Value::Number(m.map(|m| m.genome_count).unwrap_or(0) as f64),
						(_, None) => Value::Missing,
						("cases", Some(m)) => m.cases.into(),
						("genomes_per_1000", Some(m)) => m.genomes_per_1000.into(),
						(_, Some(m)) => m.median_turnaround_days.into(),
					});
				}
			}
			values.push(self.overall.get(country).copied().flatten().into());
			table.push(country.clone(), values);
		}
		table
	}

	pub fn write_long<W: io::Write>(&self, w: &mut csv::Writer<W>) -> Result<()> {
		if self.long.is_empty() {
			w.write_record(&LONG_COLUMNS)?;
		}
		for m in self.long.iter() {
			w.serialize(m)?;
		}
		w.flush()?;
		Ok(())
	}
}
