use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;

use log::info;

use serde::Deserialize;

use genosurv::{
	create_table, default_sources, open_table, validate_sources, write_cardinalities, CountryTable,
	CovariateSource, MergeEngine, OnDuplicateKeys, Table, YearWindow, METRICS_KEY_COLUMN,
};


#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SourceFile {
	sources: Vec<CovariateSource>,
}


/// Left-join country-level covariates onto the wide metrics table.
#[derive(Parser, Debug)]
#[command(name = "merge_covariates")]
struct Args {
	/// wide metrics as written by period_metrics
	metrics: PathBuf,

	/// TOML file with `[[sources]]` entries
	#[arg(long, value_name = "FILE", conflicts_with = "covariate_dir", required_unless_present = "covariate_dir")]
	sources: Option<PathBuf>,

	/// use the built-in covariate set from this directory
	#[arg(long, value_name = "DIR")]
	covariate_dir: Option<PathBuf>,

	/// country table, needed by sources keyed on country names
	#[arg(long, value_name = "FILE")]
	countries: Option<PathBuf>,

	#[arg(long, default_value_t = 2010)]
	first_year: i32,

	#[arg(long, default_value_t = 2025)]
	last_year: i32,

	/// abort instead of warning when a table repeats a country code
	#[arg(long)]
	fail_on_duplicate_keys: bool,

	/// per-source cardinality report
	#[arg(long, value_name = "FILE")]
	report: Option<PathBuf>,

	/// merged output
	#[arg(long, short, value_name = "FILE")]
	output: PathBuf,
}

fn load_sources(path: &Path) -> Result<Vec<CovariateSource>, Box<dyn std::error::Error>> {
	let file: SourceFile = toml::from_str(&fs::read_to_string(path)?)?;
	validate_sources(&file.sources)?;
	let base = path.parent().unwrap_or_else(|| Path::new(""));
	Ok(file.sources.into_iter().map(|mut s| {
		if s.path.is_relative() {
			s.path = base.join(&s.path);
		}
		s
	}).collect())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	genosurv::init_logging();
	let args = Args::parse();

	let window = YearWindow::new(args.first_year, args.last_year)?;
	let sources = match (&args.sources, &args.covariate_dir) {
		(Some(path), _) => load_sources(path)?,
		(None, Some(dir)) => default_sources(dir),
		(None, None) => Vec::new(),
	};
	let countries = match &args.countries {
		Some(path) => CountryTable::from_path(path)?,
		None => CountryTable::new(),
	};

	let primary = Table::read("metrics", METRICS_KEY_COLUMN, open_table(&args.metrics)?)?;
	let mut tables = Vec::with_capacity(sources.len());
	for source in sources.iter() {
		let (table, report) = source.load(&countries, window)?;
		report.log();
		tables.push(table);
	}

	let policy = if args.fail_on_duplicate_keys {
		OnDuplicateKeys::Fail
	} else {
		OnDuplicateKeys::Warn
	};
	let (merged, cardinalities) = MergeEngine::new(policy).merge(&primary, &tables)?;
	if let Some(path) = &args.report {
		write_cardinalities(&cardinalities, &mut create_table(path)?)?;
	}
	merged.write(&mut create_table(&args.output)?)?;
	info!("wrote {} rows × {} columns to {}", merged.len(), merged.columns().len() + 1, args.output.display());
	Ok(())
}
