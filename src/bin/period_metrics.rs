use std::path::PathBuf;

use chrono::NaiveDate;

use clap::Parser;

use log::info;

use genosurv::{
	case_observations, create_table, open_table, read_clean_metadata, CaseMatrix,
	PeriodAggregator, CASE_INDEX_COLUMN,
};


/// Genome counts, sequencing coverage and turnaround per country, before and
/// after the cutoff.
#[derive(Parser, Debug)]
#[command(name = "period_metrics")]
struct Args {
	/// clean metadata as written by sanitize_metadata
	metadata: PathBuf,

	/// dense case matrix as written by case_matrix
	cases: PathBuf,

	/// first day of the `post` period
	#[arg(long, env = "GENOSURV_CUTOFF", default_value = "2020-03-01")]
	cutoff: NaiveDate,

	/// long-form output, one row per country and period
	#[arg(long, value_name = "FILE")]
	long: PathBuf,

	/// wide output, one row per country
	#[arg(long, value_name = "FILE")]
	wide: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	genosurv::init_logging();
	let args = Args::parse();

	let records = read_clean_metadata(open_table(&args.metadata)?)?;
	info!("loaded {} genomes", records.len());
	let matrix = CaseMatrix::read("cases", CASE_INDEX_COLUMN, open_table(&args.cases)?)?;
	info!("loaded case matrix with {} countries", matrix.len());

	let metrics = PeriodAggregator::new(args.cutoff).aggregate(&records, &case_observations(&matrix));
	metrics.report().log();

	metrics.write_long(&mut create_table(&args.long)?)?;
	let wide = metrics.wide();
	wide.write(&mut create_table(&args.wide)?)?;
	info!("wrote {} strata and {} countries", metrics.long().len(), wide.len());
	Ok(())
}
