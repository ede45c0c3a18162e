use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use log::info;

use genosurv::{
	build_case_matrix, create_table, load_case_observations, open_table, CaseLoadReport,
	DuplicatePolicy, CASE_INDEX_COLUMN,
};


#[derive(ValueEnum, Debug, Clone, Copy)]
enum Duplicates {
	Sum,
	LastWins,
	Error,
}

impl From<Duplicates> for DuplicatePolicy {
	fn from(other: Duplicates) -> Self {
		match other {
			Duplicates::Sum => Self::Sum,
			Duplicates::LastWins => Self::LastWins,
			Duplicates::Error => Self::Error,
		}
	}
}


/// Pivot long-form monthly case counts into a dense country × month matrix.
#[derive(Parser, Debug)]
#[command(name = "case_matrix")]
struct Args {
	/// long-form cases (`iso3`, `date`, `cases`)
	cases: PathBuf,

	/// dense matrix output
	#[arg(long, short, value_name = "FILE")]
	output: PathBuf,

	/// how to combine repeated (country, month) observations
	#[arg(long, value_enum, default_value = "sum")]
	duplicates: Duplicates,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	genosurv::init_logging();
	let args = Args::parse();

	let mut report = CaseLoadReport::default();
	let observations = load_case_observations(
		&mut *genosurv::default_output(),
		open_table(&args.cases)?,
		&mut report,
	)?;
	let matrix = build_case_matrix(&observations, args.duplicates.into(), &mut report)?;
	report.log();

	matrix.write(CASE_INDEX_COLUMN, &mut create_table(&args.output)?)?;
	info!("wrote {} × {} case matrix to {}", matrix.len(), matrix.months().len(), args.output.display());
	Ok(())
}
