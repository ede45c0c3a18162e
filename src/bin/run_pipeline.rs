use std::path::PathBuf;

use chrono::NaiveDate;

use clap::Parser;

use log::info;

use genosurv::{run_pipeline, CountryTable, PipelineConfig};


/// Run every stage from raw metadata to the merged covariate dataset.
#[derive(Parser, Debug)]
#[command(name = "run_pipeline")]
struct Args {
	/// pipeline configuration (TOML)
	config: PathBuf,

	/// overrides the configured cutoff
	#[arg(long, env = "GENOSURV_CUTOFF")]
	cutoff: Option<NaiveDate>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	genosurv::init_logging();
	let args = Args::parse();

	let mut config = PipelineConfig::from_path(&args.config)?;
	if let Some(cutoff) = args.cutoff {
		config.cutoff = cutoff;
	}
	let countries = CountryTable::from_path(&config.inputs.countries)?;
	info!("loaded {} countries", countries.len());

	let output = run_pipeline(&config, &countries, &mut *genosurv::default_output())?;
	let suspect: Vec<&str> = output.cardinalities.iter()
		.filter(|c| c.duplicated)
		.map(|c| c.source.as_str())
		.collect();
	if !suspect.is_empty() {
		info!("merged output has duplicate-key sources: {}", suspect.join(", "));
	}
	Ok(())
}
