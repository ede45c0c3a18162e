use std::path::PathBuf;

use clap::Parser;

use log::info;

use genosurv::{
	create_table, genome_matrix, open_table, sanitize_metadata, write_clean_metadata,
	CountryTable, SanitizeReport, GENOME_INDEX_COLUMN,
};


/// Clean a raw sequence metadata export down to dated, country-coded genomes.
#[derive(Parser, Debug)]
#[command(name = "sanitize_metadata")]
struct Args {
	/// raw metadata (`Accession`, `Collection_Date`, `Release_Date`, `Country`)
	metadata: PathBuf,

	/// country table with `alpha_3` and `name` columns
	#[arg(long, value_name = "FILE")]
	countries: PathBuf,

	/// clean metadata output
	#[arg(long, short, value_name = "FILE")]
	output: PathBuf,

	/// also write the country × month genome count matrix
	#[arg(long, value_name = "FILE")]
	genome_matrix: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	genosurv::init_logging();
	let args = Args::parse();

	let countries = CountryTable::from_path(&args.countries)?;
	info!("loaded {} countries", countries.len());

	let mut report = SanitizeReport::default();
	let records = sanitize_metadata(
		&mut *genosurv::default_output(),
		open_table(&args.metadata)?,
		&countries,
		&mut report,
	)?;
	report.log();

	write_clean_metadata(&records, &mut create_table(&args.output)?)?;
	info!("wrote {} records to {}", records.len(), args.output.display());
	if let Some(path) = args.genome_matrix {
		let matrix = genome_matrix(&records);
		matrix.write(GENOME_INDEX_COLUMN, &mut create_table(&path)?)?;
		info!("wrote {} × {} genome matrix to {}", matrix.len(), matrix.months().len(), path.display());
	}
	Ok(())
}
