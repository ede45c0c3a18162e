use log::info;

use super::cases::{build_case_matrix, case_observations, load_case_observations, CaseLoadReport, CaseMatrix, CASE_INDEX_COLUMN};
use super::config::PipelineConfig;
use super::country::CountryLookup;
use super::covariate::CovariateReport;
use super::error::Result;
use super::ioutil::{create_table, open_table};
use super::merge::{write_cardinalities, Cardinality, MergeEngine};
use super::metrics::{PeriodAggregator, PeriodMetrics};
use super::progress::ProgressSink;
use super::sanitize::{genome_matrix, sanitize_metadata, write_clean_metadata, GenomicRecord, SanitizeReport, GENOME_INDEX_COLUMN};
use super::table::Table;


#[derive(Debug, Clone)]
pub struct PipelineOutput {
	pub records: Vec<GenomicRecord>,
	pub sanitize: SanitizeReport,
	pub case_matrix: CaseMatrix,
	pub cases: CaseLoadReport,
	pub metrics: PeriodMetrics,
	pub covariates: Vec<CovariateReport>,
	pub cardinalities: Vec<Cardinality>,
	pub merged: Table,
}


/// Runs every stage in order and writes each intermediate table to the
/// path configured for it. Nothing is written for a stage that fails, but
/// files of earlier stages stay in place.
pub fn run_pipeline<L: CountryLookup + ?Sized, S: ProgressSink + ?Sized>(
	config: &PipelineConfig,
	lookup: &L,
	progress: &mut S,
) -> Result<PipelineOutput> {
	info!("sanitizing {}", config.inputs.metadata.display());
	let mut sanitize = SanitizeReport::default();
	let records = sanitize_metadata(&mut *progress, open_table(&config.inputs.metadata)?, lookup, &mut sanitize)?;
	sanitize.log();
	write_clean_metadata(&records, &mut create_table(&config.outputs.clean_metadata)?)?;
	if let Some(path) = &config.outputs.genome_matrix {
		genome_matrix(&records).write(GENOME_INDEX_COLUMN, &mut create_table(path)?)?;
	}

	info!("loading cases from {}", config.inputs.cases.display());
	let mut cases = CaseLoadReport::default();
	let observations = load_case_observations(&mut *progress, open_table(&config.inputs.cases)?, &mut cases)?;
	let case_matrix = build_case_matrix(&observations, config.case_duplicates, &mut cases)?;
	cases.log();
	case_matrix.write(CASE_INDEX_COLUMN, &mut create_table(&config.outputs.case_matrix)?)?;

	info!("aggregating with cutoff {}", config.cutoff);
	let metrics = PeriodAggregator::new(config.cutoff).aggregate(&records, &case_observations(&case_matrix));
	metrics.report().log();
	metrics.write_long(&mut create_table(&config.outputs.long_metrics)?)?;
	let wide = metrics.wide();
	wide.write(&mut create_table(&config.outputs.wide_metrics)?)?;

	let mut tables = Vec::new();
	let mut covariates = Vec::new();
	for source in config.covariate_sources().iter() {
		info!("loading covariate {} from {}", source.name, source.path.display());
		let (table, report) = source.load(lookup, config.window)?;
		report.log();
		tables.push(table);
		covariates.push(report);
	}
	let (merged, cardinalities) = MergeEngine::new(config.on_duplicate_keys).merge(&wide, &tables)?;
	if let Some(path) = &config.outputs.merge_report {
		write_cardinalities(&cardinalities, &mut create_table(path)?)?;
	}
	merged.write(&mut create_table(&config.outputs.merged)?)?;
	info!("wrote {} merged rows to {}", merged.len(), config.outputs.merged.display());

	Ok(PipelineOutput{
		records,
		sanitize,
		case_matrix,
		cases,
		metrics,
		covariates,
		cardinalities,
		merged,
	})
}
