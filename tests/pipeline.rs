use std::fs;
use std::path::Path;

use chrono::NaiveDate;

use genosurv::{
	open_table, read_clean_metadata, run_pipeline, CountryTable, Error, Period, PipelineConfig,
	Quiet, Table, Value, METRICS_KEY_COLUMN,
};


static COUNTRIES: &str = "alpha_3,alpha_2,name\n\
	BRA,BR,Brazil\n\
	PER,PE,Peru\n\
	VNM,VN,Viet Nam\n";

static METADATA: &str = "Accession,Collection_Date,Release_Date,Country\n\
	A1,2019-05-10,2019-06-09,Brazil\n\
	A2,2021-01-01,2021-03-02,Brazil: Sao Paulo\n\
	A3,,,Brazil\n\
	A4,2021-02-01,,Atlantis\n\
	A5,2020-06-01,2020-05-01,Peru\n\
	A6,garbage,2020-01-01,Peru\n";

static CASES: &str = "iso3,date,cases\n\
	BRA,2019-05-01,1000\n\
	BRA,2021-01-15,500\n\
	BRA,2021-01-20,500\n\
	PER,2020-06-01,0\n";

static GDP: &str = "iso3,year,usd\n\
	BRA,2010,10\n\
	BRA,2012,20\n\
	PER,2009,5\n";

static RISK: &str = "Sovereignt,score\n\
	Brazil,0.5\n\
	Brazil,0.7\n\
	Peru,0.2\n";

static CONFIG: &str = r#"
on_duplicate_keys = "warn"

[inputs]
metadata = "raw/metadata.csv"
countries = "raw/countries.csv"
cases = "raw/cases_monthly.csv"

[outputs]
clean_metadata = "out/metadata_clean.tsv"
genome_matrix = "out/matrix_genomes_monthly.tsv"
case_matrix = "out/matrix_cases_monthly.tsv"
long_metrics = "out/country_period_metrics.tsv"
wide_metrics = "out/country_wide_metrics.tsv"
merged = "out/merged.csv"
merge_report = "out/merge_report.tsv"

[[sources]]
name = "gdp"
path = "raw/gdp.csv"
key = { by = "code", column = "iso3" }
shape = { kind = "yearly", year_column = "year", value_columns = ["usd"] }

[[sources]]
name = "risk"
path = "raw/risk.csv"
key = { by = "name", column = "Sovereignt" }
shape = { kind = "static" }
"#;


fn setup(dir: &Path, config: &str) -> PipelineConfig {
	fs::create_dir_all(dir.join("raw")).unwrap();
	fs::write(dir.join("raw/countries.csv"), COUNTRIES).unwrap();
	fs::write(dir.join("raw/metadata.csv"), METADATA).unwrap();
	fs::write(dir.join("raw/cases_monthly.csv"), CASES).unwrap();
	fs::write(dir.join("raw/gdp.csv"), GDP).unwrap();
	fs::write(dir.join("raw/risk.csv"), RISK).unwrap();
	fs::write(dir.join("pipeline.toml"), config).unwrap();
	PipelineConfig::from_path(dir.join("pipeline.toml")).unwrap()
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
	NaiveDate::from_ymd_opt(y, m, day).unwrap()
}


#[test]
fn end_to_end() {
	let tmp = tempfile::tempdir().unwrap();
	let config = setup(tmp.path(), CONFIG);
	let countries = CountryTable::from_path(&config.inputs.countries).unwrap();
	let output = run_pipeline(&config, &countries, &mut Quiet).unwrap();

	assert_eq!(output.sanitize.rows, 6);
	assert_eq!(output.sanitize.kept, 3);
	assert_eq!(output.sanitize.dropped_without_dates, 1);
	assert_eq!(output.sanitize.dropped_unmapped_country, 1);
	assert_eq!(output.sanitize.dropped_without_collection_date, 1);

	let clean = read_clean_metadata(open_table(&config.outputs.clean_metadata).unwrap()).unwrap();
	assert_eq!(clean, output.records);
	assert_eq!(clean[1].country_code.as_str(), "BRA");
	assert_eq!(clean[1].submission_date, Some(d(2021, 3, 2)));

	assert_eq!(output.cases.duplicates, 1);
	assert_eq!(output.case_matrix.len(), 2);
	assert_eq!(output.case_matrix.months().len(), 3);
	assert!(config.outputs.case_matrix.exists());
	assert!(config.outputs.genome_matrix.as_ref().unwrap().exists());

	let bra_pre = output.metrics.get("BRA", Period::Pre).unwrap();
	assert_eq!(bra_pre.genome_count, 1);
	assert_eq!(bra_pre.cases, Some(1000.));
	assert_eq!(bra_pre.genomes_per_1000, Some(1.));
	assert_eq!(bra_pre.median_turnaround_days, Some(30.));
	let bra_post = output.metrics.get("BRA", Period::Post).unwrap();
	assert_eq!(bra_post.cases, Some(1000.));
	assert_eq!(bra_post.median_turnaround_days, Some(60.));
	let per_post = output.metrics.get("PER", Period::Post).unwrap();
	assert_eq!(per_post.cases, Some(0.));
	assert_eq!(per_post.genomes_per_1000, None);
	assert_eq!(per_post.median_turnaround_days, None);
	assert!(output.metrics.get("PER", Period::Pre).is_none());
	assert_eq!(output.metrics.report().negative, 1);

	let merged = Table::read("merged", METRICS_KEY_COLUMN, open_table(&config.outputs.merged).unwrap()).unwrap();
	assert_eq!(merged.len(), 2);
	assert_eq!(merged.get("BRA", "overall_median_turnaround_days"), Some(&Value::Number(45.)));
	assert_eq!(merged.get("BRA", "gdp_usd"), Some(&Value::Number(15.)));
	assert_eq!(merged.get("BRA", "risk_score"), Some(&Value::Number(0.5)));
	assert_eq!(merged.get("PER", "pre_genome_count"), Some(&Value::Number(0.)));
	assert_eq!(merged.get("PER", "pre_cases"), Some(&Value::Missing));
	assert_eq!(merged.get("PER", "gdp_usd"), Some(&Value::Missing));
	assert_eq!(merged.get("PER", "risk_score"), Some(&Value::Number(0.2)));
	assert!(merged.get("VNM", "gdp_usd").is_none());

	let risk = &output.cardinalities[2];
	assert_eq!(risk.source, "risk");
	assert_eq!((risk.rows, risk.distinct), (3, 2));
	assert!(risk.duplicated);
	let report = fs::read_to_string(config.outputs.merge_report.as_ref().unwrap()).unwrap();
	assert!(report.starts_with("source\trows\tdistinct\tduplicated\tmatched\n"));
	assert!(report.contains("risk\t3\t2\ttrue\t2\n"));
}

#[test]
fn duplicate_keys_can_abort_the_merge() {
	let tmp = tempfile::tempdir().unwrap();
	let config = setup(tmp.path(), &CONFIG.replace("\"warn\"", "\"fail\""));
	let countries = CountryTable::from_path(&config.inputs.countries).unwrap();
	match run_pipeline(&config, &countries, &mut Quiet) {
		Err(Error::DuplicateKeys{table, rows, distinct}) => {
			assert_eq!(table, "risk");
			assert_eq!((rows, distinct), (3, 2));
		},
		other => panic!("unexpected result: {:?}", other.map(|o| o.merged.len())),
	}
	assert!(!config.outputs.merged.exists());
	assert!(config.outputs.wide_metrics.exists());
}

#[test]
fn missing_metadata_column_is_fatal() {
	let tmp = tempfile::tempdir().unwrap();
	let config = setup(tmp.path(), CONFIG);
	fs::write(&config.inputs.metadata, "Accession,Collection_Date,Country\nA1,2019-05-10,Brazil\n").unwrap();
	let countries = CountryTable::from_path(&config.inputs.countries).unwrap();
	match run_pipeline(&config, &countries, &mut Quiet) {
		Err(Error::MissingColumn{table, column}) => {
			assert_eq!(table, "metadata");
			assert_eq!(column, "Release_Date");
		},
		other => panic!("unexpected result: {:?}", other.map(|o| o.merged.len())),
	}
}
