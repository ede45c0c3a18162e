use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use serde::{Deserialize, Serialize};

use super::cases::DuplicatePolicy;
use super::covariate::{default_sources, validate_sources, CovariateSource, YearWindow};
use super::error::Result;
use super::merge::OnDuplicateKeys;


pub fn default_cutoff() -> NaiveDate {
	// WHO pandemic declaration month
	NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputPaths {
	/// raw GenBank-style metadata export
	pub metadata: PathBuf,
	/// name → ISO3 table for the country lookup
	pub countries: PathBuf,
	/// long-form `iso3, date, cases`
	pub cases: PathBuf,
	/// directory holding the default covariate files
	#[serde(default)]
	pub covariate_dir: Option<PathBuf>,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputPaths {
	pub clean_metadata: PathBuf,
	#[serde(default)]
	pub genome_matrix: Option<PathBuf>,
	pub case_matrix: PathBuf,
	pub long_metrics: PathBuf,
	pub wide_metrics: PathBuf,
	pub merged: PathBuf,
	#[serde(default)]
	pub merge_report: Option<PathBuf>,
}


/// Everything a pipeline run depends on. Relative paths are resolved
/// against the directory of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
	pub inputs: InputPaths,
	pub outputs: OutputPaths,
	#[serde(default = "default_cutoff")]
	pub cutoff: NaiveDate,
	#[serde(default)]
	pub window: YearWindow,
	#[serde(default)]
	pub case_duplicates: DuplicatePolicy,
	#[serde(default)]
	pub on_duplicate_keys: OnDuplicateKeys,
	#[serde(default)]
	pub sources: Vec<CovariateSource>,
}

impl PipelineConfig {
	pub fn from_toml_str(s: &str) -> Result<Self> {
		let config: Self = toml::from_str(s)?;
		config.validate()?;
		Ok(config)
	}

	pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let mut config = Self::from_toml_str(&fs::read_to_string(path)?)?;
		if let Some(base) = path.parent() {
			config.rebase(base);
		}
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		YearWindow::new(self.window.first, self.window.last)?;
		validate_sources(&self.sources)
	}

	pub fn rebase(&mut self, base: &Path) {
		let fix = |p: &mut PathBuf| {
			if p.is_relative() {
				*p = base.join(&*p);
			}
		};
		fix(&mut self.inputs.metadata);
		fix(&mut self.inputs.countries);
		fix(&mut self.inputs.cases);
		if let Some(p) = self.inputs.covariate_dir.as_mut() {
			fix(p);
		}
		fix(&mut self.outputs.clean_metadata);
		if let Some(p) = self.outputs.genome_matrix.as_mut() {
			fix(p);
		}
		fix(&mut self.outputs.case_matrix);
		fix(&mut self.outputs.long_metrics);
		fix(&mut self.outputs.wide_metrics);
		fix(&mut self.outputs.merged);
		if let Some(p) = self.outputs.merge_report.as_mut() {
			fix(p);
		}
		for source in self.sources.iter_mut() {
			fix(&mut source.path);
		}
	}

	/// Configured sources, or the default set when none are configured but
	/// a covariate directory is.
	pub fn covariate_sources(&self) -> Vec<CovariateSource> {
		if !self.sources.is_empty() {
			return self.sources.clone()
		}
		match &self.inputs.covariate_dir {
			Some(dir) => default_sources(dir),
			None => Vec::new(),
		}
	}
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::covariate::{Aggregation, KeySpec, SourceShape};
	use crate::error::Error;

	static MINIMAL: &str = r#"
[inputs]
metadata = "data/dengue_genbank.csv"
countries = "data/countries.csv"
cases = "data/cases_monthly.csv"

[outputs]
clean_metadata = "data/dengue_metadata_clean.tsv"
case_matrix = "data/matrix_cases_monthly.tsv"
long_metrics = "results/country_period_metrics.tsv"
wide_metrics = "results/country_turnaround_wide_metrics.tsv"
merged = "results/merged_dengue_dataset.csv"
"#;

	#[test]
	fn defaults_apply() {
		let c = PipelineConfig::from_toml_str(MINIMAL).unwrap();
		assert_eq!(c.cutoff, NaiveDate::from_ymd_opt(2020, 3, 1).unwrap());
		assert_eq!(c.window, YearWindow{first: 2010, last: 2025});
		assert_eq!(c.case_duplicates, DuplicatePolicy::Sum);
		assert_eq!(c.on_duplicate_keys, OnDuplicateKeys::Warn);
		assert!(c.covariate_sources().is_empty());
	}

	#[test]
	fn parses_sources() {
		let s = format!("{}{}{}", r#"
cutoff = "2020-01-01"
on_duplicate_keys = "fail"
"#, MINIMAL, r#"
[window]
first = 2012
last = 2019

[[sources]]
name = "gdp"
path = "data/GDP.CSV"
key = { by = "code", column = "iso3" }
aggregate = "latest"
shape = { kind = "yearly", year_column = "year", value_columns = ["gdp_usd_mean"] }

[[sources]]
name = "risk"
prefix = "r"
path = "data/risk.csv"
key = { by = "name", column = "Sovereignt" }
shape = { kind = "static" }
"#);
		let c = PipelineConfig::from_toml_str(&s).unwrap();
		assert_eq!(c.cutoff, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
		assert_eq!(c.window, YearWindow{first: 2012, last: 2019});
		assert_eq!(c.on_duplicate_keys, OnDuplicateKeys::Fail);
		let sources = c.covariate_sources();
		assert_eq!(sources.len(), 2);
		assert_eq!(sources[0].aggregate, Aggregation::Latest);
		assert_eq!(sources[0].prefix(), "gdp");
		assert_eq!(sources[1].prefix(), "r");
		assert_eq!(sources[1].key, KeySpec::Name("Sovereignt".into()));
		assert_eq!(sources[1].shape, SourceShape::Static{columns: vec![]});
	}

	#[test]
	fn rejects_bad_configs() {
		let s = format!("{}\n[window]\nfirst = 2020\nlast = 2010\n", MINIMAL);
		assert!(matches!(PipelineConfig::from_toml_str(&s), Err(Error::Config(_))));
		let s = format!("{}\nsurprise = 1\n", MINIMAL);
		assert!(matches!(PipelineConfig::from_toml_str(&s), Err(Error::Toml(_))));
	}

	#[test]
	fn default_sources_from_covariate_dir() {
		let s = MINIMAL.replace("cases = \"data/cases_monthly.csv\"", "cases = \"data/cases_monthly.csv\"\ncovariate_dir = \"covariates\"");
		let mut c = PipelineConfig::from_toml_str(&s).unwrap();
		c.rebase(Path::new("/project"));
		assert_eq!(c.inputs.metadata, Path::new("/project/data/dengue_genbank.csv"));
		let sources = c.covariate_sources();
		assert_eq!(sources.len(), 7);
		assert_eq!(sources[0].path, Path::new("/project/covariates/income_classification_worldbank.tsv"));
	}

	#[test]
	fn rejects_source_configured_twice() {
		let source = "\n[[sources]]\nname = \"gdp\"\npath = \"gdp.csv\"\nkey = { by = \"code\", column = \"iso3\" }\nshape = { kind = \"static\" }\n";
		let s = format!("{}{}{}", MINIMAL, source, source);
		assert!(matches!(PipelineConfig::from_toml_str(&s), Err(Error::Config(_))));
	}
}
