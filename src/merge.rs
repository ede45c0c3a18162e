use std::collections::{HashMap, HashSet};
use std::io;

use log::{info, warn};

use serde::{Deserialize, Serialize};

use super::country::CountryCode;
use super::error::{Error, Result};
use super::table::{Table, Value};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDuplicateKeys {
	/// report, then join only the first row per key
	#[default]
	Warn,
	/// abort the merge
	Fail,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cardinality {
	pub source: String,
	pub rows: usize,
	pub distinct: usize,
	pub duplicated: bool,
	/// primary rows that found a match; always zero for the primary table
	pub matched: usize,
}

impl Cardinality {
	pub fn of(table: &Table) -> Self {
		let rows = table.len();
		let distinct = table.distinct_keys();
		Self{
			source: table.name().into(),
			rows,
			distinct,
			duplicated: rows != distinct,
			matched: 0,
		}
	}
}


pub fn write_cardinalities<W: io::Write>(cardinalities: &[Cardinality], w: &mut csv::Writer<W>) -> Result<()> {
	for c in cardinalities.iter() {
		w.serialize(c)?;
	}
	w.flush()?;
	Ok(())
}


/// Left-joins country-keyed covariate tables onto a primary table.
///
/// Every table passes a cardinality check before it is joined: a key that
/// occurs more than once would otherwise multiply the matching primary
/// rows. The output always has exactly the rows of the primary table, in
/// their original order.
pub struct MergeEngine {
	on_duplicate: OnDuplicateKeys,
}

impl MergeEngine {
	pub fn new(on_duplicate: OnDuplicateKeys) -> Self {
		Self{on_duplicate}
	}

	fn gate(&self, c: &Cardinality) -> Result<()> {
		if !c.duplicated {
			return Ok(())
		}
		match self.on_duplicate {
			OnDuplicateKeys::Warn => {
				warn!(
					"{}: {} rows but only {} distinct country codes; only the first row per country is joined, treat its columns as suspect",
					c.source, c.rows, c.distinct,
				);
				Ok(())
			},
			OnDuplicateKeys::Fail => Err(Error::DuplicateKeys{
				table: c.source.clone(),
				rows: c.rows,
				distinct: c.distinct,
			}),
		}
	}

	/// Returns the merged table together with the cardinality of the primary
	/// table followed by that of every source, in order.
	pub fn merge(&self, primary: &Table, sources: &[Table]) -> Result<(Table, Vec<Cardinality>)> {
		let mut cardinalities = Vec::with_capacity(sources.len() + 1);
		let primary_card = Cardinality::of(primary);
		self.gate(&primary_card)?;
		cardinalities.push(primary_card);

		let mut columns: Vec<String> = primary.columns().to_vec();
		let mut seen: HashSet<String> = columns.iter().cloned().collect();
		seen.insert(primary.key_column().to_string());
		for source in sources.iter() {
			for column in source.columns().iter() {
				if !seen.insert(column.clone()) {
					return Err(Error::ColumnCollision{
						table: source.name().into(),
						column: column.clone(),
					})
				}
				columns.push(column.clone());
			}
		}

		let mut indices: Vec<HashMap<&CountryCode, usize>> = Vec::with_capacity(sources.len());
		for source in sources.iter() {
			let mut card = Cardinality::of(source);
			self.gate(&card)?;
			let mut index = HashMap::with_capacity(card.distinct);
			for (i, row) in source.rows().iter().enumerate() {
				index.entry(&row.key).or_insert(i);
			}
			card.matched = primary.rows().iter().filter(|r| index.contains_key(&r.key)).count();
			info!(
				"{}: {} rows, {} distinct countries, {} of {} primary rows matched",
				card.source, card.rows, card.distinct, card.matched, primary.len(),
			);
			cardinalities.push(card);
			indices.push(index);
		}

		let mut merged = Table::new(primary.name(), primary.key_column(), columns);
		for row in primary.rows().iter() {
			let mut values = row.values.clone();
			for (source, index) in sources.iter().zip(indices.iter()) {
				match index.get(&row.key) {
					Some(i) => values.extend(source.rows()[*i].values.iter().cloned()),
					None => values.extend(std::iter::repeat(Value::Missing).take(source.columns().len())),
				}
			}
			merged.push(row.key.clone(), values);
		}
		Ok((merged, cardinalities))
	}
}
