use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::str::FromStr;

use num_traits::Zero;

use log::warn;

use super::country::CountryCode;
use super::error::{Error, Result};
use super::month::YearMonth;


/// Country × month matrix in which every cell is populated.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix<V: Copy> {
	months: Vec<YearMonth>,
	rows: BTreeMap<CountryCode, Vec<V>>,
}

impl<V: Copy> DenseMatrix<V> {
	#[inline(always)]
	pub fn months(&self) -> &[YearMonth] {
		&self.months[..]
	}

	pub fn countries(&self) -> impl Iterator<Item = &CountryCode> {
		self.rows.keys()
	}

	#[inline(always)]
	pub fn month_index(&self, month: YearMonth) -> Option<usize> {
		self.months.binary_search(&month).ok()
	}

	pub fn row(&self, country: &str) -> Option<&[V]> {
		Some(&self.rows.get(country)?[..])
	}

	pub fn get(&self, country: &str, month: YearMonth) -> Option<V> {
		let i = self.month_index(month)?;
		self.row(country).map(|row| row[i])
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	pub fn cells(&self) -> impl Iterator<Item = (&CountryCode, YearMonth, V)> + '_ {
		self.rows.iter().flat_map(move |(k, row)| {
			self.months.iter().zip(row.iter()).map(move |(m, v)| (k, *m, *v))
		})
	}
}

impl<V: Copy + Zero> DenseMatrix<V> {
	/// Every country and every month seen in `cells` gets a row resp. a
	/// column. Cells are expected to be unique per key; a repeated key
	/// overwrites.
	pub fn from_cells<I: IntoIterator<Item = (CountryCode, YearMonth, V)>>(cells: I) -> Self {
		let cells: Vec<_> = cells.into_iter().collect();
		let months: Vec<YearMonth> = cells.iter().map(|(_, m, _)| *m).collect::<BTreeSet<_>>().into_iter().collect();
		let mut result = Self{
			months,
			rows: BTreeMap::new(),
		};
		for (k, m, v) in cells {
			// months were collected from the very same cells
			let i = match result.month_index(m) {
				Some(i) => i,
				None => continue,
			};
			result.get_or_create(k)[i] = v;
		}
		result
	}

	pub fn get_or_create(&mut self, k: CountryCode) -> &mut [V] {
		let len = self.months.len();
		&mut self.rows.entry(k).or_insert_with(|| vec![V::zero(); len])[..]
	}
}

impl<V: Copy + fmt::Display> DenseMatrix<V> {
	/// Header `index_column` followed by one `YYYY-MM` column per month.
	pub fn write<W: io::Write>(&self, index_column: &str, w: &mut csv::Writer<W>) -> Result<()> {
		let mut header = Vec::with_capacity(self.months.len() + 1);
		header.push(index_column.to_string());
		header.extend(self.months.iter().map(|m| m.to_string()));
		w.write_record(&header)?;
		let mut buf = Vec::with_capacity(header.len());
		for (k, row) in self.rows.iter() {
			buf.clear();
			buf.push(k.to_string());
			buf.extend(row.iter().map(|v| v.to_string()));
			w.write_record(&buf)?;
		}
		w.flush()?;
		Ok(())
	}
}

impl<V: Copy + Zero + FromStr> DenseMatrix<V> {
	/// Reads a matrix written by [`DenseMatrix::write`]. Blank cells are
	/// zero; anything else that does not parse is fatal. A country that
	/// appears on more than one row keeps its first row.
	pub fn read<R: io::Read>(table: &str, index_column: &str, r: csv::Reader<R>) -> Result<Self> {
		let (result, rows) = Self::read_rows(table, index_column, r)?;
		if rows != result.len() {
			warn!(
				"{}: {} rows but only {} distinct country codes; repeated rows were ignored",
				table, rows, result.len(),
			);
		}
		Ok(result)
	}

	fn read_rows<R: io::Read>(table: &str, index_column: &str, mut r: csv::Reader<R>) -> Result<(Self, usize)> {
		let headers = r.headers()?.clone();
		match headers.get(0) {
			Some(h) if h == index_column => (),
			_ => return Err(Error::MissingColumn{
				table: table.into(),
				column: index_column.into(),
			}),
		}
		let mut months = Vec::with_capacity(headers.len() - 1);
		for h in headers.iter().skip(1) {
			let m = h.parse::<YearMonth>().map_err(|_| Error::InvalidValue{
				table: table.into(),
				column: "<header>".into(),
				value: h.into(),
			})?;
			months.push(m);
		}

		let mut rows = 0;
		let mut seen = BTreeSet::new();
		let mut cells = Vec::new();
		for row in r.records() {
			let row = row?;
			rows += 1;
			let k: CountryCode = row.get(0).unwrap_or("").trim().into();
			if !seen.insert(k.clone()) {
				continue
			}
			for (i, m) in months.iter().enumerate() {
				let raw = row.get(i + 1).unwrap_or("").trim();
				let v = if raw.is_empty() {
					V::zero()
				} else {
					raw.parse::<V>().map_err(|_| Error::InvalidValue{
						table: table.into(),
						column: m.to_string(),
						value: raw.into(),
					})?
				};
				cells.push((k.clone(), *m, v));
			}
		}
		Ok((Self::from_cells(cells), rows))
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	fn ym(y: i32, m: u32) -> YearMonth {
		YearMonth::new(y, m).unwrap()
	}

	#[test]
	fn fills_absent_cells_with_zero() {
		let m = DenseMatrix::from_cells(vec![
			("BRA".into(), ym(2020, 2), 5u64),
			("ARG".into(), ym(2019, 12), 3u64),
		]);
		assert_eq!(m.months(), &[ym(2019, 12), ym(2020, 2)]);
		assert_eq!(m.countries().map(|k| k.as_str()).collect::<Vec<_>>(), vec!["ARG", "BRA"]);
		assert_eq!(m.row("ARG").unwrap(), &[3, 0]);
		assert_eq!(m.row("BRA").unwrap(), &[0, 5]);
		assert_eq!(m.get("BRA", ym(2019, 12)), Some(0));
		assert_eq!(m.get("BRA", ym(2020, 1)), None);
		assert_eq!(m.get("PER", ym(2020, 2)), None);
	}

	#[test]
	fn writes_and_reads_tsv() {
		let m = DenseMatrix::from_cells(vec![
			("VNM".into(), ym(2021, 1), 12.5f64),
			("THA".into(), ym(2020, 11), 7.0f64),
		]);
		let mut w = csv::WriterBuilder::new().delimiter(b'\t').from_writer(Vec::new());
		m.write("iso3", &mut w).unwrap();
		let data = String::from_utf8(w.into_inner().unwrap()).unwrap();
		assert_eq!(data, "iso3\t2020-11\t2021-01\nTHA\t7\t0\nVNM\t0\t12.5\n");

		let r = csv::ReaderBuilder::new().delimiter(b'\t').from_reader(data.as_bytes());
		let back = DenseMatrix::<f64>::read("cases", "iso3", r).unwrap();
		assert_eq!(back, m);
	}

	#[test]
	fn read_rejects_wrong_index_column() {
		let r = csv::Reader::from_reader("country,2020-01\nBRA,1\n".as_bytes());
		match DenseMatrix::<f64>::read("cases", "iso3", r) {
			Err(Error::MissingColumn{column, ..}) => assert_eq!(column, "iso3"),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn read_rejects_garbage_cells() {
		let r = csv::Reader::from_reader("iso3,2020-01\nBRA,lots\n".as_bytes());
		assert!(matches!(
			DenseMatrix::<f64>::read("cases", "iso3", r),
			Err(Error::InvalidValue{..})
		));
	}

	#[test]
	fn read_reports_duplicate_rows() {
		let data = "iso3\t2020-01\nBRA\t5\nBRA\t7\nPER\t1\n";
		let r = csv::ReaderBuilder::new().delimiter(b'\t').from_reader(data.as_bytes());
		let (m, rows) = DenseMatrix::<f64>::read_rows("cases", "iso3", r).unwrap();
		assert_eq!(rows, 3);
		assert_eq!(m.len(), 2);
		assert_eq!(m.get("BRA", ym(2020, 1)), Some(5.));

		let r = csv::ReaderBuilder::new().delimiter(b'\t').from_reader(data.as_bytes());
		let m = DenseMatrix::<f64>::read("cases", "iso3", r).unwrap();
		assert_eq!(m.get("BRA", ym(2020, 1)), Some(5.));
	}
}
