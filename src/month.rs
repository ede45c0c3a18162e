use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};


#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth(NaiveDate);

impl YearMonth {
	pub fn new(year: i32, month: u32) -> Option<Self> {
		Some(Self(NaiveDate::from_ymd_opt(year, month, 1)?))
	}

	pub fn of(date: NaiveDate) -> Self {
		Self(date - chrono::Duration::days(date.day0() as i64))
	}

	pub fn first_day(&self) -> NaiveDate {
		self.0
	}

	pub fn year(&self) -> i32 {
		self.0.year()
	}

	pub fn month(&self) -> u32 {
		self.0.month()
	}
}

impl From<NaiveDate> for YearMonth {
	fn from(other: NaiveDate) -> Self {
		Self::of(other)
	}
}

impl fmt::Display for YearMonth {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(f, "{:04}-{:02}", self.year(), self.month())
	}
}

impl FromStr for YearMonth {
	type Err = chrono::ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let date = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")?;
		Ok(Self(date))
	}
}
