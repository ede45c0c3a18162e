use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use enum_map::Enum;

use serde::{Deserialize, Serialize};

use super::month::YearMonth;


#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum Period {
	Pre,
	Post,
}

impl Period {
	pub const ALL: [Period; 2] = [Period::Pre, Period::Post];

	pub fn label(&self) -> &'static str {
		match self {
			Self::Pre => "pre",
			Self::Post => "post",
		}
	}
}

impl fmt::Display for Period {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.label())
	}
}

impl FromStr for Period {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pre" => Ok(Self::Pre),
			"post" => Ok(Self::Post),
			other => Err(format!("unknown period {:?}", other)),
		}
	}
}


/// `Pre` strictly before the cutoff, `Post` on or after it.
#[inline]
pub fn classify(date: NaiveDate, cutoff: NaiveDate) -> Period {
	if date < cutoff {
		Period::Pre
	} else {
		Period::Post
	}
}

/// Months are classified by their first day.
#[inline]
pub fn classify_month(month: YearMonth, cutoff: NaiveDate) -> Period {
	classify(month.first_day(), cutoff)
}
