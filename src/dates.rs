use chrono::NaiveDate;


/// Lenient date parsing for free-text metadata columns. Partial dates pin
/// to the first day of their month or year. Returns `None` for anything it
/// cannot make sense of, blank input included.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
	let s = s.trim();
	if s.is_empty() {
		return None
	}
	if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
		return Some(d)
	}
	// datetimes, either ISO `T` or space separated
	if s.len() > 10 && s.is_char_boundary(10) {
		let (date, rest) = s.split_at(10);
		if rest.starts_with('T') || rest.starts_with(' ') {
			if let Ok(d) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
				return Some(d)
			}
		}
	}
	if let Ok(d) = NaiveDate::parse_from_str(s, "%Y/%m/%d") {
		return Some(d)
	}
	if let Ok(d) = NaiveDate::parse_from_str(s, "%d-%b-%Y") {
		return Some(d)
	}
	match s.len() {
		7 => NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").ok(),
		4 if s.bytes().all(|b| b.is_ascii_digit()) => NaiveDate::from_ymd_opt(s.parse().ok()?, 1, 1),
		_ => None,
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	fn d(y: i32, m: u32, day: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(y, m, day).unwrap()
	}

	#[test]
	fn full_dates() {
		assert_eq!(parse_date("2019-01-05"), Some(d(2019, 1, 5)));
		assert_eq!(parse_date(" 2019-01-05 "), Some(d(2019, 1, 5)));
		assert_eq!(parse_date("2019/01/05"), Some(d(2019, 1, 5)));
		assert_eq!(parse_date("05-Jan-2019"), Some(d(2019, 1, 5)));
	}

	#[test]
	fn datetimes_keep_the_date() {
		assert_eq!(parse_date("2020-06-01T13:45:00Z"), Some(d(2020, 6, 1)));
		assert_eq!(parse_date("2020-06-01 00:00:00"), Some(d(2020, 6, 1)));
	}

	#[test]
	fn partial_dates_pin_to_start() {
		assert_eq!(parse_date("2018-07"), Some(d(2018, 7, 1)));
		assert_eq!(parse_date("2018"), Some(d(2018, 1, 1)));
	}

	#[test]
	fn garbage_is_none() {
		assert_eq!(parse_date(""), None);
		assert_eq!(parse_date("   "), None);
		assert_eq!(parse_date("missing"), None);
		assert_eq!(parse_date("2019-02-30"), None);
		assert_eq!(parse_date("2018-13"), None);
		assert_eq!(parse_date("20x8"), None);
	}
}
