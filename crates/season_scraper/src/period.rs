use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;

/// One season, identified by the calendar year it ends in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Period(pub i32);

impl Period {
	pub const fn year(self) -> i32 {
		self.0
	}

	/// Substitutes `{period}` in `template` with the (offset) year.
	///
	/// Some sources address a season by the year it starts in, hence the offset.
	pub fn url(self, template: &str, offset: i32) -> String {
		template.replace("{period}", &(self.0 + offset).to_string())
	}
}

impl fmt::Display for Period {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<i32> for Period {
	fn from(year: i32) -> Self {
		Self(year)
	}
}

/// Inclusive range of seasons, iterated in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRange {
	pub start: i32,
	pub end: i32,
}

impl PeriodRange {
	pub fn new(start: i32, end: i32) -> Result<Self, ConfigError> {
		if start > end {
			return Err(ConfigError::InvalidRange { start, end });
		}
		Ok(Self { start, end })
	}

	pub const fn contains(&self, period: Period) -> bool {
		period.0 >= self.start && period.0 <= self.end
	}

	pub fn periods(&self) -> Vec<Period> {
		(self.start..=self.end).map(Period).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_url_substitution() {
		let template = "https://www.basketball-reference.com/teams/GSW/{period}.html";
		assert_eq!(Period(2022).url(template, 0), "https://www.basketball-reference.com/teams/GSW/2022.html");
	}

	#[test]
	fn test_url_substitution_with_offset() {
		let template = "https://www.spotrac.com/nba/golden-state-warriors/cap/_/year/{period}";
		assert_eq!(Period(2021).url(template, -1), "https://www.spotrac.com/nba/golden-state-warriors/cap/_/year/2020");
	}

	#[test]
	fn test_range_is_inclusive_and_ordered() {
		let range = PeriodRange::new(2021, 2025).unwrap();
		assert_eq!(range.periods(), vec![Period(2021), Period(2022), Period(2023), Period(2024), Period(2025)]);
		assert!(range.contains(Period(2025)));
		assert!(!range.contains(Period(2026)));
	}

	#[test]
	fn test_inverted_range_rejected() {
		assert!(matches!(PeriodRange::new(2025, 2021), Err(ConfigError::InvalidRange { start: 2025, end: 2021 })));
	}
}
