use serde::{Deserialize, Serialize};

use crate::columns::ColumnMapping;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
	Text(String),
	Number(f64),
	Missing,
}

impl Cell {
	pub fn from_text(raw: &str) -> Self {
		let trimmed = raw.trim();
		if trimmed.is_empty() {
			Cell::Missing
		} else {
			Cell::Text(trimmed.to_string())
		}
	}

	pub fn as_text(&self) -> Option<&str> {
		match self {
			Cell::Text(s) => Some(s.as_str()),
			_ => None,
		}
	}

	pub const fn as_number(&self) -> Option<f64> {
		match self {
			Cell::Number(n) => Some(*n),
			_ => None,
		}
	}
}

/// Parses a numeric cell, tolerating currency symbols, thousands separators and percent signs.
pub fn parse_number(raw: &str) -> Option<f64> {
	let cleaned: String = raw.chars().filter(|c| !matches!(c, '$' | ',' | '%') && !c.is_whitespace()).collect();
	if cleaned.is_empty() {
		return None;
	}
	cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// A table recovered from a document, not yet confirmed to be the one we want.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateTable {
	pub id: Option<String>,
	pub columns: Vec<String>,
	pub rows: Vec<Vec<Cell>>,
}

impl CandidateTable {
	pub fn cell(&self, row: usize, column: usize) -> &Cell {
		self.rows.get(row).and_then(|r| r.get(column)).unwrap_or(&Cell::Missing)
	}

	/// Removes rows that repeat the header inside the body (e.g. `Rk` appearing under the `Rk` column).
	///
	/// The sentinel column is `sentinel` if such a label exists, else the first column.
	pub fn drop_header_echoes(&mut self, sentinel: Option<&str>) {
		let index = sentinel.and_then(|label| self.columns.iter().position(|c| c == label)).unwrap_or(0);
		let Some(label) = self.columns.get(index).cloned() else {
			return;
		};
		self.rows.retain(|row| row.get(index).and_then(Cell::as_text) != Some(label.as_str()));
	}

	pub fn coerce_numeric(&mut self, columns: &[usize]) {
		for row in &mut self.rows {
			for &index in columns {
				if let Some(cell) = row.get_mut(index) {
					*cell = match cell {
						Cell::Text(s) => parse_number(s).map_or(Cell::Missing, Cell::Number),
						Cell::Number(n) => Cell::Number(*n),
						Cell::Missing => Cell::Missing,
					};
				}
			}
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowCondition {
	/// Strictly greater than `threshold`; missing values fail.
	Above { field: String, threshold: f64 },
	/// Case-insensitive substring match against any of the needles.
	Contains { field: String, any_of: Vec<String> },
}

impl RowCondition {
	fn field(&self) -> &str {
		match self {
			RowCondition::Above { field, .. } | RowCondition::Contains { field, .. } => field,
		}
	}

	fn holds(&self, cell: &Cell) -> bool {
		match self {
			RowCondition::Above { threshold, .. } => cell.as_number().is_some_and(|n| n > *threshold),
			RowCondition::Contains { any_of, .. } => {
				let text = match cell {
					Cell::Text(s) => s.to_lowercase(),
					Cell::Number(n) => n.to_string(),
					Cell::Missing => return false,
				};
				any_of.iter().any(|needle| text.contains(&needle.to_lowercase()))
			}
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowFilter {
	pub conditions: Vec<RowCondition>,
	/// Rows taken, in order, when the conditions cannot be applied or select nothing.
	pub head_slice: usize,
}

impl Default for RowFilter {
	fn default() -> Self {
		Self {
			conditions: Vec::new(),
			head_slice: 15,
		}
	}
}

impl RowFilter {
	pub fn qualifying_rows<'t>(&self, table: &'t CandidateTable, mapping: &ColumnMapping) -> Vec<&'t [Cell]> {
		let resolved: Option<Vec<(usize, &RowCondition)>> = self.conditions.iter().map(|c| mapping.get(c.field()).map(|index| (index, c))).collect();

		let filtered: Vec<&[Cell]> = match resolved {
			Some(conditions) => table
				.rows
				.iter()
				.filter(|row| conditions.iter().all(|(index, condition)| condition.holds(row.get(*index).unwrap_or(&Cell::Missing))))
				.map(Vec::as_slice)
				.collect(),
			None => {
				tracing::debug!("row filter references unmapped columns, using head slice");
				Vec::new()
			}
		};

		if filtered.is_empty() {
			table.rows.iter().take(self.head_slice).map(Vec::as_slice).collect()
		} else {
			filtered
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn text(s: &str) -> Cell {
		Cell::Text(s.to_string())
	}

	fn roster() -> CandidateTable {
		CandidateTable {
			id: Some("advanced".to_string()),
			columns: vec!["Rk".into(), "Player".into(), "G".into(), "MP".into(), "PER".into()],
			rows: vec![
				vec![text("1"), text("Stephen Curry"), text("56"), text("1,941"), text("24.1")],
				vec![text("Rk"), text("Player"), text("G"), text("MP"), text("PER")],
				vec![text("2"), text("Two-Way Guy"), text("4"), text("30"), text("")],
				vec![text("3"), text("Draymond Green"), text("73"), text("2,297"), text("14.9")],
			],
		}
	}

	fn mapping(pairs: &[(&str, usize)]) -> ColumnMapping {
		ColumnMapping::from(pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect::<HashMap<_, _>>())
	}

	#[test]
	fn test_parse_number_strips_markup() {
		assert_eq!(parse_number("$176,924,383"), Some(176_924_383.0));
		assert_eq!(parse_number("99.5%"), Some(99.5));
		assert_eq!(parse_number(" -3.2 "), Some(-3.2));
		assert_eq!(parse_number("Rk"), None);
		assert_eq!(parse_number(""), None);
	}

	#[test]
	fn test_drop_header_echoes_default_sentinel() {
		let mut table = roster();
		table.drop_header_echoes(None);
		assert_eq!(table.rows.len(), 3);
		assert!(table.rows.iter().all(|r| r[0] != text("Rk")));
	}

	#[test]
	fn test_drop_header_echoes_named_sentinel() {
		let mut table = roster();
		table.rows.push(vec![text("4"), text("Player"), text("1"), text("1"), text("1")]);
		table.drop_header_echoes(Some("Player"));
		// both the full echo and the row with "Player" in the Player column go
		assert_eq!(table.rows.len(), 3);
	}

	#[test]
	fn test_coerce_numeric_marks_unparsable_missing() {
		let mut table = roster();
		table.coerce_numeric(&[2, 3, 4]);
		assert_eq!(table.cell(0, 3), &Cell::Number(1941.0));
		assert_eq!(table.cell(1, 2), &Cell::Missing);
		assert_eq!(table.cell(2, 4), &Cell::Missing);
		assert_eq!(table.cell(0, 1), &text("Stephen Curry"));
	}

	#[test]
	fn test_filter_keeps_rows_above_thresholds() {
		let mut table = roster();
		table.drop_header_echoes(None);
		table.coerce_numeric(&[2, 3, 4]);
		let filter = RowFilter {
			conditions: vec![
				RowCondition::Above { field: "games".into(), threshold: 10.0 },
				RowCondition::Above { field: "minutes".into(), threshold: 100.0 },
			],
			head_slice: 15,
		};
		let rows = filter.qualifying_rows(&table, &mapping(&[("games", 2), ("minutes", 3)]));
		assert_eq!(rows.len(), 2);
		assert_eq!(rows[1][1], text("Draymond Green"));
	}

	#[test]
	fn test_filter_falls_back_to_head_slice_when_empty() {
		let mut table = roster();
		table.drop_header_echoes(None);
		table.coerce_numeric(&[2]);
		let filter = RowFilter {
			conditions: vec![RowCondition::Above { field: "games".into(), threshold: 500.0 }],
			head_slice: 2,
		};
		let rows = filter.qualifying_rows(&table, &mapping(&[("games", 2)]));
		assert_eq!(rows.len(), 2);
		assert_eq!(rows[0][1], text("Stephen Curry"));
		assert_eq!(rows[1][1], text("Two-Way Guy"));
	}

	#[test]
	fn test_filter_with_unmapped_field_uses_head_slice() {
		let table = roster();
		let filter = RowFilter {
			conditions: vec![RowCondition::Above { field: "games".into(), threshold: 10.0 }],
			head_slice: 1,
		};
		assert_eq!(filter.qualifying_rows(&table, &mapping(&[])).len(), 1);
	}

	#[test]
	fn test_only_header_echoes_yield_no_rows() {
		let mut table = CandidateTable {
			id: None,
			columns: vec!["Rk".into(), "PER".into()],
			rows: vec![vec![text("Rk"), text("PER")], vec![text("Rk"), text("PER")]],
		};
		table.drop_header_echoes(None);
		let filter = RowFilter {
			conditions: vec![RowCondition::Above { field: "per".into(), threshold: 0.0 }],
			head_slice: 15,
		};
		assert!(filter.qualifying_rows(&table, &mapping(&[("per", 1)])).is_empty());
	}

	#[test]
	fn test_contains_condition_is_case_insensitive() {
		let table = CandidateTable {
			id: None,
			columns: vec!["TEAM".into(), "HOME AVG".into()],
			rows: vec![vec![text("Lakers"), text("18,997")], vec![text("Golden State"), text("18,064")]],
		};
		let filter = RowFilter {
			conditions: vec![RowCondition::Contains {
				field: "team".into(),
				any_of: vec!["golden state".into(), "warriors".into()],
			}],
			head_slice: 15,
		};
		let rows = filter.qualifying_rows(&table, &mapping(&[("team", 0)]));
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0][0], text("Golden State"));
	}
}
