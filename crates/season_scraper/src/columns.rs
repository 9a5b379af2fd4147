use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::table::CandidateTable;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matcher {
	Equals(String),
	Contains(String),
}

impl Matcher {
	const fn is_exact(&self) -> bool {
		matches!(self, Matcher::Equals(_))
	}

	fn pattern(&self) -> &str {
		match self {
			Matcher::Equals(p) | Matcher::Contains(p) => p,
		}
	}
}

fn default_required() -> bool {
	true
}

/// Ties one semantic field to the column labels that may carry it.
///
/// Matchers are tried in order; the first one that hits any column wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
	pub field: String,
	pub matchers: Vec<Matcher>,
	#[serde(default = "default_required")]
	pub required: bool,
	#[serde(default)]
	pub numeric: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
	pub fields: Vec<FieldRule>,
	#[serde(default)]
	pub case_insensitive: bool,
	#[serde(default)]
	pub ignore_whitespace: bool,
	/// Label of the column used to detect repeated header rows; defaults to the first column.
	#[serde(default)]
	pub sentinel: Option<String>,
}

/// Semantic field name to column index, for one selected table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping(HashMap<String, usize>);

impl ColumnMapping {
	pub fn get(&self, field: &str) -> Option<usize> {
		self.0.get(field).copied()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl From<HashMap<String, usize>> for ColumnMapping {
	fn from(map: HashMap<String, usize>) -> Self {
		Self(map)
	}
}

impl ColumnSpec {
	fn normalize(&self, label: &str) -> String {
		let mut out: String = if self.ignore_whitespace { label.chars().filter(|c| !c.is_whitespace()).collect() } else { label.trim().to_string() };
		if self.case_insensitive {
			out = out.to_lowercase();
		}
		out
	}

	fn find_column(&self, rule: &FieldRule, labels: &[String], exact_only: bool) -> Option<usize> {
		rule.matchers.iter().filter(|m| !exact_only || m.is_exact()).find_map(|matcher| {
			let pattern = self.normalize(matcher.pattern());
			labels.iter().position(|label| match matcher {
				Matcher::Equals(_) => *label == pattern,
				Matcher::Contains(_) => label.contains(&pattern),
			})
		})
	}

	/// Maps every field that resolves; `None` if a required field does not.
	pub fn resolve(&self, table: &CandidateTable, exact_only: bool) -> Option<ColumnMapping> {
		let labels: Vec<String> = table.columns.iter().map(|c| self.normalize(c)).collect();
		let mut mapping = HashMap::new();
		for rule in &self.fields {
			match self.find_column(rule, &labels, exact_only) {
				Some(index) => {
					mapping.insert(rule.field.clone(), index);
				}
				None if rule.required => return None,
				None => {}
			}
		}
		Some(ColumnMapping(mapping))
	}

	/// Tables that can be read from, best first, as two passes over document order:
	/// tables whose required fields all resolve through `Equals` matchers,
	/// then the remaining tables whose required fields resolve through any matcher.
	///
	/// Each mapping uses every matcher, in priority order.
	pub fn candidates(&self, tables: &[CandidateTable]) -> Vec<(usize, ColumnMapping)> {
		let exact: Vec<usize> = tables.iter().enumerate().filter(|(_, t)| self.resolve(t, true).is_some()).map(|(i, _)| i).collect();
		let loose = (0..tables.len()).filter(|i| !exact.contains(i));
		exact.iter().copied().chain(loose).filter_map(|i| self.resolve(&tables[i], false).map(|mapping| (i, mapping))).collect()
	}

	pub fn numeric_columns(&self, mapping: &ColumnMapping) -> Vec<usize> {
		self.fields.iter().filter(|r| r.numeric).filter_map(|r| mapping.get(&r.field)).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn table(columns: &[&str]) -> CandidateTable {
		CandidateTable {
			id: None,
			columns: columns.iter().map(|c| (*c).to_string()).collect(),
			rows: Vec::new(),
		}
	}

	fn rule(field: &str, matchers: Vec<Matcher>) -> FieldRule {
		FieldRule {
			field: field.to_string(),
			matchers,
			required: true,
			numeric: true,
		}
	}

	fn advanced_spec() -> ColumnSpec {
		ColumnSpec {
			fields: vec![
				rule("per", vec![Matcher::Equals("PER".into()), Matcher::Contains("PER".into())]),
				rule("ws", vec![Matcher::Equals("WS".into()), Matcher::Contains("WS".into())]),
			],
			..ColumnSpec::default()
		}
	}

	#[test]
	fn test_exact_match_preferred_over_earlier_contains_match() {
		let tables = vec![table(&["Player", "PER_adj", "WS/48"]), table(&["Player", "PER", "WS"])];
		let candidates = advanced_spec().candidates(&tables);
		assert_eq!(candidates.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![1, 0]);
		assert_eq!(candidates[0].1.get("per"), Some(1));
	}

	#[test]
	fn test_falls_back_to_first_contains_match() {
		let tables = vec![table(&["Player", "G"]), table(&["Player", "PER_adj", "WS/48"]), table(&["PER x", "WS y"])];
		let candidates = advanced_spec().candidates(&tables);
		assert_eq!(candidates.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![1, 2]);
		assert_eq!(candidates[0].1.get("ws"), Some(2));
	}

	#[test]
	fn test_no_table_satisfies_required_fields() {
		let tables = vec![table(&["Player", "PER"]), table(&["Team"])];
		assert!(advanced_spec().candidates(&tables).is_empty());
	}

	#[test]
	fn test_matcher_priority_within_field() {
		// "G" must not be claimed by "GS" when an exact label exists later in the row.
		let spec = ColumnSpec {
			fields: vec![rule("games", vec![Matcher::Equals("G".into()), Matcher::Contains("G".into())])],
			..ColumnSpec::default()
		};
		let mapping = spec.resolve(&table(&["Rk", "GS", "G"]), false).unwrap();
		assert_eq!(mapping.get("games"), Some(2));
	}

	#[test]
	fn test_optional_field_may_be_absent() {
		let mut spec = advanced_spec();
		spec.fields.push(FieldRule {
			field: "minutes".into(),
			matchers: vec![Matcher::Equals("MP".into())],
			required: false,
			numeric: true,
		});
		let mapping = spec.resolve(&table(&["PER", "WS"]), false).unwrap();
		assert_eq!(mapping.len(), 2);
		assert_eq!(mapping.get("minutes"), None);
	}

	#[test]
	fn test_normalization_of_labels() {
		let spec = ColumnSpec {
			fields: vec![rule("cap_hit", vec![Matcher::Contains("caphit".into())])],
			case_insensitive: true,
			ignore_whitespace: true,
			sentinel: None,
		};
		let mapping = spec.resolve(&table(&["Player", "Cap Hit 2024-25"]), false).unwrap();
		assert_eq!(mapping.get("cap_hit"), Some(1));
	}

	#[test]
	fn test_matcher_json_shape() {
		let rule: FieldRule = serde_json::from_str(r#"{"field": "per", "matchers": [{"equals": "PER"}, {"contains": "PER"}], "numeric": true}"#).unwrap();
		assert!(rule.required);
		assert_eq!(rule.matchers, vec![Matcher::Equals("PER".into()), Matcher::Contains("PER".into())]);
	}
}
