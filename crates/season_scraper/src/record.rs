use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::ConfigError;
use crate::period::Period;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
	Integer(i64),
	Float(f64),
	Text(String),
}

impl fmt::Display for FieldValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FieldValue::Integer(n) => write!(f, "{n}"),
			FieldValue::Float(n) => write!(f, "{n}"),
			FieldValue::Text(s) => write!(f, "{s}"),
		}
	}
}

impl FieldValue {
	fn from_json(value: &Value) -> Option<Self> {
		match value {
			Value::Null => None,
			Value::Number(n) => n.as_i64().map(FieldValue::Integer).or_else(|| n.as_f64().map(FieldValue::Float)),
			Value::String(s) => Some(FieldValue::Text(s.clone())),
			other => Some(FieldValue::Text(other.to_string())),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
	Scraped,
	Backup,
}

impl fmt::Display for Provenance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Provenance::Scraped => write!(f, "scraped"),
			Provenance::Backup => write!(f, "backup"),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
	pub period: Period,
	pub provenance: Provenance,
	pub values: Vec<(String, FieldValue)>,
}

impl OutputRow {
	pub fn scraped(period: Period, values: Vec<(String, FieldValue)>) -> Self {
		Self {
			period,
			provenance: Provenance::Scraped,
			values,
		}
	}

	pub fn get(&self, name: &str) -> Option<&FieldValue> {
		self.values.iter().find(|(k, _)| k == name).map(|(_, v)| v)
	}
}

/// Hand-curated values for one period, used when live retrieval fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupRecord(pub BTreeMap<String, Value>);

impl BackupRecord {
	pub fn to_output_row(&self, period: Period) -> OutputRow {
		OutputRow {
			period,
			provenance: Provenance::Backup,
			values: self.0.iter().filter_map(|(k, v)| FieldValue::from_json(v).map(|fv| (k.clone(), fv))).collect(),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupTable(BTreeMap<i32, BackupRecord>);

impl BackupTable {
	pub fn get(&self, period: Period) -> Option<&BackupRecord> {
		self.0.get(&period.year())
	}

	pub fn insert(&mut self, period: Period, record: BackupRecord) {
		self.0.insert(period.year(), record);
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Reads a JSON object keyed by year, e.g. `{"2022": {"Avg_PER": 14.8}}`.
	pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
		let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
		serde_json::from_str(&raw).map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })
	}

	/// Entries of `other` win over ours for the same period.
	pub fn merge(&mut self, other: Self) {
		self.0.extend(other.0);
	}
}
