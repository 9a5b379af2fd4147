use csv::Writer;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;

use crate::error::OutputError;
use crate::period::Period;
use crate::record::OutputRow;

/// Column order of the persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvLayout {
	pub period_column: String,
	pub value_columns: Vec<String>,
	pub source_column: String,
}

impl CsvLayout {
	fn header(&self) -> Vec<&str> {
		std::iter::once(self.period_column.as_str())
			.chain(self.value_columns.iter().map(String::as_str))
			.chain(std::iter::once(self.source_column.as_str()))
			.collect()
	}
}

/// Rows in ascending period order, at most one per period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputCollection {
	rows: Vec<OutputRow>,
}

impl OutputCollection {
	pub fn rows(&self) -> &[OutputRow] {
		&self.rows
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	/// Writes the whole collection, replacing whatever was at `path`.
	pub fn write_csv(&self, path: &Path, layout: &CsvLayout) -> Result<(), OutputError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent)?;
		}
		let file = File::create(path)?;
		self.write_to(file, layout)
	}

	pub fn write_to<W: std::io::Write>(&self, sink: W, layout: &CsvLayout) -> Result<(), OutputError> {
		let mut wtr = Writer::from_writer(sink);
		wtr.write_record(layout.header())?;

		for row in &self.rows {
			let mut record = vec![row.period.to_string()];
			for column in &layout.value_columns {
				record.push(row.get(column).map(ToString::to_string).unwrap_or_default());
			}
			record.push(row.provenance.to_string());
			wtr.write_record(&record)?;
		}

		wtr.flush()?;
		Ok(())
	}
}

/// Orders per-period results by period, dropping empty results, periods not in `periods`,
/// and any second result for a period already seen.
pub fn assemble(periods: &[Period], results: Vec<(Period, Option<OutputRow>)>) -> OutputCollection {
	let mut by_period: BTreeMap<Period, OutputRow> = BTreeMap::new();
	for (period, row) in results {
		let Some(row) = row else {
			continue;
		};
		if !periods.contains(&period) || row.period != period {
			tracing::warn!(%period, "discarding result outside the requested periods");
			continue;
		}
		by_period.entry(period).or_insert(row);
	}
	OutputCollection {
		rows: by_period.into_values().collect(),
	}
}
