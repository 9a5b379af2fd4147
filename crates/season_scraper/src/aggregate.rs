use serde::{Deserialize, Serialize};

use crate::columns::ColumnMapping;
use crate::error::ParseError;
use crate::record::FieldValue;
use crate::table::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
	Mean,
	Max,
	Min,
	Sum,
	Count,
}

/// One output column computed over the qualifying rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
	pub output: String,
	pub kind: AggregateKind,
	/// Semantic field to read; unused for `count`.
	#[serde(default)]
	pub field: Option<String>,
	/// Decimal places to round to.
	#[serde(default)]
	pub round: Option<u32>,
}

/// Accepted range for a computed output; either end may be open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bound {
	pub output: String,
	#[serde(default)]
	pub min: Option<f64>,
	#[serde(default)]
	pub max: Option<f64>,
}

impl Bound {
	fn check(&self, value: f64) -> Result<(), ParseError> {
		let below = self.min.is_some_and(|min| value < min);
		let above = self.max.is_some_and(|max| value > max);
		if below || above {
			return Err(ParseError::ValidationFailed {
				output: self.output.clone(),
				value,
				min: self.min,
				max: self.max,
			});
		}
		Ok(())
	}
}

#[allow(clippy::cast_possible_wrap, clippy::cast_precision_loss)]
fn round_to(value: f64, places: u32) -> f64 {
	let factor = 10f64.powi(places as i32);
	(value * factor).round() / factor
}

impl Aggregate {
	#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
	fn compute(&self, rows: &[&[Cell]], mapping: &ColumnMapping) -> Result<FieldValue, ParseError> {
		if self.kind == AggregateKind::Count {
			return Ok(FieldValue::Integer(rows.len() as i64));
		}

		let field = self.field.as_deref().ok_or_else(|| ParseError::MissingColumn { field: self.output.clone() })?;
		let index = mapping.get(field).ok_or_else(|| ParseError::MissingColumn { field: field.to_string() })?;
		let values: Vec<f64> = rows.iter().filter_map(|row| row.get(index).and_then(Cell::as_number)).collect();
		if values.is_empty() {
			return Err(ParseError::NoValues { field: field.to_string() });
		}

		let value = match self.kind {
			AggregateKind::Mean => values.iter().sum::<f64>() / values.len() as f64,
			AggregateKind::Sum => values.iter().sum(),
			AggregateKind::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
			AggregateKind::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
			AggregateKind::Count => unreachable!("count handled above"),
		};
		Ok(FieldValue::Float(self.round.map_or(value, |places| round_to(value, places))))
	}
}

/// Computes every aggregate, then checks the bounds against the computed outputs.
pub fn compute_all(aggregates: &[Aggregate], bounds: &[Bound], rows: &[&[Cell]], mapping: &ColumnMapping) -> Result<Vec<(String, FieldValue)>, ParseError> {
	let values = aggregates
		.iter()
		.map(|agg| agg.compute(rows, mapping).map(|v| (agg.output.clone(), v)))
		.collect::<Result<Vec<_>, _>>()?;

	for bound in bounds {
		let numeric = values.iter().find(|(name, _)| *name == bound.output).and_then(|(_, v)| match v {
			FieldValue::Integer(n) => Some(*n as f64),
			FieldValue::Float(n) => Some(*n),
			FieldValue::Text(_) => None,
		});
		match numeric {
			Some(value) => bound.check(value)?,
			None => return Err(ParseError::MissingColumn { field: bound.output.clone() }),
		}
	}

	Ok(values)
}
