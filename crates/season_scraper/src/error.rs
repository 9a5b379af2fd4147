use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::period::Period;

#[derive(Debug, Error)]
pub enum TransportError {
	#[error("Failed to build HTTP client: {0}")]
	Build(#[source] reqwest::Error),

	#[error("Request failed: {0}")]
	Request(#[source] reqwest::Error),

	#[error("Invalid header {name}: {reason}")]
	InvalidHeader { name: String, reason: String },

	/// Used by non-reqwest transports (and tests) to signal a dropped connection.
	#[error("Connection failed: {0}")]
	Connection(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
	#[error("No candidate table matched the column spec")]
	NoMatchingTable,

	#[error("Required column missing for field: {field}")]
	MissingColumn { field: String },

	#[error("No numeric values for field: {field}")]
	NoValues { field: String },

	#[error("Validation failed for {output}: {value} outside [{min:?}, {max:?}]")]
	ValidationFailed {
		output: String,
		value: f64,
		min: Option<f64>,
		max: Option<f64>,
	},
}

#[derive(Debug, Error)]
pub enum FetchError {
	#[error("Transient failure for {period} after {attempts} attempt(s): {reason}")]
	TransientNetwork { period: Period, attempts: u32, reason: String },

	#[error("Resource absent for {period} (HTTP {status})")]
	PermanentNotFound { period: Period, status: u16 },

	#[error("Parse failure for {period}: {source}")]
	Parse {
		period: Period,
		#[source]
		source: ParseError,
	},

	#[error("No data available for {period}: live fetch failed and no backup record exists")]
	NoBackupAvailable { period: Period },
}

impl FetchError {
	pub fn parse_error(period: Period, source: ParseError) -> Self {
		FetchError::Parse { period, source }
	}
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("Failed to read {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("Invalid JSON in {path}: {source}")]
	Json {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("Invalid period range: {start} > {end}")]
	InvalidRange { start: i32, end: i32 },

	#[error("User-agent pool must not be empty")]
	EmptyUserAgents,

	#[error("Invalid retry policy: {0}")]
	InvalidRetry(String),

	#[error("URL template must contain {{period}}: {0}")]
	InvalidTemplate(String),
}

#[derive(Debug, Error)]
pub enum OutputError {
	#[error(transparent)]
	Io(#[from] io::Error),

	#[error(transparent)]
	Csv(#[from] csv::Error),
}
