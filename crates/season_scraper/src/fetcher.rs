use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use crate::aggregate;
use crate::columns::ColumnMapping;
use crate::config::SourceConfig;
use crate::error::{FetchError, ParseError, TransportError};
use crate::html::{extract_tables, strip_comment_delimiters};
use crate::period::Period;
use crate::record::{BackupTable, FieldValue, OutputRow};
use crate::retry::{retry_async, Retry, RetryPolicy, Sleeper};
use crate::table::CandidateTable;
use crate::transport::{HttpResponse, HttpTransport, UserAgentPool};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
	Parsed,
	Transport(String),
	Status(u16),
	ParseFailed(String),
}

/// One retrieval try; logged and then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
	pub number: u32,
	pub outcome: AttemptOutcome,
}

impl fmt::Display for FetchAttempt {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.outcome {
			AttemptOutcome::Parsed => write!(f, "attempt {}: parsed", self.number),
			AttemptOutcome::Transport(e) => write!(f, "attempt {}: transport error: {e}", self.number),
			AttemptOutcome::Status(s) => write!(f, "attempt {}: HTTP {s}", self.number),
			AttemptOutcome::ParseFailed(e) => write!(f, "attempt {}: parse failed: {e}", self.number),
		}
	}
}

/// Turns a fetched document into the configured output values.
///
/// Matching tables are tried best first; the first one that survives cleaning, filtering,
/// aggregation and validation wins. When none does, the error of the best candidate is returned.
pub fn scrape_document(source: &SourceConfig, body: &str) -> Result<Vec<(String, FieldValue)>, ParseError> {
	let html = if source.strip_comments { strip_comment_delimiters(body) } else { body.to_string() };
	let tables = extract_tables(&html);
	tracing::debug!(candidates = tables.len(), "extracted candidate tables");

	let mut first_error = None;
	for (index, mapping) in source.columns.candidates(&tables) {
		let table = &tables[index];
		match scrape_table(source, table.clone(), &mapping) {
			Ok(values) => {
				tracing::debug!(table_id = table.id.as_deref().unwrap_or("-"), rows = table.rows.len(), "selected table");
				return Ok(values);
			}
			Err(err) => {
				tracing::debug!(table_id = table.id.as_deref().unwrap_or("-"), error = %err, "table rejected");
				first_error.get_or_insert(err);
			}
		}
	}
	Err(first_error.unwrap_or(ParseError::NoMatchingTable))
}

fn scrape_table(source: &SourceConfig, mut table: CandidateTable, mapping: &ColumnMapping) -> Result<Vec<(String, FieldValue)>, ParseError> {
	table.drop_header_echoes(source.columns.sentinel.as_deref());
	table.coerce_numeric(&source.columns.numeric_columns(mapping));

	let rows = source.filter.qualifying_rows(&table, mapping);
	aggregate::compute_all(&source.aggregates, &source.validate, &rows, mapping)
}

pub struct Fetcher {
	source: SourceConfig,
	retry: RetryPolicy,
	transport: Box<dyn HttpTransport>,
	sleeper: Arc<dyn Sleeper>,
	user_agents: UserAgentPool,
}

impl Fetcher {
	pub fn new(source: SourceConfig, retry: RetryPolicy, transport: Box<dyn HttpTransport>, sleeper: Arc<dyn Sleeper>) -> Self {
		let user_agents = UserAgentPool::new(&source.client.user_agents);
		Self {
			source,
			retry,
			transport,
			sleeper,
			user_agents,
		}
	}

	pub const fn source(&self) -> &SourceConfig {
		&self.source
	}

	pub fn sleeper(&self) -> &dyn Sleeper {
		self.sleeper.as_ref()
	}

	/// Live row for `period`, or its backup record when the live path fails for good.
	///
	/// The only error is [`FetchError::NoBackupAvailable`]; everything else is logged and
	/// replaced by the backup.
	pub async fn fetch_period(&self, period: Period, backup: &BackupTable) -> Result<OutputRow, FetchError> {
		match self.scrape(period).await {
			Ok(values) => {
				tracing::info!(%period, source = %self.source.name, "scraped");
				Ok(OutputRow::scraped(period, values))
			}
			Err(err) => {
				tracing::warn!(%period, source = %self.source.name, error = %err, "live fetch failed");
				match backup.get(period) {
					Some(record) => {
						tracing::info!(%period, "using backup record");
						Ok(record.to_output_row(period))
					}
					None => Err(FetchError::NoBackupAvailable { period }),
				}
			}
		}
	}

	async fn scrape(&self, period: Period) -> Result<Vec<(String, FieldValue)>, FetchError> {
		let url = period.url(&self.source.url_template, self.source.period_offset);
		let url = url.as_str();
		let refetched = Cell::new(false);
		let refetched = &refetched;

		retry_async(&self.retry, self.sleeper.as_ref(), move |attempt| async move {
			let user_agent = self.user_agents.pick();
			tracing::debug!(%period, attempt, url, user_agent, "requesting");
			let response = self.transport.get(url, user_agent).await;
			self.classify(period, attempt, response, refetched)
		})
		.await
	}

	fn classify(&self, period: Period, attempt: u32, response: Result<HttpResponse, TransportError>, refetched: &Cell<bool>) -> Result<Vec<(String, FieldValue)>, Retry<FetchError>> {
		let response = match response {
			Ok(response) => response,
			Err(err) => {
				let reason = err.to_string();
				log_attempt(period, &FetchAttempt {
					number: attempt,
					outcome: AttemptOutcome::Transport(reason.clone()),
				});
				return Err(Retry::Transient(FetchError::TransientNetwork { period, attempts: attempt, reason }));
			}
		};

		if !response.is_success() {
			log_attempt(period, &FetchAttempt {
				number: attempt,
				outcome: AttemptOutcome::Status(response.status),
			});
			if response.is_absent() {
				return Err(Retry::Permanent(FetchError::PermanentNotFound { period, status: response.status }));
			}
			return Err(Retry::Transient(FetchError::TransientNetwork {
				period,
				attempts: attempt,
				reason: format!("HTTP {}", response.status),
			}));
		}

		match scrape_document(&self.source, &response.body) {
			Ok(values) => {
				log_attempt(period, &FetchAttempt {
					number: attempt,
					outcome: AttemptOutcome::Parsed,
				});
				Ok(values)
			}
			Err(err) => {
				log_attempt(period, &FetchAttempt {
					number: attempt,
					outcome: AttemptOutcome::ParseFailed(err.to_string()),
				});
				let failure = FetchError::parse_error(period, err);
				// A truncated page may parse on a second download; the content itself won't change.
				if self.retry.refetch_on_parse_failure && !refetched.replace(true) {
					Err(Retry::Transient(failure))
				} else {
					Err(Retry::Permanent(failure))
				}
			}
		}
	}
}

fn log_attempt(period: Period, attempt: &FetchAttempt) {
	match attempt.outcome {
		AttemptOutcome::Parsed => tracing::debug!(%period, "{attempt}"),
		_ => tracing::warn!(%period, "{attempt}"),
	}
}
