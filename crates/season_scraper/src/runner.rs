use crate::assemble::{assemble, OutputCollection};
use crate::error::FetchError;
use crate::fetcher::Fetcher;
use crate::period::Period;
use crate::record::{BackupTable, Provenance};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
	pub scraped: usize,
	pub backup: usize,
	pub dropped: usize,
}

/// Fetches every period one after another, pausing between them, and assembles the result.
///
/// A period without data is dropped and reported; it never stops the run.
pub async fn run(fetcher: &Fetcher, periods: &[Period], backup: &BackupTable) -> (OutputCollection, RunSummary) {
	let mut summary = RunSummary::default();
	let mut results = Vec::with_capacity(periods.len());

	for (i, &period) in periods.iter().enumerate() {
		if i > 0 {
			let pause = fetcher.source().politeness.draw(&mut rand::thread_rng());
			tracing::debug!(pause_ms = u64::try_from(pause.as_millis()).unwrap_or(u64::MAX), "pausing between periods");
			fetcher.sleeper().sleep(pause).await;
		}

		match fetcher.fetch_period(period, backup).await {
			Ok(row) => {
				match row.provenance {
					Provenance::Scraped => summary.scraped += 1,
					Provenance::Backup => summary.backup += 1,
				}
				results.push((period, Some(row)));
			}
			Err(err @ FetchError::NoBackupAvailable { .. }) => {
				tracing::error!(%period, error = %err, "dropping period");
				summary.dropped += 1;
				results.push((period, None));
			}
			Err(err) => {
				tracing::error!(%period, error = %err, "unexpected fetch error, dropping period");
				summary.dropped += 1;
				results.push((period, None));
			}
		}
	}

	let collection = assemble(periods, results);
	tracing::info!(scraped = summary.scraped, backup = summary.backup, dropped = summary.dropped, "run finished");
	(collection, summary)
}
