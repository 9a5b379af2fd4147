use anyhow::Context;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{filter::EnvFilter, fmt::format::JsonFields, util::SubscriberInitExt, Layer};

use season_scraper::{run, Cli, Fetcher, ProxySettings, ReqwestTransport, SourceConfig, TokioSleeper};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
	dotenv::dotenv().ok();

	let cli = Cli::parse();
	init_tracing(&cli);

	let source = SourceConfig::from_json_file(&cli.source).with_context(|| format!("could not load source config {}", cli.source.display()))?;
	let config_dir = cli.source.parent().unwrap_or_else(|| Path::new("."));
	let backup = source.load_backup(config_dir).context("could not load backup records")?;
	let range = cli.period_range(source.periods)?;

	let proxy = ProxySettings::resolve(source.client.proxy.clone(), |key| std::env::var(key).ok());
	proxy.log();

	let transport = ReqwestTransport::new(&source.client, &proxy).context("could not build HTTP client")?;
	let output = cli.output.clone().unwrap_or_else(|| source.output_file.clone());
	let layout = source.csv_layout();
	let retry = source.retry.clone();

	tracing::info!(source = %source.name, start = range.start, end = range.end, backups = backup.len(), "starting run");
	let fetcher = Fetcher::new(source, retry, Box::new(transport), Arc::new(TokioSleeper));
	let (collection, _summary) = run(&fetcher, &range.periods(), &backup).await;

	if collection.is_empty() {
		tracing::warn!("no rows collected, nothing written");
		return Ok(());
	}

	collection.write_csv(&output, &layout).with_context(|| format!("could not write {}", output.display()))?;
	tracing::info!(path = %output.display(), rows = collection.len(), "saved");

	Ok(())
}

pub fn init_tracing(cli: &Cli) {
	use tracing_subscriber::layer::SubscriberExt;

	let filter = EnvFilter::try_new(&cli.rust_log).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::registry()
		.with(if cli.log_json {
			Box::new(
				tracing_subscriber::fmt::layer()
					.fmt_fields(JsonFields::default())
					.event_format(tracing_subscriber::fmt::format().json().flatten_event(true).with_span_list(false))
					.with_filter(filter),
			) as Box<dyn Layer<_> + Send + Sync>
		} else {
			Box::new(tracing_subscriber::fmt::layer().event_format(tracing_subscriber::fmt::format().pretty()).with_filter(filter))
		})
		.init();
}
