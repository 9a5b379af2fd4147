pub mod aggregate;
pub mod assemble;
pub mod columns;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod html;
pub mod period;
pub mod record;
pub mod retry;
pub mod runner;
pub mod table;
pub mod transport;

pub use assemble::{assemble, CsvLayout, OutputCollection};
pub use config::{Cli, ProxySettings, SourceConfig};
pub use error::{ConfigError, FetchError, OutputError, ParseError, TransportError};
pub use fetcher::{scrape_document, Fetcher};
pub use period::{Period, PeriodRange};
pub use record::{BackupRecord, BackupTable, FieldValue, OutputRow, Provenance};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use runner::{run, RunSummary};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
