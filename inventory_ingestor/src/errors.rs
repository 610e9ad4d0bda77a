use snafu::{Backtrace, Snafu};

use crate::adapters::AdapterError;

/// The unified error type for the `inventory_ingestor` crate.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// An error originating from a dealership adapter (e.g., API error, decode failure).
    #[snafu(display("Adapter '{adapter}' failed: {source}"))]
    Adapter {
        adapter: String,
        source: AdapterError,
    },

    /// An adapter exceeded its soft deadline and was cancelled.
    #[snafu(display("Adapter '{adapter}' exceeded its deadline"))]
    Deadline {
        adapter: String,
        backtrace: Backtrace,
    },

    /// The scraping session was cancelled from outside.
    #[snafu(display("Session cancelled"))]
    Cancelled { backtrace: Backtrace },

    /// An error related to configuration.
    #[snafu(display("Configuration error: {message}"))]
    Config {
        message: String,
        backtrace: Backtrace,
    },
}
