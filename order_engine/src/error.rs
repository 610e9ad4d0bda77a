//! The enumerated error surface of the engine.
//!
//! Pure components (normalizer, filter engine) never fail — they return
//! values plus warnings. Everything that touches the store, the filesystem,
//! or caller input reports one of these kinds.

use thiserror::Error;

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed request: bad VIN length, empty job list, unparseable date.
    /// Surfaced to the caller; never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The named dealership has no configuration row.
    #[error("unknown dealership '{0}'")]
    UnknownDealership(String),

    /// The import was already activated or archived; its row set is frozen.
    #[error("import '{import_id}' is already finalized (status '{status}')")]
    IngestConflict {
        /// The conflicting import.
        import_id: String,
        /// Its current status.
        status: String,
    },

    /// A store operation failed even after the internal retry.
    #[error("store unavailable: {source}")]
    StoreUnavailable {
        /// The underlying Diesel error from the second attempt.
        source: diesel::result::Error,
    },

    /// A non-transient store error.
    #[error("store error: {0}")]
    Store(#[from] diesel::result::Error),

    /// The order mixes graphic sizes; the downstream printer takes one size
    /// per file. Rejected before any file is written.
    #[error("mixed graphic sizes in one order: {sizes:?}")]
    MixedSizeRejected {
        /// The distinct sizes found.
        sizes: Vec<String>,
    },

    /// Artifact files were emitted but the VIN log write failed; the run is
    /// recorded as `FILES_EMITTED_NO_LOG` and needs operator attention.
    #[error("files emitted for run '{run_id}' but the vin log write failed: {message}")]
    PartialEmission {
        /// The affected run.
        run_id: String,
        /// Description of the failed write.
        message: String,
    },

    /// Cooperative cancellation observed.
    #[error("operation cancelled")]
    Cancelled,

    /// The QR payload could not be encoded.
    #[error("qr encoding failed: {0}")]
    QrEncode(String),

    /// Filesystem failure while staging or renaming artifacts.
    #[error("artifact i/o: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding/decoding failure.
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    /// A stored or supplied configuration could not be parsed.
    #[error("config: {0}")]
    Config(String),
}
