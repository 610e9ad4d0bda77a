use thiserror::Error;

/// Errors that can occur within an `InventoryAdapter` implementation.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// An error during an HTTP request (e.g., network failure, timeout).
    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The site's API returned a specific error message.
    #[error("API error: {0}")]
    Api(String),

    /// The response body could not be mapped to vehicle rows.
    #[error("Response decode failed: {0}")]
    Decode(String),

    /// The adapter observed cancellation and stopped early.
    #[error("Scrape cancelled")]
    Cancelled,

    /// An internal error occurred while processing data within the adapter.
    #[error("Internal adapter error: {0}")]
    Internal(String),
}

/// Errors that can occur while constructing an adapter.
#[derive(Debug, Error)]
pub enum AdapterInitError {
    /// A required credential is not present in the environment.
    #[error(transparent)]
    MissingEnvVar(#[from] shared_utils::env::MissingEnvVarError),

    /// A credential could not be encoded as an HTTP header.
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// The HTTP client could not be built.
    #[error("Client build failed: {0}")]
    Client(#[from] reqwest::Error),
}
