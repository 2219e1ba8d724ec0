use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, BillingError>;

/// Error type covering the failure cases of a billing run. None of them are
/// recovered locally: every variant aborts the run.
#[derive(Debug, Error)]
pub enum BillingError {
    /// Raised when the account registry or style configuration is inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Raised when an alias-identified row matches no configured account.
    #[error(
        "failed to find account mapping for '{}'\n\
         Senders Name:\t{senders_name}\n\
         Sender Contact:\t{sender_contact}\n\
         Receivers Name:\t{receivers_name}",
        .path.display()
    )]
    UnresolvedAccount {
        path: PathBuf,
        senders_name: String,
        sender_contact: String,
        receivers_name: String,
    },

    /// Raised when a required numeric field is absent or not a number.
    #[error("malformed record at {origin}:{line}: column '{column}' has value '{value}'")]
    MalformedRecord {
        origin: String,
        line: usize,
        column: String,
        value: String,
    },

    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Errors bubbled up from the CSV reader or writer.
    #[error("CSV error on '{}': {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Raised when a configuration file is not valid JSON for its schema.
    #[error("JSON error in '{}': {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error on '{}': {source}", .path.display())]
    ExcelRead {
        path: PathBuf,
        #[source]
        source: calamine::XlsxError,
    },

    /// Errors bubbled up while laying out cells in the Excel writer.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Raised when a finished workbook cannot be saved to disk.
    #[error("failed to save workbook '{}': {source}", .path.display())]
    ExcelSave {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    /// Raised when the user provides an input path that cannot be processed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl BillingError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BillingError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        BillingError::Csv {
            path: path.into(),
            source,
        }
    }
}
