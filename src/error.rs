//! Error handling for scope-rs
//!
//! This module defines the error taxonomy used throughout the crate:
//!
//! - [`TransportError`] - terminal failures of a record source
//! - [`ParseError`] - per-record failures; the record is dropped and acquisition continues
//! - [`ScopeError`] - the crate-wide error, wrapping both plus configuration errors

use thiserror::Error;

/// Failure of a record source. Always terminal for the acquisition loop.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The transport was already closed
    #[error("transport closed")]
    Closed,

    /// The remote end went away (process exited, device unplugged)
    #[error("transport disconnected: {0}")]
    Disconnected(String),

    /// The underlying resource could not be opened
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// IO errors from the underlying resource
    #[error("transport IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to turn one raw record into a sample vector
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The configured pattern did not match the record
    #[error("record does not match pattern")]
    PatternMismatch,

    /// The captured payload had the wrong number of fields
    #[error("bad input length: expected {expected} fields, found {found}")]
    ArityMismatch { expected: usize, found: usize },

    /// A field was not a floating-point number
    #[error("field {field} is not a number: {value:?}")]
    NumericConversion { field: usize, value: String },
}

impl ParseError {
    /// Short stable name, used for logging and statistics
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::PatternMismatch => "pattern_mismatch",
            ParseError::ArityMismatch { .. } => "arity_mismatch",
            ParseError::NumericConversion { .. } => "numeric_conversion",
        }
    }
}

/// Main error type for scope-rs operations
#[derive(Error, Debug)]
pub enum ScopeError {
    /// Errors from the record source
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Errors from record parsing
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Errors related to configuration loading and validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// A snapshot was requested for a channel that does not exist
    #[error("Channel {channel} out of range (dimension {dimension})")]
    ChannelOutOfRange { channel: usize, dimension: usize },

    /// The acquisition thread could not be spawned or joined
    #[error("Acquisition thread error: {0}")]
    Thread(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ScopeError>,
    },
}

impl ScopeError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ScopeError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it wraps) is a configuration error
    pub fn is_config(&self) -> bool {
        match self {
            ScopeError::Config(_) => true,
            ScopeError::WithContext { source, .. } => source.is_config(),
            _ => false,
        }
    }
}

/// Result type alias for scope-rs operations
pub type Result<T> = std::result::Result<T, ScopeError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<ScopeError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
