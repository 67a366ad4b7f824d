//! Error types for the response engine (spec.md §7).

use thiserror::Error;

/// All errors the engine can produce, one variant per row of spec.md §7's
/// error taxonomy.
#[derive(Debug, Error)]
pub enum RespError {
    /// A required field's value could not be parsed as the expected type.
    #[error("parse error: {0}")]
    ParseError(String),

    /// A field held a value of the wrong shape for its declared type.
    #[error("improper data type: {0}")]
    ImproperDataType(String),

    /// Input ended before a required field or blockette was fully read.
    #[error("unexpected end of input: {0}")]
    UnexpectedEof(String),

    /// A line's blockette prefix (`Bxx`) was not a recognized blockette number.
    #[error("undefined blockette prefix: {0}")]
    UndefinedPrefix(String),

    /// A data line's separator between prefix and fields was malformed.
    #[error("undefined separator in line: {0}")]
    UndefinedSeparator(String),

    /// A blockette tag was not recognized by any parser.
    #[error("unrecognized filter type: {0}")]
    UnrecognizedFilterType(String),

    /// A blockette tag was recognized but is not allowed in this context.
    #[error("unsupported filter type: {0}")]
    UnsupportedFilterType(String),

    /// Unit continuity, decimation-presence, or sensitivity-stage-count
    /// invariants from spec.md §3/§4.5 were violated.
    #[error("illegal RESP format: {0}")]
    IllegalRespFormat(String),

    /// A blockette's declared row count did not match the number of rows read.
    #[error("array bounds exceeded: {0}")]
    ArrayBoundsExceeded(String),

    /// A requested start/stop stage range excluded every stage in the channel.
    #[error("no stage matched the requested range")]
    NoStageMatched,

    /// The requested output unit is not one of the allowed set.
    #[error("bad output units: {0}")]
    BadOutUnits(String),

    /// A unit token could not be mapped to a known [`crate::units::Unit`].
    #[error("unrecognized units: {0}")]
    UnrecognizedUnits(String),

    /// A continuation blockette could not be merged into its predecessor.
    #[error("merge error: {0}")]
    MergeError(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RespError>;
