//! Error types for BIFF reading.

use thiserror::Error;

/// Result type for BIFF operations.
pub type XlsResult<T> = std::result::Result<T, XlsError>;

/// Errors that can occur while reading a BIFF workbook stream.
///
/// Most anomalies are recovered from locally and surfaced through a
/// [`crate::warnings::WarningSink`] instead of here. Only the cases that
/// make the rest of the stream unreadable become an `Err`.
#[derive(Debug, Error)]
pub enum XlsError {
    /// IO error from the underlying `StreamSource`.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte buffer is not a recognizable BIFF stream (no BOF found,
    /// wrong globals substream type, etc.).
    #[error("invalid BIFF stream: {0}")]
    InvalidFormat(String),

    /// The BOF record names a BIFF version this reader does not know how
    /// to dispatch. Non-fatal: callers that want a hard failure instead
    /// should set `ReaderOptions::strict_version`.
    #[error("unsupported BIFF version: {0}")]
    UnsupportedVersion(String),

    /// A record body was shorter than its fixed layout requires, or a
    /// variable-length field ran past the end of the buffer.
    #[error("malformed record: {0}")]
    Parse(String),

    /// CODEPAGE named a code page the active `Encoder` cannot resolve.
    /// Fatal: every string decoded after this point would be garbage.
    #[error("unknown code page: {0}")]
    UnknownCodePage(u16),
}
