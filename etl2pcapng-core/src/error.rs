//! Error types for etl2pcapng-core.
//!
//! Errors fall into two groups:
//!
//! - [`EventError`] - problems confined to a single trace event. The pipeline
//!   logs these, skips the event, and keeps going.
//! - [`ConversionError`], [`SourceError`] and I/O errors - conditions that
//!   abort the whole conversion.
//!
//! [`enum@Error`] wraps all of them; [`Error::is_recoverable`] tells the two
//! groups apart.

use thiserror::Error;

/// Main error type for etl2pcapng-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A single event could not be used
    #[error("Event error: {0}")]
    Event(#[from] EventError),

    /// The conversion cannot continue
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// The event source failed
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// I/O error (writing the capture file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the pipeline may log this error and continue with the next event.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Event(_))
    }

    /// Process exit status for a fatal error.
    ///
    /// I/O failures carry the operating system's error code; everything else
    /// maps to 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Io(err) => err.raw_os_error().filter(|code| *code != 0).unwrap_or(1),
            Error::Source(SourceError::Open { source, .. }) => {
                source.raw_os_error().filter(|code| *code != 0).unwrap_or(1)
            }
            _ => 1,
        }
    }
}

/// Errors confined to one trace event.
#[derive(Error, Debug)]
pub enum EventError {
    /// A mandatory property is absent from the event
    #[error("event {event_id}: missing property {property}")]
    MissingProperty {
        event_id: u16,
        property: &'static str,
    },

    /// A property is present but cannot be read as the requested type
    #[error("event {event_id}: invalid property {property}: {reason}")]
    InvalidProperty {
        event_id: u16,
        property: &'static str,
        reason: String,
    },

    /// Metadata record size differs from the known record layout
    #[error("unknown metadata length: expected {expected}, got {actual}")]
    UnsupportedMetadataSize { expected: usize, actual: u32 },

    /// Appending a fragment would exceed the maximum frame size
    #[error("packet too large (size = {size}, max = {max}) and skipped")]
    FrameTooLarge { size: usize, max: usize },
}

/// Fatal conversion errors.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// Interface storage could not grow
    #[error("out of memory registering interface {lower_if_index}")]
    Allocation { lower_if_index: u32 },

    /// The second pass saw an interface the first pass never registered
    #[error("packet with unrecognized IfIndex {lower_if_index}")]
    UnknownInterface { lower_if_index: u32 },

    /// A pipeline step ran in the wrong state
    #[error("invalid pipeline state: expected {expected}, found {found}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },
}

/// Errors from the trace event source.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The input could not be opened
    #[error("cannot open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A record of the event dump could not be decoded
    #[error("malformed event at line {line}: {reason}")]
    Malformed { line: u64, reason: String },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_event_errors_are_recoverable() {
        let event: Error = EventError::FrameTooLarge { size: 70000, max: 65535 }.into();
        assert!(event.is_recoverable());

        let fatal: Error = ConversionError::UnknownInterface { lower_if_index: 9 }.into();
        assert!(!fatal.is_recoverable());

        let io: Error = std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert!(!io.is_recoverable());
    }

    #[test]
    fn test_exit_code_uses_os_error() {
        let io: Error = std::io::Error::from_raw_os_error(28).into();
        assert_eq!(io.exit_code(), 28);

        let fatal: Error = ConversionError::UnknownInterface { lower_if_index: 9 }.into();
        assert_eq!(fatal.exit_code(), 1);

        let other: Error = std::io::Error::new(std::io::ErrorKind::Other, "x").into();
        assert_eq!(other.exit_code(), 1);
    }

    #[test]
    fn test_error_messages() {
        let err = EventError::UnsupportedMetadataSize {
            expected: 48,
            actual: 40,
        };
        assert_eq!(err.to_string(), "unknown metadata length: expected 48, got 40");

        let err = ConversionError::UnknownInterface { lower_if_index: 12 };
        assert_eq!(err.to_string(), "packet with unrecognized IfIndex 12");
    }
}
