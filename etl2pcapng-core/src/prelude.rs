//! Convenient re-exports for common usage.
//!
//! # Example
//!
//! ```rust,no_run
//! use etl2pcapng_core::prelude::*;
//!
//! let source = MemoryEventSource::new(vec![TraceEvent::fragment(
//!     1,
//!     1,
//!     Keywords::PACKET_START | Keywords::PACKET_END,
//!     116_444_736_000_000_000,
//!     &[0u8; 60],
//! )]);
//! let mut pipeline = ConversionPipeline::new(PcapNgWriter::new(Vec::new()));
//! pipeline.run(&source).unwrap();
//! ```

// Events
pub use crate::event::{
    EventReader, EventSource, FileEventSource, Keywords, MemoryEventSource, TraceEvent,
};

// Conversion
pub use crate::pipeline::{ConversionConfig, ConversionPipeline, ConversionSummary};

// Output
pub use crate::pcapng::{CaptureSink, PcapNgWriter};

// Error types
pub use crate::error::{Error, Result};
