//! # etl2pcapng-core
//!
//! Conversion engine that turns NDIS packet-capture trace events into a
//! pcapng capture readable by Wireshark.
//!
//! The trace is read twice. The first pass discovers the network interfaces
//! and puts them in a stable order (each miniport ahead of the filters
//! stacked on it). The second pass reassembles frames from fragment events,
//! attaches 802.11 receive metadata as packet comments and writes one
//! enhanced packet block per frame.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use etl2pcapng_core::prelude::*;
//! use std::fs::File;
//! use std::io::BufWriter;
//!
//! let source = FileEventSource::open("trace.jsonl").unwrap();
//! let output = BufWriter::new(File::create("trace.pcapng").unwrap());
//!
//! let mut pipeline = ConversionPipeline::new(PcapNgWriter::new(output));
//! let summary = pipeline.run(&source).unwrap();
//! println!("Converted {} frames", summary.stats.frames_converted);
//! pipeline.into_sink().finish().unwrap();
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                        etl2pcapng-core                              |
//! +---------------------------------------------------------------------+
//! |  event/       - TraceEvent, EventSource/EventReader, JSON Lines     |
//! |  interface    - InterfaceRegistry, canonical ordering               |
//! |  reassembly   - FragmentAssembler, 802.11 protected-bit rewrite     |
//! |  metadata     - receive context, MetadataCache, packet comments     |
//! |  timestamp    - 1601-epoch ticks to Unix microseconds               |
//! |  pcapng/      - CaptureSink, block encoders, PcapNgWriter           |
//! |  pipeline     - ConversionPipeline (two passes)                     |
//! |  error        - Error types                                         |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Crate Features
//!
//! - `default` - Gzip support enabled
//! - `compress-gzip` - Read gzip-compressed event dumps

pub mod error;
pub mod event;
pub mod interface;
pub mod metadata;
pub mod pcapng;
pub mod pipeline;
pub mod prelude;
pub mod reassembly;
pub mod timestamp;

pub use error::{ConversionError, Error, EventError, Result, SourceError};
pub use event::{
    EventKind, EventReader, EventSource, FileEventSource, JsonLinesReader, Keywords,
    MemoryEventSource, TraceEvent, NDIS_PACKET_CAPTURE_PROVIDER,
};
pub use interface::{Interface, InterfaceRegistry, MediaType};
pub use metadata::{MetadataCache, RecvContext};
pub use pcapng::{CaptureSink, Direction, PacketRecord, PcapNgWriter};
pub use pipeline::{
    ConversionConfig, ConversionContext, ConversionPipeline, ConversionStats, ConversionSummary,
    PipelineState,
};
pub use reassembly::{FragmentAssembler, MAX_FRAME_SIZE};
pub use timestamp::Timestamp;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
