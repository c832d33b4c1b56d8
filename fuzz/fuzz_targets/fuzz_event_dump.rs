//! Fuzz target for event dump decoding and conversion.
//!
//! Tests handling of malformed input including:
//! - Broken JSON lines and wrong property types
//! - Invalid base64 blobs and short fragments
//! - Arbitrary keyword masks and interface indices

#![no_main]

use etl2pcapng_core::prelude::*;
use etl2pcapng_core::JsonLinesReader;
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Decoding stops at the first malformed line; keep what came before it
    let mut events = Vec::new();
    let mut reader = JsonLinesReader::new(Cursor::new(data));
    while let Ok(Some(event)) = reader.next_event() {
        events.push(event);
    }

    // Conversion may fail on an unknown interface, but never panics
    let mut pipeline = ConversionPipeline::new(PcapNgWriter::new(Vec::new()));
    let _ = pipeline.run(&MemoryEventSource::new(events));
});
