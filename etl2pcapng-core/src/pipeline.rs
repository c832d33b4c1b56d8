//! Two-pass conversion of a trace into a pcapng capture.
//!
//! ```text
//!   Discovery ──(trace exhausted)──▶ Finalized ──(IDBs written)──▶ Conversion ──▶ Done
//! ```
//!
//! Pass 1 ([`ConversionPipeline::discover`]) only registers interfaces. After
//! [`ConversionPipeline::finalize`] has ordered them and written one
//! interface description per interface, pass 2
//! ([`ConversionPipeline::convert`]) reassembles frames, attaches pending
//! metadata and writes one enhanced packet per completed frame.
//!
//! Per-event problems (missing properties, odd metadata sizes, oversized
//! frames) are logged and the event is skipped. Everything else aborts the
//! run.

use tracing::{debug, info, trace, warn};

use crate::error::{ConversionError, EventError, Result};
use crate::event::{property, EventKind, EventReader, EventSource, Keywords, TraceEvent};
use crate::interface::{Interface, InterfaceRegistry, MediaType};
use crate::metadata::{self, MetadataCache, RecvContext, RECV_CONTEXT_SIZE};
use crate::pcapng::{CaptureSink, Direction, PacketRecord};
use crate::reassembly::{FragmentAssembler, DOT11_PROTECTED_FRAME, MAX_FRAME_SIZE};
use crate::timestamp::Timestamp;

/// Conversion settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionConfig {
    /// Largest frame accepted, also written as every interface's snap length
    pub snap_len: u32,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            snap_len: MAX_FRAME_SIZE as u32,
        }
    }
}

/// Where the pipeline is in the two-pass protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Discovery,
    Finalized,
    Conversion,
    Done,
}

impl PipelineState {
    pub fn name(self) -> &'static str {
        match self {
            PipelineState::Discovery => "discovery",
            PipelineState::Finalized => "finalized",
            PipelineState::Conversion => "conversion",
            PipelineState::Done => "done",
        }
    }
}

/// Counters kept across both passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStats {
    /// Events from other providers or with other event ids
    pub events_ignored: u64,
    /// Capture events skipped because of a per-event error
    pub events_skipped: u64,
    pub frames_converted: u64,
    /// Frames thrown away for exceeding the snap length
    pub frames_dropped: u64,
    pub metadata_attached: u64,
    /// 802.11 frames whose protected flag was cleared
    pub protected_cleared: u64,
}

/// Outcome of a completed conversion.
#[derive(Debug, Clone)]
pub struct ConversionSummary {
    /// Interfaces in output order
    pub interfaces: Vec<Interface>,
    pub stats: ConversionStats,
}

/// Mutable state shared by both passes.
#[derive(Debug)]
pub struct ConversionContext {
    pub interfaces: InterfaceRegistry,
    pub assembler: FragmentAssembler,
    pub metadata: MetadataCache,
    pub stats: ConversionStats,
}

impl ConversionContext {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            interfaces: InterfaceRegistry::new(),
            assembler: FragmentAssembler::with_capacity(config.snap_len as usize),
            metadata: MetadataCache::new(),
            stats: ConversionStats::default(),
        }
    }

    fn discover_event(&mut self, event: &TraceEvent) -> Result<()> {
        let lower_index = event.u32_property(property::LOWER_IF_INDEX)?;
        let media_type = MediaType::from_keywords(event.keywords);
        self.interfaces.observe(lower_index, media_type, || {
            Ok(event.u32_property(property::MINIPORT_IF_INDEX)?)
        })?;
        Ok(())
    }

    fn convert_event<S: CaptureSink>(
        &mut self,
        event: &TraceEvent,
        kind: EventKind,
        sink: &mut S,
    ) -> Result<()> {
        if !kind.is_fragment() {
            return self.store_metadata(event);
        }

        if event.keywords.contains(Keywords::PACKET_START) {
            let stale = self.assembler.begin_frame();
            if stale > 0 {
                warn!(bytes = stale, "frame without end marker discarded");
            }
        }

        let frame_end = event.keywords.contains(Keywords::PACKET_END);
        let fragment = match read_fragment(event) {
            Ok(fragment) => fragment,
            Err(err) => {
                if frame_end {
                    // The frame lost its last fragment; don't let the rest
                    // leak into the next frame.
                    self.assembler.finish_frame();
                }
                return Err(err);
            }
        };

        if let Err(err) = self.assembler.append(&fragment) {
            self.stats.frames_dropped += 1;
            if frame_end {
                self.assembler.finish_frame();
            }
            return Err(err.into());
        }

        if !frame_end {
            return Ok(());
        }
        self.emit_frame(event, sink)
    }

    fn store_metadata(&mut self, event: &TraceEvent) -> Result<()> {
        let size = event.u32_property(property::METADATA_SIZE)?;
        if size as usize != RECV_CONTEXT_SIZE {
            return Err(EventError::UnsupportedMetadataSize {
                expected: RECV_CONTEXT_SIZE,
                actual: size,
            }
            .into());
        }
        let record = event.bytes_property(property::METADATA, RECV_CONTEXT_SIZE)?;
        self.metadata.set(RecvContext::parse(&record)?);
        Ok(())
    }

    fn emit_frame<S: CaptureSink>(&mut self, event: &TraceEvent, sink: &mut S) -> Result<()> {
        let Some(mut frame) = self.assembler.finish_frame() else {
            // Tail of a frame that was already dropped.
            return Ok(());
        };

        let lower_index = event.u32_property(property::LOWER_IF_INDEX)?;
        let iface = *self
            .interfaces
            .lookup(lower_index)
            .ok_or(ConversionError::UnknownInterface {
                lower_if_index: lower_index,
            })?;
        let interface_id = iface.output_index.ok_or(ConversionError::InvalidState {
            expected: "finalized",
            found: "discovery",
        })?;

        if iface.media_type == MediaType::Wifi && DOT11_PROTECTED_FRAME.apply(&mut frame) {
            self.stats.protected_cleared += 1;
        }

        let (comment, attached) = metadata::frame_comment(&mut self.metadata, event.pid);
        let direction = if event.keywords.contains(Keywords::SEND) {
            Direction::Outbound
        } else {
            Direction::Inbound
        };

        sink.write_enhanced_packet(&PacketRecord {
            interface_id,
            direction,
            timestamp: Timestamp::from_filetime(event.timestamp),
            payload: &frame,
            comment: Some(&comment),
        })?;

        self.stats.frames_converted += 1;
        if attached {
            self.stats.metadata_attached += 1;
        }
        trace!(
            interface_id,
            len = frame.len(),
            ?direction,
            "frame written"
        );
        Ok(())
    }
}

fn read_fragment(event: &TraceEvent) -> Result<Vec<u8>> {
    let len = event.u32_property(property::FRAGMENT_SIZE)?;
    Ok(event.bytes_property(property::FRAGMENT, len as usize)?)
}

/// Drives the two passes and the output sink.
pub struct ConversionPipeline<S: CaptureSink> {
    sink: S,
    config: ConversionConfig,
    context: ConversionContext,
    state: PipelineState,
    header_written: bool,
    interfaces: Vec<Interface>,
}

impl<S: CaptureSink> ConversionPipeline<S> {
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, ConversionConfig::default())
    }

    pub fn with_config(sink: S, config: ConversionConfig) -> Self {
        let context = ConversionContext::new(&config);
        Self {
            sink,
            config,
            context,
            state: PipelineState::Discovery,
            header_written: false,
            interfaces: Vec::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn context(&self) -> &ConversionContext {
        &self.context
    }

    pub fn stats(&self) -> ConversionStats {
        self.context.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Convert a whole trace: header, pass 1, interface descriptions, pass 2.
    pub fn run<E: EventSource>(&mut self, source: &E) -> Result<ConversionSummary> {
        self.run_discovery(source)?;
        self.run_conversion(source)
    }

    /// Write the section header, run pass 1 over `source` and write the
    /// interface descriptions.
    ///
    /// Returns the interfaces in output order.
    pub fn run_discovery<E: EventSource>(&mut self, source: &E) -> Result<Vec<Interface>> {
        self.start()?;

        let mut reader = source.reader()?;
        let mut events = 0u64;
        while let Some(event) = reader.next_event()? {
            self.discover(&event)?;
            events += 1;
        }
        info!(events, "pass 1 complete");

        let interfaces = self.finalize()?;
        info!(interfaces = interfaces.len(), "interfaces written");
        Ok(interfaces)
    }

    /// Run pass 2 over `source` and finish the conversion.
    pub fn run_conversion<E: EventSource>(&mut self, source: &E) -> Result<ConversionSummary> {
        let mut reader = source.reader()?;
        let mut events = 0u64;
        while let Some(event) = reader.next_event()? {
            self.convert(&event)?;
            events += 1;
        }
        info!(events, "pass 2 complete");

        self.finish()
    }

    /// Write the section header. Must precede pass 1.
    pub fn start(&mut self) -> Result<()> {
        self.expect_state(PipelineState::Discovery)?;
        if self.header_written {
            return Err(ConversionError::InvalidState {
                expected: "discovery before section header",
                found: "discovery",
            }
            .into());
        }
        self.sink.write_section_header()?;
        self.header_written = true;
        Ok(())
    }

    /// Pass 1: feed one event to interface discovery.
    pub fn discover(&mut self, event: &TraceEvent) -> Result<()> {
        self.expect_state(PipelineState::Discovery)?;
        if event.kind().is_none() {
            self.context.stats.events_ignored += 1;
            return Ok(());
        }
        let result = self.context.discover_event(event);
        self.absorb(event, result)
    }

    /// End pass 1: order the interfaces and write their descriptions.
    ///
    /// Returns the interfaces in output order.
    pub fn finalize(&mut self) -> Result<Vec<Interface>> {
        self.expect_state(PipelineState::Discovery)?;
        if !self.header_written {
            self.start()?;
        }
        self.state = PipelineState::Finalized;

        let interfaces = self.context.interfaces.finalize();
        for iface in &interfaces {
            self.sink
                .write_interface_description(iface.media_type, self.config.snap_len)?;
            debug!(%iface, "interface description written");
        }

        self.interfaces = interfaces.clone();
        self.state = PipelineState::Conversion;
        Ok(interfaces)
    }

    /// Pass 2: feed one event to reassembly and output.
    pub fn convert(&mut self, event: &TraceEvent) -> Result<()> {
        self.expect_state(PipelineState::Conversion)?;
        let Some(kind) = event.kind() else {
            return Ok(());
        };
        let result = self.context.convert_event(event, kind, &mut self.sink);
        self.absorb(event, result)
    }

    /// End pass 2.
    pub fn finish(&mut self) -> Result<ConversionSummary> {
        self.expect_state(PipelineState::Conversion)?;
        if !self.context.assembler.is_empty() {
            warn!(
                bytes = self.context.assembler.len(),
                "trace ended inside a frame, partial frame discarded"
            );
            self.context.assembler.finish_frame();
        }
        self.state = PipelineState::Done;

        let stats = self.context.stats;
        info!(
            frames = stats.frames_converted,
            dropped = stats.frames_dropped,
            skipped = stats.events_skipped,
            "conversion complete"
        );
        Ok(ConversionSummary {
            interfaces: self.interfaces.clone(),
            stats,
        })
    }

    fn expect_state(&self, expected: PipelineState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ConversionError::InvalidState {
                expected: expected.name(),
                found: self.state.name(),
            }
            .into())
        }
    }

    fn absorb(&mut self, event: &TraceEvent, result: Result<()>) -> Result<()> {
        match result {
            Err(err) if err.is_recoverable() => {
                warn!(event_id = event.id, error = %err, "event skipped");
                self.context.stats.events_skipped += 1;
                Ok(())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::event::{MemoryEventSource, PropertyValue};
    use uuid::Uuid;

    const EPOCH_TICKS: i64 = 116_444_736_000_000_000;
    const SINGLE: Keywords = Keywords::PACKET_START.union(Keywords::PACKET_END);

    #[derive(Debug, Clone, PartialEq)]
    enum Record {
        SectionHeader,
        Interface(MediaType, u32),
        Packet {
            interface_id: u32,
            direction: Direction,
            micros: i64,
            payload: Vec<u8>,
            comment: Option<String>,
        },
    }

    #[derive(Default)]
    struct RecordingSink {
        records: Vec<Record>,
    }

    impl RecordingSink {
        fn packets(&self) -> Vec<&Record> {
            self.records
                .iter()
                .filter(|r| matches!(r, Record::Packet { .. }))
                .collect()
        }
    }

    impl CaptureSink for RecordingSink {
        fn write_section_header(&mut self) -> Result<()> {
            self.records.push(Record::SectionHeader);
            Ok(())
        }

        fn write_interface_description(&mut self, media_type: MediaType, snap_len: u32) -> Result<()> {
            self.records.push(Record::Interface(media_type, snap_len));
            Ok(())
        }

        fn write_enhanced_packet(&mut self, packet: &PacketRecord<'_>) -> Result<()> {
            self.records.push(Record::Packet {
                interface_id: packet.interface_id,
                direction: packet.direction,
                micros: packet.timestamp.as_micros(),
                payload: packet.payload.to_vec(),
                comment: packet.comment.map(str::to_string),
            });
            Ok(())
        }
    }

    fn run(events: Vec<TraceEvent>) -> (Result<ConversionSummary>, RecordingSink) {
        let mut pipeline = ConversionPipeline::new(RecordingSink::default());
        let result = pipeline.run(&MemoryEventSource::new(events));
        (result, pipeline.into_sink())
    }

    fn payload_of(record: &Record) -> &[u8] {
        match record {
            Record::Packet { payload, .. } => payload,
            other => panic!("not a packet: {other:?}"),
        }
    }

    fn comment_of(record: &Record) -> &str {
        match record {
            Record::Packet { comment, .. } => comment.as_deref().unwrap_or(""),
            other => panic!("not a packet: {other:?}"),
        }
    }

    #[test]
    fn test_record_order_and_interface_ids() {
        let events = vec![
            TraceEvent::fragment(7, 5, SINGLE, EPOCH_TICKS, &[7]),
            TraceEvent::fragment(5, 5, SINGLE, EPOCH_TICKS, &[5]),
            TraceEvent::fragment(3, 3, SINGLE, EPOCH_TICKS, &[3]),
        ];
        let (result, sink) = run(events);
        let summary = result.unwrap();

        let order: Vec<u32> = summary.interfaces.iter().map(|i| i.lower_index).collect();
        assert_eq!(order, vec![3, 5, 7]);

        assert_eq!(sink.records[0], Record::SectionHeader);
        assert_eq!(sink.records[1], Record::Interface(MediaType::Ethernet, 65535));
        assert_eq!(sink.records[3], Record::Interface(MediaType::Ethernet, 65535));

        let ids: Vec<u32> = sink
            .packets()
            .iter()
            .map(|r| match r {
                Record::Packet { interface_id, .. } => *interface_id,
                _ => unreachable!(),
            })
            .collect();
        // Packets keep trace order; ids follow the sorted interface list.
        assert_eq!(ids, vec![2, 1, 0]);
        assert_eq!(summary.stats.frames_converted, 3);
    }

    #[test]
    fn test_multi_fragment_frame() {
        let events = vec![
            TraceEvent::fragment(1, 1, Keywords::PACKET_START, EPOCH_TICKS, b"ab"),
            TraceEvent::fragment(1, 1, Keywords::empty(), EPOCH_TICKS, b"cd"),
            TraceEvent::fragment(1, 1, Keywords::PACKET_END, EPOCH_TICKS + 10, b"ef"),
        ];
        let (result, sink) = run(events);
        result.unwrap();

        let packets = sink.packets();
        assert_eq!(packets.len(), 1);
        assert_eq!(payload_of(packets[0]), b"abcdef");
        match packets[0] {
            Record::Packet { micros, .. } => assert_eq!(*micros, 1),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_direction_from_send_keyword() {
        let events = vec![
            TraceEvent::fragment(1, 1, SINGLE | Keywords::SEND, EPOCH_TICKS, &[1]),
            TraceEvent::fragment(1, 1, SINGLE | Keywords::RECEIVE, EPOCH_TICKS, &[2]),
        ];
        let (result, sink) = run(events);
        result.unwrap();

        let directions: Vec<Direction> = sink
            .packets()
            .iter()
            .map(|r| match r {
                Record::Packet { direction, .. } => *direction,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(directions, vec![Direction::Outbound, Direction::Inbound]);
    }

    #[test]
    fn test_privacy_bit_cleared_only_for_wifi() {
        let frame = [0x08, 0xC0, 0x00, 0x00];
        let events = vec![
            TraceEvent::fragment(1, 1, SINGLE | Keywords::MEDIA_NATIVE_802_11, EPOCH_TICKS, &frame),
            TraceEvent::fragment(2, 2, SINGLE, EPOCH_TICKS, &frame),
            TraceEvent::fragment(3, 3, SINGLE | Keywords::MEDIA_WIRELESS_WAN, EPOCH_TICKS, &frame),
        ];
        let (result, sink) = run(events);
        let summary = result.unwrap();

        let packets = sink.packets();
        assert_eq!(payload_of(packets[0])[1], 0x80);
        assert_eq!(payload_of(packets[1])[1], 0xC0);
        assert_eq!(payload_of(packets[2])[1], 0xC0);
        assert_eq!(summary.stats.protected_cleared, 1);
    }

    #[test]
    fn test_metadata_attaches_to_next_frame() {
        let record = RecvContext {
            receive_flags: 0,
            phy_id: 7,
            center_frequency: 6,
            mpdus_received: 1,
            rssi: -60,
            data_rate: 12,
            timestamp: 0,
        };
        let events = vec![
            TraceEvent::metadata(1, 1, Keywords::MEDIA_NATIVE_802_11, EPOCH_TICKS, &record.to_bytes()),
            TraceEvent::fragment(2, 2, SINGLE, EPOCH_TICKS, &[1]).with_pid(77),
            TraceEvent::fragment(2, 2, SINGLE, EPOCH_TICKS, &[2]).with_pid(78),
        ];
        let (result, sink) = run(events);
        let summary = result.unwrap();

        let packets = sink.packets();
        assert_eq!(
            comment_of(packets[0]),
            "Packet Metadata: ReceiveFlags:0x0, PhyType:802.11n, CenterCh:6, \
             NumMPDUsReceived:1, RSSI:-60, DataRate:12, PID=77"
        );
        assert_eq!(comment_of(packets[1]), "PID=78");
        assert_eq!(summary.stats.metadata_attached, 1);
    }

    #[test]
    fn test_bad_metadata_size_is_skipped() {
        let events = vec![
            TraceEvent::metadata(1, 1, Keywords::empty(), EPOCH_TICKS, &[0u8; 40]),
            TraceEvent::fragment(1, 1, SINGLE, EPOCH_TICKS, &[1]).with_pid(3),
        ];
        let (result, sink) = run(events);
        let summary = result.unwrap();

        assert_eq!(summary.stats.events_skipped, 1);
        assert_eq!(comment_of(sink.packets()[0]), "PID=3");
    }

    #[test]
    fn test_oversized_frame_is_dropped() {
        let big = vec![0u8; 40_000];
        let events = vec![
            TraceEvent::fragment(1, 1, Keywords::PACKET_START, EPOCH_TICKS, &big),
            TraceEvent::fragment(1, 1, Keywords::empty(), EPOCH_TICKS, &big),
            TraceEvent::fragment(1, 1, Keywords::PACKET_END, EPOCH_TICKS, &[1, 2]),
            TraceEvent::fragment(1, 1, SINGLE, EPOCH_TICKS, &[9]),
        ];
        let (result, sink) = run(events);
        let summary = result.unwrap();

        let packets = sink.packets();
        assert_eq!(packets.len(), 1);
        assert_eq!(payload_of(packets[0]), &[9]);
        assert_eq!(summary.stats.frames_dropped, 1);
        assert_eq!(summary.stats.frames_converted, 1);
    }

    #[test]
    fn test_frame_start_ends_dropped_frame_without_end_marker() {
        let big = vec![0u8; 40_000];
        let events = vec![
            TraceEvent::fragment(1, 1, Keywords::PACKET_START, EPOCH_TICKS, &big),
            TraceEvent::fragment(1, 1, Keywords::empty(), EPOCH_TICKS, &big),
            TraceEvent::fragment(2, 2, SINGLE, EPOCH_TICKS, &[0xAB]),
        ];
        let (result, sink) = run(events);
        let summary = result.unwrap();

        let packets = sink.packets();
        assert_eq!(packets.len(), 1);
        assert_eq!(payload_of(packets[0]), &[0xAB]);
        assert_eq!(summary.stats.frames_dropped, 1);
        assert_eq!(summary.stats.frames_converted, 1);
    }

    #[test]
    fn test_frame_start_discards_unterminated_frame() {
        let events = vec![
            TraceEvent::fragment(1, 1, Keywords::PACKET_START, EPOCH_TICKS, &[1, 2]),
            TraceEvent::fragment(1, 1, SINGLE, EPOCH_TICKS, &[3]),
        ];
        let (result, sink) = run(events);
        result.unwrap();

        let packets = sink.packets();
        assert_eq!(packets.len(), 1);
        assert_eq!(payload_of(packets[0]), &[3]);
    }

    #[test]
    fn test_dropped_frame_keeps_pending_metadata() {
        let record = RecvContext::default().to_bytes();
        let events = vec![
            TraceEvent::metadata(1, 1, Keywords::empty(), EPOCH_TICKS, &record),
            TraceEvent::fragment(1, 1, SINGLE, EPOCH_TICKS, &vec![0u8; 70_000]),
            TraceEvent::fragment(1, 1, SINGLE, EPOCH_TICKS, &[1]),
        ];
        let (result, sink) = run(events);
        result.unwrap();

        let packets = sink.packets();
        assert_eq!(packets.len(), 1);
        assert!(comment_of(packets[0]).starts_with("Packet Metadata:"));
    }

    #[test]
    fn test_missing_property_skips_event() {
        let mut broken = TraceEvent::fragment(1, 1, SINGLE, EPOCH_TICKS, &[1]);
        broken.properties.remove(property::FRAGMENT_SIZE);

        let mut no_lower = TraceEvent::fragment(4, 4, SINGLE, EPOCH_TICKS, &[4]);
        no_lower.properties.remove(property::LOWER_IF_INDEX);

        let events = vec![
            broken,
            no_lower,
            TraceEvent::fragment(1, 1, SINGLE, EPOCH_TICKS, &[2]),
        ];
        let (result, sink) = run(events);
        let summary = result.unwrap();

        assert_eq!(summary.interfaces.len(), 1);
        let packets = sink.packets();
        assert_eq!(packets.len(), 1);
        assert_eq!(payload_of(packets[0]), &[2]);
        // no_lower fails in both passes, broken only in pass 2.
        assert_eq!(summary.stats.events_skipped, 3);
    }

    #[test]
    fn test_non_integer_index_skips_event() {
        let mut negative = TraceEvent::fragment(1, 1, SINGLE, EPOCH_TICKS, &[1]);
        negative.properties.insert(
            property::LOWER_IF_INDEX.to_string(),
            PropertyValue::Other(serde_json::json!(-1)),
        );

        let events = vec![negative, TraceEvent::fragment(2, 2, SINGLE, EPOCH_TICKS, &[2])];
        let (result, sink) = run(events);
        let summary = result.unwrap();

        assert_eq!(summary.interfaces.len(), 1);
        assert_eq!(summary.stats.events_skipped, 2);
        assert_eq!(payload_of(sink.packets()[0]), &[2]);
    }

    #[test]
    fn test_missing_fragment_on_frame_end_discards_partial_frame() {
        let mut end = TraceEvent::fragment(1, 1, Keywords::PACKET_END, EPOCH_TICKS, &[2]);
        end.properties.remove(property::FRAGMENT);

        let events = vec![
            TraceEvent::fragment(1, 1, Keywords::PACKET_START, EPOCH_TICKS, &[1]),
            end,
            TraceEvent::fragment(1, 1, SINGLE, EPOCH_TICKS, &[3]),
        ];
        let (result, sink) = run(events);
        result.unwrap();

        let packets = sink.packets();
        assert_eq!(packets.len(), 1);
        assert_eq!(payload_of(packets[0]), &[3]);
    }

    #[test]
    fn test_foreign_events_are_ignored() {
        let events = vec![
            TraceEvent::fragment(1, 1, SINGLE, EPOCH_TICKS, &[1]).with_provider(Uuid::nil()),
            TraceEvent::fragment(2, 2, SINGLE, EPOCH_TICKS, &[2]),
        ];
        let (result, sink) = run(events);
        let summary = result.unwrap();

        assert_eq!(summary.interfaces.len(), 1);
        assert_eq!(sink.packets().len(), 1);
        assert_eq!(summary.stats.events_ignored, 1);
    }

    #[test]
    fn test_unknown_interface_in_pass_two_is_fatal() {
        let mut pipeline = ConversionPipeline::new(RecordingSink::default());
        pipeline.start().unwrap();
        pipeline
            .discover(&TraceEvent::fragment(1, 1, SINGLE, EPOCH_TICKS, &[1]))
            .unwrap();
        pipeline.finalize().unwrap();

        let err = pipeline
            .convert(&TraceEvent::fragment(9, 9, SINGLE, EPOCH_TICKS, &[1]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Conversion(ConversionError::UnknownInterface { lower_if_index: 9 })
        ));
    }

    #[test]
    fn test_passes_can_be_driven_separately() {
        let source = MemoryEventSource::new(vec![
            TraceEvent::fragment(4, 4, SINGLE, EPOCH_TICKS, &[1]),
            TraceEvent::fragment(4, 4, Keywords::PACKET_START, EPOCH_TICKS, &[2]),
        ]);
        let config = ConversionConfig { snap_len: 1500 };
        let mut pipeline = ConversionPipeline::with_config(RecordingSink::default(), config);
        assert_eq!(pipeline.config().snap_len, 1500);
        assert_eq!(pipeline.context().assembler.capacity(), 1500);

        let interfaces = pipeline.run_discovery(&source).unwrap();
        assert_eq!(interfaces.len(), 1);
        assert_eq!(pipeline.state(), PipelineState::Conversion);
        assert!(pipeline.context().interfaces.is_finalized());
        assert_eq!(
            pipeline.sink().records[1],
            Record::Interface(MediaType::Ethernet, 1500)
        );
        assert!(pipeline.sink().packets().is_empty());

        let summary = pipeline.run_conversion(&source).unwrap();
        assert_eq!(summary.stats.frames_converted, 1);
        assert_eq!(pipeline.stats(), summary.stats);
        assert_eq!(pipeline.sink().packets().len(), 1);
    }

    #[test]
    fn test_steps_out_of_order_are_rejected() {
        let mut pipeline = ConversionPipeline::new(RecordingSink::default());
        let event = TraceEvent::fragment(1, 1, SINGLE, EPOCH_TICKS, &[1]);

        assert!(pipeline.convert(&event).is_err());
        assert!(pipeline.finish().is_err());

        pipeline.start().unwrap();
        assert!(pipeline.start().is_err());
        pipeline.discover(&event).unwrap();
        pipeline.finalize().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Conversion);

        assert!(pipeline.discover(&event).is_err());
        pipeline.convert(&event).unwrap();
        pipeline.finish().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Done);
    }

    #[test]
    fn test_empty_trace() {
        let (result, sink) = run(Vec::new());
        let summary = result.unwrap();
        assert!(summary.interfaces.is_empty());
        assert_eq!(sink.records, vec![Record::SectionHeader]);
    }

    #[test]
    fn test_trailing_partial_frame_is_not_emitted() {
        let events = vec![TraceEvent::fragment(1, 1, Keywords::PACKET_START, EPOCH_TICKS, &[1])];
        let (result, sink) = run(events);
        result.unwrap();
        assert!(sink.packets().is_empty());
    }
}
