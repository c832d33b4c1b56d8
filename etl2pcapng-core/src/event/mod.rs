//! Decoded trace events and the sources that replay them.
//!
//! The conversion engine never touches raw trace buffers. It consumes
//! [`TraceEvent`] values that already carry the provider id, event id,
//! keyword mask, timestamp, process id and named properties of one record
//! written by the NDIS packet-capture provider.
//!
//! Events come from an [`EventSource`]. A source must be replayable: every
//! call to [`EventSource::reader`] starts a fresh traversal of the same
//! finite sequence, because the converter walks the trace twice.

mod jsonl;

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use uuid::{uuid, Uuid};

use crate::error::{EventError, Result};

pub use jsonl::{Compression, FileEventSource, JsonLinesReader};

/// Microsoft-Windows-NDIS-PacketCapture.
pub const NDIS_PACKET_CAPTURE_PROVIDER: Uuid = uuid!("2ed6006e-4729-4609-b423-3ee7bcd678ef");

/// Property names used by the capture provider's events.
pub mod property {
    pub const LOWER_IF_INDEX: &str = "LowerIfIndex";
    pub const MINIPORT_IF_INDEX: &str = "MiniportIfIndex";
    pub const METADATA_SIZE: &str = "MetadataSize";
    pub const METADATA: &str = "Metadata";
    pub const FRAGMENT_SIZE: &str = "FragmentSize";
    pub const FRAGMENT: &str = "Fragment";
}

bitflags! {
    /// Keyword bits of the capture provider's manifest.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Keywords: u64 {
        const MEDIA_WIRELESS_WAN = 0x200;
        const MEDIA_NATIVE_802_11 = 0x1_0000;
        const PACKET_START = 0x4000_0000;
        const PACKET_END = 0x8000_0000;
        const SEND = 0x1_0000_0000;
        const RECEIVE = 0x2_0000_0000;
    }
}

/// Capture events the converter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A chunk of a frame (event 1001)
    PacketFragment,
    /// 802.11 receive metadata for the next frame (event 1002)
    PacketMetadata,
    /// A chunk of a frame seen by the virtual switch (event 1003)
    VmSwitchPacketFragment,
}

impl EventKind {
    /// Event id in the provider manifest.
    pub const fn id(self) -> u16 {
        match self {
            EventKind::PacketFragment => 1001,
            EventKind::PacketMetadata => 1002,
            EventKind::VmSwitchPacketFragment => 1003,
        }
    }

    /// Map a manifest event id back to a kind.
    pub fn from_id(id: u16) -> Option<Self> {
        match id {
            1001 => Some(EventKind::PacketFragment),
            1002 => Some(EventKind::PacketMetadata),
            1003 => Some(EventKind::VmSwitchPacketFragment),
            _ => None,
        }
    }

    /// Whether the event carries frame bytes.
    pub fn is_fragment(self) -> bool {
        matches!(
            self,
            EventKind::PacketFragment | EventKind::VmSwitchPacketFragment
        )
    }
}

/// A single named property value.
///
/// Integers are stored as decoded; byte blobs stay base64 text until a
/// caller asks for them, so a corrupt blob only affects the event that
/// reads it. Any other JSON value is kept as is and rejected on access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Int(u64),
    Text(String),
    Other(serde_json::Value),
}

impl PropertyValue {
    fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Int(_) => "integer",
            PropertyValue::Text(_) => "string",
            PropertyValue::Other(serde_json::Value::Null) => "null",
            PropertyValue::Other(serde_json::Value::Number(_)) => "number",
            PropertyValue::Other(_) => "structured value",
        }
    }
}

/// One decoded trace event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Provider that wrote the event
    pub provider: Uuid,
    /// Event id within the provider manifest
    pub id: u16,
    /// Keyword bitmask
    #[serde(with = "keyword_bits")]
    pub keywords: Keywords,
    /// 100 ns intervals since 1601-01-01T00:00:00Z
    pub timestamp: i64,
    /// Process that was running when the event fired
    #[serde(default)]
    pub pid: u32,
    /// Named properties
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl TraceEvent {
    /// Create a capture-provider event with no properties.
    pub fn new(kind: EventKind, keywords: Keywords, timestamp: i64) -> Self {
        Self {
            provider: NDIS_PACKET_CAPTURE_PROVIDER,
            id: kind.id(),
            keywords,
            timestamp,
            pid: 0,
            properties: BTreeMap::new(),
        }
    }

    /// Build a fragment event carrying `payload`.
    pub fn fragment(
        lower_if_index: u32,
        miniport_if_index: u32,
        keywords: Keywords,
        timestamp: i64,
        payload: &[u8],
    ) -> Self {
        Self::new(EventKind::PacketFragment, keywords, timestamp)
            .with_u32(property::LOWER_IF_INDEX, lower_if_index)
            .with_u32(property::MINIPORT_IF_INDEX, miniport_if_index)
            .with_u32(property::FRAGMENT_SIZE, payload.len() as u32)
            .with_bytes(property::FRAGMENT, payload)
    }

    /// Build a metadata event carrying a raw receive-context record.
    pub fn metadata(
        lower_if_index: u32,
        miniport_if_index: u32,
        keywords: Keywords,
        timestamp: i64,
        record: &[u8],
    ) -> Self {
        Self::new(EventKind::PacketMetadata, keywords, timestamp)
            .with_u32(property::LOWER_IF_INDEX, lower_if_index)
            .with_u32(property::MINIPORT_IF_INDEX, miniport_if_index)
            .with_u32(property::METADATA_SIZE, record.len() as u32)
            .with_bytes(property::METADATA, record)
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn with_provider(mut self, provider: Uuid) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_u32(mut self, name: &str, value: u32) -> Self {
        self.properties
            .insert(name.to_string(), PropertyValue::Int(u64::from(value)));
        self
    }

    pub fn with_bytes(mut self, name: &str, value: &[u8]) -> Self {
        self.properties
            .insert(name.to_string(), PropertyValue::Text(BASE64.encode(value)));
        self
    }

    /// The capture event this is, or `None` for events the converter ignores
    /// (another provider, or an event id outside the capture set).
    pub fn kind(&self) -> Option<EventKind> {
        if self.provider != NDIS_PACKET_CAPTURE_PROVIDER {
            return None;
        }
        EventKind::from_id(self.id)
    }

    /// Read a 32-bit unsigned property.
    pub fn u32_property(&self, name: &'static str) -> std::result::Result<u32, EventError> {
        match self.properties.get(name) {
            None => Err(EventError::MissingProperty {
                event_id: self.id,
                property: name,
            }),
            Some(PropertyValue::Int(value)) => {
                u32::try_from(*value).map_err(|_| EventError::InvalidProperty {
                    event_id: self.id,
                    property: name,
                    reason: format!("{value} does not fit in 32 bits"),
                })
            }
            Some(other) => Err(EventError::InvalidProperty {
                event_id: self.id,
                property: name,
                reason: format!("expected an integer, found {}", other.type_name()),
            }),
        }
    }

    /// Read the first `len` bytes of a binary property.
    ///
    /// Fails when the property holds fewer than `len` bytes. Extra bytes are
    /// ignored, matching how the provider lays several payload properties
    /// out back to back.
    pub fn bytes_property(
        &self,
        name: &'static str,
        len: usize,
    ) -> std::result::Result<Vec<u8>, EventError> {
        let text = match self.properties.get(name) {
            None => {
                return Err(EventError::MissingProperty {
                    event_id: self.id,
                    property: name,
                })
            }
            Some(PropertyValue::Text(text)) => text,
            Some(other) => {
                return Err(EventError::InvalidProperty {
                    event_id: self.id,
                    property: name,
                    reason: format!("expected base64 bytes, found {}", other.type_name()),
                })
            }
        };

        let mut bytes = BASE64
            .decode(text)
            .map_err(|e| EventError::InvalidProperty {
                event_id: self.id,
                property: name,
                reason: e.to_string(),
            })?;

        if bytes.len() < len {
            return Err(EventError::InvalidProperty {
                event_id: self.id,
                property: name,
                reason: format!("need {len} bytes, have {}", bytes.len()),
            });
        }
        bytes.truncate(len);
        Ok(bytes)
    }
}

mod keyword_bits {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Keywords;

    pub fn serialize<S: Serializer>(keywords: &Keywords, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(keywords.bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Keywords, D::Error> {
        u64::deserialize(d).map(Keywords::from_bits_retain)
    }
}

/// Sequential reader over one traversal of a trace.
pub trait EventReader {
    /// Read the next event.
    ///
    /// Returns `Ok(None)` once the trace is exhausted.
    fn next_event(&mut self) -> Result<Option<TraceEvent>>;
}

/// A finite, replayable sequence of trace events.
pub trait EventSource {
    type Reader: EventReader;

    /// Start a new traversal from the first event.
    fn reader(&self) -> Result<Self::Reader>;
}

/// Replayable in-memory event list.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventSource {
    events: Arc<[TraceEvent]>,
}

impl MemoryEventSource {
    pub fn new(events: Vec<TraceEvent>) -> Self {
        Self {
            events: events.into(),
        }
    }

    /// Drain another reader into memory.
    pub fn from_reader<R: EventReader>(mut reader: R) -> Result<Self> {
        let mut events = Vec::new();
        while let Some(event) = reader.next_event()? {
            events.push(event);
        }
        Ok(Self::new(events))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSource for MemoryEventSource {
    type Reader = MemoryEventReader;

    fn reader(&self) -> Result<Self::Reader> {
        Ok(MemoryEventReader {
            events: Arc::clone(&self.events),
            position: 0,
        })
    }
}

/// Reader for [`MemoryEventSource`].
#[derive(Debug)]
pub struct MemoryEventReader {
    events: Arc<[TraceEvent]>,
    position: usize,
}

impl EventReader for MemoryEventReader {
    fn next_event(&mut self) -> Result<Option<TraceEvent>> {
        let event = self.events.get(self.position).cloned();
        if event.is_some() {
            self.position += 1;
        }
        Ok(event)
    }
}
