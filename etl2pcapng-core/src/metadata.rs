//! 802.11 receive metadata and packet comments.
//!
//! A metadata event carries the driver's extensible-station receive context
//! for the frame that follows it. The converter keeps the most recent record
//! in a [`MetadataCache`] and renders it into the comment of the next frame
//! it emits.
//!
//! The cache is a single slot. It is not keyed by interface, so when frames
//! of several interfaces interleave a record can end up on another
//! interface's frame.

use std::fmt;

use crate::error::EventError;

/// Size of the receive-context record on 64-bit Windows.
pub const RECV_CONTEXT_SIZE: usize = 48;

/// Longest comment an enhanced packet block can carry.
pub const MAX_COMMENT_LEN: usize = 65535;

/// Upper bound of the process-id-only comment.
pub const PID_COMMENT_MAX_LEN: usize = 16;

const PHY_TYPE_NAMES: [&str; 11] = [
    "Unknown",
    "Fhss",
    "Dsss",
    "IrBaseband",
    "802.11a",
    "802.11b",
    "802.11g",
    "802.11n",
    "802.11ac",
    "802.11ad",
    "802.11ax",
];

/// 802.11 PHY id as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhyType(pub u32);

impl PhyType {
    pub fn name(self) -> Option<&'static str> {
        PHY_TYPE_NAMES.get(self.0 as usize).copied()
    }
}

impl fmt::Display for PhyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "Unknown({})", self.0),
        }
    }
}

/// Decoded receive context.
///
/// Layout (little-endian, 8-byte packing):
///
/// | Offset | Size | Field |
/// |--------|------|-------|
/// | 0 | 4 | object header |
/// | 4 | 4 | receive flags |
/// | 8 | 4 | PHY id |
/// | 12 | 4 | center channel frequency |
/// | 16 | 2 | MPDUs received |
/// | 20 | 4 | RSSI (signed) |
/// | 24 | 1 | data rate |
/// | 28 | 4 | media-specific info size |
/// | 32 | 8 | media-specific info pointer |
/// | 40 | 8 | timestamp |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecvContext {
    pub receive_flags: u32,
    pub phy_id: u32,
    pub center_frequency: u32,
    pub mpdus_received: u16,
    pub rssi: i32,
    pub data_rate: u8,
    pub timestamp: u64,
}

impl RecvContext {
    /// Decode a record of exactly [`RECV_CONTEXT_SIZE`] bytes.
    pub fn parse(record: &[u8]) -> Result<Self, EventError> {
        if record.len() != RECV_CONTEXT_SIZE {
            return Err(EventError::UnsupportedMetadataSize {
                expected: RECV_CONTEXT_SIZE,
                actual: record.len() as u32,
            });
        }

        let u32_at = |off: usize| {
            u32::from_le_bytes([record[off], record[off + 1], record[off + 2], record[off + 3]])
        };
        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&record[40..48]);

        Ok(Self {
            receive_flags: u32_at(4),
            phy_id: u32_at(8),
            center_frequency: u32_at(12),
            mpdus_received: u16::from_le_bytes([record[16], record[17]]),
            rssi: u32_at(20) as i32,
            data_rate: record[24],
            timestamp: u64::from_le_bytes(timestamp),
        })
    }

    /// Encode back to the on-wire layout. Header, media-specific fields and
    /// padding are zero.
    pub fn to_bytes(&self) -> [u8; RECV_CONTEXT_SIZE] {
        let mut out = [0u8; RECV_CONTEXT_SIZE];
        out[4..8].copy_from_slice(&self.receive_flags.to_le_bytes());
        out[8..12].copy_from_slice(&self.phy_id.to_le_bytes());
        out[12..16].copy_from_slice(&self.center_frequency.to_le_bytes());
        out[16..18].copy_from_slice(&self.mpdus_received.to_le_bytes());
        out[20..24].copy_from_slice(&self.rssi.to_le_bytes());
        out[24] = self.data_rate;
        out[40..48].copy_from_slice(&self.timestamp.to_le_bytes());
        out
    }

    pub fn phy_type(&self) -> PhyType {
        PhyType(self.phy_id)
    }
}

/// Holds at most one receive context waiting for the next frame.
#[derive(Debug, Default)]
pub struct MetadataCache {
    pending: Option<RecvContext>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record, replacing any record still pending.
    pub fn set(&mut self, record: RecvContext) {
        if self.pending.replace(record).is_some() {
            tracing::trace!("pending metadata replaced before use");
        }
    }

    /// Take the pending record, leaving the slot empty.
    pub fn take(&mut self) -> Option<RecvContext> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Comment for a frame with attached receive metadata.
pub fn metadata_comment(metadata: &RecvContext, pid: u32) -> String {
    let mut comment = format!(
        "Packet Metadata: ReceiveFlags:0x{:x}, PhyType:{}, CenterCh:{}, NumMPDUsReceived:{}, RSSI:{}, DataRate:{}, PID={}",
        metadata.receive_flags,
        metadata.phy_type(),
        metadata.center_frequency,
        metadata.mpdus_received,
        metadata.rssi,
        metadata.data_rate,
        pid,
    );
    truncate_at_char_boundary(&mut comment, MAX_COMMENT_LEN);
    comment
}

/// Comment for a frame without metadata.
pub fn pid_comment(pid: u32) -> String {
    let mut comment = format!("PID={pid}");
    truncate_at_char_boundary(&mut comment, PID_COMMENT_MAX_LEN - 1);
    comment
}

/// Build the comment for the next emitted frame, consuming pending metadata.
pub fn frame_comment(cache: &mut MetadataCache, pid: u32) -> (String, bool) {
    match cache.take() {
        Some(metadata) => (metadata_comment(&metadata, pid), true),
        None => (pid_comment(pid), false),
    }
}

pub(crate) fn truncate_at_char_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}
