//! pcapng output.
//!
//! The conversion pipeline talks to its output through [`CaptureSink`].
//! [`PcapNgWriter`] is the file implementation; the block encoders in
//! [`block`] are pure functions returning complete blocks.

pub mod block;
mod writer;

use crate::error::Result;
use crate::interface::MediaType;
use crate::timestamp::Timestamp;

pub use writer::PcapNgWriter;

/// Direction of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    /// Value of the `epb_flags` direction bits.
    pub fn epb_flags(self) -> u32 {
        match self {
            Direction::Inbound => 1,
            Direction::Outbound => 2,
        }
    }
}

/// One frame ready to be written.
#[derive(Debug, Clone, Copy)]
pub struct PacketRecord<'a> {
    pub interface_id: u32,
    pub direction: Direction,
    pub timestamp: Timestamp,
    pub payload: &'a [u8],
    pub comment: Option<&'a str>,
}

/// Destination of the converted capture.
pub trait CaptureSink {
    /// Start the capture section. Called once, before anything else.
    fn write_section_header(&mut self) -> Result<()>;

    /// Declare the next interface. The n-th call declares interface id n.
    fn write_interface_description(&mut self, media_type: MediaType, snap_len: u32) -> Result<()>;

    /// Write one frame.
    fn write_enhanced_packet(&mut self, packet: &PacketRecord<'_>) -> Result<()>;
}

impl<S: CaptureSink + ?Sized> CaptureSink for &mut S {
    fn write_section_header(&mut self) -> Result<()> {
        (**self).write_section_header()
    }

    fn write_interface_description(&mut self, media_type: MediaType, snap_len: u32) -> Result<()> {
        (**self).write_interface_description(media_type, snap_len)
    }

    fn write_enhanced_packet(&mut self, packet: &PacketRecord<'_>) -> Result<()> {
        (**self).write_enhanced_packet(packet)
    }
}
