use std::io::Write;

use super::block;
use super::{CaptureSink, PacketRecord};
use crate::error::Result;
use crate::interface::MediaType;

/// Writes pcapng blocks to any `Write` destination.
///
/// Wrap files in a `BufWriter`; every block is a separate `write_all`.
pub struct PcapNgWriter<W: Write> {
    inner: W,
    user_application: String,
    interfaces_written: u32,
    packets_written: u64,
    bytes_written: u64,
}

impl<W: Write> PcapNgWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_user_application(inner, "")
    }

    /// Record `user_application` in the section header.
    pub fn with_user_application(inner: W, user_application: impl Into<String>) -> Self {
        Self {
            inner,
            user_application: user_application.into(),
            interfaces_written: 0,
            packets_written: 0,
            bytes_written: 0,
        }
    }

    pub fn interfaces_written(&self) -> u32 {
        self.interfaces_written
    }

    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush and return the destination.
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn put(&mut self, block: &[u8]) -> Result<()> {
        self.inner.write_all(block)?;
        self.bytes_written += block.len() as u64;
        Ok(())
    }
}

impl<W: Write> CaptureSink for PcapNgWriter<W> {
    fn write_section_header(&mut self) -> Result<()> {
        let block = block::section_header_block(&self.user_application)?;
        self.put(&block)
    }

    fn write_interface_description(&mut self, media_type: MediaType, snap_len: u32) -> Result<()> {
        let block = block::interface_description_block(media_type.link_type(), snap_len)?;
        self.put(&block)?;
        self.interfaces_written += 1;
        Ok(())
    }

    fn write_enhanced_packet(&mut self, packet: &PacketRecord<'_>) -> Result<()> {
        let block = block::enhanced_packet_block(packet)?;
        self.put(&block)?;
        self.packets_written += 1;
        Ok(())
    }
}
