//! pcapng block encoders (little-endian).
//!
//! Every block is `type | total length | body | options | total length`,
//! with the body and each option padded to 32 bits.

use std::io;

use super::PacketRecord;

pub const BLOCK_TYPE_SECTION_HEADER: u32 = 0x0A0D_0D0A;
pub const BLOCK_TYPE_INTERFACE_DESCRIPTION: u32 = 0x0000_0001;
pub const BLOCK_TYPE_ENHANCED_PACKET: u32 = 0x0000_0006;

pub const BYTE_ORDER_MAGIC: u32 = 0x1A2B_3C4D;

pub const OPT_ENDOFOPT: u16 = 0;
pub const OPT_COMMENT: u16 = 1;
pub const OPT_EPB_FLAGS: u16 = 2;
pub const OPT_SHB_USERAPPL: u16 = 4;

/// Build a Section Header Block, version 1.0, section length unspecified.
pub fn section_header_block(user_appl: &str) -> io::Result<Vec<u8>> {
    let mut body = Vec::with_capacity(16);
    body.extend_from_slice(&BYTE_ORDER_MAGIC.to_le_bytes());
    body.extend_from_slice(&1u16.to_le_bytes()); // major
    body.extend_from_slice(&0u16.to_le_bytes()); // minor
    body.extend_from_slice(&(-1i64).to_le_bytes());

    let mut opts = Vec::new();
    if !user_appl.is_empty() {
        write_opt(&mut opts, OPT_SHB_USERAPPL, user_appl.as_bytes())?;
        write_opt_end(&mut opts);
    }

    build_block(BLOCK_TYPE_SECTION_HEADER, &body, &opts)
}

/// Build an Interface Description Block without options.
pub fn interface_description_block(link_type: u16, snap_len: u32) -> io::Result<Vec<u8>> {
    let mut body = Vec::with_capacity(8);
    body.extend_from_slice(&link_type.to_le_bytes());
    body.extend_from_slice(&0u16.to_le_bytes()); // reserved
    body.extend_from_slice(&snap_len.to_le_bytes());

    build_block(BLOCK_TYPE_INTERFACE_DESCRIPTION, &body, &[])
}

/// Build an Enhanced Packet Block.
///
/// Captured and original length are both the payload length; truncation is
/// not represented.
pub fn enhanced_packet_block(packet: &PacketRecord<'_>) -> io::Result<Vec<u8>> {
    let payload_len = u32::try_from(packet.payload.len())
        .map_err(|_| invalid_input("packet payload exceeds 4 GiB"))?;
    let (ts_high, ts_low) = packet.timestamp.to_pcapng_words();

    let mut body = Vec::with_capacity(20 + packet.payload.len() + 3);
    body.extend_from_slice(&packet.interface_id.to_le_bytes());
    body.extend_from_slice(&ts_high.to_le_bytes());
    body.extend_from_slice(&ts_low.to_le_bytes());
    body.extend_from_slice(&payload_len.to_le_bytes()); // captured
    body.extend_from_slice(&payload_len.to_le_bytes()); // original
    body.extend_from_slice(packet.payload);
    pad_to_32(&mut body);

    let mut opts = Vec::new();
    write_opt(&mut opts, OPT_EPB_FLAGS, &packet.direction.epb_flags().to_le_bytes())?;
    if let Some(comment) = packet.comment.filter(|c| !c.is_empty()) {
        write_opt(&mut opts, OPT_COMMENT, comment.as_bytes())?;
    }
    write_opt_end(&mut opts);

    build_block(BLOCK_TYPE_ENHANCED_PACKET, &body, &opts)
}

fn pad_to_32(buf: &mut Vec<u8>) {
    let pad_len = (4 - (buf.len() % 4)) % 4;
    buf.extend(std::iter::repeat(0u8).take(pad_len));
}

fn build_block(block_type: u32, body: &[u8], opts: &[u8]) -> io::Result<Vec<u8>> {
    let total_len = 12 + body.len() + opts.len();
    let total_len_u32 =
        u32::try_from(total_len).map_err(|_| invalid_input("pcapng block too large"))?;

    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&block_type.to_le_bytes());
    out.extend_from_slice(&total_len_u32.to_le_bytes());
    out.extend_from_slice(body);
    out.extend_from_slice(opts);
    out.extend_from_slice(&total_len_u32.to_le_bytes());
    Ok(out)
}

fn write_opt_end(out: &mut Vec<u8>) {
    out.extend_from_slice(&OPT_ENDOFOPT.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
}

fn write_opt(out: &mut Vec<u8>, code: u16, val: &[u8]) -> io::Result<()> {
    let len = u16::try_from(val.len()).map_err(|_| invalid_input("pcapng option too large"))?;
    out.extend_from_slice(&code.to_le_bytes());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(val);
    pad_to_32(out);
    Ok(())
}

fn invalid_input(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}
