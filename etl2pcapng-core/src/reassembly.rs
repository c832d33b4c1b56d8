//! Frame reassembly from fragment events.
//!
//! The provider traces a frame as one or more consecutive fragment events.
//! A single-event frame carries both `PACKET_START` and `PACKET_END`; a
//! multi-event frame has `PACKET_START` on its first event, `PACKET_END` on
//! its last, and zero or more unmarked events in between. Fragments are
//! appended until the end marker shows up; a start marker resets whatever
//! an unterminated earlier frame left behind.

use bytes::BytesMut;

use crate::error::EventError;

/// Largest frame the converter will emit.
pub const MAX_FRAME_SIZE: usize = 65535;

/// Accumulates fragments into a single frame buffer.
#[derive(Debug)]
pub struct FragmentAssembler {
    buffer: BytesMut,
    capacity: usize,
    /// Set after an overflow; remaining fragments of that frame are dropped.
    discarding: bool,
}

impl Default for FragmentAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FragmentAssembler {
    pub fn new() -> Self {
        Self::with_capacity(MAX_FRAME_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            capacity,
            discarding: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes accumulated for the current frame.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Whether the current frame was dropped and is being skipped.
    pub fn is_discarding(&self) -> bool {
        self.discarding
    }

    /// Start a new frame, abandoning any unterminated one.
    ///
    /// Clears the discard state of a dropped frame whose end marker never
    /// arrived. Returns the number of buffered bytes thrown away.
    pub fn begin_frame(&mut self) -> usize {
        self.discarding = false;
        let stale = self.buffer.len();
        self.buffer.clear();
        stale
    }

    /// Append a fragment to the current frame.
    ///
    /// If the frame would exceed the capacity, everything buffered so far is
    /// thrown away and `FrameTooLarge` is returned. The rest of that frame is
    /// then ignored up to its end marker, see [`finish_frame`](Self::finish_frame).
    pub fn append(&mut self, fragment: &[u8]) -> Result<(), EventError> {
        if self.discarding {
            return Ok(());
        }

        let size = self.buffer.len() + fragment.len();
        if size > self.capacity {
            self.buffer.clear();
            self.discarding = true;
            return Err(EventError::FrameTooLarge {
                size,
                max: self.capacity,
            });
        }

        self.buffer.extend_from_slice(fragment);
        Ok(())
    }

    /// Close the current frame and return its bytes.
    ///
    /// Returns `None` if the frame was dropped. Either way the assembler is
    /// empty afterwards and ready for the next frame.
    pub fn finish_frame(&mut self) -> Option<BytesMut> {
        if std::mem::take(&mut self.discarding) {
            self.buffer.clear();
            return None;
        }
        let frame = self.buffer.split();
        self.buffer.reserve(self.capacity);
        Some(frame)
    }
}

/// Clears a bit mask at a fixed byte offset of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitClear {
    pub offset: usize,
    pub mask: u8,
}

/// The 802.11 frame-control "Protected Frame" flag (byte 1, bit 6).
///
/// Frames logged by the capture provider are already decrypted, so a set
/// flag would make viewers try to decrypt plaintext.
pub const DOT11_PROTECTED_FRAME: BitClear = BitClear {
    offset: 1,
    mask: 0x40,
};

impl BitClear {
    /// Clear the bits in place. Returns true if any bit was set.
    ///
    /// Frames shorter than `offset + 1` are left alone.
    pub fn apply(&self, frame: &mut [u8]) -> bool {
        match frame.get_mut(self.offset) {
            Some(byte) if *byte & self.mask != 0 => {
                *byte &= !self.mask;
                true
            }
            _ => false,
        }
    }
}
