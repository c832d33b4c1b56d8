//! Trace timestamp conversion.
//!
//! Trace events are stamped in 100 ns ticks since 1601-01-01T00:00:00Z.
//! pcapng enhanced packet blocks use microseconds since the Unix epoch by
//! default, stored as two 32-bit words.

/// Microseconds between 1601-01-01 and 1970-01-01.
pub const EPOCH_DIFFERENCE_MICROS: i64 = 11_644_473_600_000_000;

/// Ticks (100 ns) per microsecond.
const TICKS_PER_MICRO: i64 = 10;

const MICROS_PER_SECOND: i64 = 1_000_000;

/// A capture timestamp in microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    micros: i64,
}

impl Timestamp {
    pub const fn from_unix_micros(micros: i64) -> Self {
        Self { micros }
    }

    /// Convert a trace timestamp (100 ns ticks since 1601).
    pub const fn from_filetime(ticks: i64) -> Self {
        Self {
            micros: ticks / TICKS_PER_MICRO - EPOCH_DIFFERENCE_MICROS,
        }
    }

    pub const fn as_micros(self) -> i64 {
        self.micros
    }

    /// Whole seconds since the epoch.
    pub const fn secs(self) -> i64 {
        self.micros.div_euclid(MICROS_PER_SECOND)
    }

    /// Microseconds past [`secs`](Self::secs), always in `0..1_000_000`.
    pub const fn subsec_micros(self) -> u32 {
        self.micros.rem_euclid(MICROS_PER_SECOND) as u32
    }

    /// High and low 32-bit words of the microsecond count, as written into
    /// an enhanced packet block.
    pub const fn to_pcapng_words(self) -> (u32, u32) {
        let raw = self.micros as u64;
        ((raw >> 32) as u32, raw as u32)
    }
}
