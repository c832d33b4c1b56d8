//! JSON Lines event dumps.
//!
//! Each non-blank line holds one [`TraceEvent`]:
//!
//! ```text
//! {"provider":"2ed6006e-4729-4609-b423-3ee7bcd678ef","id":1001,"keywords":3221291008,
//!  "timestamp":132514560000000000,"pid":4,
//!  "properties":{"LowerIfIndex":7,"MiniportIfIndex":5,"FragmentSize":4,"Fragment":"3q2+7w=="}}
//! ```
//!
//! Gzip-compressed dumps are recognised by their magic bytes.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

#[cfg(feature = "compress-gzip")]
use flate2::read::GzDecoder;

use super::{EventReader, EventSource, TraceEvent};
use crate::error::{Error, Result, SourceError};

/// Detected compression of an event dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// No compression
    None,
    /// Gzip (.gz)
    #[cfg(feature = "compress-gzip")]
    Gzip,
}

impl Compression {
    /// Detect compression format from magic bytes.
    pub fn detect(data: &[u8]) -> Self {
        match data {
            #[cfg(feature = "compress-gzip")]
            [0x1f, 0x8b, ..] => Compression::Gzip,
            _ => Compression::None,
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            #[cfg(feature = "compress-gzip")]
            Compression::Gzip => write!(f, "gzip"),
        }
    }
}

/// Event dump stored in a file.
///
/// Every [`reader`](EventSource::reader) call reopens the file, so the two
/// conversion passes see exactly the same events.
#[derive(Debug, Clone)]
pub struct FileEventSource {
    path: PathBuf,
    compression: Compression,
}

impl FileEventSource {
    /// Open a dump and detect its compression.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = open_file(&path)?;

        let mut magic = [0u8; 2];
        let read = read_up_to(&mut file, &mut magic)?;
        let compression = Compression::detect(&magic[..read]);
        tracing::debug!(path = %path.display(), %compression, "opened event dump");

        Ok(Self { path, compression })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }
}

impl EventSource for FileEventSource {
    type Reader = JsonLinesReader<Box<dyn BufRead>>;

    fn reader(&self) -> Result<Self::Reader> {
        let file = open_file(&self.path)?;
        let inner: Box<dyn BufRead> = match self.compression {
            Compression::None => Box::new(BufReader::new(file)),
            #[cfg(feature = "compress-gzip")]
            Compression::Gzip => Box::new(BufReader::new(GzDecoder::new(file))),
        };
        Ok(JsonLinesReader::new(inner))
    }
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| {
        Error::Source(SourceError::Open {
            path: path.display().to_string(),
            source,
        })
    })
}

fn read_up_to(file: &mut File, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(filled)
}

/// Reads one [`TraceEvent`] per line from any buffered source.
pub struct JsonLinesReader<R: BufRead> {
    inner: R,
    line: String,
    line_number: u64,
}

impl<R: BufRead> JsonLinesReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: String::new(),
            line_number: 0,
        }
    }

    /// Number of lines consumed so far.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }
}

impl<R: BufRead> EventReader for JsonLinesReader<R> {
    fn next_event(&mut self) -> Result<Option<TraceEvent>> {
        loop {
            self.line.clear();
            let read = self.inner.read_line(&mut self.line).map_err(|e| {
                Error::Source(SourceError::Malformed {
                    line: self.line_number + 1,
                    reason: e.to_string(),
                })
            })?;
            if read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let text = self.line.trim();
            if text.is_empty() {
                continue;
            }

            return serde_json::from_str(text).map(Some).map_err(|e| {
                Error::Source(SourceError::Malformed {
                    line: self.line_number,
                    reason: e.to_string(),
                })
            });
        }
    }
}

/// Iterator adapter for JsonLinesReader.
impl<R: BufRead> Iterator for JsonLinesReader<R> {
    type Item = Result<TraceEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}
