//! etl2pcapng - Convert NDIS packet-capture traces to pcapng.
//!
//! The conversion engine lives in [`etl2pcapng_core`]; this crate adds the
//! command-line front end.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut stdout = std::io::stdout();
//!     let summary = etl2pcapng::cli::convert_file(
//!         Path::new("trace.jsonl"),
//!         Path::new("trace.pcapng"),
//!         &mut stdout,
//!     )?;
//!     eprintln!("{} interfaces", summary.interfaces.len());
//!     Ok(())
//! }
//! ```

pub mod cli;

pub use etl2pcapng_core::{Error, Result};
