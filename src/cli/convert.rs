//! File-to-file conversion driven by the command line.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use etl2pcapng_core::prelude::*;
use etl2pcapng_core::Interface;

/// Text recorded in the section header of every produced file.
pub fn user_application() -> String {
    format!("etl2pcapng {}", env!("CARGO_PKG_VERSION"))
}

/// Convert `input` into a new pcapng file at `output`.
///
/// The interface table is written to `report` as soon as pass 1 is done,
/// the frame count once the conversion completes.
pub fn convert_file(
    input: &Path,
    output: &Path,
    report: &mut impl Write,
) -> Result<ConversionSummary> {
    let source = FileEventSource::open(input)?;
    info!(
        "Reading {} ({})",
        source.path().display(),
        source.compression()
    );

    let file = File::create(output)
        .with_context(|| format!("Failed to create output file: {}", output.display()))?;
    let writer = PcapNgWriter::with_user_application(BufWriter::new(file), user_application());

    let mut pipeline = ConversionPipeline::new(writer);
    let interfaces = pipeline.run_discovery(&source)?;
    report_interfaces(&interfaces, report)?;

    let summary = pipeline.run_conversion(&source)?;
    let writer = pipeline.into_sink();
    let bytes_written = writer.bytes_written();
    writer
        .finish()
        .with_context(|| format!("Failed to flush {}", output.display()))?;
    info!("Wrote {} bytes to {}", bytes_written, output.display());

    writeln!(report, "Converted {} frames", summary.stats.frames_converted)?;
    Ok(summary)
}

/// Print one line per declared interface.
pub fn report_interfaces(interfaces: &[Interface], report: &mut impl Write) -> std::io::Result<()> {
    for iface in interfaces {
        writeln!(report, "{iface}")?;
    }
    Ok(())
}
