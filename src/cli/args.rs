//! Command-line argument definitions.

use clap::Parser;
use std::path::PathBuf;

/// Short usage text printed when the arguments do not fit.
pub const USAGE: &str = "etl2pcapng <infile> <outfile>\n\
                         Converts a packet capture from etl to pcapng format.\n";

/// Process exit code for a malformed command line.
pub const INVALID_PARAMETER_EXIT_CODE: i32 = 87;

/// Convert an NDIS packet-capture trace to pcapng.
#[derive(Parser, Debug)]
#[command(name = "etl2pcapng")]
#[command(about = "Converts a packet capture from etl to pcapng format.", long_about = None)]
#[command(disable_version_flag = true, disable_help_flag = true)]
pub struct Args {
    /// Decoded trace events (JSON Lines, optionally gzip-compressed)
    #[arg(value_name = "INFILE", required_unless_present = "version")]
    pub input: Option<PathBuf>,

    /// pcapng file to create
    #[arg(value_name = "OUTFILE", required_unless_present = "version")]
    pub output: Option<PathBuf>,

    /// Print the version and exit
    #[arg(short = 'v', long = "version", exclusive = true)]
    pub version: bool,

    /// Enable verbose logging (repeat for more)
    #[arg(long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Input and output paths, when both were given.
    pub fn paths(&self) -> Option<(&PathBuf, &PathBuf)> {
        self.input.as_ref().zip(self.output.as_ref())
    }

    /// Default log filter for the `--verbose` count.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("etl2pcapng").chain(args.iter().copied()))
    }

    #[test]
    fn test_two_paths() {
        let args = parse(&["in.jsonl", "out.pcapng"]).unwrap();
        let (input, output) = args.paths().unwrap();
        assert_eq!(input, &PathBuf::from("in.jsonl"));
        assert_eq!(output, &PathBuf::from("out.pcapng"));
        assert!(!args.version);
        assert_eq!(args.log_filter(), "warn");
    }

    #[test]
    fn test_version_flags() {
        assert!(parse(&["-v"]).unwrap().version);
        assert!(parse(&["--version"]).unwrap().version);
    }

    #[test]
    fn test_version_must_be_alone() {
        assert!(parse(&["-v", "in.jsonl"]).is_err());
    }

    #[test]
    fn test_wrong_argument_count() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["in.jsonl"]).is_err());
        assert!(parse(&["a", "b", "c"]).is_err());
    }

    #[test]
    fn test_help_is_not_an_argument() {
        assert!(parse(&["--help"]).is_err());
        assert!(parse(&["-h"]).is_err());
    }

    #[test]
    fn test_verbose_count() {
        let args = parse(&["--verbose", "--verbose", "a", "b"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.log_filter(), "debug");
    }
}
