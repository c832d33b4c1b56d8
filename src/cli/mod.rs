//! Command-line interface module.
//!
//! This module handles:
//! - Argument parsing via clap
//! - Running a file-to-file conversion and reporting it

mod args;
mod convert;

pub use args::{Args, INVALID_PARAMETER_EXIT_CODE, USAGE};
pub use convert::{convert_file, report_interfaces, user_application};
