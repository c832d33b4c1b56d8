//! etl2pcapng CLI entry point.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use etl2pcapng::cli::{convert_file, Args, INVALID_PARAMETER_EXIT_CODE, USAGE};
use etl2pcapng_core::Error;

fn main() -> ExitCode {
    // Parse command line arguments
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(_) => {
            print!("{USAGE}");
            return exit_code(INVALID_PARAMETER_EXIT_CODE);
        }
    };

    if args.version {
        println!("etl2pcapng version {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    // Set up logging
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| args.log_filter().into()),
        )
        .init();

    let Some((input, output)) = args.paths() else {
        print!("{USAGE}");
        return exit_code(INVALID_PARAMETER_EXIT_CODE);
    };

    match convert_file(input, output, &mut io::stdout()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            exit_code(failure_code(&err))
        }
    }
}

/// Exit status for a failed conversion: the OS error code when one is known.
fn failure_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(err) = cause.downcast_ref::<Error>() {
            return err.exit_code();
        }
        if let Some(code) = cause
            .downcast_ref::<io::Error>()
            .and_then(io::Error::raw_os_error)
        {
            if code != 0 {
                return code;
            }
        }
    }
    1
}

fn exit_code(code: i32) -> ExitCode {
    // Exit statuses are a single byte outside Windows.
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
