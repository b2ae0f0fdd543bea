#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Binary entry point for the convert-cpu-hex tool.
//!
//! This module is excluded from mutation testing because testing process entry/exit behavior
//! is impractical - it requires spawning subprocesses and checking exit codes.

use std::process::ExitCode;

use argh::FromArgs;
use convert_cpu_hex::{RunInput, run};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Converts a comma-separated list of CPU IDs (e.g. 4,7,9) into a hexadecimal CPU mask.
#[derive(FromArgs)]
struct Args {
    /// comma-separated list of decimal CPU IDs
    #[argh(positional, greedy)]
    cpu_list: Vec<String>,
}

// Binary entry point - mutations would require subprocess testing which is impractical.
#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    init_logging();

    let env_args: Vec<String> = std::env::args().collect();
    let str_args: Vec<&str> = env_args.iter().map(String::as_str).collect();

    let program_name = str_args
        .first()
        .copied()
        .unwrap_or(env!("CARGO_BIN_NAME"));
    let raw_args = str_args.get(1..).unwrap_or(&[]);

    let args = match Args::from_args(&[program_name], raw_args) {
        Ok(args) => args.cpu_list,
        Err(early_exit) if early_exit.status.is_ok() => {
            println!("{}", early_exit.output);
            return ExitCode::SUCCESS;
        }
        Err(early_exit) => {
            // Something like "-1" looks like a flag to the parser but is still a CPU list token
            // to us, so it gets validated (and rejected) like any other token.
            debug!(output = %early_exit.output, "argument parser rejected input");
            raw_args.iter().map(ToString::to_string).collect()
        }
    };

    match run(&RunInput { args }) {
        Ok(outcome) => {
            println!("{}", outcome.mask);
            ExitCode::SUCCESS
        }
        Err(e) => {
            if matches!(e, convert_cpu_hex::RunError::InvalidCpuList(_)) {
                debug!(error = %e, "invalid CPU list");
            } else {
                eprintln!("Error: {e}");
            }

            e.exit_code()
        }
    }
}

// Logs go to stderr so that stdout only ever carries the mask.
#[cfg_attr(test, mutants::skip)]
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
