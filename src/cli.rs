use crate::config::{parse_bounds_policy, parse_log_level, parse_testbench_mode, Options};
use anyhow::{Context, Result};
use clap::Parser;

/// Prefix that marks an argument as meant for the host, not the simulator
pub const HOST_ARG_PREFIX: &str = "--extbuf-";

/// Host side of a GHDL external-buffer simulation.
///
/// Every argument is forwarded unchanged to the simulator; the options
/// below are additionally read by the host.
#[derive(Parser, Debug, Default)]
#[command(name = "extbuf")]
#[command(version)]
#[command(about = "Shares a byte buffer with an HDL simulation and checks it afterwards", long_about = None)]
pub struct Cli {
    /// Diagnostic level (nothing, user, error, warning, info, debug, all or 0-6)
    #[arg(long = "extbuf-log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Mirror diagnostics into this file
    #[arg(long = "extbuf-log-file", value_name = "FILE")]
    pub log_file: Option<String>,

    /// Accessor bounds policy (checked, unchecked)
    #[arg(long = "extbuf-bounds", value_name = "POLICY")]
    pub bounds: Option<String>,

    /// Reference testbench access mode (extfnc, extacc)
    #[arg(long = "extbuf-mode", value_name = "MODE")]
    pub mode: Option<String>,
}

/// Pick the host options out of the full argument vector.
///
/// Keeps `argv[0]`, every `--extbuf-*` argument and, for the two-token form
/// `--extbuf-name value`, the value that follows it.
pub fn split_host_args(args: &[String]) -> Vec<String> {
    let mut host = Vec::new();
    let mut iter = args.iter().peekable();

    if let Some(program) = iter.next() {
        host.push(program.clone());
    }

    while let Some(arg) = iter.next() {
        if !arg.starts_with(HOST_ARG_PREFIX) {
            continue;
        }
        host.push(arg.clone());
        if !arg.contains('=') {
            if let Some(value) = iter.next_if(|next| !next.starts_with('-')) {
                host.push(value.clone());
            }
        }
    }
    host
}

impl Cli {
    /// Parse the host options from the process arguments
    pub fn parse_host_args(args: &[String]) -> Result<Self> {
        Cli::try_parse_from(split_host_args(args)).context("Invalid host option")
    }

    /// Merge CLI arguments into the options struct
    pub fn merge_into_options(&self, mut opts: Options) -> Result<Options> {
        if let Some(ref level) = self.log_level {
            opts.log_level = parse_log_level(level)?;
        }

        if let Some(ref log_file) = self.log_file {
            opts.log_file = Some(log_file.clone());
        }

        if let Some(ref bounds) = self.bounds {
            opts.bounds = parse_bounds_policy(bounds)?;
        }

        if let Some(ref mode) = self.mode {
            opts.testbench_mode = parse_testbench_mode(mode)?;
        }

        Ok(opts)
    }
}
