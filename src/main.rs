use anyhow::Result;
use std::env;
use std::io::{self, Write};
use std::path::Path;

use extbuf::{boundary, host, logging, log_info, Cli, Options};

#[cfg(feature = "ghdl")]
fn simulator(_options: &Options) -> extbuf::simulator::GhdlSimulator {
    extbuf::simulator::GhdlSimulator
}

#[cfg(not(feature = "ghdl"))]
fn simulator(options: &Options) -> extbuf::ReferenceTestbench {
    extbuf::ReferenceTestbench::new(options.length, options.testbench_mode)
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    // Host options ride along with the simulator's; all args are forwarded
    let cli = Cli::parse_host_args(&args)?;
    let options = cli.merge_into_options(Options::default())?;

    logging::log_init(options.log_level, options.log_file.as_deref().map(Path::new))?;
    log_info!("Command line arguments: {:?}", args);

    // Covers a simulator that calls exit() instead of returning
    boundary::arm_exit_hook();

    let mut sim = simulator(&options);
    let mut stdout = io::stdout();
    let status = host::run_host(&options, &mut sim, &args, &mut stdout)?;

    stdout.flush()?;
    logging::log_flush();
    std::process::exit(status.code());
}
