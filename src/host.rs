//! One host run: allocate, seed, simulate, verify, release

use anyhow::{Context, Result};
use std::io::Write;

use crate::boundary;
use crate::config::Options;
use crate::context::HostContext;
use crate::error::ExitStatus;
use crate::simulator::Simulator;

/// Drive `simulator` over a freshly seeded buffer and check the result.
///
/// Buffer dumps and the check lines go to `out`. The buffer is released on
/// every path out of this function.
pub fn run_host<S, W>(
    options: &Options,
    simulator: &mut S,
    args: &[String],
    out: &mut W,
) -> Result<ExitStatus>
where
    S: Simulator + ?Sized,
    W: Write,
{
    let mut ctx = HostContext::new(options.clone());
    if let Err(e) = ctx.allocate_and_seed() {
        crate::log_fatal!("Failed to allocate the shared buffer: {}", e);
        return Ok(ExitStatus::AllocationFailed);
    }
    crate::log_debug!("Seeded {} byte buffer", options.buffer_size());

    ctx.dump(out).context("Failed to print the seeded buffer")?;

    let guard = boundary::install(ctx);
    let result = simulator.run(args);
    let mut ctx = guard
        .finish()
        .context("Host context was taken while the simulator ran")?;

    let sim_status = result.context("Simulator failed")?;
    crate::log_info!("Simulator returned: {}", sim_status);

    let faults = ctx.registry().faults();
    if faults > 0 {
        crate::log_warning!("Simulator made {} rejected buffer access(es)", faults);
    }

    let status = match ctx.verify(out) {
        Ok(()) => ExitStatus::Simulator(sim_status),
        Err(e) => {
            crate::log_error!("{}", e);
            ExitStatus::CheckFailed
        }
    };
    ctx.release();
    Ok(status)
}
