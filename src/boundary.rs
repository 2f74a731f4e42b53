//! Hand-over of the host context to the simulator boundary
//!
//! The exported accessors have no user-data argument, so the context they
//! operate on lives in one process-wide slot while the simulator runs.
//! `install` fills the slot and returns a guard; the guard takes the context
//! back (or releases it on drop). An exit hook covers a simulator that ends
//! the process with `exit` while the context is still installed.

use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::{LazyLock, Once};

use crate::context::HostContext;
use crate::error::ExitStatus;

/// Context reachable from the exported accessors, present only while simulating
static ACTIVE: LazyLock<Mutex<Option<HostContext>>> = LazyLock::new(|| Mutex::new(None));

static EXIT_HOOK: Once = Once::new();

/// Scope of one installed context
#[must_use = "dropping the guard releases the installed context"]
pub struct BoundaryGuard {
    _private: (),
}

/// Make `ctx` the context the accessors operate on
pub fn install(mut ctx: HostContext) -> BoundaryGuard {
    ctx.begin_simulation();
    let previous = ACTIVE.lock().replace(ctx);
    if previous.is_some() {
        crate::log_warning!("Replacing a host context that was still installed");
    }
    BoundaryGuard { _private: () }
}

impl BoundaryGuard {
    /// Take the context back after the simulator returned
    pub fn finish(self) -> Option<HostContext> {
        ACTIVE.lock().take()
    }
}

impl Drop for BoundaryGuard {
    fn drop(&mut self) {
        // No-op after finish(); otherwise this releases the buffer
        drop(ACTIVE.lock().take());
    }
}

/// Whether a context is currently installed
pub fn is_installed() -> bool {
    ACTIVE.lock().is_some()
}

/// Run `f` against the installed context
pub fn with_context<T>(f: impl FnOnce(&mut HostContext) -> T) -> Option<T> {
    ACTIVE.lock().as_mut().map(f)
}

/// Register the exit-path verifier once per process
pub fn arm_exit_hook() {
    EXIT_HOOK.call_once(|| {
        // SAFETY: exit_hook is a plain extern "C" fn with no captured state
        let rc = unsafe { libc::atexit(exit_hook) };
        if rc != 0 {
            crate::log_warning!("Failed to register the exit-path verifier");
        }
    });
}

/// Verify and release a context the simulator left behind by exiting.
///
/// Returns `None` when nothing was installed, which is the normal case: the
/// host already took the context back.
pub fn verify_abandoned<W: Write>(out: &mut W) -> Option<ExitStatus> {
    let mut ctx = ACTIVE.try_lock()?.take()?;
    crate::log_info!("Simulator exited with the buffer still installed; verifying");
    let status = match ctx.verify(out) {
        Ok(()) => ExitStatus::Simulator(0),
        Err(e) => {
            crate::log_error!("{}", e);
            ExitStatus::CheckFailed
        }
    };
    ctx.release();
    Some(status)
}

extern "C" fn exit_hook() {
    let mut stdout = io::stdout();
    if let Some(ExitStatus::CheckFailed) = verify_abandoned(&mut stdout) {
        let _ = stdout.flush();
        crate::logging::log_flush();
        // Already inside exit(); _exit avoids re-running the handlers
        unsafe { libc::_exit(ExitStatus::CHECK_FAILED_CODE) };
    }
}
