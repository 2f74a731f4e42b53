//! C ABI accessors the HDL testbench binds to through VHPIDIRECT
//!
//! The names and argument widths are fixed by the VHDL side:
//!
//! ```vhdl
//! procedure set_string_ptr(id : integer; ptr : line);
//! impure function get_string_ptr(id : integer) return line;
//! procedure write_char(id, i : integer; v : character);
//! impure function read_char(id, i : integer) return character;
//! ```
//!
//! None of them can fail across the boundary. A rejected access is logged,
//! reads yield 0, writes are dropped and unset slots report a null address.

use libc::uintptr_t;

use crate::boundary::with_context;
use crate::error::BufferError;

fn report(call: &str, err: &BufferError) {
    crate::log_warning!("{}: {}", call, err);
}

fn no_context(call: &str) {
    crate::log_error!("{}: no host buffer is installed", call);
}

// ============================================================================
// External through access (mode = extacc)
// ============================================================================

/// Point buffer `id` at `p`.
///
/// # Safety
/// Under the unchecked bounds policy `p` must stay valid for as many bytes as
/// the slot held before, until the process exits. Under the checked policy
/// only the address obtained from `get_string_ptr` is accepted.
#[no_mangle]
pub unsafe extern "C" fn set_string_ptr(id: u8, p: *mut u8) {
    let result = with_context(|ctx| ctx.registry_mut().set_pointer(id, p as usize));
    match result {
        Some(Ok(())) => crate::log_debug!("set_string_ptr({}, {:p})", id, p),
        Some(Err(e)) => report("set_string_ptr", &e),
        None => no_context("set_string_ptr"),
    }
}

/// Address of buffer `id`, or 0 if the slot is unset
#[no_mangle]
pub extern "C" fn get_string_ptr(id: u8) -> uintptr_t {
    match with_context(|ctx| ctx.registry_mut().get_pointer(id)) {
        Some(Ok(address)) => {
            crate::log_debug!("get_string_ptr({}): {:#x}", id, address);
            address
        }
        Some(Err(e)) => {
            report("get_string_ptr", &e);
            0
        }
        None => {
            no_context("get_string_ptr");
            0
        }
    }
}

// ============================================================================
// External through functions (mode = extfnc)
// ============================================================================

/// Store `v` at offset `i` of buffer `id`
///
/// # Safety
/// Under the unchecked bounds policy `i` must lie inside the buffer.
#[no_mangle]
pub unsafe extern "C" fn write_char(id: u8, i: u32, v: u8) {
    match with_context(|ctx| ctx.registry_mut().write_byte(id, i, v)) {
        Some(Ok(())) => {}
        Some(Err(e)) => report("write_char", &e),
        None => no_context("write_char"),
    }
}

/// Load the byte at offset `i` of buffer `id`
///
/// # Safety
/// Under the unchecked bounds policy `i` must lie inside the buffer.
#[no_mangle]
pub unsafe extern "C" fn read_char(id: u8, i: u32) -> u8 {
    match with_context(|ctx| ctx.registry_mut().read_byte(id, i)) {
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            report("read_char", &e);
            0
        }
        None => {
            no_context("read_char");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::install;
    use crate::config::{BoundsPolicy, Options};
    use crate::context::HostContext;
    use proptest::prelude::*;
    use proptest::test_runner::TestRunner;
    use serial_test::serial;

    fn installed(bounds: BoundsPolicy) -> crate::boundary::BoundaryGuard {
        let mut ctx = HostContext::new(Options {
            bounds,
            ..Options::default()
        });
        ctx.allocate_and_seed().unwrap();
        install(ctx)
    }

    #[test]
    #[serial]
    fn test_read_seed_through_accessor() {
        let _guard = installed(BoundsPolicy::Checked);
        unsafe {
            assert_eq!(read_char(0, 0), 11);
            assert_eq!(read_char(0, 4), 55);
            assert_eq!(read_char(0, 5), 0);
        }
    }

    #[test]
    #[serial]
    fn test_checked_rejections_yield_defaults() {
        let guard = installed(BoundsPolicy::Checked);
        unsafe {
            write_char(0, 15, 1);
            assert_eq!(read_char(0, 15), 0);
            assert_eq!(read_char(3, 0), 0);
        }
        assert_eq!(get_string_ptr(9), 0);

        let ctx = guard.finish().unwrap();
        assert_eq!(ctx.registry().faults(), 4);
    }

    #[test]
    #[serial]
    fn test_pointer_round_trip() {
        let guard = installed(BoundsPolicy::Checked);
        let address = get_string_ptr(0);
        assert_ne!(address, 0);

        unsafe {
            set_string_ptr(0, address as *mut u8);
            *(address as *mut u8).add(6) = 99;
        }
        assert_eq!(get_string_ptr(0), address);
        assert_eq!(unsafe { read_char(0, 6) }, 99);

        let ctx = guard.finish().unwrap();
        assert_eq!(ctx.registry().faults(), 0);
    }

    #[test]
    #[serial]
    fn test_accessors_without_context() {
        assert_eq!(get_string_ptr(0), 0);
        unsafe {
            write_char(0, 0, 1);
            assert_eq!(read_char(0, 0), 0);
            set_string_ptr(0, std::ptr::null_mut());
        }
    }

    #[test]
    #[serial]
    fn prop_write_then_read_through_accessors() {
        let _guard = installed(BoundsPolicy::Checked);
        let mut runner = TestRunner::default();
        runner
            .run(&(0u32..15, any::<u8>()), |(offset, value)| {
                unsafe {
                    write_char(0, offset, value);
                    prop_assert_eq!(read_char(0, offset), value);
                }
                Ok(())
            })
            .unwrap();
    }
}
