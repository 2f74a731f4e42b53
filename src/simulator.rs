//! The external simulation engine the host hands control to
//!
//! With the `ghdl` feature the host calls `ghdl_main` from an elaborated
//! testbench. `ReferenceTestbench` reproduces that testbench in-process,
//! going through the same exported accessors the VHDL code binds to.

use anyhow::Result;

use crate::config::{TestbenchMode, SEGMENT_COUNT};
use crate::context::BUFFER_ID;
use crate::ffi::{get_string_ptr, read_char, set_string_ptr, write_char};

/// A blocking simulation run
pub trait Simulator {
    /// Run to completion with the process arguments and return the
    /// simulator's exit status
    fn run(&mut self, args: &[String]) -> Result<i32>;
}

/// In-process model of `tb_ext_byte_vector` / `tb_ext_string`.
///
/// Copies segment `k - 1` into segment `k`, adding `k` to every byte.
#[derive(Debug, Clone)]
pub struct ReferenceTestbench {
    length: u32,
    mode: TestbenchMode,
}

impl ReferenceTestbench {
    pub fn new(length: u32, mode: TestbenchMode) -> Self {
        Self { length, mode }
    }

    fn run_ext_function(&self) {
        let length = self.length;
        for step in 1..SEGMENT_COUNT as u32 {
            for i in 0..length {
                // SAFETY: every offset is below SEGMENT_COUNT * length
                unsafe {
                    let value = read_char(BUFFER_ID, (step - 1) * length + i);
                    write_char(BUFFER_ID, step * length + i, value.wrapping_add(step as u8));
                }
            }
        }
    }

    fn run_ext_access(&self) -> Result<()> {
        let address = get_string_ptr(BUFFER_ID);
        if address == 0 {
            anyhow::bail!("get_string_ptr({}) returned a null address", BUFFER_ID);
        }
        let ptr = address as *mut u8;
        let length = self.length as usize;

        for step in 1..SEGMENT_COUNT {
            for i in 0..length {
                // SAFETY: the host buffer spans SEGMENT_COUNT * length bytes
                // and stays installed until this run returns
                unsafe {
                    let value = *ptr.add((step - 1) * length + i);
                    *ptr.add(step * length + i) = value.wrapping_add(step as u8);
                }
            }
        }

        // Hand the access value back, as the VHDL side does on deallocate
        // SAFETY: ptr is the address get_string_ptr returned for this slot
        unsafe { set_string_ptr(BUFFER_ID, ptr) };
        Ok(())
    }
}

impl Simulator for ReferenceTestbench {
    fn run(&mut self, args: &[String]) -> Result<i32> {
        crate::log_info!(
            "Reference testbench ({:?}) running with {} argument(s)",
            self.mode,
            args.len()
        );
        match self.mode {
            TestbenchMode::ExtFunction => self.run_ext_function(),
            TestbenchMode::ExtAccess => self.run_ext_access()?,
        }
        Ok(0)
    }
}

#[cfg(feature = "ghdl")]
mod ghdl {
    use super::Simulator;
    use anyhow::Result;
    use libc::{c_char, c_int};
    use std::ffi::CString;

    extern "C" {
        /// Entry point of a GHDL-elaborated design
        fn ghdl_main(argc: c_int, argv: *mut *mut c_char) -> c_int;
    }

    /// The real simulator, linked from the elaborated testbench
    #[derive(Debug, Default)]
    pub struct GhdlSimulator;

    impl Simulator for GhdlSimulator {
        fn run(&mut self, args: &[String]) -> Result<i32> {
            let c_args: Vec<CString> = args
                .iter()
                .map(|s| CString::new(s.as_str()))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| anyhow::anyhow!("Failed to convert arguments: {}", e))?;

            let mut c_argv: Vec<*mut c_char> = c_args
                .iter()
                .map(|cs| cs.as_ptr() as *mut c_char)
                .collect();
            c_argv.push(std::ptr::null_mut());

            crate::log_info!("Calling ghdl_main...");
            // SAFETY: argv holds args.len() valid C strings plus a null
            // terminator, all alive for the duration of the call
            let exit_code = unsafe { ghdl_main(args.len() as c_int, c_argv.as_mut_ptr()) };
            crate::log_info!("ghdl_main returned: {}", exit_code);
            Ok(exit_code)
        }
    }
}

#[cfg(feature = "ghdl")]
pub use ghdl::GhdlSimulator;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::install;
    use crate::config::Options;
    use crate::context::HostContext;
    use serial_test::serial;

    const TRANSFORMED: [u8; 15] = [11, 22, 33, 44, 55, 12, 23, 34, 45, 56, 14, 25, 36, 47, 58];

    fn run_mode(mode: TestbenchMode) -> Vec<u8> {
        let mut ctx = HostContext::new(Options::default());
        ctx.allocate_and_seed().unwrap();
        let guard = install(ctx);

        let mut testbench = ReferenceTestbench::new(5, mode);
        assert_eq!(testbench.run(&["extbuf".to_string()]).unwrap(), 0);

        let ctx = guard.finish().unwrap();
        assert_eq!(ctx.registry().faults(), 0);
        ctx.contents().unwrap().to_vec()
    }

    #[test]
    #[serial]
    fn test_ext_function_mode() {
        assert_eq!(run_mode(TestbenchMode::ExtFunction), TRANSFORMED);
    }

    #[test]
    #[serial]
    fn test_ext_access_mode() {
        assert_eq!(run_mode(TestbenchMode::ExtAccess), TRANSFORMED);
    }

    #[test]
    #[serial]
    fn test_ext_access_without_buffer_fails() {
        let mut testbench = ReferenceTestbench::new(5, TestbenchMode::ExtAccess);
        assert!(testbench.run(&[]).is_err());
    }
}
