// extbuf: host side of a GHDL external-buffer simulation
// Shares one byte buffer with the testbench through C ABI accessors.

#[macro_use]
pub mod logging;

pub mod boundary;
pub mod buffer;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod ffi;
pub mod host;
pub mod registry;
pub mod simulator;
pub mod verify;

pub use cli::Cli;
pub use config::Options;
pub use context::HostContext;
pub use error::{BufferError, ExitStatus, VerifyError};
pub use logging::LogLevel;
pub use simulator::{ReferenceTestbench, Simulator};
