//! Process-wide host state for one simulation run
//!
//! Lifecycle: `Init → Seeded → Simulating → Verifying → {Failed | Released}`.
//! The context is created at start, handed to the boundary layer for the
//! simulating phase, and released when the run ends.

use std::io::{self, Write};

use crate::buffer::{dump_bytes, expected_value, SharedBuffer};
use crate::config::Options;
use crate::error::{BufferError, VerifyError};
use crate::registry::BufferRegistry;
use crate::verify::verify_buffer;

/// Identifier the simulator uses for the one shared buffer
pub const BUFFER_ID: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Seeded,
    Simulating,
    Verifying,
    Failed,
    Released,
}

#[derive(Debug)]
pub struct HostContext {
    options: Options,
    registry: BufferRegistry,
    phase: Phase,
}

impl HostContext {
    pub fn new(options: Options) -> Self {
        let registry = BufferRegistry::new(options.table_slots, options.bounds);
        Self {
            options,
            registry,
            phase: Phase::Init,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn registry(&self) -> &BufferRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut BufferRegistry {
        &mut self.registry
    }

    /// Reserve the shared buffer, seed its first segment and put it in the table
    pub fn allocate_and_seed(&mut self) -> Result<(), BufferError> {
        let mut buffer = SharedBuffer::allocate(self.options.length)?;
        buffer.seed();
        self.registry.attach(BUFFER_ID, buffer)?;
        self.phase = Phase::Seeded;
        Ok(())
    }

    /// Current buffer bytes, if the table still holds any
    pub fn contents(&self) -> Option<&[u8]> {
        // SAFETY: borrowed slots only exist under the unchecked policy, where
        // the simulator keeps registered memory alive until exit
        unsafe { self.registry.contents(BUFFER_ID) }
    }

    /// Print the buffer as `<offset>: <value>` lines
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self.contents() {
            Some(data) => dump_bytes(data, out),
            None => out.flush(),
        }
    }

    pub fn begin_simulation(&mut self) {
        self.phase = Phase::Simulating;
    }

    /// Check the buffer against the segment pattern.
    ///
    /// An empty table fails at offset 0, the first byte that cannot match.
    pub fn verify<W: Write>(&mut self, out: &mut W) -> Result<(), VerifyError> {
        self.phase = Phase::Verifying;
        let length = self.options.length;
        let result = match self.contents() {
            Some(data) => verify_buffer(data, length, out),
            None => Err(VerifyError {
                offset: 0,
                expected: if length == 0 { 0 } else { expected_value(length, 0) },
                got: 0,
            }),
        };
        if result.is_err() {
            self.phase = Phase::Failed;
        }
        result
    }

    /// Free the shared buffer. Idempotent.
    pub fn release(&mut self) {
        self.registry.release();
        if self.phase != Phase::Failed {
            self.phase = Phase::Released;
        }
    }
}

impl Drop for HostContext {
    fn drop(&mut self) {
        self.registry.release();
    }
}
