//! The shared byte buffer and the segment pattern it is checked against
//!
//! The buffer is three segments of `length` bytes. The host seeds the first
//! one; the testbench copies it forward twice, adding 1 and then 2.

use std::io::{self, Write};

use crate::config::SEGMENT_COUNT;
use crate::error::BufferError;

/// Value the host seeds at position `i` of the first segment
pub fn seed_value(i: usize) -> u8 {
    (i.wrapping_add(1)).wrapping_mul(11) as u8
}

/// Sum 0 + 1 + ... + `segment`: how much the testbench has added to the
/// seed by the time it writes that segment
pub fn cumulative_offset(segment: usize) -> u8 {
    (segment * (segment + 1) / 2) as u8
}

/// Byte expected at absolute `offset` once the testbench has run
pub fn expected_value(length: u32, offset: usize) -> u8 {
    let length = length as usize;
    let segment = offset / length;
    let position = offset % length;
    seed_value(position).wrapping_add(cumulative_offset(segment))
}

/// Print every byte as `<offset>: <value>`
pub fn dump_bytes<W: Write>(data: &[u8], out: &mut W) -> io::Result<()> {
    for (offset, value) in data.iter().enumerate() {
        writeln!(out, "{}: {}", offset, value)?;
    }
    out.flush()
}

/// A host-owned buffer of `SEGMENT_COUNT * length` bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedBuffer {
    length: u32,
    data: Box<[u8]>,
}

impl SharedBuffer {
    /// Reserve a zeroed buffer for `length` values per segment
    pub fn allocate(length: u32) -> Result<Self, BufferError> {
        if length == 0 {
            return Err(BufferError::ZeroLength);
        }
        let size = (length as usize)
            .checked_mul(SEGMENT_COUNT)
            .ok_or(BufferError::AllocationFailure { size: usize::MAX })?;

        let mut data = Vec::<u8>::new();
        data.try_reserve_exact(size)
            .map_err(|_| BufferError::AllocationFailure { size })?;
        data.resize(size, 0);

        Ok(Self {
            length,
            data: data.into_boxed_slice(),
        })
    }

    /// Write the seed values into the first segment
    pub fn seed(&mut self) {
        let length = self.length as usize;
        for (i, byte) in self.data[..length].iter_mut().enumerate() {
            *byte = seed_value(i);
        }
    }

    /// Values per segment
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Total size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.data.as_mut_ptr()
    }

    /// Address of the first byte, as handed to the simulator
    pub fn address(&self) -> usize {
        self.data.as_ptr() as usize
    }
}
