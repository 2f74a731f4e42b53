//! Buffer table keyed by the small identifiers the simulator passes
//!
//! The host owns every buffer it attaches. A simulator that registers its own
//! memory through `set_pointer` gets a borrowed slot; the host never frees it.

use crate::buffer::SharedBuffer;
use crate::config::BoundsPolicy;
use crate::error::BufferError;

#[derive(Debug)]
enum Slot {
    Empty,
    Owned(SharedBuffer),
    Borrowed {
        address: usize,
        len: usize,
        // The host buffer the slot held before, kept alive until release
        parked: Option<SharedBuffer>,
    },
}

/// Identifier-indexed table of shared buffers
#[derive(Debug)]
pub struct BufferRegistry {
    slots: Vec<Slot>,
    bounds: BoundsPolicy,
    faults: u32,
}

impl BufferRegistry {
    pub fn new(slots: usize, bounds: BoundsPolicy) -> Self {
        Self {
            slots: (0..slots).map(|_| Slot::Empty).collect(),
            bounds,
            faults: 0,
        }
    }

    /// Number of accesses rejected since the registry was created
    pub fn faults(&self) -> u32 {
        self.faults
    }

    fn slot(&self, id: u8) -> Result<&Slot, BufferError> {
        let slots = self.slots.len();
        self.slots
            .get(id as usize)
            .ok_or(BufferError::UnknownId { id, slots })
    }

    fn slot_mut(&mut self, id: u8) -> Result<&mut Slot, BufferError> {
        let slots = self.slots.len();
        self.slots
            .get_mut(id as usize)
            .ok_or(BufferError::UnknownId { id, slots })
    }

    fn fault<T>(&mut self, result: Result<T, BufferError>) -> Result<T, BufferError> {
        if result.is_err() {
            self.faults += 1;
        }
        result
    }

    /// Hand a host buffer to the table, replacing whatever the slot held
    pub fn attach(&mut self, id: u8, buffer: SharedBuffer) -> Result<(), BufferError> {
        let slot = self.slot_mut(id)?;
        *slot = Slot::Owned(buffer);
        Ok(())
    }

    /// The host buffer in a slot, if the slot still holds one
    pub fn buffer(&self, id: u8) -> Option<&SharedBuffer> {
        match self.slots.get(id as usize)? {
            Slot::Owned(buffer) => Some(buffer),
            _ => None,
        }
    }

    /// Current contents of a slot, whichever side owns the memory
    ///
    /// # Safety
    /// A borrowed slot's address must still point at `len` readable bytes.
    /// The simulator guarantees this for memory it registers, which lives
    /// until the process exits.
    pub unsafe fn contents(&self, id: u8) -> Option<&[u8]> {
        match self.slots.get(id as usize)? {
            Slot::Owned(buffer) => Some(buffer.as_slice()),
            Slot::Borrowed { address, len, .. } => {
                Some(std::slice::from_raw_parts(*address as *const u8, *len))
            }
            Slot::Empty => None,
        }
    }

    /// Point a slot at `address`.
    ///
    /// Handing back the address of the slot's own host buffer is a no-op.
    /// Any other address is only accepted under the unchecked policy, and
    /// is assumed to span as many bytes as the slot held before.
    pub fn set_pointer(&mut self, id: u8, address: usize) -> Result<(), BufferError> {
        let result = self.set_pointer_inner(id, address);
        self.fault(result)
    }

    fn set_pointer_inner(&mut self, id: u8, address: usize) -> Result<(), BufferError> {
        if address == 0 {
            return Err(BufferError::NullAddress { id });
        }
        let bounds = self.bounds;
        let slot = self.slot_mut(id)?;

        match &mut *slot {
            Slot::Owned(buffer) if buffer.address() == address => return Ok(()),
            Slot::Borrowed { parked, .. }
                if parked.as_ref().is_some_and(|b| b.address() == address) =>
            {
                if let Some(buffer) = parked.take() {
                    *slot = Slot::Owned(buffer);
                }
                return Ok(());
            }
            _ => {}
        }

        // Foreign memory cannot be validated
        if bounds == BoundsPolicy::Checked {
            return Err(BufferError::ForeignAddress { id });
        }

        let (len, parked) = match std::mem::replace(slot, Slot::Empty) {
            Slot::Owned(buffer) => (buffer.size(), Some(buffer)),
            Slot::Borrowed { len, parked, .. } => (len, parked),
            Slot::Empty => (0, None),
        };
        *slot = Slot::Borrowed {
            address,
            len,
            parked,
        };
        Ok(())
    }

    /// Address of the memory behind a slot
    pub fn get_pointer(&mut self, id: u8) -> Result<usize, BufferError> {
        let result = match self.slot_mut(id) {
            Ok(Slot::Owned(buffer)) => Ok(buffer.as_mut_ptr() as usize),
            Ok(Slot::Borrowed { address, .. }) => Ok(*address),
            Ok(Slot::Empty) => Err(BufferError::Unset { id }),
            Err(e) => Err(e),
        };
        self.fault(result)
    }

    /// Store `value` at `offset` in the slot's memory
    pub fn write_byte(&mut self, id: u8, offset: u32, value: u8) -> Result<(), BufferError> {
        let result = self.write_byte_inner(id, offset, value);
        self.fault(result)
    }

    fn write_byte_inner(&mut self, id: u8, offset: u32, value: u8) -> Result<(), BufferError> {
        let checked = self.bounds == BoundsPolicy::Checked;
        match self.slot_mut(id)? {
            Slot::Owned(buffer) => {
                let len = buffer.size();
                if checked {
                    let byte = buffer
                        .as_mut_slice()
                        .get_mut(offset as usize)
                        .ok_or(BufferError::OutOfBounds { id, offset, len })?;
                    *byte = value;
                } else {
                    // SAFETY: the unchecked policy leaves bounds to the simulator
                    unsafe { *buffer.as_mut_ptr().add(offset as usize) = value };
                }
                Ok(())
            }
            Slot::Borrowed { address, len, .. } => {
                if checked && offset as usize >= *len {
                    return Err(BufferError::OutOfBounds {
                        id,
                        offset,
                        len: *len,
                    });
                }
                // SAFETY: the simulator registered this memory for our use
                unsafe { *(*address as *mut u8).add(offset as usize) = value };
                Ok(())
            }
            Slot::Empty => Err(BufferError::Unset { id }),
        }
    }

    /// Load the byte at `offset` in the slot's memory
    pub fn read_byte(&mut self, id: u8, offset: u32) -> Result<u8, BufferError> {
        let result = self.read_byte_inner(id, offset);
        self.fault(result)
    }

    fn read_byte_inner(&self, id: u8, offset: u32) -> Result<u8, BufferError> {
        let checked = self.bounds == BoundsPolicy::Checked;
        match self.slot(id)? {
            Slot::Owned(buffer) => {
                let len = buffer.size();
                if checked {
                    buffer
                        .as_slice()
                        .get(offset as usize)
                        .copied()
                        .ok_or(BufferError::OutOfBounds { id, offset, len })
                } else {
                    // SAFETY: the unchecked policy leaves bounds to the simulator
                    Ok(unsafe { *buffer.as_ptr().add(offset as usize) })
                }
            }
            Slot::Borrowed { address, len, .. } => {
                if checked && offset as usize >= *len {
                    return Err(BufferError::OutOfBounds {
                        id,
                        offset,
                        len: *len,
                    });
                }
                // SAFETY: the simulator registered this memory for our use
                Ok(unsafe { *(*address as *const u8).add(offset as usize) })
            }
            Slot::Empty => Err(BufferError::Unset { id }),
        }
    }

    /// Drop every host buffer and forget borrowed addresses
    pub fn release(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::Empty;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn registry_with_buffer(bounds: BoundsPolicy) -> BufferRegistry {
        let mut registry = BufferRegistry::new(1, bounds);
        let mut buffer = SharedBuffer::allocate(5).unwrap();
        buffer.seed();
        registry.attach(0, buffer).unwrap();
        registry
    }

    #[test]
    fn test_read_seeded_values() {
        let mut registry = registry_with_buffer(BoundsPolicy::Checked);
        assert_eq!(registry.read_byte(0, 0), Ok(11));
        assert_eq!(registry.read_byte(0, 4), Ok(55));
        assert_eq!(registry.read_byte(0, 5), Ok(0));
        assert_eq!(registry.faults(), 0);
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut registry = registry_with_buffer(BoundsPolicy::Checked);
        assert_eq!(
            registry.write_byte(0, 15, 1),
            Err(BufferError::OutOfBounds {
                id: 0,
                offset: 15,
                len: 15
            })
        );
        assert_eq!(
            registry.read_byte(0, 100),
            Err(BufferError::OutOfBounds {
                id: 0,
                offset: 100,
                len: 15
            })
        );
        assert_eq!(registry.faults(), 2);
    }

    #[test]
    fn test_unknown_and_unset_ids() {
        let mut registry = BufferRegistry::new(2, BoundsPolicy::Checked);
        assert_eq!(
            registry.read_byte(5, 0),
            Err(BufferError::UnknownId { id: 5, slots: 2 })
        );
        assert_eq!(registry.get_pointer(1), Err(BufferError::Unset { id: 1 }));
        assert_eq!(
            registry.write_byte(0, 0, 1),
            Err(BufferError::Unset { id: 0 })
        );
    }

    #[test]
    fn test_get_pointer_is_buffer_address() {
        let mut registry = registry_with_buffer(BoundsPolicy::Checked);
        let address = registry.buffer(0).unwrap().address();
        assert_eq!(registry.get_pointer(0), Ok(address));
    }

    #[test]
    fn test_set_pointer_own_address_keeps_ownership() {
        let mut registry = registry_with_buffer(BoundsPolicy::Checked);
        let address = registry.get_pointer(0).unwrap();
        registry.set_pointer(0, address).unwrap();
        assert_eq!(registry.get_pointer(0), Ok(address));
        assert!(registry.buffer(0).is_some());
    }

    #[test]
    fn test_set_pointer_foreign_rejected_when_checked() {
        let mut registry = registry_with_buffer(BoundsPolicy::Checked);
        let foreign = vec![0u8; 15];
        assert_eq!(
            registry.set_pointer(0, foreign.as_ptr() as usize),
            Err(BufferError::ForeignAddress { id: 0 })
        );
        // The host buffer is still in place
        assert_eq!(registry.read_byte(0, 1), Ok(22));
        assert_eq!(
            registry.set_pointer(0, 0),
            Err(BufferError::NullAddress { id: 0 })
        );
    }

    #[test]
    fn test_borrowed_slot_reads_and_writes_foreign_memory() {
        let mut registry = registry_with_buffer(BoundsPolicy::Unchecked);
        let parked_address = registry.buffer(0).unwrap().address();
        let mut foreign = vec![7u8; 15];
        let address = foreign.as_mut_ptr() as usize;

        registry.set_pointer(0, address).unwrap();
        assert_eq!(registry.get_pointer(0), Ok(address));
        assert!(registry.buffer(0).is_none());

        registry.write_byte(0, 3, 42).unwrap();
        assert_eq!(registry.read_byte(0, 3), Ok(42));
        assert_eq!(unsafe { registry.contents(0) }.unwrap().len(), 15);

        // Handing back the host address reclaims the parked buffer
        registry.set_pointer(0, parked_address).unwrap();
        assert_eq!(registry.get_pointer(0), Ok(parked_address));
        assert_eq!(registry.buffer(0).unwrap().as_slice()[0], 11);
        assert_eq!(registry.faults(), 0);
        assert_eq!(foreign[3], 42);
    }

    #[test]
    fn test_release_empties_table() {
        let mut registry = registry_with_buffer(BoundsPolicy::Checked);
        registry.release();
        assert!(registry.buffer(0).is_none());
        assert_eq!(registry.read_byte(0, 0), Err(BufferError::Unset { id: 0 }));
    }

    proptest! {
        #[test]
        fn prop_write_then_read(offset in 0u32..15, value: u8) {
            let mut registry = registry_with_buffer(BoundsPolicy::Checked);
            registry.write_byte(0, offset, value).unwrap();
            prop_assert_eq!(registry.read_byte(0, offset), Ok(value));
        }

        #[test]
        fn prop_set_then_get_pointer(address in 1usize..usize::MAX) {
            // Addresses are stored, never dereferenced here
            let mut registry = BufferRegistry::new(1, BoundsPolicy::Unchecked);
            registry.set_pointer(0, address).unwrap();
            prop_assert_eq!(registry.get_pointer(0), Ok(address));
        }
    }
}
