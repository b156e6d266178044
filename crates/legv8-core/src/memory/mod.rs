//! Word-granular memory interface, the default region-backed store, and
//! byte/halfword/doubleword accessors layered on top.

use std::cell::Cell;

/// Narrow-width and doubleword accessors built from word operations.
pub mod access;
/// Fixed region map.
pub mod map;

pub use access::{
    read_byte, read_doubleword, read_halfword, write_byte, write_doubleword, write_halfword,
};
pub use map::{
    decode_memory_region, MemoryRegion, RegionDescriptor, DATA_START, KERNEL_DATA_START,
    KERNEL_TEXT_START, MEMORY_REGIONS, REGION_SIZE, STACK_START, TEXT_START,
};

/// Word-addressed backing store supplied to the simulator.
///
/// Callers only pass 4-byte-aligned addresses. Words are little-endian: the
/// byte at `addr` is bits `0..8` of the returned value.
pub trait WordMemory {
    /// Reads the 32-bit word at `addr`.
    fn read_word(&self, addr: u64) -> u32;
    /// Writes the 32-bit word at `addr`.
    fn write_word(&mut self, addr: u64, value: u32);
}

/// Default [`WordMemory`] backed by the five fixed regions of [`map`].
///
/// Unmapped reads return zero and unmapped writes are dropped; both are
/// logged and counted.
#[derive(Debug, Clone)]
pub struct RegionMemory {
    regions: Vec<Box<[u8]>>,
    unmapped_accesses: Cell<u64>,
}

impl Default for RegionMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionMemory {
    /// Allocates zeroed backing storage for every region.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new() -> Self {
        let regions = MEMORY_REGIONS
            .iter()
            .map(|_| vec![0_u8; REGION_SIZE as usize].into_boxed_slice())
            .collect();
        Self {
            regions,
            unmapped_accesses: Cell::new(0),
        }
    }

    /// Number of reads or writes that fell outside every region.
    #[must_use]
    pub fn unmapped_accesses(&self) -> u64 {
        self.unmapped_accesses.get()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn locate(addr: u64) -> Option<(usize, usize)> {
        decode_memory_region(addr).map(|region| {
            let (start, _) = region.bounds();
            (region.slot(), (addr - start) as usize)
        })
    }

    fn note_unmapped(&self, addr: u64, kind: &str) {
        self.unmapped_accesses
            .set(self.unmapped_accesses.get().saturating_add(1));
        log::warn!("unmapped {kind} at 0x{addr:016X}");
    }
}

impl WordMemory for RegionMemory {
    fn read_word(&self, addr: u64) -> u32 {
        let Some((slot, offset)) = Self::locate(addr) else {
            self.note_unmapped(addr, "read");
            return 0;
        };
        let bytes = &self.regions[slot][offset..offset + 4];
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn write_word(&mut self, addr: u64, value: u32) {
        let Some((slot, offset)) = Self::locate(addr) else {
            self.note_unmapped(addr, "write");
            return;
        };
        self.regions[slot][offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }
}
