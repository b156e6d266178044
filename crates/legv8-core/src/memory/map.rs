//! Fixed region map backing [`RegionMemory`](super::RegionMemory).

/// Size in bytes of every mapped region (1 MiB).
pub const REGION_SIZE: u64 = 0x0010_0000;

/// Inclusive start address of the user text segment.
pub const TEXT_START: u64 = 0x0040_0000;
/// Inclusive start address of the user data segment.
pub const DATA_START: u64 = 0x1000_0000;
/// Inclusive start address of the stack segment.
pub const STACK_START: u64 = 0x7FF0_0000;
/// Inclusive start address of the kernel text segment.
pub const KERNEL_TEXT_START: u64 = 0x8000_0000;
/// Inclusive start address of the kernel data segment.
pub const KERNEL_DATA_START: u64 = 0x9000_0000;

/// Canonical region descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionDescriptor {
    /// Region classification.
    pub region: MemoryRegion,
    /// Inclusive start address.
    pub start: u64,
    /// Inclusive end address.
    pub end: u64,
}

/// Mapped segment of the simulated address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryRegion {
    /// User text, where programs are loaded.
    Text,
    /// User data.
    Data,
    /// Stack, ending just below the kernel text segment.
    Stack,
    /// Kernel text.
    KernelText,
    /// Kernel data.
    KernelData,
}

impl MemoryRegion {
    /// Returns the inclusive bounds for this region.
    #[must_use]
    pub const fn bounds(self) -> (u64, u64) {
        let start = match self {
            Self::Text => TEXT_START,
            Self::Data => DATA_START,
            Self::Stack => STACK_START,
            Self::KernelText => KERNEL_TEXT_START,
            Self::KernelData => KERNEL_DATA_START,
        };
        (start, start + REGION_SIZE - 1)
    }

    /// Position of this region in [`MEMORY_REGIONS`].
    #[must_use]
    pub const fn slot(self) -> usize {
        self as usize
    }

    /// Returns `true` when `addr` belongs to this region.
    #[must_use]
    pub const fn contains(self, addr: u64) -> bool {
        let (start, end) = self.bounds();
        addr >= start && addr <= end
    }

    /// Returns the canonical descriptor for this region.
    #[must_use]
    pub const fn descriptor(self) -> RegionDescriptor {
        let (start, end) = self.bounds();
        RegionDescriptor {
            region: self,
            start,
            end,
        }
    }
}

/// Mapped regions in ascending address order.
pub const MEMORY_REGIONS: [RegionDescriptor; 5] = [
    MemoryRegion::Text.descriptor(),
    MemoryRegion::Data.descriptor(),
    MemoryRegion::Stack.descriptor(),
    MemoryRegion::KernelText.descriptor(),
    MemoryRegion::KernelData.descriptor(),
];

const _: () = assert_region_layout();

const fn assert_region_layout() {
    let mut index = 1;
    while index < MEMORY_REGIONS.len() {
        assert!(
            MEMORY_REGIONS[index - 1].end < MEMORY_REGIONS[index].start,
            "regions must be ascending and disjoint"
        );
        index += 1;
    }
    assert!(
        STACK_START + REGION_SIZE == KERNEL_TEXT_START,
        "stack must end at kernel text"
    );
}

/// Returns the region holding `addr`, or `None` for unmapped addresses.
#[must_use]
pub const fn decode_memory_region(addr: u64) -> Option<MemoryRegion> {
    let mut index = 0;
    while index < MEMORY_REGIONS.len() {
        let descriptor = MEMORY_REGIONS[index];
        if addr >= descriptor.start && addr <= descriptor.end {
            return Some(descriptor.region);
        }
        index += 1;
    }
    None
}
