#![allow(clippy::cast_possible_truncation)]

use crate::{AccessKind, AccessWidth, Diagnostic, DiagnosticLog, WordMemory};

/// Returns the 4-byte-aligned address of the word holding `addr`.
#[must_use]
pub const fn word_base(addr: u64) -> u64 {
    addr & !3
}

/// Bit position of the byte at `addr` within its containing word.
#[must_use]
pub const fn byte_lane(addr: u64) -> u32 {
    ((addr & 3) * 8) as u32
}

fn check_alignment(
    addr: u64,
    width: AccessWidth,
    kind: AccessKind,
    diagnostics: &mut DiagnosticLog,
) {
    if !width.is_aligned(addr) {
        diagnostics.record(Diagnostic::UnalignedAccess { addr, width, kind });
    }
}

/// Reads the byte at `addr`.
#[must_use]
pub fn read_byte(memory: &dyn WordMemory, addr: u64) -> u8 {
    (memory.read_word(word_base(addr)) >> byte_lane(addr)) as u8
}

/// Writes the byte at `addr`, preserving the other three bytes of its word.
pub fn write_byte(memory: &mut dyn WordMemory, addr: u64, value: u8) {
    let base = word_base(addr);
    let lane = byte_lane(addr);
    let word = memory.read_word(base);
    let merged = (word & !(0xFF << lane)) | (u32::from(value) << lane);
    memory.write_word(base, merged);
}

/// Reads the little-endian halfword at `addr`.
///
/// An odd address records an [`Diagnostic::UnalignedAccess`]; the access is
/// still served, splitting into byte reads when it straddles two words.
pub fn read_halfword(memory: &dyn WordMemory, addr: u64, diagnostics: &mut DiagnosticLog) -> u16 {
    check_alignment(addr, AccessWidth::Halfword, AccessKind::Read, diagnostics);
    if addr & 3 <= 2 {
        (memory.read_word(word_base(addr)) >> byte_lane(addr)) as u16
    } else {
        u16::from_le_bytes([read_byte(memory, addr), read_byte(memory, addr.wrapping_add(1))])
    }
}

/// Writes the little-endian halfword at `addr`.
///
/// Alignment is handled as in [`read_halfword`].
pub fn write_halfword(
    memory: &mut dyn WordMemory,
    addr: u64,
    value: u16,
    diagnostics: &mut DiagnosticLog,
) {
    check_alignment(addr, AccessWidth::Halfword, AccessKind::Write, diagnostics);
    if addr & 3 <= 2 {
        let base = word_base(addr);
        let lane = byte_lane(addr);
        let word = memory.read_word(base);
        let merged = (word & !(0xFFFF << lane)) | (u32::from(value) << lane);
        memory.write_word(base, merged);
    } else {
        let [lo, hi] = value.to_le_bytes();
        write_byte(memory, addr, lo);
        write_byte(memory, addr.wrapping_add(1), hi);
    }
}

/// Reads the little-endian doubleword at `addr`.
///
/// Addresses that are not 8-aligned record an [`Diagnostic::UnalignedAccess`].
/// A 4-aligned address is served as two word reads, anything else as eight
/// byte reads.
pub fn read_doubleword(
    memory: &dyn WordMemory,
    addr: u64,
    diagnostics: &mut DiagnosticLog,
) -> u64 {
    check_alignment(addr, AccessWidth::Doubleword, AccessKind::Read, diagnostics);
    if addr & 3 == 0 {
        let lo = memory.read_word(addr);
        let hi = memory.read_word(addr.wrapping_add(4));
        u64::from(lo) | (u64::from(hi) << 32)
    } else {
        let mut bytes = [0_u8; 8];
        for (offset, byte) in (0_u64..).zip(bytes.iter_mut()) {
            *byte = read_byte(memory, addr.wrapping_add(offset));
        }
        u64::from_le_bytes(bytes)
    }
}

/// Writes the little-endian doubleword at `addr`.
///
/// Alignment is handled as in [`read_doubleword`].
pub fn write_doubleword(
    memory: &mut dyn WordMemory,
    addr: u64,
    value: u64,
    diagnostics: &mut DiagnosticLog,
) {
    check_alignment(addr, AccessWidth::Doubleword, AccessKind::Write, diagnostics);
    if addr & 3 == 0 {
        memory.write_word(addr, value as u32);
        memory.write_word(addr.wrapping_add(4), (value >> 32) as u32);
    } else {
        for (offset, byte) in (0_u64..).zip(value.to_le_bytes()) {
            write_byte(memory, addr.wrapping_add(offset), byte);
        }
    }
}
