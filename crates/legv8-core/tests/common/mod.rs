//! Instruction encoders and program helpers shared by the integration suites.

#![allow(dead_code)]

use legv8_core::{load_program, SimConfig, Simulator, TEXT_START};

pub const HLT: u32 = 0xD440_0000;

fn field(value: i64, width: u32) -> u32 {
    (value as u32) & ((1 << width) - 1)
}

pub fn movz(rd: u32, imm16: u32) -> u32 {
    0xD280_0000 | (imm16 << 5) | rd
}

pub fn add_imm(rd: u32, rn: u32, imm12: u32) -> u32 {
    0x9100_0000 | (imm12 << 10) | (rn << 5) | rd
}

pub fn adds_imm(rd: u32, rn: u32, imm12: u32) -> u32 {
    0xB100_0000 | (imm12 << 10) | (rn << 5) | rd
}

pub fn subs_imm(rd: u32, rn: u32, imm12: u32) -> u32 {
    0xF100_0000 | (imm12 << 10) | (rn << 5) | rd
}

pub fn add_reg(rd: u32, rn: u32, rm: u32) -> u32 {
    0x8B00_0000 | (rm << 16) | (rn << 5) | rd
}

pub fn adds_reg(rd: u32, rn: u32, rm: u32) -> u32 {
    0xAB00_0000 | (rm << 16) | (rn << 5) | rd
}

pub fn subs_reg(rd: u32, rn: u32, rm: u32) -> u32 {
    0xEB00_0000 | (rm << 16) | (rn << 5) | rd
}

pub fn orr(rd: u32, rn: u32, rm: u32) -> u32 {
    0xAA00_0000 | (rm << 16) | (rn << 5) | rd
}

pub fn stur(rt: u32, rn: u32, offset: i64) -> u32 {
    0xF800_0000 | (field(offset, 9) << 12) | (rn << 5) | rt
}

pub fn ldur(rt: u32, rn: u32, offset: i64) -> u32 {
    0xF840_0000 | (field(offset, 9) << 12) | (rn << 5) | rt
}

pub fn b(offset_words: i64) -> u32 {
    0x1400_0000 | field(offset_words, 26)
}

pub fn b_cond(cond: u32, offset_words: i64) -> u32 {
    0x5400_0000 | (field(offset_words, 19) << 5) | cond
}

pub fn cbz(rt: u32, offset_words: i64) -> u32 {
    0xB400_0000 | (field(offset_words, 19) << 5) | rt
}

pub fn cbnz(rt: u32, offset_words: i64) -> u32 {
    0xB500_0000 | (field(offset_words, 19) << 5) | rt
}

/// Builds a default simulator with `words` loaded at the text segment.
pub fn simulator_with(words: &[u32]) -> Simulator {
    let mut sim = Simulator::new(SimConfig::default());
    load_program(sim.memory_mut(), words).expect("program fits in text segment");
    sim
}

pub fn text_addr(index: u64) -> u64 {
    TEXT_START + 4 * index
}
