//! Runs one program in two independent simulators and prints a state fingerprint.

use legv8_core::{
    load_program, ArchitecturalState, Register, RunOutcome, SimConfig, Simulator, StepOutcome,
    WordMemory, DATA_START,
};
use log as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

// Sums 1..=5 into X0, stores it to the data segment, then halts.
const PROGRAM: [u32; 10] = [
    0xD280_00A1, // MOVZ X1, #5
    0xD280_0000, // MOVZ X0, #0
    0x8B01_0000, // ADD X0, X0, X1
    0xF100_0421, // SUBS X1, X1, #1
    0x54FF_FFC1, // B.NE .-8
    0xD282_0006, // MOVZ X6, #0x1000
    0xD370_BCC6, // LSL X6, X6, #16
    0xF800_00C0, // STUR X0, [X6, #0]
    0xF840_00C7, // LDUR X7, [X6, #0]
    0xD440_0000, // HLT #0
];

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn hash_state(hash: &mut u64, state: &ArchitecturalState) {
    hash_bytes(hash, &state.pc().to_le_bytes());
    for value in state.regs() {
        hash_bytes(hash, &value.to_le_bytes());
    }
    hash_bytes(
        hash,
        &[u8::from(state.flag_negative()), u8::from(state.flag_zero())],
    );
}

fn run_instance() -> (Simulator, RunOutcome) {
    let mut sim = Simulator::new(SimConfig::default());
    load_program(sim.memory_mut(), &PROGRAM).expect("program fits in text segment");
    let run = sim.run(1_000).expect("program uses supported instructions");
    (sim, run)
}

fn fingerprint(sim: &Simulator, run: RunOutcome) -> String {
    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    hash_bytes(&mut hash, &run.steps.to_le_bytes());

    match run.final_step {
        StepOutcome::Retired { branch_taken } => {
            hash_bytes(&mut hash, &[0x10, u8::from(branch_taken)]);
        }
        StepOutcome::Halted => hash_bytes(&mut hash, &[0x11]),
        StepOutcome::Unsupported { word } => {
            hash_bytes(&mut hash, &[0x12]);
            hash_bytes(&mut hash, &word.to_le_bytes());
        }
        StepOutcome::Idle => hash_bytes(&mut hash, &[0x13]),
    }

    hash_state(&mut hash, sim.state());
    hash_bytes(&mut hash, &sim.memory().read_word(DATA_START).to_le_bytes());

    format!("{hash:016x}")
}

fn main() {
    let (left, left_run) = run_instance();
    let (right, right_run) = run_instance();

    let left_print = fingerprint(&left, left_run);
    let right_print = fingerprint(&right, right_run);
    assert_eq!(left_print, right_print, "independent instances diverged");

    println!(
        "{left_print} x0={} x7={}",
        left.state().reg(Register::from_u5(0)),
        left.state().reg(Register::from_u5(7))
    );
}
