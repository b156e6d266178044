#![no_main]

use legv8_core::{
    disassemble, load_program, read_doubleword, read_halfword, DiagnosticLog, DispatchTable,
    Register, SimConfig, Simulator, UnsupportedPolicy, DATA_START,
};
use libfuzzer_sys::fuzz_target;

const MAX_WORDS: usize = 64;

fuzz_target!(|data: &[u8]| {
    let words: Vec<u32> = data
        .chunks_exact(4)
        .take(MAX_WORDS)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    if words.is_empty() {
        return;
    }

    let dispatch = DispatchTable::new();
    for &word in &words {
        let _ = dispatch.decode(word);
        let _ = disassemble(&dispatch, word);
    }

    let config = SimConfig {
        unsupported_policy: UnsupportedPolicy::Halt,
        ..SimConfig::default()
    };
    let mut sim = Simulator::new(config);
    if load_program(sim.memory_mut(), &words).is_err() {
        return;
    }
    for index in 0..31 {
        sim.state_mut()
            .set_reg(Register::from_u5(index), DATA_START + u64::from(index) * 8);
    }

    let run = sim.run(256).expect("halt policy never surfaces errors");
    assert_eq!(sim.state().reg(Register::XZR), 0);
    assert!(run.steps <= 256);

    let addr = DATA_START + u64::from(data[0]);
    let mut diagnostics = DiagnosticLog::default();
    let _ = read_halfword(sim.memory(), addr, &mut diagnostics);
    let _ = read_doubleword(sim.memory(), addr, &mut diagnostics);
});
