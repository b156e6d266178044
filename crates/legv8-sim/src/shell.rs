//! Line-oriented command shell driving one simulator instance.

use std::io::{self, BufRead, Write};

use legv8_core::{
    LoadError, MemoryDump, Register, RegisterDump, SimError, Simulator, StepOutcome,
    MAX_MEMORY_DUMP_SPAN,
};
use thiserror::Error;

/// Prompt printed before each command; hosts that drive the shell over a pipe
/// read output up to this marker.
pub const PROMPT: &str = "ARM-SIM> ";

const BANNER: &str = "LEGv8 Simulator";

const HELP_TEXT: &str = "\
----------------LEGv8 SIM Help-----------------------
go                     -  run program to completion
run n                  -  execute program for n instructions
rdump [json]           -  dump architectural registers
mdump low high         -  dump memory from low to high
input reg_no reg_value -  set GPR reg_no to reg_value
?                      -  display this help menu
quit                   -  exit the program
";

/// Errors raised while executing a shell command.
#[derive(Debug, Error)]
pub enum ShellError {
    /// Command word not recognised.
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    /// Command given the wrong number of arguments.
    #[error("usage: {0}")]
    Usage(&'static str),
    /// Argument could not be parsed.
    #[error("invalid {what} `{text}`")]
    InvalidArgument {
        /// Which argument was rejected.
        what: &'static str,
        /// Raw argument text.
        text: String,
    },
    /// Fatal step error from the core.
    #[error(transparent)]
    Sim(#[from] SimError),
    /// Program loading failed.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// JSON rendering failed.
    #[error("failed to render state as JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Reading commands or writing output failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ShellError {
    /// Errors that end the session rather than just the current command.
    const fn is_terminal(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// What the session loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Read the next command.
    Continue,
    /// End the session.
    Quit,
}

/// Interactive shell writing all command output to `out`.
pub struct Shell<W: Write> {
    sim: Simulator,
    out: W,
    max_steps: Option<u64>,
}

impl<W: Write> Shell<W> {
    /// Wraps a loaded simulator. `max_steps` bounds `go`.
    pub const fn new(sim: Simulator, out: W, max_steps: Option<u64>) -> Self {
        Self {
            sim,
            out,
            max_steps,
        }
    }

    /// Simulator driven by this shell.
    #[must_use]
    pub const fn simulator(&self) -> &Simulator {
        &self.sim
    }

    /// Consumes the shell, returning the output sink.
    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.out
    }

    /// Reads commands from `input` until `quit` or end of input.
    ///
    /// Command errors are reported on the output and the session continues.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Io`] when reading input or writing output fails.
    pub fn run_session(&mut self, input: impl BufRead) -> Result<(), ShellError> {
        writeln!(self.out, "{BANNER}")?;
        write!(self.out, "{PROMPT}")?;
        self.out.flush()?;

        for line in input.lines() {
            let line = line?;
            match self.execute(&line) {
                Ok(Control::Quit) => break,
                Ok(Control::Continue) => {}
                Err(error) if error.is_terminal() => return Err(error),
                Err(error) => writeln!(self.out, "error: {error}")?,
            }
            write!(self.out, "{PROMPT}")?;
            self.out.flush()?;
        }
        writeln!(self.out, "Bye.")?;
        self.out.flush()?;
        Ok(())
    }

    /// Executes one command line.
    ///
    /// # Errors
    ///
    /// Returns a [`ShellError`] describing why the command was rejected or failed.
    pub fn execute(&mut self, line: &str) -> Result<Control, ShellError> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Control::Continue);
        };
        let args: Vec<&str> = words.collect();

        match command.to_ascii_lowercase().as_str() {
            "go" | "g" => self.go()?,
            "run" | "r" => match args.as_slice() {
                [count] => {
                    let count = parse_number(count, "instruction count")?;
                    self.run(count)?;
                }
                _ => return Err(ShellError::Usage("run <n>")),
            },
            "rdump" => match args.as_slice() {
                [] => self.rdump()?,
                ["json"] => self.rdump_json()?,
                _ => return Err(ShellError::Usage("rdump [json]")),
            },
            "mdump" => match args.as_slice() {
                [low, high] => {
                    let low = parse_number(low, "address")?;
                    let high = parse_number(high, "address")?;
                    if high.saturating_sub(low) >= MAX_MEMORY_DUMP_SPAN {
                        return Err(ShellError::InvalidArgument {
                            what: "address range",
                            text: format!("0x{low:x}..0x{high:x}"),
                        });
                    }
                    self.mdump(low, high)?;
                }
                _ => return Err(ShellError::Usage("mdump <low> <high>")),
            },
            "input" | "i" => match args.as_slice() {
                [reg, value] => {
                    let reg = parse_register(reg)?;
                    let value = parse_number(value, "register value")?;
                    self.sim.state_mut().set_reg(reg, value);
                }
                _ => return Err(ShellError::Usage("input <reg> <value>")),
            },
            "?" | "help" => write!(self.out, "{HELP_TEXT}")?,
            "quit" | "q" => return Ok(Control::Quit),
            other => return Err(ShellError::UnknownCommand(other.to_string())),
        }
        Ok(Control::Continue)
    }

    fn go(&mut self) -> Result<(), ShellError> {
        if !self.sim.state().running() {
            writeln!(self.out, "Can't simulate, simulator is halted")?;
            return Ok(());
        }
        writeln!(self.out, "Simulating...")?;
        let run = match self.max_steps {
            Some(limit) => self.sim.run(limit)?,
            None => self.sim.run_to_halt()?,
        };
        self.report_stop(run.final_step)?;
        if !self.sim.state().running() {
            writeln!(self.out, "Simulator halted")?;
        }
        Ok(())
    }

    fn run(&mut self, count: u64) -> Result<(), ShellError> {
        if !self.sim.state().running() {
            writeln!(self.out, "Can't simulate, simulator is halted")?;
            return Ok(());
        }
        writeln!(self.out, "Simulating for {count} instructions...")?;
        let run = self.sim.run(count)?;
        self.report_stop(run.final_step)?;
        Ok(())
    }

    fn report_stop(&mut self, outcome: StepOutcome) -> Result<(), ShellError> {
        match outcome {
            StepOutcome::Unsupported { word } => {
                writeln!(self.out, "Stopped on unsupported instruction 0x{word:08x}")?;
            }
            StepOutcome::Retired { .. } if self.sim.state().running() => {
                log::debug!("step budget exhausted at 0x{:x}", self.sim.state().pc());
            }
            _ => {}
        }
        Ok(())
    }

    fn rdump(&mut self) -> Result<(), ShellError> {
        let dump = RegisterDump::new(self.sim.state(), self.sim.instruction_count());
        writeln!(self.out, "{dump}")?;
        Ok(())
    }

    fn rdump_json(&mut self) -> Result<(), ShellError> {
        let report = serde_json::json!({
            "instruction_count": self.sim.instruction_count(),
            "state": self.sim.state(),
        });
        writeln!(self.out, "{}", serde_json::to_string_pretty(&report)?)?;
        Ok(())
    }

    fn mdump(&mut self, low: u64, high: u64) -> Result<(), ShellError> {
        let dump = MemoryDump::new(self.sim.memory(), low, high);
        writeln!(self.out, "{dump}")?;
        Ok(())
    }
}

/// Parses a decimal or `0x`-prefixed hexadecimal number.
///
/// # Errors
///
/// Returns [`ShellError::InvalidArgument`] naming `what` when `text` is not a number.
pub fn parse_number(text: &str, what: &'static str) -> Result<u64, ShellError> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| ShellError::InvalidArgument {
        what,
        text: text.to_string(),
    })
}

fn parse_register(text: &str) -> Result<Register, ShellError> {
    let digits = text
        .strip_prefix('X')
        .or_else(|| text.strip_prefix('x'))
        .unwrap_or(text);
    digits
        .parse::<u8>()
        .ok()
        .and_then(Register::new)
        .filter(|reg| !reg.is_zero_register())
        .ok_or_else(|| ShellError::InvalidArgument {
            what: "register",
            text: text.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::{parse_number, Control, Shell, ShellError, PROMPT};
    use legv8_core::{load_program, Register, SimConfig, Simulator, UnsupportedPolicy};

    const HLT: u32 = 0xD440_0000;

    fn shell(words: &[u32], config: SimConfig) -> Shell<Vec<u8>> {
        let mut sim = Simulator::new(config);
        load_program(sim.memory_mut(), words).expect("program fits");
        Shell::new(sim, Vec::new(), None)
    }

    fn output(shell: Shell<Vec<u8>>) -> String {
        String::from_utf8(shell.into_output()).expect("shell writes UTF-8")
    }

    #[test]
    fn piped_session_runs_and_dumps_registers() {
        // MOVZ X1, #5; MOVZ X2, #3; ADDS X0, X1, X2; HLT
        let mut shell = shell(
            &[0xD280_00A1, 0xD280_0062, 0xAB02_0020, HLT],
            SimConfig::default(),
        );

        shell
            .run_session("go\nrdump\nquit\n".as_bytes())
            .expect("session completes");

        let text = output(shell);
        assert!(text.starts_with("LEGv8 Simulator\n"));
        assert!(text.contains("Simulator halted"));
        assert!(text.contains("X0: 0x8\n"));
        assert!(text.contains("Instruction Count : 4\n"));
        assert_eq!(text.matches(PROMPT).count(), 3);
        assert!(text.ends_with("Bye.\n"));
    }

    #[test]
    fn input_sets_register_before_run() {
        // ADD X0, X1, X1; HLT
        let mut shell = shell(&[0x8B01_0020, HLT], SimConfig::default());

        shell.execute("input 1 0x21").expect("input accepted");
        shell.execute("run 1").expect("run accepted");

        let state = shell.simulator().state();
        assert_eq!(state.reg(Register::from_u5(0)), 0x42);
        assert!(state.running());
    }

    #[test]
    fn input_rejects_out_of_range_register() {
        let mut shell = shell(&[HLT], SimConfig::default());
        let error = shell.execute("input 32 1").expect_err("X32 does not exist");
        assert!(matches!(error, ShellError::InvalidArgument { what: "register", .. }));
    }

    #[test]
    fn input_rejects_zero_register() {
        // ADD X0, XZR, #0
        let mut shell = shell(&[0x9100_03E0, HLT], SimConfig::default());
        for text in ["input 31 0x55", "input X31 0x55"] {
            let error = shell.execute(text).expect_err("XZR is not writable");
            assert!(matches!(error, ShellError::InvalidArgument { what: "register", .. }));
        }

        shell.execute("run 1").expect("run accepted");
        assert_eq!(shell.simulator().state().reg(Register::from_u5(0)), 0);
        assert_eq!(shell.simulator().state().reg(Register::XZR), 0);
    }

    #[test]
    fn mdump_lists_loaded_words() {
        let mut shell = shell(&[0xD280_00A1, HLT], SimConfig::default());
        shell
            .execute("mdump 0x400000 0x400004")
            .expect("mdump accepted");

        let text = output(shell);
        assert!(text.contains("0x00400000 (4194304) : 0xd28000a1"));
        assert!(text.contains("0x00400004 (4194308) : 0xd4400000"));
    }

    #[test]
    fn mdump_rejects_oversized_range() {
        let mut shell = shell(&[HLT], SimConfig::default());
        let error = shell
            .execute("mdump 0 0xffffffffffffffff")
            .expect_err("range wider than a region");
        assert!(matches!(
            error,
            ShellError::InvalidArgument {
                what: "address range",
                ..
            }
        ));
    }

    #[test]
    fn rdump_json_includes_counter_and_pc() {
        let mut shell = shell(&[HLT], SimConfig::default());
        shell.execute("go").expect("go accepted");
        shell.execute("rdump json").expect("json dump accepted");

        let text = output(shell);
        let json_start = text.find('{').expect("JSON object present");
        let value: serde_json::Value =
            serde_json::from_str(&text[json_start..]).expect("valid JSON");
        assert_eq!(value["instruction_count"], 1);
        assert_eq!(value["state"]["pc"], 0x40_0000);
    }

    #[test]
    fn unsupported_word_reports_fatal_error() {
        let mut shell = shell(&[0xFFFF_FFFF], SimConfig::default());
        let error = shell.execute("go").expect_err("fatal policy surfaces error");
        assert!(matches!(error, ShellError::Sim(_)));
        assert!(!shell.simulator().state().running());
    }

    #[test]
    fn unsupported_word_under_halt_policy_is_reported() {
        let config = SimConfig {
            unsupported_policy: UnsupportedPolicy::Halt,
            ..SimConfig::default()
        };
        let mut shell = shell(&[0xFFFF_FFFF], config);
        shell.execute("go").expect("halt policy keeps going");

        let text = output(shell);
        assert!(text.contains("Stopped on unsupported instruction 0xffffffff"));
    }

    #[test]
    fn session_survives_bad_commands() {
        let mut shell = shell(&[HLT], SimConfig::default());
        shell
            .run_session("bogus\nrun\nq\n".as_bytes())
            .expect("session completes");

        let text = output(shell);
        assert!(text.contains("error: unknown command `bogus`"));
        assert!(text.contains("error: usage: run <n>"));
    }

    #[test]
    fn go_after_halt_is_refused() {
        let mut shell = shell(&[HLT], SimConfig::default());
        shell.execute("go").expect("first go");
        shell.execute("go").expect("second go");
        assert!(output(shell).contains("Can't simulate, simulator is halted"));
    }

    #[test]
    fn blank_line_and_quit() {
        let mut shell = shell(&[HLT], SimConfig::default());
        assert_eq!(shell.execute("   ").expect("blank"), Control::Continue);
        assert_eq!(shell.execute("QUIT").expect("quit"), Control::Quit);
    }

    #[test]
    fn numbers_parse_in_both_radixes() {
        assert_eq!(parse_number("16", "n").expect("decimal"), 16);
        assert_eq!(parse_number("0x10", "n").expect("hex"), 16);
        assert!(parse_number("0xZZ", "n").is_err());
    }
}
