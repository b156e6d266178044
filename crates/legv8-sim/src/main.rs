//! CLI entry point for the LEGv8 simulator shell.

mod shell;

use std::env;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

use legv8_core::{load_program_file, SimConfig, Simulator, UnsupportedPolicy};
use shell::{parse_number, Shell, ShellError};
#[cfg(test)]
use tempfile as _;

const USAGE_TEXT: &str = "\
Usage: legv8-sim [options] <program.x>

Loads a hex program into the text segment and reads shell commands from stdin.

Options:
  --entry <addr>                 Initial program counter (default 0x400000)
  --on-unsupported <fatal|halt>  Handling of unsupported instructions (default fatal)
  --max-steps <n>                Upper bound on instructions executed by `go`
  --log-level <level>            Log filter (default warn, RUST_LOG overrides)
  -h, --help                     Show this help message

Examples:
  legv8-sim inputs/sum.x
  printf 'go\\nrdump\\nquit\\n' | legv8-sim --on-unsupported halt inputs/sum.x
";

#[derive(Debug, PartialEq, Eq)]
struct Options {
    program: PathBuf,
    config: SimConfig,
    max_steps: Option<u64>,
    log_level: Option<String>,
}

#[derive(Debug)]
enum ParseResult {
    Run(Options),
    Help,
}

fn option_value(args: &mut impl Iterator<Item = OsString>, flag: &str) -> Result<String, String> {
    args.next()
        .map(|value| value.to_string_lossy().to_string())
        .ok_or_else(|| format!("missing value for {flag}"))
}

#[allow(clippy::while_let_on_iterator)]
fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let mut program: Option<PathBuf> = None;
    let mut config = SimConfig::default();
    let mut max_steps = None;
    let mut log_level = None;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Ok(ParseResult::Help);
        }

        if arg == "--entry" {
            let value = option_value(&mut args, "--entry")?;
            config.entry_pc = parse_number(&value, "entry address").map_err(|e| e.to_string())?;
            continue;
        }

        if arg == "--on-unsupported" {
            let value = option_value(&mut args, "--on-unsupported")?;
            config.unsupported_policy = match value.as_str() {
                "fatal" => UnsupportedPolicy::Fatal,
                "halt" => UnsupportedPolicy::Halt,
                other => return Err(format!("unknown unsupported-instruction policy: {other}")),
            };
            continue;
        }

        if arg == "--max-steps" {
            let value = option_value(&mut args, "--max-steps")?;
            max_steps = Some(parse_number(&value, "step count").map_err(|e| e.to_string())?);
            continue;
        }

        if arg == "--log-level" {
            log_level = Some(option_value(&mut args, "--log-level")?);
            continue;
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if program.is_some() {
            return Err("multiple program paths provided".to_string());
        }
        program = Some(PathBuf::from(arg));
    }

    let program = program.ok_or_else(|| "missing program path".to_string())?;
    Ok(ParseResult::Run(Options {
        program,
        config,
        max_steps,
        log_level,
    }))
}

fn init_logging(level: Option<&str>) {
    let env = env_logger::Env::default().default_filter_or("warn");
    let mut builder = env_logger::Builder::from_env(env);
    if let Some(level) = level {
        builder.parse_filters(level);
    }
    builder.format_timestamp(None).init();
}

fn run(options: Options) -> Result<(), ShellError> {
    let mut sim = Simulator::new(options.config);
    let words = load_program_file(&options.program, sim.memory_mut())?;
    log::info!("loaded {words} words from {}", options.program.display());

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut shell = Shell::new(sim, stdout.lock(), options.max_steps);
    shell.run_session(stdin.lock())?;
    log::info!(
        "session ended after {} instructions",
        shell.simulator().instruction_count()
    );
    Ok(())
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Run(options)) => {
            init_logging(options.log_level.as_deref());
            match run(options) {
                Ok(()) => 0,
                Err(error) => {
                    eprintln!("error: {error}");
                    1
                }
            }
        }
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{USAGE_TEXT}");
            2
        }
    };

    std::process::exit(exit_code);
}
