//! Program image loading from `.x` text files.
//!
//! A program file holds one instruction word per line in hexadecimal, with
//! an optional `0x` prefix. Blank lines and `#`/`//` comments are skipped.
//! Word `i` is placed at `TEXT_START + 4 * i`.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::{WordMemory, REGION_SIZE, TEXT_START};

/// Maximum number of words that fit in the text segment.
#[allow(clippy::cast_possible_truncation)]
pub const TEXT_CAPACITY_WORDS: usize = (REGION_SIZE / 4) as usize;

/// Errors raised while loading a program image.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The program file could not be read.
    #[error("failed to read program {}: {source}", .path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A line is not a 32-bit hexadecimal word.
    #[error("line {line}: invalid instruction word `{text}`")]
    InvalidWord {
        /// 1-based line number.
        line: usize,
        /// Offending text after trimming.
        text: String,
    },
    /// The program does not fit in the text segment.
    #[error("program has {words} words but the text segment holds {capacity}")]
    ProgramTooLarge {
        /// Words in the program.
        words: usize,
        /// Segment capacity in words.
        capacity: usize,
    },
}

/// Parses program text into instruction words.
///
/// # Errors
///
/// Returns [`LoadError::InvalidWord`] for the first line that is not a
/// hexadecimal 32-bit value.
pub fn parse_program(text: &str) -> Result<Vec<u32>, LoadError> {
    let mut words = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        let digits = line
            .strip_prefix("0x")
            .or_else(|| line.strip_prefix("0X"))
            .unwrap_or(line);
        let word = u32::from_str_radix(digits, 16).map_err(|_| LoadError::InvalidWord {
            line: index + 1,
            text: line.to_string(),
        })?;
        words.push(word);
    }
    Ok(words)
}

fn strip_comment(line: &str) -> &str {
    let end = [line.find('#'), line.find("//")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(line.len());
    &line[..end]
}

/// Writes `words` into the text segment starting at [`TEXT_START`].
///
/// # Errors
///
/// Returns [`LoadError::ProgramTooLarge`] when `words` exceeds the segment;
/// nothing is written in that case.
pub fn load_program(memory: &mut dyn WordMemory, words: &[u32]) -> Result<usize, LoadError> {
    if words.len() > TEXT_CAPACITY_WORDS {
        return Err(LoadError::ProgramTooLarge {
            words: words.len(),
            capacity: TEXT_CAPACITY_WORDS,
        });
    }
    for (addr, &word) in (TEXT_START..).step_by(4).zip(words) {
        memory.write_word(addr, word);
    }
    log::debug!("loaded {} words at 0x{TEXT_START:08X}", words.len());
    Ok(words.len())
}

/// Reads, parses, and loads a program file.
///
/// # Errors
///
/// Returns [`LoadError::Io`] when the file cannot be read, or any error from
/// [`parse_program`] and [`load_program`].
pub fn load_program_file(
    path: impl AsRef<Path>,
    memory: &mut dyn WordMemory,
) -> Result<usize, LoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let words = parse_program(&text)?;
    load_program(memory, &words)
}
