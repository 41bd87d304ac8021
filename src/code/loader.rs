//! Machine-code listing format.
//!
//! The external assembler's output: one instruction per line, exactly
//! 16 characters of `'0'`/`'1'`, most-significant bit first, no
//! separators. Blank lines and `//` comment lines are skipped. Any
//! character that cannot be resolved to a bit is an encoding error,
//! reported with its line and column, never silently tolerated.

use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::code::word::decode;
use crate::logic::WORD_WIDTH;

/// Errors raised while reading a machine-code listing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingError {
    /// A line does not hold exactly 16 characters.
    #[error("line {line}: expected 16 bits, got {got} characters")]
    WrongLength { line: usize, got: usize },

    /// A character that is neither '0' nor '1'.
    #[error("line {line}, column {column}: invalid bit character {found:?} (expected '0' or '1')")]
    InvalidBit {
        line: usize,
        column: usize,
        found: char,
    },

    #[error("I/O error: {0}")]
    Io(String),
}

fn parse_line(line: &str, line_num: usize) -> Result<u16, ListingError> {
    let chars: Vec<char> = line.chars().collect();
    if chars.len() != WORD_WIDTH {
        return Err(ListingError::WrongLength {
            line: line_num,
            got: chars.len(),
        });
    }
    let mut word = 0u16;
    for (column, &ch) in chars.iter().enumerate() {
        // MSB first: column 0 is bit 15
        let bit = match ch {
            '0' => 0,
            '1' => 1,
            _ => {
                return Err(ListingError::InvalidBit {
                    line: line_num,
                    column: column + 1,
                    found: ch,
                })
            }
        };
        word |= bit << (WORD_WIDTH - 1 - column);
    }
    Ok(word)
}

/// Parse a single 16-character line of machine code.
pub fn parse_word(text: &str) -> Result<u16, ListingError> {
    parse_line(text.trim(), 1)
}

/// Parse a whole listing. Line numbers in errors are 1-based.
pub fn parse_listing(text: &str) -> Result<Vec<u16>, ListingError> {
    let mut words = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        words.push(parse_line(line, index + 1)?);
    }
    Ok(words)
}

/// Load a listing from disk.
pub fn load_listing<P: AsRef<Path>>(path: P) -> Result<Vec<u16>, ListingError> {
    let file = std::fs::File::open(path.as_ref()).map_err(|e| ListingError::Io(e.to_string()))?;
    let reader = BufReader::new(file);

    let mut words = Vec::new();
    for (index, line_result) in reader.lines().enumerate() {
        let raw = line_result.map_err(|e| ListingError::Io(e.to_string()))?;
        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        words.push(parse_line(line, index + 1)?);
    }
    Ok(words)
}

/// Render a listing as an address / bits / mnemonic table.
///
/// Words that do not decode (unassigned control codes) are shown as
/// `???` rather than guessed at.
pub fn disassemble(words: &[u16]) -> String {
    let mut out = String::new();
    for (addr, &word) in words.iter().enumerate() {
        let mnemonic = match decode(word) {
            Ok(instr) => instr.to_string(),
            Err(_) => "???".to_string(),
        };
        out.push_str(&format!("{addr:5}  {word:016b}  {mnemonic}\n"));
    }
    out
}
