//! Machine-code format: the instruction word layout, a decoded view for
//! the boundary, and the text listing the external assembler produces.

pub mod loader;
pub mod word;

pub use loader::{disassemble, load_listing, parse_listing, parse_word, ListingError};
pub use word::{decode, encode, field, DecodeError, Dest, Instruction, Jump, YSource};
