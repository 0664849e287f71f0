///! Birthday roster module
///!
///! Reads the hand-edited `birthdays.txt` roster, one `name-...-type` entry
///! per line, into structured records.

pub mod parser;
pub mod types;

pub use parser::RosterParser;
pub use types::{LineShape, Roster, SkipReason, SkippedLine};
