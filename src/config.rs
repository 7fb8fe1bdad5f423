//! Process-wide tunables for the scanner and interpreter.

/// Longest accepted string literal inside a code tag, in bytes.
pub const MAX_STRING_LEN: usize = 256;

/// Longest accepted identifier inside a code tag, in bytes.
pub const MAX_IDENT_LEN: usize = 32;

/// A loop whose materialized length exceeds this is skipped rather than run.
pub const MAX_ITERATIONS: usize = 4096;

/// How many times a single cached inclusion may replay before it is cut off.
pub const MAX_INCLUSIONS: usize = 16;

pub const TAG_OPEN: u8 = b'{';
pub const TAG_CLOSE: u8 = b'}';
pub const TAG_CODE: u8 = b'%';
pub const TAG_ECHO: u8 = b'=';
