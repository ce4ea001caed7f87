//! Channel layer: prompt detection over a PTY shell.
//!
//! ANSI escape codes are stripped as output arrives and prompts are searched
//! in the buffer tail only.

mod buffer;
mod pty;

pub use buffer::PatternBuffer;
pub use pty::{DEFAULT_SEARCH_DEPTH, PtyChannel, redact};
