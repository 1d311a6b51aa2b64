//! Reading and writing the external engine's file formats.
//!
//! The input-deck writer ([`com`]) and the log parser ([`log`]) are the
//! only places the engine's textual formats are known; everything above
//! them works with parsed values.

pub mod com;
pub mod log;
