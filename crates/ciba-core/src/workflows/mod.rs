//! # Workflows Module
//!
//! This module provides the high-level entry points of the campaign. Each
//! workflow ties the [`crate::core`] and [`crate::engine`] layers together
//! into one complete operation, leaving storage and presentation to the
//! caller.
//!
//! ## Architecture
//!
//! - **Generation** ([`generate`]) - Enumerates every substituted structure
//!   over the scaffold templates into store records.
//! - **Screening** ([`screen`]) - Runs one structure end-to-end: archive
//!   preparation, the calculation pipeline, and the archived outcome.
//! - **Extraction** ([`extract`]) - Sweeps the success archives into the
//!   extracted property dataset, verifying what the job driver could not.

pub mod extract;
pub mod generate;
pub mod screen;
