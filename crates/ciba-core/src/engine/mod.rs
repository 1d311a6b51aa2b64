//! # Engine Module
//!
//! This module implements the job-execution machinery of the campaign: it
//! turns one stored structure into a terminal success or error archive by
//! driving the external engine through the fixed calculation pipeline.
//!
//! ## Overview
//!
//! A job has no persisted state of its own. The set of log files in the
//! working directory *is* the state: a stage counts as done exactly when
//! its log exists and parses as normally terminated, and the archive pair
//! `{title}.tar.gz` / `{title}_error.tar.gz` records the terminal outcome.
//! Re-invoking a job therefore resumes it, and a title whose success
//! archive exists is never touched again.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Immutable campaign-wide calculation
//!   settings, passed explicitly into every workflow.
//! - **Stages** ([`stage`]) - The fixed pipeline and per-stage input decks.
//! - **Engine Invocation** ([`runner`]) - The blocking subprocess seam to
//!   the external engine.
//! - **Job Driver** ([`driver`]) - Resume classification, the relaxation
//!   recovery policy, and the failure rules.
//! - **Archives** ([`archive`]) - Working-directory preparation and the
//!   two-state archive outcome.
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress
//!   reporting for long sweeps.
//! - **Error Handling** ([`error`]) - Engine-specific error types.

pub mod archive;
pub mod config;
pub mod driver;
pub mod error;
pub mod progress;
pub mod runner;
pub mod stage;
