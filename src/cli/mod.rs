//! Command Line Interface (CLI) layer for GEOTHERM.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`): resolve parameters from the
//! config file and flag overrides, run the analysis on a manifest, and
//! write the products.
//!
//! If you are embedding GEOTHERM into another application, prefer using
//! the high-level `geotherm::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
