//! envsecrets command-line front end
//!
//! Resolves lookup keys from the shell, mainly to check that a deployment's
//! references are wired correctly before a service starts.

pub mod cli;
pub mod commands;
pub mod tracing;
