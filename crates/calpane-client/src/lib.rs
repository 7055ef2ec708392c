//! calpane client library.
//!
//! Everything behind the `calpane` binary: argument parsing, configuration,
//! secret references, the terminal render surface and the notice forwarder.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod notifier;
pub mod secret;
pub mod surface;
