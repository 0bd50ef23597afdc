//! Microcode control word editor core.
//!
//! A [`session::Session`] owns a set of enumerated controls. Every edit
//! re-runs the derivation rules (which controls are enabled, which diagram
//! arrows are visible) and packs the selections into the four K registers.

pub mod condition;
pub mod config;
pub mod ds;
pub mod error;
pub mod packer;
pub mod parser;
pub mod rules;
pub mod script;
pub mod session;

pub use error::{ConfigError, ParseError, SelectError};
pub use session::Session;
