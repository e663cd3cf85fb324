//! Core of the command bot: update model, command extraction and the per-chat
//! dispatch engine.
//!
//! The chat platform and the content sources live behind ports (traits)
//! implemented in adapter crates.

pub mod command;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod extract;
pub mod formatting;
pub mod handlers;
pub mod logging;
pub mod messaging;
pub mod poller;
pub mod ports;

pub use errors::{Error, Result};
