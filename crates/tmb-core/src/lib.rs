//! Core domain + migration engine for the thread mover bot.
//!
//! This crate is intentionally framework-agnostic. Discord lives behind the
//! `ChatPlatform` / `InvocationContext` ports implemented in the adapter crate.

pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod migration;

pub use errors::{Error, Result};
