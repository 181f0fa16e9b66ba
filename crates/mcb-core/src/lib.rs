//! Core domain + application logic for the mortgage calculator bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! `MessagingPort` trait implemented in the adapter crate.

pub mod bot;
pub mod calculator;
pub mod config;
pub mod dialog;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod session;
pub mod store;
pub mod utils;

pub use errors::{Error, Result};
