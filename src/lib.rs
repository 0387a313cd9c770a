//! Encrypted Orderbook Agent
//!
//! Turns free-form trading commands into validated calls against an
//! external encrypted-orderbook service:
//! - Matches each command against an ordered set of action descriptors
//! - Extracts structured parameters with ordered fallback rules
//! - Issues at most one remote call per command
//! - Keeps a per-session display cache with an encryption-visibility mode
//!
//! FLOW:
//! TEXT → SELECT → EXTRACT → INVOKE → COMPOSE

pub mod actions;
pub mod api;
pub mod client;
pub mod composer;
pub mod config;
pub mod dispatcher;
pub mod display;
pub mod error;
pub mod extractor;
pub mod models;
pub mod session;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use dispatcher::Dispatcher;
