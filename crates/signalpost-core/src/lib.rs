//! # SignalPost Core
//!
//! Shared foundation for the SignalPost workspace: the unified error type,
//! TOML configuration, the business-day calendar gate, canned broadcast
//! texts, and the `Transport` seam the rest of the system sends through.

pub mod calendar;
pub mod config;
pub mod error;
pub mod messages;
pub mod traits;

pub use calendar::BusinessCalendar;
pub use config::SignalPostConfig;
pub use error::{Result, SignalPostError};
pub use traits::{IncomingMessage, Transport};
