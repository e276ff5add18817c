//! # SignalPost Channels
//!
//! Message transport implementations. Today that is Telegram; the rest of
//! the system only sees the `Transport` trait.

pub mod telegram;

pub use telegram::{TelegramChannel, TelegramPollingStream};
