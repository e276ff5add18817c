//! The transport seam and the inbound message shape.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// One-way message transport to a chat endpoint.
///
/// The scheduler and the publish workflow only ever see this trait; the
/// Telegram implementation lives in `signalpost-channels` and tests use an
/// in-memory recorder.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str) -> Result<()>;
}

/// An inbound message after the channel has authenticated the sender.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Chat the message arrived in.
    pub chat_id: i64,
    /// Stable sender identifier.
    pub sender_id: i64,
    /// Display name, when the channel provides one.
    pub sender_name: Option<String>,
    /// Text content; None for pure-attachment messages.
    pub text: Option<String>,
    /// True when the message carries a photo or document (payment evidence).
    pub has_attachment: bool,
    pub timestamp: DateTime<Utc>,
}
