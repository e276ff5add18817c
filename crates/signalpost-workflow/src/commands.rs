//! Inbound command router.
//!
//! Maps authenticated messages onto workflow entry points: `/start`,
//! `/list` (admin, begins the draft workflow), `/panel` (admin reporting),
//! `/confirm <id>` (admin, payment confirmation), `/status`, `/help`,
//! payment-evidence uploads, and the yes/no reply while a draft is staged.
//!
//! Replies are returned as text; the caller sends them back on the chat the
//! message arrived in. Draft-then-confirm runs under one async mutex, so the
//! administrator's preview is never raced by a concurrent sequence.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

use signalpost_core::error::SignalPostError;
use signalpost_core::{IncomingMessage, Transport, messages};
use signalpost_store::SignalStore;

use crate::publish::{PublishWorkflow, ReplyOutcome};

const ACCESS_DENIED: &str = "🚫 Access denied.";

/// Routes inbound messages for the whole system.
pub struct CommandRouter {
    admin_id: i64,
    payment_key: String,
    subscription_price: u32,
    store: Arc<SignalStore>,
    transport: Arc<dyn Transport>,
    workflow: tokio::sync::Mutex<PublishWorkflow>,
}

impl CommandRouter {
    pub fn new(
        admin_id: i64,
        channel_id: i64,
        payment_key: &str,
        subscription_price: u32,
        store: Arc<SignalStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let workflow = PublishWorkflow::new(admin_id, channel_id, store.clone(), transport.clone());
        Self {
            admin_id,
            payment_key: payment_key.to_string(),
            subscription_price,
            store,
            transport,
            workflow: tokio::sync::Mutex::new(workflow),
        }
    }

    /// Handle one inbound message; the returned text is the reply for the
    /// sender's chat. `None` means stay silent.
    ///
    /// `today` is the civil date in the scheduler's clock domain; a confirmed
    /// publication stamps the daily-post marker under it.
    pub async fn handle(
        &self,
        msg: &IncomingMessage,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> Option<String> {
        if msg.has_attachment {
            return Some(self.receive_evidence(msg, now));
        }

        let text = msg.text.as_deref()?.trim();
        if text.is_empty() {
            return None;
        }

        if msg.sender_id == self.admin_id {
            return self.handle_admin(text, now, today).await;
        }
        self.handle_member(msg, text, now)
    }

    /// Payment evidence: record a PENDING payment awaiting `/confirm`.
    fn receive_evidence(&self, msg: &IncomingMessage, now: DateTime<Utc>) -> String {
        let name = msg.sender_name.as_deref().unwrap_or("unknown");
        match self.store.insert_payment(
            msg.sender_id,
            name,
            self.subscription_price,
            "telegram upload",
            now,
        ) {
            Ok(_) => "📄 Receipt received! Your access will be unlocked once the \
                      payment is confirmed."
                .into(),
            Err(e) => {
                tracing::error!("⚠️ Failed to record payment evidence: {e}");
                "⚠️ Could not record your receipt, please send it again.".into()
            }
        }
    }

    async fn handle_admin(
        &self,
        text: &str,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> Option<String> {
        let mut workflow = self.workflow.lock().await;

        if workflow.has_draft(self.admin_id) {
            // While DRAFTED only three things have meaning: a new /list
            // (overwrite), the confirm token, and the reject token.
            if text.split_whitespace().next() == Some("/list") {
                return Some(self.start_draft(&mut workflow, text));
            }
            return match workflow.reply(self.admin_id, text, now, today).await {
                Ok(ReplyOutcome::Published { .. }) => {
                    Some("✅ List published to the channel.".into())
                }
                Ok(ReplyOutcome::Discarded) => Some("🗑 Draft discarded.".into()),
                Ok(ReplyOutcome::Ignored) => None,
                Err(SignalPostError::Transport(e)) => {
                    tracing::error!("⚠️ Publish broadcast failed: {e}");
                    Some(
                        "⚠️ Broadcast failed; your draft is kept. Reply yes to retry."
                            .into(),
                    )
                }
                Err(e) => {
                    tracing::error!("⚠️ Publish commit failed: {e}");
                    Some("⚠️ Could not record the publication; your draft is kept.".into())
                }
            };
        }

        match text.split_whitespace().next().unwrap_or_default() {
            "/start" => Some(messages::welcome(&self.payment_key, self.subscription_price)),
            "/help" => Some(self.help_text()),
            "/status" => Some(self.status_text(self.admin_id, now)),
            "/list" => Some(self.start_draft(&mut workflow, text)),
            "/panel" => Some(self.panel_text(now)),
            "/confirm" => Some(self.confirm_payment(text, now).await),
            _ => None,
        }
    }

    fn handle_member(
        &self,
        msg: &IncomingMessage,
        text: &str,
        now: DateTime<Utc>,
    ) -> Option<String> {
        match text.split_whitespace().next().unwrap_or_default() {
            "/start" => Some(messages::welcome(&self.payment_key, self.subscription_price)),
            "/help" => Some(self.help_text()),
            "/status" => Some(self.status_text(msg.sender_id, now)),
            // Admin-only transitions are rejected without any state change.
            "/list" | "/panel" | "/confirm" => Some(ACCESS_DENIED.into()),
            _ => None,
        }
    }

    /// Begin (or overwrite) the draft from the text after `/list`.
    fn start_draft(&self, workflow: &mut PublishWorkflow, text: &str) -> String {
        let raw = text.strip_prefix("/list").unwrap_or(text).trim();
        if raw.is_empty() {
            return "⚠️ Send the list lines after /list, one signal per line.".into();
        }

        match workflow.draft(self.admin_id, raw) {
            Ok(preview) => {
                let warning = if preview.replaced {
                    "⚠️ Previous draft replaced.\n\n"
                } else {
                    ""
                };
                format!(
                    "{warning}{}\n\n👀 Preview above — {} signals. Reply *{}* to publish or *{}* to discard.",
                    preview.body,
                    preview.entry_count,
                    messages::CONFIRM_TOKEN,
                    messages::REJECT_TOKEN,
                )
            }
            Err(e) => {
                tracing::error!("⚠️ Draft failed: {e}");
                ACCESS_DENIED.into()
            }
        }
    }

    /// `/confirm <user_id>` — flip the most recent PENDING payment and
    /// unlock the subscriber.
    async fn confirm_payment(&self, text: &str, now: DateTime<Utc>) -> String {
        let Some(target) = text
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse::<i64>().ok())
        else {
            return "⚠️ Usage: /confirm <numeric user id>".into();
        };

        match self.store.confirm_payment(target, now) {
            Ok(expires_at) => {
                // Best-effort courtesy note to the payer; their private chat
                // id equals their user id.
                let note = messages::payment_confirmed(expires_at.date_naive());
                if let Err(e) = self.transport.send(target, &note).await {
                    tracing::warn!("⚠️ Could not notify payer {target}: {e}");
                }
                format!(
                    "✅ Payment confirmed for {target}. Access until {}.",
                    expires_at.format("%d/%m/%Y")
                )
            }
            Err(SignalPostError::Validation(_)) => {
                format!("⚠️ No pending payment found for {target}. Nothing changed.")
            }
            Err(e) => {
                tracing::error!("⚠️ Payment confirmation failed: {e}");
                "⚠️ Confirmation failed; nothing changed. Please retry.".into()
            }
        }
    }

    fn panel_text(&self, now: DateTime<Utc>) -> String {
        match self.store.ledger_report(now) {
            Ok(report) => {
                let revenue = report.total * self.subscription_price;
                format!(
                    "📊 *SignalPost Panel*\n\n\
                     👥 Subscribers: {}\n\
                     ⏳ Expiring within 3 days: {}\n\
                     🚪 Expired: {}\n\
                     💸 Estimated revenue: ${revenue}.00",
                    report.total, report.expiring_soon, report.expired
                )
            }
            Err(e) => {
                tracing::error!("⚠️ Panel query failed: {e}");
                "⚠️ Could not load the panel, please retry.".into()
            }
        }
    }

    fn status_text(&self, user_id: i64, now: DateTime<Utc>) -> String {
        match self.store.subscriber(user_id) {
            Ok(Some(sub)) if sub.expires_at > now => format!(
                "✅ Subscription active until {}.",
                sub.expires_at.format("%d/%m/%Y")
            ),
            Ok(Some(sub)) => format!(
                "🚪 Subscription expired on {}. Send /start to renew.",
                sub.expires_at.format("%d/%m/%Y")
            ),
            Ok(None) => "ℹ️ No subscription on record. Send /start to join.".into(),
            Err(e) => {
                tracing::error!("⚠️ Status query failed: {e}");
                "⚠️ Could not check your status, please retry.".into()
            }
        }
    }

    fn help_text(&self) -> String {
        "💹 *SignalPost commands*\n\n\
         /start — subscription instructions\n\
         /status — your access status\n\
         /help — this message\n\n\
         After paying, send your receipt (image or PDF) here."
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use signalpost_core::error::Result;
    use std::sync::Mutex;

    const ADMIN: i64 = 77;
    const CHANNEL: i64 = -500;

    struct RecordingTransport {
        sent: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
            self.sent.lock().expect("lock").push((chat_id, text.to_string()));
            Ok(())
        }
    }

    fn setup() -> (CommandRouter, Arc<SignalStore>, Arc<RecordingTransport>) {
        let store = Arc::new(SignalStore::open_in_memory().expect("store"));
        let transport = Arc::new(RecordingTransport {
            sent: Mutex::new(Vec::new()),
        });
        let router = CommandRouter::new(ADMIN, CHANNEL, "key-123", 30, store.clone(), transport.clone());
        (router, store, transport)
    }

    fn msg(sender_id: i64, text: &str) -> IncomingMessage {
        IncomingMessage {
            chat_id: sender_id,
            sender_id,
            sender_name: Some("Tester".into()),
            text: Some(text.into()),
            has_attachment: false,
            timestamp: now(),
        }
    }

    fn evidence(sender_id: i64) -> IncomingMessage {
        IncomingMessage {
            chat_id: sender_id,
            sender_id,
            sender_name: Some("Payer".into()),
            text: None,
            has_attachment: true,
            timestamp: now(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 27, 9, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn today() -> NaiveDate {
        now().date_naive()
    }

    #[tokio::test]
    async fn test_start_reply_carries_payment_key() {
        let (router, _store, _transport) = setup();
        let reply = router.handle(&msg(5, "/start"), now(), today()).await.expect("reply");
        assert!(reply.contains("key-123"));
        assert!(reply.contains("$30.00"));
    }

    #[tokio::test]
    async fn test_admin_only_commands_rejected_for_members() {
        let (router, store, _transport) = setup();
        for cmd in ["/list EURUSD; 09:05; CALL; G2", "/panel", "/confirm 5"] {
            let reply = router.handle(&msg(5, cmd), now(), today()).await.expect("reply");
            assert_eq!(reply, ACCESS_DENIED, "command {cmd:?}");
        }
        // No state leaked from the rejected draft attempt.
        assert!(store.recent_publications(5).expect("log").is_empty());
    }

    #[tokio::test]
    async fn test_full_publish_flow_via_router() {
        let (router, store, transport) = setup();

        let preview = router
            .handle(&msg(ADMIN, "/list\nEURUSD; 09:05; CALL; G2"), now(), today())
            .await
            .expect("preview");
        assert!(preview.contains("EURUSD"));
        assert!(preview.contains("Reply"));

        // Unrelated admin text while drafted: silent no-op.
        assert!(router.handle(&msg(ADMIN, "hmm"), now(), today()).await.is_none());

        let done = router.handle(&msg(ADMIN, "YES"), now(), today()).await.expect("published");
        assert!(done.contains("published"));

        let sent = transport.sent.lock().expect("lock").clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, CHANNEL);
        assert!(store.is_posted(now().date_naive()).expect("posted"));
    }

    #[tokio::test]
    async fn test_second_list_overwrites_with_warning() {
        let (router, _store, _transport) = setup();
        router
            .handle(&msg(ADMIN, "/list EURUSD; 09:05; CALL; G2"), now(), today())
            .await
            .expect("first");
        let second = router
            .handle(&msg(ADMIN, "/list GBPJPY; 10:00; PUT; G1"), now(), today())
            .await
            .expect("second");
        assert!(second.contains("Previous draft replaced"));
        assert!(second.contains("GBPJPY"));
    }

    #[tokio::test]
    async fn test_empty_list_command_is_validation_reply() {
        let (router, _store, _transport) = setup();
        let reply = router.handle(&msg(ADMIN, "/list"), now(), today()).await.expect("reply");
        assert!(reply.contains("Send the list lines"));
        // No draft was staged: a stray "yes" does nothing.
        assert!(router.handle(&msg(ADMIN, "yes"), now(), today()).await.is_none());
    }

    #[tokio::test]
    async fn test_evidence_then_confirm_unlocks_subscriber() {
        let (router, store, transport) = setup();

        let receipt = router.handle(&evidence(42), now(), today()).await.expect("receipt");
        assert!(receipt.contains("Receipt received"));
        assert!(!store.is_active(42, now()).expect("still pending"));

        let confirm = router
            .handle(&msg(ADMIN, "/confirm 42"), now(), today())
            .await
            .expect("confirm");
        assert!(confirm.contains("confirmed"));
        assert!(store.is_active(42, now()).expect("active"));

        // The payer got a courtesy note in their private chat.
        let sent = transport.sent.lock().expect("lock").clone();
        assert!(sent.iter().any(|(chat, text)| *chat == 42 && text.contains("confirmed")));
    }

    #[tokio::test]
    async fn test_confirm_with_bad_target() {
        let (router, _store, _transport) = setup();
        let usage = router
            .handle(&msg(ADMIN, "/confirm abc"), now(), today())
            .await
            .expect("usage");
        assert!(usage.contains("Usage"));

        let missing = router
            .handle(&msg(ADMIN, "/confirm 9000"), now(), today())
            .await
            .expect("missing");
        assert!(missing.contains("No pending payment"));
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let (router, store, _transport) = setup();
        let none = router.handle(&msg(8, "/status"), now(), today()).await.expect("none");
        assert!(none.contains("No subscription"));

        store.upsert_subscriber(8, "Tester", now()).expect("upsert");
        let active = router.handle(&msg(8, "/status"), now(), today()).await.expect("active");
        assert!(active.contains("active"));

        let later = now() + chrono::Duration::days(31);
        let expired = router
            .handle(&msg(8, "/status"), later, later.date_naive())
            .await
            .expect("expired");
        assert!(expired.contains("expired"));
    }

    #[tokio::test]
    async fn test_plain_member_text_is_silent() {
        let (router, _store, _transport) = setup();
        assert!(router.handle(&msg(5, "hello there"), now(), today()).await.is_none());
    }
}
