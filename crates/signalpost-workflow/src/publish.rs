//! Publish workflow — the IDLE → DRAFTED → {PUBLISHED | DISCARDED} machine.
//!
//! The pending preview is an explicit keyed store (administrator id →
//! staged body) with plain transition functions, so the whole machine is
//! testable without a live transport. Terminal states collapse back to
//! IDLE for the next list.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use signalpost_core::error::{Result, SignalPostError};
use signalpost_core::{Transport, messages};
use signalpost_store::SignalStore;

use crate::render::render_list;

/// The staged preview echoed back to the administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub body: String,
    pub entry_count: usize,
    /// True when this draft overwrote an earlier staged one.
    pub replaced: bool,
}

/// What a reply while DRAFTED did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Broadcast sent and publication committed; back to IDLE.
    Published { body: String },
    /// Preview cleared, nothing sent or written; back to IDLE.
    Discarded,
    /// Not a token, or nothing was drafted — state unchanged.
    Ignored,
}

/// Per-administrator publish state machine.
pub struct PublishWorkflow {
    admin_id: i64,
    channel_id: i64,
    store: Arc<SignalStore>,
    transport: Arc<dyn Transport>,
    /// Administrator id → staged body. At most one in-flight draft per admin.
    drafts: HashMap<i64, String>,
}

impl PublishWorkflow {
    pub fn new(
        admin_id: i64,
        channel_id: i64,
        store: Arc<SignalStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            admin_id,
            channel_id,
            store,
            transport,
            drafts: HashMap::new(),
        }
    }

    /// True while a preview is staged for `caller_id`.
    pub fn has_draft(&self, caller_id: i64) -> bool {
        self.drafts.contains_key(&caller_id)
    }

    /// IDLE → DRAFTED. Renders `raw`, stages the preview, and returns it for
    /// echoing. A second draft overwrites the staged one (`replaced` set so
    /// the caller can warn). Only the fixed administrator may draft.
    pub fn draft(&mut self, caller_id: i64, raw: &str) -> Result<Preview> {
        if caller_id != self.admin_id {
            return Err(SignalPostError::authorization(
                "only the administrator can draft a list",
            ));
        }

        let rendered = render_list(raw);
        let replaced = self
            .drafts
            .insert(caller_id, rendered.body.clone())
            .is_some();
        tracing::info!(
            "📝 List drafted: {} entries{}",
            rendered.entry_count,
            if replaced { " (replaced prior draft)" } else { "" }
        );
        Ok(Preview {
            body: rendered.body,
            entry_count: rendered.entry_count,
            replaced,
        })
    }

    /// Handle a reply while possibly DRAFTED. Token matching is exact and
    /// case-insensitive; any other text leaves the preview untouched.
    ///
    /// On confirm the broadcast goes out first, then the publication record
    /// and the marker for `post_date` commit in one transaction. If either
    /// step fails the draft stays staged so the administrator can retry
    /// manually. `post_date` is the civil date in the scheduler's clock
    /// domain — the closing-job guard reads the marker under that date, which
    /// near UTC midnight differs from `now.date_naive()`.
    pub async fn reply(
        &mut self,
        caller_id: i64,
        text: &str,
        now: DateTime<Utc>,
        post_date: NaiveDate,
    ) -> Result<ReplyOutcome> {
        if caller_id != self.admin_id || !self.has_draft(caller_id) {
            return Ok(ReplyOutcome::Ignored);
        }

        let token = text.trim();
        if token.eq_ignore_ascii_case(messages::CONFIRM_TOKEN) {
            let body = self
                .drafts
                .get(&caller_id)
                .cloned()
                .unwrap_or_default();

            self.transport.send(self.channel_id, &body).await?;
            self.store.commit_publication(now, post_date, &body)?;
            self.drafts.remove(&caller_id);
            tracing::info!("📣 List published and marker set for {post_date}");
            Ok(ReplyOutcome::Published { body })
        } else if token.eq_ignore_ascii_case(messages::REJECT_TOKEN) {
            self.drafts.remove(&caller_id);
            tracing::info!("🗑 Draft discarded");
            Ok(ReplyOutcome::Discarded)
        } else {
            Ok(ReplyOutcome::Ignored)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    const ADMIN: i64 = 1_722_782_714;
    const CHANNEL: i64 = -1_000_100;

    struct RecordingTransport {
        sent: Mutex<Vec<(i64, String)>>,
        fail: std::sync::atomic::AtomicBool,
    }

    impl RecordingTransport {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: std::sync::atomic::AtomicBool::new(false),
            }
        }

        fn set_failing(&self, failing: bool) {
            self.fail.store(failing, std::sync::atomic::Ordering::SeqCst);
        }

        fn sent(&self) -> Vec<(i64, String)> {
            self.sent.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(SignalPostError::transport("simulated outage"));
            }
            self.sent.lock().expect("lock").push((chat_id, text.to_string()));
            Ok(())
        }
    }

    fn setup() -> (PublishWorkflow, Arc<SignalStore>, Arc<RecordingTransport>) {
        let store = Arc::new(SignalStore::open_in_memory().expect("store"));
        let transport = Arc::new(RecordingTransport::new());
        let workflow = PublishWorkflow::new(ADMIN, CHANNEL, store.clone(), transport.clone());
        (workflow, store, transport)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 27, 21, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    fn today() -> NaiveDate {
        now().date_naive()
    }

    #[tokio::test]
    async fn test_publish_near_utc_midnight_marks_civil_date() {
        let (mut workflow, store, _transport) = setup();
        workflow.draft(ADMIN, "EURUSD; 09:05; CALL; G2").expect("draft");

        // 23:00 UTC on the 26th, but it is already the 27th in the
        // scheduler's zone. The marker must land on the 27th or the closing
        // guard never sees it.
        let late = Utc
            .with_ymd_and_hms(2026, 8, 26, 23, 0, 0)
            .single()
            .expect("valid timestamp");
        let civil = NaiveDate::from_ymd_opt(2026, 8, 27).expect("valid date");

        let outcome = workflow.reply(ADMIN, "yes", late, civil).await.expect("reply");
        assert!(matches!(outcome, ReplyOutcome::Published { .. }));
        assert!(store.is_posted(civil).expect("civil date posted"));
        assert!(!store.is_posted(late.date_naive()).expect("utc date unmarked"));
    }

    #[tokio::test]
    async fn test_draft_confirm_publishes_and_sets_marker() {
        let (mut workflow, store, transport) = setup();
        let preview = workflow
            .draft(ADMIN, "EURUSD; 09:05; CALL; G2")
            .expect("draft");
        assert_eq!(preview.entry_count, 1);
        assert!(!preview.replaced);

        // Case-insensitive exact token.
        let outcome = workflow.reply(ADMIN, "  YeS ", now(), today()).await.expect("reply");
        assert!(matches!(outcome, ReplyOutcome::Published { .. }));

        assert_eq!(transport.sent().len(), 1);
        assert_eq!(transport.sent()[0].0, CHANNEL);
        assert!(store.is_posted(now().date_naive()).expect("posted"));
        assert_eq!(store.recent_publications(5).expect("log").len(), 1);
        assert!(!workflow.has_draft(ADMIN));
    }

    #[tokio::test]
    async fn test_non_admin_cannot_draft() {
        let (mut workflow, _store, _transport) = setup();
        let err = workflow.draft(999, "EURUSD; 09:05; CALL; G2").expect_err("denied");
        assert!(matches!(err, SignalPostError::Authorization(_)));
        assert!(!workflow.has_draft(999));
    }

    #[tokio::test]
    async fn test_reject_clears_draft_without_writes() {
        let (mut workflow, store, transport) = setup();
        workflow.draft(ADMIN, "EURUSD; 09:05; CALL; G2").expect("draft");

        let outcome = workflow.reply(ADMIN, "no", now(), today()).await.expect("reply");
        assert_eq!(outcome, ReplyOutcome::Discarded);
        assert!(transport.sent().is_empty());
        assert!(!store.is_posted(now().date_naive()).expect("not posted"));
        assert!(store.recent_publications(5).expect("log").is_empty());
        assert!(!workflow.has_draft(ADMIN));
    }

    #[tokio::test]
    async fn test_other_text_while_drafted_is_noop() {
        let (mut workflow, _store, _transport) = setup();
        let preview = workflow.draft(ADMIN, "EURUSD; 09:05; CALL; G2").expect("draft");

        for text in ["maybe", "yes please", "", "/panel"] {
            let outcome = workflow.reply(ADMIN, text, now(), today()).await.expect("reply");
            assert_eq!(outcome, ReplyOutcome::Ignored, "text {text:?}");
        }
        assert!(workflow.has_draft(ADMIN));

        // The staged body is unchanged: confirming now publishes the
        // original preview.
        let outcome = workflow.reply(ADMIN, "yes", now(), today()).await.expect("reply");
        assert_eq!(outcome, ReplyOutcome::Published { body: preview.body });
    }

    #[tokio::test]
    async fn test_reply_without_draft_is_ignored() {
        let (mut workflow, _store, _transport) = setup();
        let outcome = workflow.reply(ADMIN, "yes", now(), today()).await.expect("reply");
        assert_eq!(outcome, ReplyOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_second_draft_overwrites_with_flag() {
        let (mut workflow, _store, transport) = setup();
        workflow.draft(ADMIN, "EURUSD; 09:05; CALL; G2").expect("draft");
        let second = workflow.draft(ADMIN, "GBPJPY; 10:00; PUT; G1").expect("draft");
        assert!(second.replaced);

        workflow.reply(ADMIN, "yes", now(), today()).await.expect("reply");
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("GBPJPY"));
        assert!(!sent[0].1.contains("EURUSD"));
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_draft_and_store_clean() {
        let (mut workflow, store, transport) = setup();
        workflow.draft(ADMIN, "EURUSD; 09:05; CALL; G2").expect("draft");

        transport.set_failing(true);
        let err = workflow.reply(ADMIN, "yes", now(), today()).await.expect_err("outage");
        assert!(matches!(err, SignalPostError::Transport(_)));

        // Draft survives, nothing committed; a manual retry succeeds.
        assert!(workflow.has_draft(ADMIN));
        assert!(!store.is_posted(now().date_naive()).expect("not posted"));
        assert!(store.recent_publications(5).expect("log").is_empty());

        transport.set_failing(false);
        let outcome = workflow.reply(ADMIN, "yes", now(), today()).await.expect("retry");
        assert!(matches!(outcome, ReplyOutcome::Published { .. }));
        assert!(store.is_posted(now().date_naive()).expect("posted"));
    }

    #[tokio::test]
    async fn test_zero_entry_draft_still_publishes_boilerplate() {
        let (mut workflow, store, _transport) = setup();
        let preview = workflow.draft(ADMIN, "a;b\nno fields here").expect("draft");
        assert_eq!(preview.entry_count, 0);

        let outcome = workflow.reply(ADMIN, "yes", now(), today()).await.expect("reply");
        assert!(matches!(outcome, ReplyOutcome::Published { .. }));
        assert!(store.is_posted(now().date_naive()).expect("posted"));
    }
}
