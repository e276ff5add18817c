//! # SignalPost Store
//!
//! SQLite persistence for the subscription ledger, payment records, the
//! per-date daily-post marker, the append-only publication log, and the
//! scheduler's firing history. Every public operation is a single
//! transaction: a concurrent reader never observes a half-applied state
//! (marker set without its publication record, confirmed payment without
//! its subscriber row).

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;

use signalpost_core::error::{Result, SignalPostError};

/// Days of access granted per confirmed payment.
pub const SUBSCRIPTION_DAYS: i64 = 30;

/// Window for the "expiring soon" report bucket.
pub const EXPIRY_WARNING_DAYS: i64 = 3;

/// A subscriber row. "Active" is derived from `expires_at`, never stored.
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub user_id: i64,
    pub name: String,
    pub activated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Payment status. PENDING rows accumulate; confirmation flips exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Confirmed,
}

impl PaymentStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
        }
    }
}

/// A payment-evidence record.
#[derive(Debug, Clone)]
pub struct Payment {
    pub id: String,
    pub payer_id: i64,
    pub payer_name: String,
    pub amount: u32,
    pub evidence: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// Point-in-time ledger aggregates for the admin panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerReport {
    pub total: u32,
    pub expiring_soon: u32,
    pub expired: u32,
}

/// The persistent store shared by the command handler and the scheduler.
pub struct SignalStore {
    conn: Mutex<Connection>,
}

fn store_err(e: impl std::fmt::Display) -> SignalPostError {
    SignalPostError::Store(e.to_string())
}

/// Uniform timestamp encoding so stored values compare lexicographically.
fn encode_ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn decode_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_default()
}

fn encode_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl SignalStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(store_err)?;
        Self::init(conn)
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        // WAL so the scheduler and the command handler never hit
        // "database is locked" against each other.
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(store_err)?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Run schema migrations.
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(store_err)?;
        conn.execute_batch(
            "
            -- Subscription ledger: one live row per user, replace on renewal
            CREATE TABLE IF NOT EXISTS subscribers (
                user_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                activated_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );

            -- Payment evidence; status is 'pending' or 'confirmed'
            CREATE TABLE IF NOT EXISTS payments (
                id TEXT PRIMARY KEY,
                payer_id INTEGER NOT NULL,
                payer_name TEXT NOT NULL,
                amount INTEGER NOT NULL,
                evidence TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_payments_payer ON payments(payer_id, status);

            -- Daily-post marker: presence of the row means posted
            CREATE TABLE IF NOT EXISTS daily_posts (
                post_date TEXT PRIMARY KEY,
                posted_at TEXT NOT NULL
            );

            -- Append-only log of everything published as a signal list
            CREATE TABLE IF NOT EXISTS publications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                published_at TEXT NOT NULL,
                content TEXT NOT NULL
            );

            -- Scheduler firing history: one row per (job, day)
            CREATE TABLE IF NOT EXISTS job_firings (
                job_id TEXT NOT NULL,
                fired_on TEXT NOT NULL,
                fired_at TEXT NOT NULL,
                PRIMARY KEY (job_id, fired_on)
            );
            ",
        )
        .map_err(store_err)?;
        Ok(())
    }

    // ─── Subscription ledger ──────────────────────────────────

    /// Create or renew a subscriber. Renewal resets the window to
    /// `now + 30 days`; it does not extend an existing expiration.
    pub fn upsert_subscriber(
        &self,
        user_id: i64,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let expires_at = now + Duration::days(SUBSCRIPTION_DAYS);
        let conn = self.conn.lock().map_err(store_err)?;
        conn.execute(
            "INSERT OR REPLACE INTO subscribers (user_id, name, activated_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, name, encode_ts(now), encode_ts(expires_at)],
        )
        .map_err(store_err)?;
        Ok(expires_at)
    }

    /// Fetch one subscriber row, expired or not.
    pub fn subscriber(&self, user_id: i64) -> Result<Option<Subscriber>> {
        let conn = self.conn.lock().map_err(store_err)?;
        conn.query_row(
            "SELECT user_id, name, activated_at, expires_at FROM subscribers WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(Subscriber {
                    user_id: row.get(0)?,
                    name: row.get(1)?,
                    activated_at: decode_ts(&row.get::<_, String>(2)?),
                    expires_at: decode_ts(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(store_err)
    }

    /// True while `expires_at > now`, strictly. At the boundary the
    /// subscription is already over.
    pub fn is_active(&self, user_id: i64, now: DateTime<Utc>) -> Result<bool> {
        Ok(self
            .subscriber(user_id)?
            .is_some_and(|s| s.expires_at > now))
    }

    /// Ledger aggregates, computed at query time.
    pub fn ledger_report(&self, now: DateTime<Utc>) -> Result<LedgerReport> {
        let conn = self.conn.lock().map_err(store_err)?;
        let now_s = encode_ts(now);
        let soon_s = encode_ts(now + Duration::days(EXPIRY_WARNING_DAYS));

        let total: u32 = conn
            .query_row("SELECT COUNT(*) FROM subscribers", [], |r| r.get(0))
            .map_err(store_err)?;
        let expiring_soon: u32 = conn
            .query_row(
                "SELECT COUNT(*) FROM subscribers WHERE expires_at > ?1 AND expires_at <= ?2",
                params![now_s, soon_s],
                |r| r.get(0),
            )
            .map_err(store_err)?;
        let expired: u32 = conn
            .query_row(
                "SELECT COUNT(*) FROM subscribers WHERE expires_at <= ?1",
                params![now_s],
                |r| r.get(0),
            )
            .map_err(store_err)?;

        Ok(LedgerReport {
            total,
            expiring_soon,
            expired,
        })
    }

    // ─── Payments ─────────────────────────────────────────────

    /// Record submitted payment evidence as PENDING.
    pub fn insert_payment(
        &self,
        payer_id: i64,
        payer_name: &str,
        amount: u32,
        evidence: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let conn = self.conn.lock().map_err(store_err)?;
        conn.execute(
            "INSERT INTO payments (id, payer_id, payer_name, amount, evidence, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                payer_id,
                payer_name,
                amount,
                evidence,
                PaymentStatus::Pending.as_str(),
                encode_ts(now)
            ],
        )
        .map_err(store_err)?;
        Ok(id)
    }

    /// Confirm the most recent PENDING payment for `payer_id` and upsert the
    /// subscriber, in one transaction. Returns the new expiration.
    ///
    /// With no PENDING row this is a `Validation` error and nothing is
    /// written.
    pub fn confirm_payment(&self, payer_id: i64, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let mut conn = self.conn.lock().map_err(store_err)?;
        let tx = conn.transaction().map_err(store_err)?;

        let pending: Option<(String, String)> = tx
            .query_row(
                "SELECT id, payer_name FROM payments
                 WHERE payer_id = ?1 AND status = ?2
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                params![payer_id, PaymentStatus::Pending.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(store_err)?;

        let Some((payment_id, payer_name)) = pending else {
            return Err(SignalPostError::validation(format!(
                "no pending payment for user {payer_id}"
            )));
        };

        tx.execute(
            "UPDATE payments SET status = ?1 WHERE id = ?2",
            params![PaymentStatus::Confirmed.as_str(), payment_id],
        )
        .map_err(store_err)?;

        let expires_at = now + Duration::days(SUBSCRIPTION_DAYS);
        tx.execute(
            "INSERT OR REPLACE INTO subscribers (user_id, name, activated_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![payer_id, payer_name, encode_ts(now), encode_ts(expires_at)],
        )
        .map_err(store_err)?;

        tx.commit().map_err(store_err)?;
        tracing::info!("💳 Payment {payment_id} confirmed for user {payer_id}");
        Ok(expires_at)
    }

    /// All payments for one payer, newest first.
    pub fn payments_for(&self, payer_id: i64) -> Result<Vec<Payment>> {
        let conn = self.conn.lock().map_err(store_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT id, payer_id, payer_name, amount, evidence, status, created_at
                 FROM payments WHERE payer_id = ?1 ORDER BY created_at DESC, id DESC",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![payer_id], |row| {
                let status: String = row.get(5)?;
                Ok(Payment {
                    id: row.get(0)?,
                    payer_id: row.get(1)?,
                    payer_name: row.get(2)?,
                    amount: row.get(3)?,
                    evidence: row.get(4)?,
                    status: if status == "confirmed" {
                        PaymentStatus::Confirmed
                    } else {
                        PaymentStatus::Pending
                    },
                    created_at: decode_ts(&row.get::<_, String>(6)?),
                })
            })
            .map_err(store_err)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ─── Daily-post marker & publications ─────────────────────

    /// True once the list for `date` was published.
    pub fn is_posted(&self, date: NaiveDate) -> Result<bool> {
        let conn = self.conn.lock().map_err(store_err)?;
        let found: Option<String> = conn
            .query_row(
                "SELECT post_date FROM daily_posts WHERE post_date = ?1",
                params![encode_date(date)],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_err)?;
        Ok(found.is_some())
    }

    /// Commit a publication: append the record and set the marker for
    /// `post_date`, atomically. The marker insert is idempotent — the flag
    /// only ever goes to true once per date.
    ///
    /// `post_date` is the civil date in the scheduler's clock domain, not
    /// derived from the UTC instant: near UTC midnight the two disagree, and
    /// the closing-job guard reads the civil one.
    pub fn commit_publication(
        &self,
        now: DateTime<Utc>,
        post_date: NaiveDate,
        content: &str,
    ) -> Result<()> {
        let mut conn = self.conn.lock().map_err(store_err)?;
        let tx = conn.transaction().map_err(store_err)?;

        tx.execute(
            "INSERT INTO publications (published_at, content) VALUES (?1, ?2)",
            params![encode_ts(now), content],
        )
        .map_err(store_err)?;
        tx.execute(
            "INSERT OR IGNORE INTO daily_posts (post_date, posted_at) VALUES (?1, ?2)",
            params![encode_date(post_date), encode_ts(now)],
        )
        .map_err(store_err)?;

        tx.commit().map_err(store_err)?;
        Ok(())
    }

    /// Most recent publications, newest first.
    pub fn recent_publications(&self, limit: usize) -> Result<Vec<(DateTime<Utc>, String)>> {
        let conn = self.conn.lock().map_err(store_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT published_at, content FROM publications ORDER BY id DESC LIMIT ?1",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    decode_ts(&row.get::<_, String>(0)?),
                    row.get::<_, String>(1)?,
                ))
            })
            .map_err(store_err)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ─── Scheduler firing history ─────────────────────────────

    /// Claim the (job, day) firing slot. Returns true if this call claimed
    /// it, false if the job already fired on `date` — even across restarts.
    pub fn claim_job_firing(
        &self,
        job_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.conn.lock().map_err(store_err)?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO job_firings (job_id, fired_on, fired_at)
                 VALUES (?1, ?2, ?3)",
                params![job_id, encode_date(date), encode_ts(now)],
            )
            .map_err(store_err)?;
        Ok(inserted > 0)
    }

    /// Whether the job already fired on `date`.
    pub fn has_job_fired(&self, job_id: &str, date: NaiveDate) -> Result<bool> {
        let conn = self.conn.lock().map_err(store_err)?;
        let found: Option<String> = conn
            .query_row(
                "SELECT job_id FROM job_firings WHERE job_id = ?1 AND fired_on = ?2",
                params![job_id, encode_date(date)],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_err)?;
        Ok(found.is_some())
    }
}
