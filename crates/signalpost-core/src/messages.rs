//! Canned broadcast and reply texts.
//!
//! Everything the system ever says is assembled from these fixed pieces; the
//! only dynamic content is the signal list the administrator drafts.

/// Rotating motivational set. Each scheduled slot is bound to one entry by
/// index, never by a captured loop variable.
pub const MOTIVATIONAL_MESSAGES: [&str; 5] = [
    "🚀 Consistency is what separates winners. Keep following the plan, trader!",
    "💰 Management is everything. Respect the limit and you win in the long run.",
    "🔥 One bad day does not define your journey. Focus, discipline, keep going!",
    "📊 The market rewards strategy, not emotion. Stay firm!",
    "⚡ Discipline today means financial freedom tomorrow. Do your part.",
];

/// End-of-list closing broadcast, sent only on days the list was published.
pub const CLOSING_MESSAGE: &str = "━━━━━━━━━━━━━━━\n\
💹 *List Closed — SignalPost*\n\n\
✅ Today's list is closed (cutoff: 16:00).\n\
👏 If you followed the management plan, well done. If not, remember: discipline beats haste.\n\n\
⚠️ Reminder: signals are valid up to *Gale 2 (G2)*. Stick to the *2-wins-and-out* management rule.\n\
📌 Today's results will be published shortly.\n\n\
🧠 *SignalPost 💹 | VIP Signal Room 🚀*\n\
━━━━━━━━━━━━━━━";

/// Business-night notice that the next list is coming.
pub const NIGHT_PRELIST_MESSAGE: &str = "━━━━━━━━━━━━━━━\n\
💹 *SignalPost Notice — New List*\n\n\
⏰ Heads up: tonight (business day) the *new list* will be posted by **23:00** for use tomorrow.\n\
📈 Reminder: open-market signals only, no OTC.\n\
🕒 Lists only carry signals between **00:00 and 16:00**, focused on the most assertive windows.\n\n\
🧠 *SignalPost 💹 | VIP Signal Room 🚀*\n\
━━━━━━━━━━━━━━━";

/// Footer appended to every published signal list.
pub const LIST_FOOTER: &str = "\n⚠️ Signals valid up to Gale 2 (G2).\n\
📌 Management: 2 wins and out of the market.\n\n\
🧠 *SignalPost 💹 | VIP Signal Room 🚀*";

/// Timeframe label used when the draft carries none.
pub const DEFAULT_TIMEFRAME: &str = "00:00 — 16:00";

/// Affirmation token that publishes a drafted list (matched case-insensitively).
pub const CONFIRM_TOKEN: &str = "yes";

/// Rejection token that discards a drafted list.
pub const REJECT_TOKEN: &str = "no";

/// Welcome/instructions reply to `/start`.
pub fn welcome(payment_key: &str, price: u32) -> String {
    format!(
        "💹 *Welcome to SignalPost | VIP Signal Room 🚀*\n\n\
         To access the exclusive lists, subscribe for *${price}.00/month*.\n\n\
         💰 *Payment key:* `{payment_key}`\n\n\
         After paying, send your receipt (image or PDF) right here.\n\
         Once confirmed, your access is unlocked for 30 days."
    )
}

/// Reply sent to a payer once their payment is confirmed.
pub fn payment_confirmed(expiration: chrono::NaiveDate) -> String {
    format!(
        "✅ Payment confirmed!\nYour access expires on *{}*.",
        expiration.format("%d/%m/%Y")
    )
}

/// Header line of a published signal list.
pub fn list_header(timeframe: &str) -> String {
    format!(
        "━━━━━━━━━━━━━━━\n💹 *SignalPost — Daily List* ({timeframe})\n━━━━━━━━━━━━━━━\n"
    )
}
