//! # Wishline Store
//!
//! SQLite persistence for the dispatch engine: users, contacts, custom
//! messages, templates, per-user settings, reminder logs, and the sent-today
//! dedup markers.
//!
//! The credit ledger lives here because its linearization point is the
//! database: `try_consume_credit` is a single conditional UPDATE, so two
//! workers racing over the same user cannot both pass the check on the last
//! credit.

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, params};

use wishline_core::error::{Result, WishlineError};
use wishline_core::types::{
    ChannelKind, Contact, CreditBalance, CreditDecision, CustomMessage, Occasion, ReminderLog,
    RunSummary, Template, User, UserSettings,
};

/// Persistent store behind a single connection. WAL mode keeps concurrent
/// readers (the log read path) out of the writers' way.
pub struct ReminderStore {
    conn: Mutex<Connection>,
}

fn db_err(e: rusqlite::Error) -> WishlineError {
    WishlineError::Store(e.to_string())
}

fn parse_dt(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_default()
}

fn parse_date(s: String) -> NaiveDate {
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").unwrap_or_default()
}

fn parse_date_opt(s: Option<String>) -> Option<NaiveDate> {
    s.and_then(|v| NaiveDate::parse_from_str(&v, "%Y-%m-%d").ok())
}

// Shared SELECT column lists, single source of truth per table.
const USER_SELECT: &str = "SELECT id,email,full_name,subscription_status,whatsapp_credits,email_credits,unlimited_whatsapp,unlimited_email,created_at FROM users";
const CONTACT_SELECT: &str = "SELECT id,user_id,name,email,whatsapp,birthday,anniversary_date,whatsapp_image_url,email_image_url,message_tone,created_at FROM contacts";
const TEMPLATE_SELECT: &str = "SELECT id,user_id,name,kind,subject,content,is_default,whatsapp_image_url,email_image_url,created_at FROM templates";
const LOG_SELECT: &str = "SELECT id,date,execution_time,total_users,messages_sent,whatsapp_sent,email_sent,errors_json FROM reminder_logs";

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        subscription_status: row.get(3)?,
        whatsapp_credits: row.get(4)?,
        email_credits: row.get(5)?,
        unlimited_whatsapp: row.get::<_, i64>(6)? != 0,
        unlimited_email: row.get::<_, i64>(7)? != 0,
        created_at: parse_dt(row.get(8)?),
    })
}

fn row_to_contact(row: &rusqlite::Row) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        whatsapp: row.get(4)?,
        birthday: parse_date_opt(row.get(5)?),
        anniversary_date: parse_date_opt(row.get(6)?),
        whatsapp_image_url: row.get(7)?,
        email_image_url: row.get(8)?,
        message_tone: row.get(9)?,
        created_at: parse_dt(row.get(10)?),
    })
}

fn row_to_template(row: &rusqlite::Row) -> rusqlite::Result<Template> {
    let kind: String = row.get(3)?;
    Ok(Template {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        kind: ChannelKind::from_str(&kind).unwrap_or(ChannelKind::Whatsapp),
        subject: row.get(4)?,
        content: row.get(5)?,
        is_default: row.get::<_, i64>(6)? != 0,
        whatsapp_image_url: row.get(7)?,
        email_image_url: row.get(8)?,
        created_at: parse_dt(row.get(9)?),
    })
}

fn row_to_log(row: &rusqlite::Row) -> rusqlite::Result<ReminderLog> {
    let errors_json: String = row.get(7)?;
    Ok(ReminderLog {
        id: row.get(0)?,
        summary: RunSummary {
            date: parse_date(row.get(1)?),
            execution_time: parse_dt(row.get(2)?),
            total_users: row.get(3)?,
            messages_sent: row.get(4)?,
            whatsapp_sent: row.get(5)?,
            email_sent: row.get(6)?,
            errors: serde_json::from_str(&errors_json).unwrap_or_default(),
        },
    })
}

impl ReminderStore {
    /// Open or create the store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| WishlineError::Store(format!("Lock: {e}")))
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                full_name TEXT DEFAULT '',
                subscription_status TEXT DEFAULT 'trial',
                whatsapp_credits INTEGER DEFAULT 0,
                email_credits INTEGER DEFAULT 0,
                unlimited_whatsapp INTEGER DEFAULT 0,
                unlimited_email INTEGER DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS contacts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                email TEXT,
                whatsapp TEXT,
                birthday TEXT,
                anniversary_date TEXT,
                whatsapp_image_url TEXT,
                email_image_url TEXT,
                message_tone TEXT DEFAULT 'warm',
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_contacts_user ON contacts(user_id);

            CREATE TABLE IF NOT EXISTS custom_messages (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                contact_id TEXT NOT NULL,
                occasion TEXT NOT NULL,
                channel TEXT NOT NULL,
                body TEXT NOT NULL,
                image_url TEXT,
                created_at TEXT NOT NULL,
                UNIQUE (contact_id, occasion, channel)
            );

            CREATE TABLE IF NOT EXISTS templates (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                subject TEXT,
                content TEXT DEFAULT '',
                is_default INTEGER DEFAULT 0,
                whatsapp_image_url TEXT,
                email_image_url TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_templates_user ON templates(user_id);

            CREATE TABLE IF NOT EXISTS user_settings (
                user_id TEXT PRIMARY KEY,
                timezone TEXT DEFAULT 'UTC',
                daily_send_time TEXT DEFAULT '09:00',
                whatsapp_provider_json TEXT,
                email_sender_json TEXT DEFAULT '{}',
                send_run_report INTEGER DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS reminder_logs (
                id TEXT PRIMARY KEY,
                date TEXT NOT NULL,
                execution_time TEXT NOT NULL,
                total_users INTEGER DEFAULT 0,
                messages_sent INTEGER DEFAULT 0,
                whatsapp_sent INTEGER DEFAULT 0,
                email_sent INTEGER DEFAULT 0,
                errors_json TEXT DEFAULT '[]'
            );
            CREATE INDEX IF NOT EXISTS idx_logs_date ON reminder_logs(date);

            CREATE TABLE IF NOT EXISTS sent_markers (
                contact_id TEXT NOT NULL,
                occasion TEXT NOT NULL,
                date TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (contact_id, occasion, date)
            );
            ",
        )
        .map_err(db_err)?;
        Ok(())
    }

    // ── Users & contacts ────────────────────────────────────────────────

    /// Users eligible for processing (trial or active subscriptions).
    pub fn list_active_users(&self) -> Result<Vec<User>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "{USER_SELECT} WHERE subscription_status != 'expired' ORDER BY created_at"
            ))
            .map_err(db_err)?;
        let users = stmt
            .query_map([], row_to_user)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(users)
    }

    pub fn user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("{USER_SELECT} WHERE id = ?1"))
            .map_err(db_err)?;
        let mut rows = stmt
            .query_map(params![user_id], row_to_user)
            .map_err(db_err)?;
        rows.next().transpose().map_err(db_err)
    }

    pub fn contacts_for_user(&self, user_id: &str) -> Result<Vec<Contact>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("{CONTACT_SELECT} WHERE user_id = ?1 ORDER BY name"))
            .map_err(db_err)?;
        let contacts = stmt
            .query_map(params![user_id], row_to_contact)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(contacts)
    }

    pub fn insert_user(&self, user: &User) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (id,email,full_name,subscription_status,whatsapp_credits,email_credits,unlimited_whatsapp,unlimited_email,created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            params![
                user.id,
                user.email,
                user.full_name,
                user.subscription_status,
                user.whatsapp_credits,
                user.email_credits,
                user.unlimited_whatsapp as i64,
                user.unlimited_email as i64,
                user.created_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub fn insert_contact(&self, contact: &Contact) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO contacts (id,user_id,name,email,whatsapp,birthday,anniversary_date,whatsapp_image_url,email_image_url,message_tone,created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
            params![
                contact.id,
                contact.user_id,
                contact.name,
                contact.email,
                contact.whatsapp,
                contact.birthday.map(|d| d.to_string()),
                contact.anniversary_date.map(|d| d.to_string()),
                contact.whatsapp_image_url,
                contact.email_image_url,
                contact.message_tone,
                contact.created_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    // ── Custom messages & templates ─────────────────────────────────────

    /// The operator-authored message for an exact (contact, occasion, channel)
    /// key, if one exists.
    pub fn custom_message(
        &self,
        contact_id: &str,
        occasion: Occasion,
        channel: ChannelKind,
    ) -> Result<Option<CustomMessage>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id,user_id,contact_id,occasion,channel,body,image_url,created_at
                 FROM custom_messages WHERE contact_id = ?1 AND occasion = ?2 AND channel = ?3",
            )
            .map_err(db_err)?;
        let mut rows = stmt
            .query_map(
                params![contact_id, occasion.as_str(), channel.as_str()],
                |row| {
                    let occ: String = row.get(3)?;
                    let ch: String = row.get(4)?;
                    Ok(CustomMessage {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        contact_id: row.get(2)?,
                        occasion: Occasion::from_str(&occ).unwrap_or(Occasion::Birthday),
                        channel: ChannelKind::from_str(&ch).unwrap_or(ChannelKind::Whatsapp),
                        body: row.get(5)?,
                        image_url: row.get(6)?,
                        created_at: parse_dt(row.get(7)?),
                    })
                },
            )
            .map_err(db_err)?;
        rows.next().transpose().map_err(db_err)
    }

    pub fn insert_custom_message(&self, msg: &CustomMessage) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO custom_messages (id,user_id,contact_id,occasion,channel,body,image_url,created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
            params![
                msg.id,
                msg.user_id,
                msg.contact_id,
                msg.occasion.as_str(),
                msg.channel.as_str(),
                msg.body,
                msg.image_url,
                msg.created_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// The user's default template for a channel, if configured.
    pub fn default_template(&self, user_id: &str, kind: ChannelKind) -> Result<Option<Template>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "{TEMPLATE_SELECT} WHERE user_id = ?1 AND kind = ?2 AND is_default = 1"
            ))
            .map_err(db_err)?;
        let mut rows = stmt
            .query_map(params![user_id, kind.as_str()], row_to_template)
            .map_err(db_err)?;
        rows.next().transpose().map_err(db_err)
    }

    pub fn insert_template(&self, tpl: &Template) -> Result<()> {
        let conn = self.lock()?;
        // One default per (user, kind)
        if tpl.is_default {
            conn.execute(
                "UPDATE templates SET is_default = 0 WHERE user_id = ?1 AND kind = ?2",
                params![tpl.user_id, tpl.kind.as_str()],
            )
            .map_err(db_err)?;
        }
        conn.execute(
            "INSERT INTO templates (id,user_id,name,kind,subject,content,is_default,whatsapp_image_url,email_image_url,created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
            params![
                tpl.id,
                tpl.user_id,
                tpl.name,
                tpl.kind.as_str(),
                tpl.subject,
                tpl.content,
                tpl.is_default as i64,
                tpl.whatsapp_image_url,
                tpl.email_image_url,
                tpl.created_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    // ── Settings ────────────────────────────────────────────────────────

    /// Per-user settings, created with defaults on first read.
    pub fn settings_for(&self, user_id: &str) -> Result<UserSettings> {
        let conn = self.lock()?;
        let row: Option<(String, String, Option<String>, String, i64)> = conn
            .query_row(
                "SELECT timezone,daily_send_time,whatsapp_provider_json,email_sender_json,send_run_report
                 FROM user_settings WHERE user_id = ?1",
                params![user_id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(db_err(other)),
            })?;

        match row {
            Some((timezone, daily_send_time, provider_json, email_json, report)) => {
                Ok(UserSettings {
                    user_id: user_id.to_string(),
                    timezone,
                    daily_send_time,
                    whatsapp_provider: provider_json
                        .and_then(|j| serde_json::from_str(&j).ok()),
                    email_sender: serde_json::from_str(&email_json).unwrap_or_default(),
                    send_run_report: report != 0,
                })
            }
            None => {
                let defaults = UserSettings::defaults_for(user_id);
                conn.execute(
                    "INSERT OR IGNORE INTO user_settings (user_id,timezone,daily_send_time,email_sender_json,send_run_report)
                     VALUES (?1,?2,?3,?4,?5)",
                    params![
                        defaults.user_id,
                        defaults.timezone,
                        defaults.daily_send_time,
                        serde_json::to_string(&defaults.email_sender).unwrap_or_default(),
                        defaults.send_run_report as i64,
                    ],
                )
                .map_err(db_err)?;
                Ok(defaults)
            }
        }
    }

    pub fn upsert_settings(&self, settings: &UserSettings) -> Result<()> {
        let conn = self.lock()?;
        let provider_json = settings
            .whatsapp_provider
            .as_ref()
            .map(|p| serde_json::to_string(p).unwrap_or_default());
        conn.execute(
            "INSERT OR REPLACE INTO user_settings (user_id,timezone,daily_send_time,whatsapp_provider_json,email_sender_json,send_run_report)
             VALUES (?1,?2,?3,?4,?5,?6)",
            params![
                settings.user_id,
                settings.timezone,
                settings.daily_send_time,
                provider_json,
                serde_json::to_string(&settings.email_sender).unwrap_or_default(),
                settings.send_run_report as i64,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    // ── Credit ledger ───────────────────────────────────────────────────

    /// Check and consume send credits for one channel.
    ///
    /// Unlimited users always pass with their counter untouched. Otherwise a
    /// single conditional UPDATE decrements iff the balance covers `count`;
    /// a denial leaves the balance unchanged.
    pub fn try_consume_credit(
        &self,
        user_id: &str,
        channel: ChannelKind,
        count: i64,
    ) -> Result<CreditDecision> {
        let (credit_col, unlimited_col) = match channel {
            ChannelKind::Whatsapp => ("whatsapp_credits", "unlimited_whatsapp"),
            ChannelKind::Email => ("email_credits", "unlimited_email"),
        };
        let conn = self.lock()?;

        let unlimited: i64 = conn
            .query_row(
                &format!("SELECT {unlimited_col} FROM users WHERE id = ?1"),
                params![user_id],
                |r| r.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    WishlineError::Store(format!("unknown user: {user_id}"))
                }
                other => db_err(other),
            })?;

        if unlimited != 0 {
            return Ok(CreditDecision {
                allowed: true,
                remaining: CreditBalance::Unlimited,
            });
        }

        let updated = conn
            .execute(
                &format!(
                    "UPDATE users SET {credit_col} = {credit_col} - ?1
                     WHERE id = ?2 AND {credit_col} >= ?1"
                ),
                params![count, user_id],
            )
            .map_err(db_err)?;

        let balance: i64 = conn
            .query_row(
                &format!("SELECT {credit_col} FROM users WHERE id = ?1"),
                params![user_id],
                |r| r.get(0),
            )
            .map_err(db_err)?;

        Ok(CreditDecision {
            allowed: updated == 1,
            remaining: CreditBalance::Count(balance),
        })
    }

    /// Current balance without consuming anything.
    pub fn credit_balance(&self, user_id: &str, channel: ChannelKind) -> Result<CreditBalance> {
        let (credit_col, unlimited_col) = match channel {
            ChannelKind::Whatsapp => ("whatsapp_credits", "unlimited_whatsapp"),
            ChannelKind::Email => ("email_credits", "unlimited_email"),
        };
        let conn = self.lock()?;
        let (credits, unlimited): (i64, i64) = conn
            .query_row(
                &format!("SELECT {credit_col}, {unlimited_col} FROM users WHERE id = ?1"),
                params![user_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .map_err(db_err)?;
        Ok(if unlimited != 0 {
            CreditBalance::Unlimited
        } else {
            CreditBalance::Count(credits)
        })
    }

    // ── Sent markers (per-day dedup) ────────────────────────────────────

    /// Atomically claim the (contact, occasion, date) marker. Returns true if
    /// this call claimed it, false if a previous run already sent today.
    pub fn mark_sent(&self, contact_id: &str, occasion: Occasion, date: NaiveDate) -> Result<bool> {
        let conn = self.lock()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO sent_markers (contact_id,occasion,date,created_at)
                 VALUES (?1,?2,?3,?4)",
                params![
                    contact_id,
                    occasion.as_str(),
                    date.to_string(),
                    Utc::now().to_rfc3339()
                ],
            )
            .map_err(db_err)?;
        Ok(inserted == 1)
    }

    /// Drop markers older than one day. Called at the start of every run.
    pub fn sweep_sent_markers(&self, today: NaiveDate) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn
            .execute(
                "DELETE FROM sent_markers WHERE date < ?1",
                params![today.to_string()],
            )
            .map_err(db_err)?;
        if removed > 0 {
            tracing::debug!("Swept {removed} expired sent markers");
        }
        Ok(removed)
    }

    // ── Reminder logs ───────────────────────────────────────────────────

    /// Persist the run record. Logs are immutable once written.
    pub fn insert_reminder_log(&self, summary: &RunSummary) -> Result<ReminderLog> {
        let log = ReminderLog {
            id: uuid::Uuid::new_v4().to_string(),
            summary: summary.clone(),
        };
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO reminder_logs (id,date,execution_time,total_users,messages_sent,whatsapp_sent,email_sent,errors_json)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
            params![
                log.id,
                log.summary.date.to_string(),
                log.summary.execution_time.to_rfc3339(),
                log.summary.total_users,
                log.summary.messages_sent,
                log.summary.whatsapp_sent,
                log.summary.email_sent,
                serde_json::to_string(&log.summary.errors).unwrap_or_else(|_| "[]".into()),
            ],
        )
        .map_err(db_err)?;
        Ok(log)
    }

    pub fn logs_for_date(&self, date: NaiveDate) -> Result<Vec<ReminderLog>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "{LOG_SELECT} WHERE date = ?1 ORDER BY execution_time"
            ))
            .map_err(db_err)?;
        let logs = stmt
            .query_map(params![date.to_string()], row_to_log)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(logs)
    }

    /// Logs for the last `days` calendar days, newest first.
    pub fn recent_logs(&self, days: i64, today: NaiveDate) -> Result<Vec<ReminderLog>> {
        let cutoff = today - chrono::Duration::days(days.max(0));
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "{LOG_SELECT} WHERE date > ?1 ORDER BY execution_time DESC"
            ))
            .map_err(db_err)?;
        let logs = stmt
            .query_map(params![cutoff.to_string()], row_to_log)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wishline_core::types::WhatsAppProviderConfig;

    fn test_user(id: &str, wa_credits: i64, unlimited_wa: bool) -> User {
        User {
            id: id.into(),
            email: format!("{id}@example.com"),
            full_name: "Test User".into(),
            subscription_status: "active".into(),
            whatsapp_credits: wa_credits,
            email_credits: 10,
            unlimited_whatsapp: unlimited_wa,
            unlimited_email: false,
            created_at: Utc::now(),
        }
    }

    fn test_contact(id: &str, user_id: &str) -> Contact {
        Contact {
            id: id.into(),
            user_id: user_id.into(),
            name: "Sarah Johnson".into(),
            email: Some("sarah@example.com".into()),
            whatsapp: Some("9876543210".into()),
            birthday: NaiveDate::from_ymd_opt(1985, 3, 15),
            anniversary_date: None,
            whatsapp_image_url: None,
            email_image_url: None,
            message_tone: "warm".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_credit_conservation() {
        let store = ReminderStore::open_in_memory().unwrap();
        store.insert_user(&test_user("u1", 3, false)).unwrap();

        let mut allowed = 0;
        for _ in 0..4 {
            let decision = store
                .try_consume_credit("u1", ChannelKind::Whatsapp, 1)
                .unwrap();
            if decision.allowed {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 3);
        // The denied attempt left the balance unchanged
        assert_eq!(
            store.credit_balance("u1", ChannelKind::Whatsapp).unwrap(),
            CreditBalance::Count(0)
        );
    }

    #[test]
    fn test_unlimited_bypass() {
        let store = ReminderStore::open_in_memory().unwrap();
        store.insert_user(&test_user("u1", 0, true)).unwrap();

        let decision = store
            .try_consume_credit("u1", ChannelKind::Whatsapp, 1)
            .unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, CreditBalance::Unlimited);
        // Counter untouched
        let raw = store.user("u1").unwrap().unwrap();
        assert_eq!(raw.whatsapp_credits, 0);
    }

    #[test]
    fn test_channels_have_independent_ledgers() {
        let store = ReminderStore::open_in_memory().unwrap();
        store.insert_user(&test_user("u1", 1, false)).unwrap();

        assert!(
            store
                .try_consume_credit("u1", ChannelKind::Whatsapp, 1)
                .unwrap()
                .allowed
        );
        assert!(
            !store
                .try_consume_credit("u1", ChannelKind::Whatsapp, 1)
                .unwrap()
                .allowed
        );
        // Email credits are a separate pool
        assert!(
            store
                .try_consume_credit("u1", ChannelKind::Email, 1)
                .unwrap()
                .allowed
        );
    }

    #[test]
    fn test_sent_marker_claims_once() {
        let store = ReminderStore::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert!(store.mark_sent("c1", Occasion::Birthday, date).unwrap());
        assert!(!store.mark_sent("c1", Occasion::Birthday, date).unwrap());
        // Different occasion is a different key
        assert!(store.mark_sent("c1", Occasion::Anniversary, date).unwrap());
    }

    #[test]
    fn test_sweep_removes_only_stale_markers() {
        let store = ReminderStore::open_in_memory().unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        store.mark_sent("c1", Occasion::Birthday, yesterday).unwrap();
        store.mark_sent("c2", Occasion::Birthday, today).unwrap();

        assert_eq!(store.sweep_sent_markers(today).unwrap(), 1);
        // Yesterday's marker is gone, so the key is claimable again
        assert!(store.mark_sent("c1", Occasion::Birthday, yesterday).unwrap());
        assert!(!store.mark_sent("c2", Occasion::Birthday, today).unwrap());
    }

    #[test]
    fn test_settings_created_lazily_then_roundtrip() {
        let store = ReminderStore::open_in_memory().unwrap();
        let defaults = store.settings_for("u1").unwrap();
        assert_eq!(defaults.timezone, "UTC");
        assert_eq!(defaults.daily_send_time, "09:00");

        let mut settings = defaults;
        settings.timezone = "Asia/Kolkata".into();
        settings.whatsapp_provider = Some(WhatsAppProviderConfig::DigitalSms {
            api_key: "key".into(),
            sender_number: "9876543210".into(),
        });
        settings.send_run_report = true;
        store.upsert_settings(&settings).unwrap();

        let back = store.settings_for("u1").unwrap();
        assert_eq!(back.timezone, "Asia/Kolkata");
        assert!(back.send_run_report);
        assert!(matches!(
            back.whatsapp_provider,
            Some(WhatsAppProviderConfig::DigitalSms { .. })
        ));
    }

    #[test]
    fn test_custom_message_exact_key_lookup() {
        let store = ReminderStore::open_in_memory().unwrap();
        store
            .insert_custom_message(&CustomMessage {
                id: "m1".into(),
                user_id: "u1".into(),
                contact_id: "c1".into(),
                occasion: Occasion::Birthday,
                channel: ChannelKind::Whatsapp,
                body: "Happy birthday Sarah!".into(),
                image_url: Some("/uploads/cake.jpg".into()),
                created_at: Utc::now(),
            })
            .unwrap();

        let hit = store
            .custom_message("c1", Occasion::Birthday, ChannelKind::Whatsapp)
            .unwrap();
        assert_eq!(hit.unwrap().body, "Happy birthday Sarah!");

        // Neighboring keys miss
        assert!(
            store
                .custom_message("c1", Occasion::Birthday, ChannelKind::Email)
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .custom_message("c1", Occasion::Anniversary, ChannelKind::Whatsapp)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_default_template_per_channel() {
        let store = ReminderStore::open_in_memory().unwrap();
        store
            .insert_template(&Template {
                id: "t1".into(),
                user_id: "u1".into(),
                name: "Birthday default".into(),
                kind: ChannelKind::Whatsapp,
                subject: None,
                content: "Best wishes!".into(),
                is_default: true,
                whatsapp_image_url: Some("https://example.com/wa.jpg".into()),
                email_image_url: None,
                created_at: Utc::now(),
            })
            .unwrap();

        let tpl = store
            .default_template("u1", ChannelKind::Whatsapp)
            .unwrap()
            .unwrap();
        assert_eq!(tpl.whatsapp_image_url.as_deref(), Some("https://example.com/wa.jpg"));
        assert!(
            store
                .default_template("u1", ChannelKind::Email)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_reminder_log_roundtrip() {
        let store = ReminderStore::open_in_memory().unwrap();
        let mut summary = RunSummary::new(Utc::now());
        summary.total_users = 2;
        summary.messages_sent = 3;
        summary.whatsapp_sent = 2;
        summary.email_sent = 1;
        summary.errors.push("Contact Bob: missing WhatsApp number".into());

        let log = store.insert_reminder_log(&summary).unwrap();
        let found = store.logs_for_date(summary.date).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, log.id);
        assert_eq!(found[0].summary.messages_sent, 3);
        assert_eq!(found[0].summary.errors.len(), 1);

        let recent = store.recent_logs(7, summary.date).unwrap();
        assert_eq!(recent.len(), 1);
    }

    #[test]
    fn test_list_active_users_excludes_expired() {
        let store = ReminderStore::open_in_memory().unwrap();
        store.insert_user(&test_user("u1", 5, false)).unwrap();
        let mut expired = test_user("u2", 5, false);
        expired.subscription_status = "expired".into();
        store.insert_user(&expired).unwrap();

        let users = store.list_active_users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, "u1");
    }

    #[test]
    fn test_contacts_scoped_to_user() {
        let store = ReminderStore::open_in_memory().unwrap();
        store.insert_user(&test_user("u1", 5, false)).unwrap();
        store.insert_contact(&test_contact("c1", "u1")).unwrap();
        store.insert_contact(&test_contact("c2", "other")).unwrap();

        let contacts = store.contacts_for_user("u1").unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].birthday, NaiveDate::from_ymd_opt(1985, 3, 15));
    }
}
