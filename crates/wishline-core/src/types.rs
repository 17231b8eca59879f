//! Domain model for the reminder dispatch engine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The event type driving message selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Occasion {
    Birthday,
    Anniversary,
}

impl Occasion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Occasion::Birthday => "birthday",
            Occasion::Anniversary => "anniversary",
        }
    }

    /// Capitalized form for message subjects ("Happy Birthday" etc.).
    pub fn label(&self) -> &'static str {
        match self {
            Occasion::Birthday => "Birthday",
            Occasion::Anniversary => "Anniversary",
        }
    }
}

impl std::fmt::Display for Occasion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Occasion {
    type Err = crate::error::WishlineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "birthday" => Ok(Occasion::Birthday),
            "anniversary" => Ok(Occasion::Anniversary),
            other => Err(crate::error::WishlineError::Validation(format!(
                "unknown occasion: {other}"
            ))),
        }
    }
}

/// Delivery medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Whatsapp,
    Email,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Whatsapp => "whatsapp",
            ChannelKind::Email => "email",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChannelKind {
    type Err = crate::error::WishlineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "whatsapp" => Ok(ChannelKind::Whatsapp),
            "email" => Ok(ChannelKind::Email),
            other => Err(crate::error::WishlineError::Validation(format!(
                "unknown channel: {other}"
            ))),
        }
    }
}

/// Account record. Credits are only mutated here by the credit ledger;
/// account management lives outside this engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    /// "trial", "active", or "expired"; expired users are not processed.
    pub subscription_status: String,
    pub whatsapp_credits: i64,
    pub email_credits: i64,
    pub unlimited_whatsapp: bool,
    pub unlimited_email: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.subscription_status != "expired"
    }
}

/// A person to be greeted. Owned by exactly one user; read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
    /// Raw number as entered; normalized at dispatch time.
    pub whatsapp: Option<String>,
    /// The stored year may be a placeholder when the source data had none.
    pub birthday: Option<NaiveDate>,
    pub anniversary_date: Option<NaiveDate>,
    /// Per-contact override images, one per channel.
    pub whatsapp_image_url: Option<String>,
    pub email_image_url: Option<String>,
    /// Steers generated message wording: warm, professional, casual, funny.
    pub message_tone: String,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    /// Date stored for the given occasion, if any.
    pub fn occasion_date(&self, occasion: Occasion) -> Option<NaiveDate> {
        match occasion {
            Occasion::Birthday => self.birthday,
            Occasion::Anniversary => self.anniversary_date,
        }
    }

    /// Per-channel override image, if any.
    pub fn override_image(&self, channel: ChannelKind) -> Option<&str> {
        match channel {
            ChannelKind::Whatsapp => self.whatsapp_image_url.as_deref(),
            ChannelKind::Email => self.email_image_url.as_deref(),
        }
    }
}

/// Operator-authored message for one (contact, occasion, channel) key.
/// Highest-priority source in message and image resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomMessage {
    pub id: String,
    pub user_id: String,
    pub contact_id: String,
    pub occasion: Occasion,
    pub channel: ChannelKind,
    pub body: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Reusable message template; the per-channel default template also carries
/// the fallback images consulted by the image resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub kind: ChannelKind,
    pub subject: Option<String>,
    pub content: String,
    pub is_default: bool,
    pub whatsapp_image_url: Option<String>,
    pub email_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Template {
    pub fn image_for(&self, channel: ChannelKind) -> Option<&str> {
        match channel {
            ChannelKind::Whatsapp => self.whatsapp_image_url.as_deref(),
            ChannelKind::Email => self.email_image_url.as_deref(),
        }
    }
}

/// WhatsApp delivery credentials. Exactly one provider per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum WhatsAppProviderConfig {
    /// Meta WhatsApp Business Cloud API: Bearer token + phone-number-id.
    MetaCloud {
        access_token: String,
        phone_number_id: String,
    },
    /// DigitalSMS: API key passed as a GET parameter.
    DigitalSms {
        api_key: String,
        sender_number: String,
    },
}

/// SMTP credentials and sender identity for transactional email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSenderConfig {
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub sender_email: String,
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
}

fn default_smtp_port() -> u16 {
    587
}
fn default_sender_name() -> String {
    "Wishline".into()
}

impl Default for EmailSenderConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            sender_email: String::new(),
            sender_name: default_sender_name(),
        }
    }
}

/// Per-user scheduling and provider settings. Created lazily with defaults
/// on first read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: String,
    /// IANA timezone identifier, e.g. "Asia/Kolkata".
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// "HH:MM", 24-hour, user-local.
    #[serde(default = "default_send_time")]
    pub daily_send_time: String,
    #[serde(default)]
    pub whatsapp_provider: Option<WhatsAppProviderConfig>,
    #[serde(default)]
    pub email_sender: EmailSenderConfig,
    /// Email the user a short summary after their contacts were processed.
    #[serde(default)]
    pub send_run_report: bool,
}

fn default_timezone() -> String {
    "UTC".into()
}
fn default_send_time() -> String {
    "09:00".into()
}

impl UserSettings {
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            timezone: default_timezone(),
            daily_send_time: default_send_time(),
            whatsapp_provider: None,
            email_sender: EmailSenderConfig::default(),
            send_run_report: false,
        }
    }
}

/// Uniform outcome of one delivery attempt, regardless of provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub status: DeliveryStatus,
    pub message: String,
}

impl DeliveryResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: DeliveryStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: DeliveryStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DeliveryStatus::Success
    }
}

/// Remaining balance after a ledger decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditBalance {
    Unlimited,
    Count(i64),
}

impl std::fmt::Display for CreditBalance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreditBalance::Unlimited => f.write_str("unlimited"),
            CreditBalance::Count(n) => write!(f, "{n}"),
        }
    }
}

/// Outcome of a credit check. A denial is a skip, not an error.
#[derive(Debug, Clone, Copy)]
pub struct CreditDecision {
    pub allowed: bool,
    pub remaining: CreditBalance,
}

/// Counters and errors for one scheduler invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub execution_time: DateTime<Utc>,
    pub date: NaiveDate,
    pub total_users: u32,
    pub messages_sent: u32,
    pub whatsapp_sent: u32,
    pub email_sent: u32,
    pub errors: Vec<String>,
}

impl RunSummary {
    pub fn new(execution_time: DateTime<Utc>) -> Self {
        Self {
            execution_time,
            date: execution_time.date_naive(),
            total_users: 0,
            messages_sent: 0,
            whatsapp_sent: 0,
            email_sent: 0,
            errors: Vec::new(),
        }
    }
}

/// Persisted execution record: one per run, immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderLog {
    pub id: String,
    #[serde(flatten)]
    pub summary: RunSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_balance_display() {
        assert_eq!(CreditBalance::Unlimited.to_string(), "unlimited");
        assert_eq!(CreditBalance::Count(3).to_string(), "3");
    }

    #[test]
    fn test_occasion_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&Occasion::Birthday).unwrap(),
            "\"birthday\""
        );
        let ch: ChannelKind = serde_json::from_str("\"whatsapp\"").unwrap();
        assert_eq!(ch, ChannelKind::Whatsapp);
    }

    #[test]
    fn test_whatsapp_provider_tagged_serde() {
        let cfg = WhatsAppProviderConfig::MetaCloud {
            access_token: "tok".into(),
            phone_number_id: "12345".into(),
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"provider\":\"meta_cloud\""));
        let back: WhatsAppProviderConfig = serde_json::from_str(&json).unwrap();
        match back {
            WhatsAppProviderConfig::MetaCloud { phone_number_id, .. } => {
                assert_eq!(phone_number_id, "12345");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_settings_defaults() {
        let s = UserSettings::defaults_for("u1");
        assert_eq!(s.timezone, "UTC");
        assert_eq!(s.daily_send_time, "09:00");
        assert!(s.whatsapp_provider.is_none());
        assert!(!s.send_run_report);
    }
}
