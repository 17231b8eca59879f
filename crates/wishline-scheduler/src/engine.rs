//! The scheduler run loop.
//!
//! Each invocation walks every active user through the gates: send window,
//! event match, sent-today marker, resolution, credit check, delivery. A
//! failure anywhere in the per-user or per-contact body is appended to the
//! run's error list and processing continues; the run always reaches its
//! terminal state and always persists exactly one ReminderLog.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use wishline_core::config::SchedulerConfig;
use wishline_core::error::Result;
use wishline_core::traits::{Deliverer, GreetingGenerator};
use wishline_core::types::{ChannelKind, Contact, Occasion, RunSummary, User, UserSettings};
use wishline_store::ReminderStore;

use crate::{events, resolve, window};

pub struct ReminderScheduler {
    store: Arc<ReminderStore>,
    generator: Arc<dyn GreetingGenerator>,
    deliverer: Arc<dyn Deliverer>,
    tolerance_minutes: i64,
    run_deadline: Option<Duration>,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<ReminderStore>,
        generator: Arc<dyn GreetingGenerator>,
        deliverer: Arc<dyn Deliverer>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            store,
            generator,
            deliverer,
            tolerance_minutes: config.window_tolerance_minutes,
            run_deadline: (config.run_deadline_secs > 0)
                .then(|| Duration::from_secs(config.run_deadline_secs)),
        }
    }

    /// One invocation against the wall clock.
    pub async fn run(&self) -> RunSummary {
        self.run_at(Utc::now()).await
    }

    /// One invocation with an injected clock. Tests pin "now" here.
    pub async fn run_at(&self, now: DateTime<Utc>) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::new(now);
        tracing::info!("Reminder run started ({})", summary.date);

        if let Err(e) = self.store.sweep_sent_markers(summary.date) {
            summary.errors.push(format!("marker sweep failed: {e}"));
        }

        let users = match self.store.list_active_users() {
            Ok(users) => users,
            Err(e) => {
                summary.errors.push(format!("user enumeration failed: {e}"));
                self.persist(&summary);
                return summary;
            }
        };

        for (idx, user) in users.iter().enumerate() {
            if let Some(deadline) = self.run_deadline
                && started.elapsed() > deadline
            {
                summary.errors.push(format!(
                    "run deadline exceeded; {} users not processed",
                    users.len() - idx
                ));
                break;
            }
            if let Err(e) = self.process_user(user, now, &mut summary).await {
                summary.errors.push(format!("user {}: {e}", user.email));
            }
        }

        self.persist(&summary);
        tracing::info!(
            "Reminder run finished: {} sent ({} whatsapp, {} email) across {} due users, {} errors",
            summary.messages_sent,
            summary.whatsapp_sent,
            summary.email_sent,
            summary.total_users,
            summary.errors.len()
        );
        summary
    }

    fn persist(&self, summary: &RunSummary) {
        // The log is the run's audit trail; losing it is worth an error-level
        // line, but the summary is still returned to the caller.
        if let Err(e) = self.store.insert_reminder_log(summary) {
            tracing::error!("Failed to persist reminder log: {e}");
        }
    }

    async fn process_user(
        &self,
        user: &User,
        now: DateTime<Utc>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let settings = self.store.settings_for(&user.id)?;
        if !window::in_send_window(
            now,
            &settings.timezone,
            &settings.daily_send_time,
            self.tolerance_minutes,
        )? {
            return Ok(());
        }
        summary.total_users += 1;
        tracing::debug!("{} is in their send window", user.email);

        let contacts = self.store.contacts_for_user(&user.id)?;
        let mut sent_for_user = 0u32;
        for contact in &contacts {
            for occasion in [Occasion::Birthday, Occasion::Anniversary] {
                let Some(date) = contact.occasion_date(occasion) else {
                    continue;
                };
                if !events::occurs_on(date, summary.date) {
                    continue;
                }
                match self
                    .process_occasion(user, &settings, contact, occasion, summary)
                    .await
                {
                    Ok(sent) => sent_for_user += sent,
                    Err(e) => summary
                        .errors
                        .push(format!("contact {} ({occasion}): {e}", contact.name)),
                }
            }
        }

        if settings.send_run_report && sent_for_user > 0 {
            self.send_user_report(user, &settings, sent_for_user, summary)
                .await;
        }
        Ok(())
    }

    /// Handle one matched (contact, occasion): both channels under a single
    /// sent marker. Returns how many messages went out.
    async fn process_occasion(
        &self,
        user: &User,
        settings: &UserSettings,
        contact: &Contact,
        occasion: Occasion,
        summary: &mut RunSummary,
    ) -> Result<u32> {
        // Claim today's marker before any delivery. If an adjacent invocation
        // already claimed it, this occasion is done for the day.
        if !self.store.mark_sent(&contact.id, occasion, summary.date)? {
            tracing::debug!(
                "{} {} already sent today, skipping",
                contact.name,
                occasion
            );
            return Ok(0);
        }

        let mut sent = 0u32;

        if let Some(number) = contact.whatsapp.as_deref() {
            if settings.whatsapp_provider.is_none() {
                summary.errors.push(format!(
                    "whatsapp to {}: no WhatsApp provider configured",
                    contact.name
                ));
            } else {
                let custom =
                    self.store
                        .custom_message(&contact.id, occasion, ChannelKind::Whatsapp)?;
                let text = resolve::resolve_message(
                    self.generator.as_ref(),
                    custom.as_ref(),
                    contact,
                    occasion,
                )
                .await;
                let template = self
                    .store
                    .default_template(&user.id, ChannelKind::Whatsapp)?;
                let image = resolve::resolve_image(
                    custom.as_ref(),
                    contact,
                    template.as_ref(),
                    occasion,
                    ChannelKind::Whatsapp,
                );

                let decision =
                    self.store
                        .try_consume_credit(&user.id, ChannelKind::Whatsapp, 1)?;
                if decision.allowed {
                    let result = self
                        .deliverer
                        .send_whatsapp(settings, number, &text, image.as_deref())
                        .await;
                    if result.is_success() {
                        summary.whatsapp_sent += 1;
                        summary.messages_sent += 1;
                        sent += 1;
                    } else {
                        summary.errors.push(format!(
                            "whatsapp to {} ({occasion}): {}",
                            contact.name, result.message
                        ));
                    }
                } else {
                    tracing::info!(
                        "{}: whatsapp credits exhausted, skipping {}",
                        user.email,
                        contact.name
                    );
                }
            }
        }

        if let Some(address) = contact.email.as_deref() {
            let email_cfg = &settings.email_sender;
            if email_cfg.smtp_host.is_empty() || email_cfg.sender_email.is_empty() {
                summary.errors.push(format!(
                    "email to {}: email sender not configured",
                    contact.name
                ));
            } else {
                let custom =
                    self.store
                        .custom_message(&contact.id, occasion, ChannelKind::Email)?;
                let text = resolve::resolve_message(
                    self.generator.as_ref(),
                    custom.as_ref(),
                    contact,
                    occasion,
                )
                .await;
                let template = self.store.default_template(&user.id, ChannelKind::Email)?;
                let image = resolve::resolve_image(
                    custom.as_ref(),
                    contact,
                    template.as_ref(),
                    occasion,
                    ChannelKind::Email,
                );

                let decision = self
                    .store
                    .try_consume_credit(&user.id, ChannelKind::Email, 1)?;
                if decision.allowed {
                    let subject = format!("Happy {}, {}!", occasion.label(), contact.name);
                    let html = render_email_html(&text, image.as_deref());
                    let result = self
                        .deliverer
                        .send_email(settings, address, &contact.name, &subject, &html)
                        .await;
                    if result.is_success() {
                        summary.email_sent += 1;
                        summary.messages_sent += 1;
                        sent += 1;
                    } else {
                        summary.errors.push(format!(
                            "email to {} ({occasion}): {}",
                            contact.name, result.message
                        ));
                    }
                } else {
                    tracing::info!(
                        "{}: email credits exhausted, skipping {}",
                        user.email,
                        contact.name
                    );
                }
            }
        }

        Ok(sent)
    }

    /// Advisory per-user dispatch report. Failures never affect counters.
    async fn send_user_report(
        &self,
        user: &User,
        settings: &UserSettings,
        sent: u32,
        summary: &mut RunSummary,
    ) {
        let subject = format!("Wishline dispatch report for {}", summary.date);
        let html = format!(
            "<p>Hi {},</p><p>{} greeting{} sent to your contacts today.</p>",
            user.full_name,
            sent,
            if sent == 1 { " was" } else { "s were" }
        );
        let result = self
            .deliverer
            .send_email(settings, &user.email, &user.full_name, &subject, &html)
            .await;
        if !result.is_success() {
            summary
                .errors
                .push(format!("report email to {}: {}", user.email, result.message));
        }
    }
}

/// Minimal HTML wrapper for outgoing greeting emails.
fn render_email_html(text: &str, image_url: Option<&str>) -> String {
    let mut html = String::from("<div style=\"font-family:sans-serif;max-width:480px\">");
    if let Some(img) = image_url {
        html.push_str(&format!(
            "<img src=\"{img}\" alt=\"\" style=\"max-width:100%;border-radius:8px\"/>"
        ));
    }
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        html.push_str(&format!("<p>{line}</p>"));
    }
    html.push_str("</div>");
    html
}
