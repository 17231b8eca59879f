//! The delivery gateway: one normalized surface over all providers.
//!
//! Configuration errors (missing provider, missing recipient, bad phone
//! number) are caught before any network call. Provider and transport
//! failures become `DeliveryResult::error`; nothing here returns a raw
//! error to the scheduler, and nothing is retried.

use async_trait::async_trait;

use wishline_core::traits::Deliverer;
use wishline_core::types::{DeliveryResult, UserSettings, WhatsAppProviderConfig};

use crate::digitalsms::DigitalSmsSender;
use crate::email::SmtpEmailSender;
use crate::phone::normalize_whatsapp_number;
use crate::whatsapp_cloud::MetaCloudSender;

#[derive(Default)]
pub struct HttpDeliveryGateway;

impl HttpDeliveryGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Deliverer for HttpDeliveryGateway {
    async fn send_whatsapp(
        &self,
        settings: &UserSettings,
        to: &str,
        text: &str,
        image_url: Option<&str>,
    ) -> DeliveryResult {
        let Some(provider) = &settings.whatsapp_provider else {
            return DeliveryResult::error("WhatsApp provider not configured");
        };
        if to.trim().is_empty() {
            return DeliveryResult::error("missing recipient WhatsApp number");
        }
        let number = match normalize_whatsapp_number(to) {
            Ok(n) => n,
            Err(e) => return DeliveryResult::error(e.to_string()),
        };

        let outcome = match provider {
            WhatsAppProviderConfig::MetaCloud {
                access_token,
                phone_number_id,
            } => {
                if access_token.is_empty() || phone_number_id.is_empty() {
                    return DeliveryResult::error("WhatsApp Cloud API credentials incomplete");
                }
                MetaCloudSender::new(access_token, phone_number_id)
                    .send(&number, text, image_url)
                    .await
            }
            WhatsAppProviderConfig::DigitalSms { api_key, .. } => {
                if api_key.is_empty() {
                    return DeliveryResult::error("DigitalSMS API key missing");
                }
                DigitalSmsSender::new(api_key)
                    .send(&number, text, image_url)
                    .await
            }
        };

        match outcome {
            Ok(id) => DeliveryResult::success(id),
            Err(e) => DeliveryResult::error(e.to_string()),
        }
    }

    async fn send_email(
        &self,
        settings: &UserSettings,
        to_addr: &str,
        to_name: &str,
        subject: &str,
        html_body: &str,
    ) -> DeliveryResult {
        if to_addr.trim().is_empty() {
            return DeliveryResult::error("missing recipient email address");
        }

        let sender = SmtpEmailSender::new(settings.email_sender.clone());
        match sender.send(to_addr, to_name, subject, html_body).await {
            Ok(()) => DeliveryResult::success("sent"),
            Err(e) => DeliveryResult::error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_provider_is_a_config_error() {
        let gateway = HttpDeliveryGateway::new();
        let settings = UserSettings::defaults_for("u1");
        let result = gateway
            .send_whatsapp(&settings, "9876543210", "hi", None)
            .await;
        assert!(!result.is_success());
        assert!(result.message.contains("not configured"));
    }

    #[tokio::test]
    async fn test_missing_recipient_detected_before_dispatch() {
        let gateway = HttpDeliveryGateway::new();
        let mut settings = UserSettings::defaults_for("u1");
        settings.whatsapp_provider = Some(WhatsAppProviderConfig::DigitalSms {
            api_key: "key".into(),
            sender_number: "9876543210".into(),
        });
        let result = gateway.send_whatsapp(&settings, "  ", "hi", None).await;
        assert!(!result.is_success());
        assert!(result.message.contains("missing recipient"));
    }

    #[tokio::test]
    async fn test_malformed_number_becomes_error_result() {
        let gateway = HttpDeliveryGateway::new();
        let mut settings = UserSettings::defaults_for("u1");
        settings.whatsapp_provider = Some(WhatsAppProviderConfig::DigitalSms {
            api_key: "key".into(),
            sender_number: "9876543210".into(),
        });
        let result = gateway
            .send_whatsapp(&settings, "12345", "hi", None)
            .await;
        assert!(!result.is_success());
        assert!(result.message.contains("10 digits"));
    }

    #[tokio::test]
    async fn test_incomplete_cloud_credentials_rejected() {
        let gateway = HttpDeliveryGateway::new();
        let mut settings = UserSettings::defaults_for("u1");
        settings.whatsapp_provider = Some(WhatsAppProviderConfig::MetaCloud {
            access_token: String::new(),
            phone_number_id: "123".into(),
        });
        let result = gateway
            .send_whatsapp(&settings, "9876543210", "hi", None)
            .await;
        assert!(!result.is_success());
        assert!(result.message.contains("credentials incomplete"));
    }

    #[tokio::test]
    async fn test_unconfigured_email_sender_becomes_error_result() {
        let gateway = HttpDeliveryGateway::new();
        let settings = UserSettings::defaults_for("u1");
        let result = gateway
            .send_email(&settings, "sarah@example.com", "Sarah", "Hi", "<p>Hi</p>")
            .await;
        assert!(!result.is_success());
        assert!(result.message.contains("not configured"));
    }

    #[tokio::test]
    async fn test_missing_email_recipient_detected() {
        let gateway = HttpDeliveryGateway::new();
        let settings = UserSettings::defaults_for("u1");
        let result = gateway.send_email(&settings, "", "Sarah", "Hi", "x").await;
        assert!(!result.is_success());
        assert!(result.message.contains("missing recipient"));
    }
}
