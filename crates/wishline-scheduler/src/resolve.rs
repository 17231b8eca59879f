//! Message and image resolution: layered override hierarchies.
//!
//! Text: custom message > generated > static fallback. The chain never fails;
//! it trades personalization for availability.
//!
//! Image: custom message image > per-contact override > default template
//! image > built-in celebration image. `None` is a legal terminal outcome
//! (send without attachment) but the built-ins make it rare in practice.

use wishline_core::traits::{GreetingGenerator, GreetingRequest};
use wishline_core::types::{ChannelKind, Contact, CustomMessage, Occasion, Template};
use wishline_providers::fallback::fallback_greeting;

pub const DEFAULT_BIRTHDAY_IMAGE: &str =
    "https://images.unsplash.com/photo-1530103862676-de8c9debad1d?w=400&h=400&fit=crop";
pub const DEFAULT_ANNIVERSARY_IMAGE: &str =
    "https://images.unsplash.com/photo-1518199266791-5375a83190b7?w=400&h=400&fit=crop";

/// Built-in celebration image for an occasion.
pub fn default_image(occasion: Occasion) -> &'static str {
    match occasion {
        Occasion::Birthday => DEFAULT_BIRTHDAY_IMAGE,
        Occasion::Anniversary => DEFAULT_ANNIVERSARY_IMAGE,
    }
}

/// Resolve final message text. Always returns usable, non-empty text.
pub async fn resolve_message(
    generator: &dyn GreetingGenerator,
    custom: Option<&CustomMessage>,
    contact: &Contact,
    occasion: Occasion,
) -> String {
    if let Some(custom) = custom
        && !custom.body.trim().is_empty()
    {
        return custom.body.clone();
    }

    let request = GreetingRequest::new(&contact.name, occasion, &contact.message_tone);
    match generator.generate(&request).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => fallback_greeting(&contact.name, occasion, &contact.message_tone),
        Err(e) => {
            tracing::warn!(
                "Generation failed for {} ({occasion}): {e}; using built-in greeting",
                contact.name
            );
            fallback_greeting(&contact.name, occasion, &contact.message_tone)
        }
    }
}

/// Resolve the attachment image URL for a channel.
pub fn resolve_image(
    custom: Option<&CustomMessage>,
    contact: &Contact,
    template: Option<&Template>,
    occasion: Occasion,
    channel: ChannelKind,
) -> Option<String> {
    if let Some(custom) = custom
        && let Some(img) = custom.image_url.as_deref()
        && !img.is_empty()
    {
        return Some(img.to_string());
    }
    if let Some(img) = contact.override_image(channel)
        && !img.is_empty()
    {
        return Some(img.to_string());
    }
    if let Some(template) = template
        && let Some(img) = template.image_for(channel)
        && !img.is_empty()
    {
        return Some(img.to_string());
    }
    Some(default_image(occasion).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wishline_core::error::{Result, WishlineError};

    struct FailingGenerator {
        calls: AtomicUsize,
    }

    impl FailingGenerator {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl GreetingGenerator for FailingGenerator {
        fn name(&self) -> &str {
            "failing"
        }
        async fn generate(&self, _request: &GreetingRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(WishlineError::Provider("quota exceeded".into()))
        }
    }

    struct FixedGenerator(&'static str);

    #[async_trait]
    impl GreetingGenerator for FixedGenerator {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn generate(&self, _request: &GreetingRequest) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn contact() -> Contact {
        Contact {
            id: "c1".into(),
            user_id: "u1".into(),
            name: "Sarah".into(),
            email: None,
            whatsapp: None,
            birthday: None,
            anniversary_date: None,
            whatsapp_image_url: Some("https://example.com/contact-wa.jpg".into()),
            email_image_url: None,
            message_tone: "warm".into(),
            created_at: Utc::now(),
        }
    }

    fn custom_message(image: Option<&str>) -> CustomMessage {
        CustomMessage {
            id: "m1".into(),
            user_id: "u1".into(),
            contact_id: "c1".into(),
            occasion: Occasion::Birthday,
            channel: ChannelKind::Whatsapp,
            body: "Operator wrote this one".into(),
            image_url: image.map(String::from),
            created_at: Utc::now(),
        }
    }

    fn template() -> Template {
        Template {
            id: "t1".into(),
            user_id: "u1".into(),
            name: "Default".into(),
            kind: ChannelKind::Whatsapp,
            subject: None,
            content: String::new(),
            is_default: true,
            whatsapp_image_url: Some("https://example.com/template-wa.jpg".into()),
            email_image_url: Some("https://example.com/template-em.jpg".into()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_custom_message_wins_without_calling_generator() {
        let generator = FailingGenerator::new();
        let custom = custom_message(None);
        let text =
            resolve_message(&generator, Some(&custom), &contact(), Occasion::Birthday).await;
        assert_eq!(text, "Operator wrote this one");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generated_text_used_when_no_custom() {
        let generator = FixedGenerator("Wishing you the best, Sarah!");
        let text = resolve_message(&generator, None, &contact(), Occasion::Birthday).await;
        assert_eq!(text, "Wishing you the best, Sarah!");
    }

    #[tokio::test]
    async fn test_generation_failure_still_yields_text() {
        let generator = FailingGenerator::new();
        let text = resolve_message(&generator, None, &contact(), Occasion::Birthday).await;
        assert!(!text.trim().is_empty());
        assert!(text.contains("Sarah"));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_generation_falls_back() {
        let generator = FixedGenerator("   ");
        let text = resolve_message(&generator, None, &contact(), Occasion::Anniversary).await;
        assert!(!text.trim().is_empty());
    }

    #[test]
    fn test_image_priority_custom_beats_everything() {
        let custom = custom_message(Some("https://example.com/custom.jpg"));
        let img = resolve_image(
            Some(&custom),
            &contact(),
            Some(&template()),
            Occasion::Birthday,
            ChannelKind::Whatsapp,
        );
        assert_eq!(img.as_deref(), Some("https://example.com/custom.jpg"));
    }

    #[test]
    fn test_image_priority_contact_override_beats_template() {
        // Custom message exists but carries no image
        let custom = custom_message(None);
        let img = resolve_image(
            Some(&custom),
            &contact(),
            Some(&template()),
            Occasion::Birthday,
            ChannelKind::Whatsapp,
        );
        assert_eq!(img.as_deref(), Some("https://example.com/contact-wa.jpg"));
    }

    #[test]
    fn test_image_priority_template_then_builtin() {
        let mut c = contact();
        c.whatsapp_image_url = None;
        let img = resolve_image(
            None,
            &c,
            Some(&template()),
            Occasion::Birthday,
            ChannelKind::Whatsapp,
        );
        assert_eq!(img.as_deref(), Some("https://example.com/template-wa.jpg"));

        let img = resolve_image(None, &c, None, Occasion::Birthday, ChannelKind::Whatsapp);
        assert_eq!(img.as_deref(), Some(DEFAULT_BIRTHDAY_IMAGE));
        let img = resolve_image(None, &c, None, Occasion::Anniversary, ChannelKind::Email);
        assert_eq!(img.as_deref(), Some(DEFAULT_ANNIVERSARY_IMAGE));
    }

    #[test]
    fn test_image_respects_channel() {
        let mut c = contact();
        c.email_image_url = Some("https://example.com/contact-em.jpg".into());
        let img = resolve_image(
            None,
            &c,
            Some(&template()),
            Occasion::Birthday,
            ChannelKind::Email,
        );
        assert_eq!(img.as_deref(), Some("https://example.com/contact-em.jpg"));
    }
}
