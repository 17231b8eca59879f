//! Trait seams the engine is wired through. Implementations are selected by
//! configuration; tests substitute stubs.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DeliveryResult, Occasion, UserSettings};

/// Parameters for one greeting-generation call.
#[derive(Debug, Clone)]
pub struct GreetingRequest {
    pub contact_name: String,
    pub occasion: Occasion,
    pub relationship: String,
    pub tone: String,
}

impl GreetingRequest {
    /// The engine always greets as a friend; relationship tracking is out of
    /// scope for dispatch.
    pub fn new(contact_name: &str, occasion: Occasion, tone: &str) -> Self {
        Self {
            contact_name: contact_name.to_string(),
            occasion,
            relationship: "friend".into(),
            tone: tone.to_string(),
        }
    }
}

/// External text-generation collaborator. Fallible by contract; the message
/// resolver falls back to a static greeting when this errors.
#[async_trait]
pub trait GreetingGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Generate greeting text. Must not return an empty string.
    async fn generate(&self, request: &GreetingRequest) -> Result<String>;
}

/// Delivery gateway. Implementations normalize every outcome (provider
/// failure codes, network errors, malformed responses) into a
/// `DeliveryResult`; they never return a raw transport error to the caller.
#[async_trait]
pub trait Deliverer: Send + Sync {
    /// Send a WhatsApp message through the provider configured in `settings`.
    /// `to` is the raw number as stored on the contact.
    async fn send_whatsapp(
        &self,
        settings: &UserSettings,
        to: &str,
        text: &str,
        image_url: Option<&str>,
    ) -> DeliveryResult;

    /// Send an HTML email through the sender configured in `settings`.
    async fn send_email(
        &self,
        settings: &UserSettings,
        to_addr: &str,
        to_name: &str,
        subject: &str,
        html_body: &str,
    ) -> DeliveryResult;
}
