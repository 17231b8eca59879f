//! Meta WhatsApp Business Cloud API sender.
//!
//! Requires an access token and phone-number-id from Meta Business Suite.
//! Responses are JSON; a successful send returns the provider message id.

use serde_json::{Value, json};
use std::time::Duration;

use wishline_core::error::{Result, WishlineError};

const GRAPH_BASE: &str = "https://graph.facebook.com/v21.0";
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

pub struct MetaCloudSender {
    access_token: String,
    phone_number_id: String,
    client: reqwest::Client,
}

impl MetaCloudSender {
    pub fn new(access_token: &str, phone_number_id: &str) -> Self {
        Self {
            access_token: access_token.to_string(),
            phone_number_id: phone_number_id.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Send a message to a normalized number; returns the provider message id.
    pub async fn send(&self, to: &str, text: &str, image_url: Option<&str>) -> Result<String> {
        let url = format!("{GRAPH_BASE}/{}/messages", self.phone_number_id);

        let body = match image_url {
            Some(img) => json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": to,
                "type": "image",
                "image": { "link": img, "caption": text }
            }),
            None => json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": to,
                "type": "text",
                "text": { "preview_url": false, "body": text }
            }),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Content-Type", "application/json")
            .json(&body)
            .timeout(SEND_TIMEOUT)
            .send()
            .await
            .map_err(|e| WishlineError::Channel(format!("WhatsApp API request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(WishlineError::Channel(format!(
                "WhatsApp API error {status}: {error_text}"
            )));
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| WishlineError::Channel(format!("Invalid WhatsApp response: {e}")))?;

        let msg_id = result["messages"][0]["id"]
            .as_str()
            .unwrap_or("unknown")
            .to_string();

        tracing::debug!("WhatsApp Cloud message sent: {msg_id} -> {to}");
        Ok(msg_id)
    }
}
