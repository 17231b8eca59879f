//! DigitalSMS WhatsApp sender.
//!
//! A simple API-key + GET-parameter provider: `apikey`, `mobile`, `msg`, and
//! optionally `img1`. Some deployments answer JSON, others free text, so
//! classification handles both.

use serde_json::Value;
use std::time::Duration;

use wishline_core::error::{Result, WishlineError};

const API_URL: &str = "https://demo.digitalsms.biz/api";
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

pub struct DigitalSmsSender {
    api_key: String,
    client: reqwest::Client,
}

impl DigitalSmsSender {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Send a message to a normalized 10-digit number.
    pub async fn send(&self, to: &str, text: &str, image_url: Option<&str>) -> Result<String> {
        let mut params = vec![
            ("apikey", self.api_key.as_str()),
            ("mobile", to),
            ("msg", text),
        ];
        if let Some(img) = image_url {
            params.push(("img1", img));
        }

        let response = self
            .client
            .get(API_URL)
            .query(&params)
            .timeout(SEND_TIMEOUT)
            .send()
            .await
            .map_err(|e| WishlineError::Channel(format!("DigitalSMS request failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let outcome = classify_response(status, &body);
        if outcome.is_ok() {
            tracing::debug!("DigitalSMS message sent -> {to}");
        }
        outcome
    }
}

/// Classify a DigitalSMS response into success or error.
///
/// JSON replies carry a `status` field ("success" or an error code); free-text
/// replies are matched on keywords. Anything unrecognized is an error.
fn classify_response(status: u16, body: &str) -> Result<String> {
    if status >= 400 {
        return Err(WishlineError::Channel(format!(
            "DigitalSMS HTTP error {status}: {body}"
        )));
    }

    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let reported = json["status"].as_str().unwrap_or("");
        if reported.eq_ignore_ascii_case("success") || reported == "1" {
            let detail = json["message"].as_str().unwrap_or("sent");
            return Ok(detail.to_string());
        }
        let detail = json["message"].as_str().unwrap_or(body);
        return Err(WishlineError::Channel(format!(
            "DigitalSMS error: {detail}"
        )));
    }

    let lower = body.to_lowercase();
    if lower.contains("success") || lower.contains("message sent") {
        Ok(body.trim().to_string())
    } else {
        Err(WishlineError::Channel(format!(
            "DigitalSMS unexpected response: {body}"
        )))
    }
}
