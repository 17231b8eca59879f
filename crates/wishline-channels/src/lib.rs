//! # Wishline Channels
//!
//! Delivery providers and the gateway that normalizes them.
//!
//! WhatsApp delivery is provider-polymorphic: each user's settings select
//! either the Meta Cloud API (Bearer token + phone-number-id) or DigitalSMS
//! (API key as a GET parameter). Email goes out over SMTP. The
//! `HttpDeliveryGateway` turns every outcome, including network failures and
//! unparseable provider responses, into a uniform `DeliveryResult`.

pub mod digitalsms;
pub mod email;
pub mod gateway;
pub mod phone;
pub mod whatsapp_cloud;

pub use gateway::HttpDeliveryGateway;
pub use phone::normalize_whatsapp_number;
