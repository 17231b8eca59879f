//! # Wishline Scheduler
//!
//! The reminder dispatch engine. Invoked on a recurring trigger; each
//! invocation is stateless apart from what it reads from the store and the
//! credits it decrements.
//!
//! ```text
//! run_at(now)
//!   ├── sweep expired sent markers
//!   └── for each active user
//!         ├── TimeWindowMatcher: is this user due right now? (fail closed)
//!         └── for each contact × occasion
//!               ├── EventMatcher: month/day match against today
//!               ├── sent marker: claimed once per (contact, occasion, date)
//!               ├── MessageResolver / ImageResolver: custom > generated >
//!               │     fallback; custom > contact > template > built-in
//!               ├── CreditLedger: skip without credits, never error
//!               └── DeliveryGateway → tally counters / error list
//!   └── persist exactly one ReminderLog, return the RunSummary
//! ```

pub mod engine;
pub mod events;
pub mod resolve;
pub mod window;

pub use engine::ReminderScheduler;
