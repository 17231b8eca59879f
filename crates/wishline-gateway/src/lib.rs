//! # Wishline Gateway
//!
//! The HTTP surface: an unauthenticated trigger endpoint for the dispatch
//! run (meant to be hit by an external scheduler every ~15 minutes) and
//! read-only access to persisted reminder logs.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, serve};
