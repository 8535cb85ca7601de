//! Web server module for handling inbound Discourse webhooks.
//!
//! This module provides a thin web layer that:
//! - Receives signed post webhooks from Discourse
//! - Hands the raw body and headers to the topic sync component
//! - Maps the sync outcome to an HTTP status and JSON body

pub mod handlers;
pub mod signature;

pub use handlers::{discourse_topic_webhook, health, AppState, HealthResponse};
pub use signature::{is_signature_verification_enabled, sign_body, verify_signature};
