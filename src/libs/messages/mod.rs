//! Centralized message management for the lockplane application.
//!
//! Single source of truth for all user-facing text. The [`Message`] enum is
//! pure data, the `Display` impl renders it, and the `msg_*!` macros route
//! output between the console and the tracing system.
//!
//! ## Usage
//!
//! ```rust
//! use lockplane::libs::messages::Message;
//! use lockplane::{msg_info, msg_success};
//!
//! msg_success!(Message::ApplySucceeded(3));
//! msg_info!(Message::PlanCreated(5));
//! ```

pub mod display;
pub mod macros;
pub mod types;

// Re-export the main Message type for convenient access
pub use types::Message;

/// Formats a success message with its ✅ prefix without printing it.
pub fn success(msg: Message) -> String {
    format!("✅ {}", msg)
}

/// Formats an error message with its ❌ prefix without printing it.
pub fn error(msg: Message) -> String {
    format!("❌ {}", msg)
}

/// Formats a warning message with its ⚠️ prefix without printing it.
pub fn warning(msg: Message) -> String {
    format!("⚠️  {}", msg)
}

/// Wraps a message with newlines for emphasis.
pub fn wrap_msg(msg: Message) -> String {
    format!("\n{}\n", msg)
}
