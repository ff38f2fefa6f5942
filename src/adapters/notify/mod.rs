//! Notification transport adapters.
//!
//! - `NtfyNotifier` - HTTP push via an ntfy server
//! - `RecordingNotifier` - Captures notifications in memory

mod ntfy;
mod recording;

pub use ntfy::{NtfyConfig, NtfyNotifier, DEFAULT_SERVER};
pub use recording::{RecordingNotifier, SentNotification};
