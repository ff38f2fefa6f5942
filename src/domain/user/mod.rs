//! User module - people who ask to be notified.

mod aggregate;
mod values;

pub use aggregate::User;
pub use values::{sanitize_topic_segment, UserName};
