//! Data models for sessions and messages.

mod message;
mod session;
pub mod timestamp;

pub use message::{Message, MessageRole};
pub use session::{short_id, Session, SessionSummary};
