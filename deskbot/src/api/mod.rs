//! HTTP client for the remote session/message store.

mod client;
mod error;
mod types;

pub use client::{ApiClient, CONFIRM_PHRASE};
pub use error::{ApiError, ApiResult};
pub use types::{ClearScope, DeleteResponse, SessionMessages};
