//! Session identity: generation and active-session resolution.

mod id;
mod resolve;

pub use id::generate_distinct;
pub use resolve::resolve_active_session;
