//! Session-scoped message view model and its terminal rendering.

pub mod render;
mod state;
mod time;
mod transcript;

pub use render::Renderer;
pub use state::{Applied, BeginSend, NewSession, PendingLoad, PendingSend, SessionView};
