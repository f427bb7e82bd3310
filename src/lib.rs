// Public API for integration tests and potential library usage

pub mod api;
pub mod auth;
pub mod protocol;
pub mod source;
pub mod state;
pub mod types;
pub mod ws;
