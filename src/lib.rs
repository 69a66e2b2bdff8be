// Public API for integration tests and potential library usage

pub mod auth;
pub mod error;
pub mod grading;
pub mod protocol;
pub mod state;
pub mod types;
pub mod ws;
