//! Pitchlink backend: signup, login and session-guarded profile endpoints
//! for a football networking platform.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
pub mod users;

pub use state::AppState;
