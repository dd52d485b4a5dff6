pub mod app;
pub mod auth;
pub mod config;
pub mod state;
pub mod telemetry;

pub use app::{build_app, serve};
pub use state::AppState;
