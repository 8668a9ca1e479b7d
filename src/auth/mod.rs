pub mod commands;
pub mod controller;
pub mod state;

pub use controller::AuthController;
pub use state::{RefreshFailurePolicy, SessionSnapshot, SessionStatus, SessionView};
