mod controller;

pub use controller::{SessionConfig, SessionController};
