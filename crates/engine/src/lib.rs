pub mod bridge;
pub mod listener;

pub use bridge::EngineBridge;
pub use listener::{spawn_log_listener, LogCallback};
