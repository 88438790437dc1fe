pub mod health;
pub mod kvman;

pub use health::health_handler;
pub use kvman::kvman_handler;
