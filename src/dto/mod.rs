pub mod account;
pub mod auth;
pub mod budget;
pub mod common;
pub mod misc;
pub mod notification;

// Re-export commonly used types for convenience
pub use account::*;
pub use auth::*;
pub use budget::*;
pub use common::*;
pub use misc::*;
pub use notification::*;
