pub mod action;
pub mod error;
pub mod schedule;
pub mod types;

pub use action::*;
pub use error::*;
pub use schedule::*;
pub use types::*;
