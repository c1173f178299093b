//! Data models for the user directory

mod user;

pub use user::*;
