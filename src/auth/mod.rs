//! Authentication module
//!
//! Keeps the access/refresh token pair in local storage and hands out
//! valid tokens, collapsing concurrent refreshes into a single request.

pub mod commands;
mod error;
pub mod jwt;
pub mod session;
pub mod storage;
pub mod tokens;
pub mod transport;

pub use commands::{login, logout, status};
pub use error::{truncate_body, AuthError};
pub use session::{SessionManager, SessionOptions, SessionStatus};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use tokens::{CredentialRecord, TokenStore};
pub use transport::{AuthTransport, FakeAuthTransport, HttpAuthTransport, LoginRequest};
