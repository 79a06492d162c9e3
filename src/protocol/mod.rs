//! Wire protocol definitions: message enums, session types, error codes,
//! and input validation/sanitization.

pub mod error_codes;
pub mod messages;
pub mod types;
pub mod validation;

pub use error_codes::ErrorCode;
pub use messages::{ClientMessage, ServerMessage};
pub use types::{EndReason, Preferences, SessionId, SessionSnapshot, SessionStatus};
