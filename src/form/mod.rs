//! # Form Session
//!
//! Headless stand-in for the form renderer: seeds values, keeps derived
//! fields resolved and errors current, and gates submission.

pub mod errors;
pub mod session;

pub use errors::{SessionError, SessionResult, SubmitError};
pub use session::FormSession;
