//! Gemini client with resilient decoding of server-sent enumerations
//!
//! Sends text and image prompts to Gemini, streams the answer into an
//! observable session state, and tolerates enum values added by the backend
//! after this client was built.

pub mod ai;
pub mod app;
pub mod codec;
pub mod error;
pub mod models;
pub mod prompt;
pub mod session;
pub mod settings;

pub use error::{Error, Result};

/// Check every resilient enumeration declared by this crate.
///
/// Run once at startup; a failure is a declaration defect.
pub fn validate_enums() -> Result<()> {
    codec::validate::<models::AiModel>()?;
    ai::gemini::types::validate_wire_enums()
}
