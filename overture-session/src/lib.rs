//! Telemetry and feedback collaborators. Event delivery is a detached side
//! channel: failures here are logged and swallowed, never surfaced to the
//! primary request path.

mod client;
mod events;
mod redact;

pub use client::{SessionClient, SessionError};
pub use events::{Event, Feedback, ModelParameters, UpdateChain};
pub use redact::{PiiRedactor, RedactionError, Redactor};
