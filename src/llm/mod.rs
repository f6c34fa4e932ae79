//! Completion transport.
//!
//! Single point of access to the language-model endpoint. The engine
//! only ever sees the `CompletionClient` trait; the HTTP client and
//! the scripted mock both satisfy it, so every caller stays testable
//! without a network.

pub mod client;

pub use client::{
    ChatMessage, CompletionClient, CompletionRequest, HttpCompletionClient, MockCompletionClient,
};

/// Errors from the completion transport.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompletionError {
    #[error("Cannot reach completion endpoint at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Completion endpoint returned HTTP {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("Could not parse completion response: {0}")]
    ResponseParsing(String),

    #[error("Completion response contained no choices")]
    EmptyResponse,

    #[error("No preferred model available on the endpoint")]
    NoModelAvailable,
}
