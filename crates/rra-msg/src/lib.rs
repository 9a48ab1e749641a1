//! ---
//! rra_section: "02-messaging-ipc-data-model"
//! rra_subsection: "module"
//! rra_type: "source"
//! rra_scope: "code"
//! rra_description: "Cross-frame envelope schema and messaging channel."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
//! Typed publish/subscribe channel between a host page and an embedded
//! editor frame.
//!
//! Everything runs on the host's single UI thread, so the channel and the
//! windows it talks to are `!Send` and share state through `Rc`/`RefCell`.
#![warn(missing_docs)]

pub mod channel;
pub mod logging;
pub mod origin;
pub mod replay;
pub mod types;
#[cfg(feature = "web")]
pub mod web;
pub mod window;

/// Shared result type for messaging operations.
pub type Result<T> = std::result::Result<T, MessagingError>;

/// Errors surfaced by fallible messaging operations.
///
/// Inbound problems never become errors; they are dropped and counted.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    /// A channel was created without an id.
    #[error("channel id must not be empty")]
    EmptyChannelId,
    /// An envelope was sent without a message type.
    #[error("message type must not be empty")]
    EmptyMessageType,
    /// The channel has been torn down.
    #[error("channel '{0}' is closed")]
    ChannelClosed(String),
    /// The target frame no longer exists.
    #[error("target frame for channel '{0}' is gone")]
    TargetGone(String),
    /// An outbound payload used a header field name.
    #[error("payload field '{0}' is reserved for the envelope header")]
    ReservedField(String),
    /// The underlying window refused the post.
    #[error("transport error: {0}")]
    Transport(String),
    /// A known message type carried a payload of the wrong shape.
    #[error("invalid '{kind}' payload: {source}")]
    Payload {
        /// Wire name of the message type.
        kind: String,
        /// Decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// Wrapper for IO errors encountered while reading transcripts.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON serialization or deserialization problems.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub use channel::{Channel, ChannelMetrics, Handler, Sender};
pub use logging::{log_envelope, ChannelMetricsExporter, EnvelopeDirection};
pub use origin::OriginPolicy;
pub use replay::{replay_lines, replay_transcript};
pub use types::{
    DropReason, EditorMessage, Envelope, MessageType, Payload, Ready, SaveStatus, Settings,
};
pub use window::{
    FrameWindow, InMemoryWindow, ListenerId, MessageListener, MessageSource, PostedMessage,
    WindowMessage,
};
