//! ---
//! rra_section: "04-editor-session"
//! rra_subsection: "module"
//! rra_type: "source"
//! rra_scope: "code"
//! rra_description: "Host-side scenario editor session."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
//! Host side of the road network editor embedding.
//!
//! An [`EditorSession`] owns the channel to one editor frame, pushes the
//! scenario settings, tracks what the editor reports back and forwards save
//! requests. [`ScenarioEditorModal`] adds the reveal/close lifecycle of the
//! dialog hosting the frame.
#![warn(missing_docs)]

pub mod loading;
pub mod modal;
pub mod session;

use rra_msg::MessagingError;

/// Shared result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors raised by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The underlying channel failed.
    #[error("messaging error: {0}")]
    Messaging(#[from] MessagingError),
    /// The session has been closed.
    #[error("editor session for scenario {scenario_id} is closed")]
    Closed {
        /// Scenario the session was editing.
        scenario_id: u64,
    },
    /// The editor dialog is not open.
    #[error("editor is not revealed")]
    NotRevealed,
}

pub use loading::{GlobalLoading, LoadingIndicator};
pub use modal::{origin_policy, ScenarioEditorModal};
pub use session::{EditorSession, SaveRequest, ScenarioRef, SessionState};
