//! ---
//! rra_section: "02-messaging-ipc-data-model"
//! rra_subsection: "module"
//! rra_type: "source"
//! rra_scope: "code"
//! rra_description: "Cross-frame envelope schema and messaging channel."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{MessagingError, Result};

/// A message event as seen by listeners on the host window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowMessage {
    /// Origin of the sending frame.
    pub origin: String,
    /// Structured-cloned message body.
    pub data: JsonValue,
}

/// Callback installed on a host window for incoming messages.
pub type MessageListener = Rc<dyn Fn(&WindowMessage)>;

/// Handle returned when a listener is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Global context of the frame messages are posted into.
pub trait FrameWindow {
    /// Post a message to the frame. `target_origin` is either a concrete
    /// origin or `*`.
    fn post_message(&self, message: &JsonValue, target_origin: &str) -> Result<()>;
    /// Human-readable window name for logging.
    fn name(&self) -> &'static str;
}

/// Global context that receives `message` events.
pub trait MessageSource {
    /// Install a listener; every future message is delivered to it.
    fn add_message_listener(&self, listener: MessageListener) -> ListenerId;
    /// Remove a listener. Returns `false` if it was not installed.
    fn remove_message_listener(&self, id: ListenerId) -> bool;
}

/// A message recorded by [`InMemoryWindow::post_message`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostedMessage {
    /// Target origin the sender asked for.
    pub target_origin: String,
    /// Posted body.
    pub data: JsonValue,
}

#[derive(Default)]
struct WindowState {
    posted: RefCell<VecDeque<PostedMessage>>,
    listeners: RefCell<Vec<(ListenerId, MessageListener)>>,
    next_listener: Cell<u64>,
    detached: Cell<bool>,
}

/// In-process window used for tests, transcript replay and the CLI.
///
/// Acts as both ends: posts are queued in FIFO order for inspection and
/// [`deliver`](InMemoryWindow::deliver) fans a message out to the installed
/// listeners in installation order.
#[derive(Clone, Default)]
pub struct InMemoryWindow {
    state: Rc<WindowState>,
}

impl InMemoryWindow {
    /// Create a new in-memory window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an inbound message to every installed listener.
    ///
    /// Listeners run outside the internal borrow so they may post, install or
    /// remove listeners themselves.
    pub fn deliver(&self, origin: impl Into<String>, data: JsonValue) {
        let message = WindowMessage {
            origin: origin.into(),
            data,
        };
        let listeners: Vec<MessageListener> = self
            .state
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&message);
        }
    }

    /// Pop the oldest posted message.
    pub fn recv(&self) -> Option<PostedMessage> {
        self.state.posted.borrow_mut().pop_front()
    }

    /// Drain every posted message.
    pub fn take_posted(&self) -> Vec<PostedMessage> {
        self.state.posted.borrow_mut().drain(..).collect()
    }

    /// Posted messages without draining them.
    pub fn posted(&self) -> Vec<PostedMessage> {
        self.state.posted.borrow().iter().cloned().collect()
    }

    /// Number of installed listeners.
    pub fn listener_count(&self) -> usize {
        self.state.listeners.borrow().len()
    }

    /// Simulate the frame going away: later posts fail.
    pub fn detach(&self) {
        self.state.detached.set(true);
    }
}

impl FrameWindow for InMemoryWindow {
    fn post_message(&self, message: &JsonValue, target_origin: &str) -> Result<()> {
        if self.state.detached.get() {
            return Err(MessagingError::Transport("window detached".into()));
        }
        self.state.posted.borrow_mut().push_back(PostedMessage {
            target_origin: target_origin.to_owned(),
            data: message.clone(),
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

impl MessageSource for InMemoryWindow {
    fn add_message_listener(&self, listener: MessageListener) -> ListenerId {
        let next = self.state.next_listener.get() + 1;
        self.state.next_listener.set(next);
        let id = ListenerId(next);
        self.state.listeners.borrow_mut().push((id, listener));
        id
    }

    fn remove_message_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.state.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(installed, _)| *installed != id);
        listeners.len() != before
    }
}
