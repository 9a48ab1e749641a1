//! ---
//! rra_section: "02-messaging-ipc-data-model"
//! rra_subsection: "module"
//! rra_type: "source"
//! rra_scope: "code"
//! rra_description: "Browser window bindings for the messaging channel."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
//! `postMessage` bindings over `web-sys`, enabled with the `web` feature.
//!
//! Messages cross the boundary as JSON text so the channel only ever sees
//! `serde_json` values.
//!
//! `wasm32-unknown-unknown` aborts on panic, so a panicking handler is not
//! isolated here the way it is on native targets. Handlers should report
//! failures through their `Err` return, which is isolated everywhere.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use serde_json::Value as JsonValue;
use tracing::{trace, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{HtmlIFrameElement, MessageEvent, Window};

use crate::window::{FrameWindow, ListenerId, MessageListener, MessageSource, WindowMessage};
use crate::{MessagingError, Result};

const MESSAGE_EVENT: &str = "message";

fn stringify(value: &JsValue) -> Option<String> {
    // `JSON.stringify(undefined)` yields `undefined`, not a string.
    js_sys::JSON::stringify(value).ok()?.as_string()
}

fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| stringify(value))
        .unwrap_or_else(|| "unknown javascript error".to_owned())
}

fn to_json(value: &JsValue) -> Option<JsonValue> {
    serde_json::from_str(&stringify(value)?).ok()
}

/// Content window of an editor frame.
pub struct BrowserFrame {
    window: Window,
}

impl BrowserFrame {
    /// Wrap a window handle directly.
    pub fn new(window: Window) -> Self {
        Self { window }
    }

    /// Content window of an iframe that is attached to the document.
    pub fn from_iframe(frame: &HtmlIFrameElement) -> Option<Self> {
        frame.content_window().map(Self::new)
    }
}

impl FrameWindow for BrowserFrame {
    fn post_message(&self, message: &JsonValue, target_origin: &str) -> Result<()> {
        let text = serde_json::to_string(message)?;
        let value = js_sys::JSON::parse(&text)
            .map_err(|err| MessagingError::Transport(describe(&err)))?;
        self.window
            .post_message(&value, target_origin)
            .map_err(|err| MessagingError::Transport(describe(&err)))
    }

    fn name(&self) -> &'static str {
        "browser_frame"
    }
}

/// The host page's own window, receiving `message` events.
///
/// Dropping it unregisters every listener it still holds.
pub struct BrowserHost {
    window: Window,
    listeners: RefCell<HashMap<ListenerId, Closure<dyn FnMut(MessageEvent)>>>,
    next_listener: Cell<u64>,
}

impl BrowserHost {
    /// Wrap a window handle directly.
    pub fn new(window: Window) -> Self {
        Self {
            window,
            listeners: RefCell::new(HashMap::new()),
            next_listener: Cell::new(0),
        }
    }

    /// The global `window`, if running in a browser context.
    pub fn current() -> Option<Self> {
        web_sys::window().map(Self::new)
    }

    fn unregister(&self, closure: &Closure<dyn FnMut(MessageEvent)>) {
        if let Err(err) = self
            .window
            .remove_event_listener_with_callback(MESSAGE_EVENT, closure.as_ref().unchecked_ref())
        {
            warn!(error = %describe(&err), "failed to remove message listener");
        }
    }
}

impl MessageSource for BrowserHost {
    fn add_message_listener(&self, listener: MessageListener) -> ListenerId {
        let next = self.next_listener.get() + 1;
        self.next_listener.set(next);
        let id = ListenerId(next);

        let closure = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            let Some(data) = to_json(&event.data()) else {
                trace!("non-json message event ignored");
                return;
            };
            listener(&WindowMessage {
                origin: event.origin(),
                data,
            });
        });

        if let Err(err) = self
            .window
            .add_event_listener_with_callback(MESSAGE_EVENT, closure.as_ref().unchecked_ref())
        {
            warn!(error = %describe(&err), "failed to install message listener");
        }
        self.listeners.borrow_mut().insert(id, closure);
        id
    }

    fn remove_message_listener(&self, id: ListenerId) -> bool {
        let Some(closure) = self.listeners.borrow_mut().remove(&id) else {
            return false;
        };
        self.unregister(&closure);
        true
    }
}

impl Drop for BrowserHost {
    fn drop(&mut self) {
        let listeners: Vec<_> = self.listeners.borrow_mut().drain().collect();
        for (_, closure) in listeners {
            self.unregister(&closure);
        }
    }
}
