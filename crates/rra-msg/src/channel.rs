//! ---
//! rra_section: "02-messaging-ipc-data-model"
//! rra_subsection: "module"
//! rra_type: "source"
//! rra_scope: "code"
//! rra_description: "Cross-frame envelope schema and messaging channel."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
//! Host-owned channel to one embedded frame.
//!
//! A [`Channel`] installs exactly one listener on the host window when it is
//! created and removes it when it is closed or dropped. Inbound messages go
//! through origin, shape and channel-id checks before being fanned out to the
//! handlers registered for their `type`, in registration order. Registering
//! the same handler twice invokes it twice.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use serde::Serialize;
use tracing::{debug, error, trace, warn};

use crate::logging::{log_envelope, ChannelMetricsExporter, EnvelopeDirection};
use crate::origin::OriginPolicy;
use crate::types::{DropReason, EditorMessage, Envelope, MessageType, Payload};
use crate::window::{FrameWindow, ListenerId, MessageListener, MessageSource, WindowMessage};
use crate::{MessagingError, Result};

/// Callback invoked for every matching inbound envelope.
pub type Handler = Rc<dyn Fn(&Envelope) -> anyhow::Result<()>>;

/// Snapshot of channel counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelMetrics {
    /// Envelopes posted to the target frame.
    pub sent: u64,
    /// Inbound envelopes accepted for this channel.
    pub received: u64,
    /// Outbound envelopes that could not be posted.
    pub dropped: u64,
    /// Inbound messages discarded before dispatch.
    pub rejected: u64,
    /// Accepted envelopes with no handler for their type.
    pub unhandled: u64,
    /// Handlers that returned an error or panicked.
    pub handler_failures: u64,
}

#[derive(Default)]
struct Counters {
    sent: Cell<u64>,
    received: Cell<u64>,
    dropped: Cell<u64>,
    rejected: Cell<u64>,
    unhandled: Cell<u64>,
    handler_failures: Cell<u64>,
}

fn bump(cell: &Cell<u64>) {
    cell.set(cell.get() + 1);
}

impl Counters {
    fn snapshot(&self) -> ChannelMetrics {
        ChannelMetrics {
            sent: self.sent.get(),
            received: self.received.get(),
            dropped: self.dropped.get(),
            rejected: self.rejected.get(),
            unhandled: self.unhandled.get(),
            handler_failures: self.handler_failures.get(),
        }
    }
}

struct ChannelInner {
    id: String,
    target: Weak<dyn FrameWindow>,
    target_name: &'static str,
    policy: OriginPolicy,
    handlers: RefCell<HashMap<String, Vec<Handler>>>,
    open: Cell<bool>,
    counters: Counters,
    exporter: RefCell<Option<ChannelMetricsExporter>>,
}

impl ChannelInner {
    fn with_exporter(&self, observe: impl FnOnce(&ChannelMetricsExporter)) {
        if let Some(exporter) = self.exporter.borrow().as_ref() {
            observe(exporter);
        }
    }

    fn post(&self, kind: &str, payload: Payload) -> Result<Envelope> {
        let outcome = self.try_post(kind, payload);
        match &outcome {
            Ok(envelope) => {
                bump(&self.counters.sent);
                self.with_exporter(ChannelMetricsExporter::observe_sent);
                log_envelope(EnvelopeDirection::Outbound, envelope);
            }
            Err(_) => {
                bump(&self.counters.dropped);
                self.with_exporter(ChannelMetricsExporter::observe_dropped);
            }
        }
        outcome
    }

    fn try_post(&self, kind: &str, payload: Payload) -> Result<Envelope> {
        if !self.open.get() {
            return Err(MessagingError::ChannelClosed(self.id.clone()));
        }
        if kind.is_empty() {
            return Err(MessagingError::EmptyMessageType);
        }
        let target = self
            .target
            .upgrade()
            .ok_or_else(|| MessagingError::TargetGone(self.id.clone()))?;
        let envelope = Envelope::new(self.id.clone(), kind, payload)?;
        target.post_message(&envelope.to_value(), self.policy.target_origin())?;
        Ok(envelope)
    }

    fn reject(&self, reason: DropReason, origin: &str) {
        bump(&self.counters.rejected);
        self.with_exporter(ChannelMetricsExporter::observe_rejected);
        trace!(channel_id = %self.id, %origin, reason = %reason, "inbound message dropped");
    }

    fn dispatch(&self, message: &WindowMessage) {
        if !self.open.get() {
            return;
        }
        if !self.policy.accepts(&message.origin) {
            self.reject(DropReason::ForeignOrigin, &message.origin);
            return;
        }
        let envelope = match Envelope::decode(&message.data) {
            Ok(envelope) => envelope,
            Err(reason) => {
                self.reject(reason, &message.origin);
                return;
            }
        };
        if envelope.channel_id != self.id {
            self.reject(DropReason::ChannelMismatch, &message.origin);
            return;
        }

        bump(&self.counters.received);
        self.with_exporter(ChannelMetricsExporter::observe_received);
        log_envelope(EnvelopeDirection::Inbound, &envelope);

        // Snapshot so handlers can register or send without holding the borrow.
        let handlers: Vec<Handler> = self
            .handlers
            .borrow()
            .get(&envelope.kind)
            .cloned()
            .unwrap_or_default();

        if handlers.is_empty() {
            bump(&self.counters.unhandled);
            self.with_exporter(ChannelMetricsExporter::observe_unhandled);
            trace!(channel_id = %self.id, kind = %envelope.kind, "no handler registered");
            return;
        }

        for (index, handler) in handlers.iter().enumerate() {
            if !self.open.get() {
                debug!(channel_id = %self.id, kind = %envelope.kind, "channel closed during dispatch");
                break;
            }
            let failure = match panic::catch_unwind(AssertUnwindSafe(|| handler(&envelope))) {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(format!("{:#}", err)),
                Err(panic) => Some(panic_message(panic.as_ref())),
            };
            if let Some(failure) = failure {
                bump(&self.counters.handler_failures);
                self.with_exporter(ChannelMetricsExporter::observe_handler_failure);
                error!(
                    channel_id = %self.id,
                    kind = %envelope.kind,
                    handler = index,
                    error = %failure,
                    "envelope handler failed"
                );
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_owned()
    }
}

/// Weak sending handle for use inside handlers.
///
/// Holding a [`Sender`] does not keep the channel alive; sends after the
/// channel is gone are dropped.
#[derive(Clone)]
pub struct Sender {
    inner: Weak<ChannelInner>,
}

impl Sender {
    /// Post an envelope if the channel still exists.
    pub fn send(&self, kind: impl AsRef<str>, payload: Payload) -> Result<Envelope> {
        match self.inner.upgrade() {
            Some(inner) => inner.post(kind.as_ref(), payload),
            None => Err(MessagingError::ChannelClosed(String::new())),
        }
    }

    /// Post a typed message if the channel still exists.
    pub fn send_message(&self, message: &EditorMessage) -> Result<Envelope> {
        self.send(message.kind(), message.payload())
    }
}

/// Typed publish/subscribe channel between the host and one embedded frame.
pub struct Channel {
    inner: Rc<ChannelInner>,
    host: Rc<dyn MessageSource>,
    listener: Cell<Option<ListenerId>>,
}

impl Channel {
    /// Create a channel to `target` and start listening on `host`.
    ///
    /// The target frame is only weakly referenced; the channel never keeps it
    /// alive.
    pub fn create<T>(
        channel_id: impl Into<String>,
        target: &Rc<T>,
        host: Rc<dyn MessageSource>,
        policy: OriginPolicy,
    ) -> Result<Self>
    where
        T: FrameWindow + 'static,
    {
        let id = channel_id.into();
        if id.is_empty() {
            return Err(MessagingError::EmptyChannelId);
        }
        let weak_target: Weak<T> = Rc::downgrade(target);
        let weak_target: Weak<dyn FrameWindow> = weak_target;
        let inner = Rc::new(ChannelInner {
            id,
            target: weak_target,
            target_name: target.name(),
            policy,
            handlers: RefCell::new(HashMap::new()),
            open: Cell::new(true),
            counters: Counters::default(),
            exporter: RefCell::new(None),
        });

        let weak_inner = Rc::downgrade(&inner);
        let listener: MessageListener = Rc::new(move |message: &WindowMessage| {
            if let Some(inner) = weak_inner.upgrade() {
                inner.dispatch(message);
            }
        });
        let listener_id = host.add_message_listener(listener);
        debug!(
            channel_id = %inner.id,
            target = inner.target_name,
            origin = inner.policy.target_origin(),
            "channel created"
        );

        Ok(Self {
            inner,
            host,
            listener: Cell::new(Some(listener_id)),
        })
    }

    /// Mirror this channel's counters into prometheus.
    pub fn with_exporter(self, exporter: ChannelMetricsExporter) -> Self {
        *self.inner.exporter.borrow_mut() = Some(exporter);
        self
    }

    /// Channel id stamped on every envelope.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Origin policy the channel was created with.
    pub fn policy(&self) -> &OriginPolicy {
        &self.inner.policy
    }

    /// Whether the channel still dispatches and sends.
    pub fn is_open(&self) -> bool {
        self.inner.open.get()
    }

    /// Register `handler` for every future envelope of type `kind`.
    ///
    /// Past envelopes are not replayed. Handlers registered after the channel
    /// closed are discarded.
    pub fn on<F>(&self, kind: impl AsRef<str>, handler: F) -> &Self
    where
        F: Fn(&Envelope) -> anyhow::Result<()> + 'static,
    {
        self.on_handler(kind, Rc::new(handler))
    }

    /// Register an already shared handler. Registering the same `Rc` twice
    /// yields two invocations per envelope.
    pub fn on_handler(&self, kind: impl AsRef<str>, handler: Handler) -> &Self {
        let kind = kind.as_ref();
        if !self.is_open() {
            debug!(channel_id = %self.inner.id, %kind, "handler registered on closed channel ignored");
            return self;
        }
        self.inner
            .handlers
            .borrow_mut()
            .entry(kind.to_owned())
            .or_default()
            .push(handler);
        self
    }

    /// Register a handler receiving the decoded [`EditorMessage`].
    ///
    /// A payload that does not match the type's shape counts as a handler
    /// failure.
    pub fn on_message<F>(&self, kind: MessageType, handler: F) -> &Self
    where
        F: Fn(EditorMessage) -> anyhow::Result<()> + 'static,
    {
        self.on(kind, move |envelope: &Envelope| {
            let message = EditorMessage::from_envelope(envelope)?;
            handler(message)
        })
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: impl AsRef<str>) -> usize {
        self.inner
            .handlers
            .borrow()
            .get(kind.as_ref())
            .map_or(0, Vec::len)
    }

    /// Post `{channelId, type, ...payload}` to the target frame.
    ///
    /// Fire-and-forget: failures are logged and counted as dropped.
    pub fn send(&self, kind: impl AsRef<str>, payload: Payload) -> &Self {
        let kind = kind.as_ref();
        if let Err(err) = self.inner.post(kind, payload) {
            match err {
                MessagingError::ChannelClosed(_) => {
                    debug!(channel_id = %self.inner.id, %kind, "send on closed channel dropped")
                }
                err => warn!(
                    channel_id = %self.inner.id,
                    target = self.inner.target_name,
                    %kind,
                    error = %err,
                    "envelope send failed"
                ),
            }
        }
        self
    }

    /// Like [`send`](Channel::send) but returns the posted envelope or the failure.
    pub fn try_send(&self, kind: impl AsRef<str>, payload: Payload) -> Result<Envelope> {
        self.inner.post(kind.as_ref(), payload)
    }

    /// Send a typed message.
    pub fn send_message(&self, message: &EditorMessage) -> &Self {
        self.send(message.kind(), message.payload())
    }

    /// Send a typed message, returning the posted envelope or the failure.
    pub fn try_send_message(&self, message: &EditorMessage) -> Result<Envelope> {
        self.try_send(message.kind(), message.payload())
    }

    /// Handle for sending from inside handlers without creating a cycle.
    pub fn sender(&self) -> Sender {
        Sender {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Current counters.
    pub fn metrics(&self) -> ChannelMetrics {
        self.inner.counters.snapshot()
    }

    /// Stop listening and release every handler. Idempotent.
    ///
    /// Nothing is sent to the target frame.
    pub fn close(&self) {
        if let Some(listener) = self.listener.take() {
            self.host.remove_message_listener(listener);
        }
        if self.inner.open.replace(false) {
            let released: usize = self
                .inner
                .handlers
                .borrow_mut()
                .drain()
                .map(|(_, handlers)| handlers.len())
                .sum();
            debug!(channel_id = %self.inner.id, handlers = released, "channel closed");
        }
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.inner.id)
            .field("policy", &self.inner.policy)
            .field("open", &self.inner.open.get())
            .field("metrics", &self.metrics())
            .finish()
    }
}
