//! ---
//! rra_section: "02-messaging-ipc-data-model"
//! rra_subsection: "module"
//! rra_type: "source"
//! rra_scope: "code"
//! rra_description: "Cross-frame envelope schema and messaging channel."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
use prometheus::{IntCounter, Opts, Registry};
use tracing::debug;

use crate::types::Envelope;

/// Direction of the envelope movement, used for consistent logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeDirection {
    /// Envelope posted to the editor frame.
    Outbound,
    /// Envelope received from the editor frame.
    Inbound,
}

/// Emit a structured log entry for envelope activity.
pub fn log_envelope(direction: EnvelopeDirection, envelope: &Envelope) {
    debug!(
        channel_id = %envelope.channel_id,
        kind = %envelope.kind,
        fields = envelope.payload.len(),
        direction = ?direction,
        "envelope activity"
    );
}

/// Prometheus metric handles for channel activity.
///
/// Cloning shares the underlying counters, so one exporter can back several
/// channels.
#[derive(Clone)]
pub struct ChannelMetricsExporter {
    sent: IntCounter,
    received: IntCounter,
    dropped: IntCounter,
    rejected: IntCounter,
    unhandled: IntCounter,
    handler_failures: IntCounter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, prometheus::Error> {
    let counter = IntCounter::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl ChannelMetricsExporter {
    /// Register channel metrics with the provided registry.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            sent: counter(
                registry,
                "bridge_envelopes_sent_total",
                "Envelopes posted to the editor frame",
            )?,
            received: counter(
                registry,
                "bridge_envelopes_received_total",
                "Envelopes accepted from the editor frame",
            )?,
            dropped: counter(
                registry,
                "bridge_envelopes_dropped_total",
                "Outbound envelopes that could not be posted",
            )?,
            rejected: counter(
                registry,
                "bridge_envelopes_rejected_total",
                "Inbound messages discarded as malformed, foreign or for another channel",
            )?,
            unhandled: counter(
                registry,
                "bridge_envelopes_unhandled_total",
                "Inbound envelopes with no registered handler",
            )?,
            handler_failures: counter(
                registry,
                "bridge_handler_failures_total",
                "Handlers that returned an error or panicked",
            )?,
        })
    }

    /// Record a posted envelope.
    pub fn observe_sent(&self) {
        self.sent.inc();
    }

    /// Record an accepted inbound envelope.
    pub fn observe_received(&self) {
        self.received.inc();
    }

    /// Record an outbound envelope that failed to post.
    pub fn observe_dropped(&self) {
        self.dropped.inc();
    }

    /// Record a discarded inbound message.
    pub fn observe_rejected(&self) {
        self.rejected.inc();
    }

    /// Record an inbound envelope nobody listened for.
    pub fn observe_unhandled(&self) {
        self.unhandled.inc();
    }

    /// Record a failing handler.
    pub fn observe_handler_failure(&self) {
        self.handler_failures.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_exporter_records_counts() {
        let registry = Registry::new();
        let metrics = ChannelMetricsExporter::register(&registry).expect("register metrics");
        metrics.observe_sent();
        metrics.observe_sent();
        metrics.observe_received();
        metrics.observe_rejected();
        metrics.observe_handler_failure();

        let families = registry.gather();
        let sent = families
            .iter()
            .find(|f| f.get_name() == "bridge_envelopes_sent_total")
            .expect("sent family");
        assert_eq!(sent.get_metric()[0].get_counter().get_value(), 2.0);
        assert!(families
            .iter()
            .any(|f| f.get_name() == "bridge_handler_failures_total"));
    }

    #[test]
    fn registering_twice_on_one_registry_fails() {
        let registry = Registry::new();
        ChannelMetricsExporter::register(&registry).expect("first registration");
        assert!(ChannelMetricsExporter::register(&registry).is_err());
    }
}
