//! ---
//! rra_section: "05-networking-external-interfaces"
//! rra_subsection: "binary"
//! rra_type: "source"
//! rra_scope: "code"
//! rra_description: "Control CLI for driving the editor bridge offline."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Args;
use prometheus::{Encoder, Registry, TextEncoder};
use rra_common::config::AppConfig;
use rra_editor::{GlobalLoading, SaveRequest, ScenarioEditorModal, ScenarioRef, SessionState};
use rra_msg::{
    replay_transcript, ChannelMetrics, ChannelMetricsExporter, InMemoryWindow, PostedMessage,
};
use serde::Serialize;

#[derive(Debug, Args)]
pub struct ReplayCommand {
    /// NDJSON transcript of messages sent by the editor frame.
    #[arg(long, value_name = "FILE")]
    transcript: PathBuf,

    /// Project the scenario belongs to.
    #[arg(long, value_name = "ID")]
    project: u64,

    /// Scenario opened in the editor.
    #[arg(long, value_name = "ID")]
    scenario: u64,

    /// Press save once the transcript has been replayed.
    #[arg(long)]
    save: bool,
}

#[derive(Debug, Serialize)]
struct ReplayReport {
    channel_id: String,
    replayed: usize,
    state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    save: Option<SaveRequest>,
    loading_depth: usize,
    metrics: ChannelMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    prometheus: Option<String>,
    posted: Vec<PostedMessage>,
}

impl ReplayCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let editor = &config.editor;
        let default_origin = editor
            .target_origin()
            .unwrap_or_else(|| editor.url.origin().ascii_serialization());

        let target = Rc::new(InMemoryWindow::new());
        let host = InMemoryWindow::new();
        let loading = Rc::new(GlobalLoading::new());
        let mut modal = ScenarioEditorModal::new(
            editor.clone(),
            ScenarioRef {
                project_id: self.project,
                scenario_id: self.scenario,
            },
            None,
            loading.clone(),
        );
        let registry = Registry::new();
        if config.metrics.enabled {
            let exporter = ChannelMetricsExporter::register(&registry)
                .context("failed to register channel metrics")?;
            modal = modal.with_exporter(exporter);
        }
        modal
            .reveal(&target, Rc::new(host.clone()))
            .context("failed to open editor session")?;

        let replayed = replay_transcript(&host, &default_origin, &self.transcript)
            .with_context(|| format!("failed to replay {}", self.transcript.display()))?;

        let save = if self.save {
            Some(modal.save().context("save request failed")?)
        } else {
            None
        };

        let session = modal
            .session()
            .context("editor session ended during replay")?;
        let report = ReplayReport {
            channel_id: editor.channel_id.clone(),
            replayed,
            state: session.state(),
            save,
            loading_depth: loading.depth(),
            metrics: session.channel().metrics(),
            prometheus: config
                .metrics
                .enabled
                .then(|| encode_metrics(&registry))
                .transpose()?,
            posted: target.take_posted(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}

fn encode_metrics(registry: &Registry) -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .context("failed to encode metrics")?;
    Ok(String::from_utf8(buffer)?)
}
