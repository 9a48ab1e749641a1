//! ---
//! rra_section: "04-editor-session"
//! rra_subsection: "module"
//! rra_type: "source"
//! rra_scope: "code"
//! rra_description: "Host-side scenario editor session."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
use std::rc::Rc;

use rra_common::geo::{bounds_to_map_location, editor_url, Bbox, MapLocation};
use rra_common::EditorConfig;
use rra_msg::{Channel, ChannelMetricsExporter, FrameWindow, MessageSource, OriginPolicy};
use tracing::debug;
use url::Url;

use crate::loading::LoadingIndicator;
use crate::session::{EditorSession, SaveRequest, ScenarioRef};
use crate::{Result, SessionError};

/// Origin policy described by the editor configuration.
pub fn origin_policy(config: &EditorConfig) -> OriginPolicy {
    OriginPolicy::from(config.target_origin())
}

/// Dialog hosting the editor frame.
///
/// Every reveal opens a fresh [`EditorSession`]; closing the dialog tears it
/// down.
pub struct ScenarioEditorModal {
    config: EditorConfig,
    scenario: ScenarioRef,
    project_bbox: Option<Bbox>,
    indicator: Rc<dyn LoadingIndicator>,
    exporter: Option<ChannelMetricsExporter>,
    session: Option<EditorSession>,
}

impl ScenarioEditorModal {
    /// Prepare a closed dialog for `scenario`.
    pub fn new(
        config: EditorConfig,
        scenario: ScenarioRef,
        project_bbox: Option<Bbox>,
        indicator: Rc<dyn LoadingIndicator>,
    ) -> Self {
        Self {
            config,
            scenario,
            project_bbox,
            indicator,
            exporter: None,
            session: None,
        }
    }

    /// Mirror the counters of every session this dialog opens into prometheus.
    pub fn with_exporter(mut self, exporter: ChannelMetricsExporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Show the dialog, replacing any session still attached to an older frame.
    pub fn reveal<T>(&mut self, target: &Rc<T>, host: Rc<dyn MessageSource>) -> Result<&EditorSession>
    where
        T: FrameWindow + 'static,
    {
        if let Some(previous) = self.session.take() {
            debug!(scenario_id = self.scenario.scenario_id, "replacing editor session");
            previous.close();
        }
        let mut channel = Channel::create(
            self.config.channel_id.clone(),
            target,
            host,
            origin_policy(&self.config),
        )?;
        if let Some(exporter) = &self.exporter {
            channel = channel.with_exporter(exporter.clone());
        }
        let session = EditorSession::attach(channel, self.scenario, self.indicator.clone());
        Ok(self.session.insert(session))
    }

    /// Hide the dialog and end the session.
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
        }
    }

    /// Whether the dialog is showing.
    pub fn is_revealed(&self) -> bool {
        self.session.is_some()
    }

    /// Current session, while revealed.
    pub fn session(&self) -> Option<&EditorSession> {
        self.session.as_ref()
    }

    /// Forward the save button.
    pub fn save(&self) -> Result<SaveRequest> {
        self.session
            .as_ref()
            .ok_or(SessionError::NotRevealed)?
            .request_save()
    }

    /// Where the editor should open, given the last reported map size.
    pub fn map_location(&self) -> MapLocation {
        let Some(bbox) = self.project_bbox.as_ref() else {
            return MapLocation::default();
        };
        let (width, height) = self
            .session
            .as_ref()
            .map(|session| {
                let state = session.state();
                (state.editor_width, state.editor_height)
            })
            .unwrap_or((0.0, 0.0));
        bounds_to_map_location(bbox, width.max(0.0) as u32, height.max(0.0) as u32)
    }

    /// URL to load into the editor frame.
    pub fn editor_url(&self) -> Url {
        editor_url(&self.config.url, &self.map_location())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::GlobalLoading;
    use rra_msg::InMemoryWindow;
    use serde_json::json;

    fn config() -> EditorConfig {
        EditorConfig {
            url: Url::parse("https://editor.example.org/id/").expect("url"),
            ..EditorConfig::default()
        }
    }

    fn modal(bbox: Option<Bbox>) -> (ScenarioEditorModal, Rc<GlobalLoading>) {
        let loading = Rc::new(GlobalLoading::new());
        let modal = ScenarioEditorModal::new(
            config(),
            ScenarioRef {
                project_id: 42,
                scenario_id: 0,
            },
            bbox,
            loading.clone(),
        );
        (modal, loading)
    }

    #[test]
    fn policy_follows_config() {
        let mut config = config();
        assert_eq!(
            origin_policy(&config),
            OriginPolicy::Exact("https://editor.example.org".into())
        );
        config.allow_any_origin = true;
        assert_eq!(origin_policy(&config), OriginPolicy::Any);
    }

    #[test]
    fn reveal_close_reveal_keeps_one_listener() {
        let (mut modal, loading) = modal(None);
        let target = Rc::new(InMemoryWindow::new());
        let host = InMemoryWindow::new();

        modal.reveal(&target, Rc::new(host.clone())).expect("reveal");
        modal.close();
        assert!(!modal.is_revealed());
        assert_eq!(host.listener_count(), 0);
        assert!(!loading.is_visible());

        modal.reveal(&target, Rc::new(host.clone())).expect("reveal again");
        modal.reveal(&target, Rc::new(host.clone())).expect("replace frame");
        assert_eq!(host.listener_count(), 1);
        assert_eq!(loading.depth(), 1);
    }

    #[test]
    fn save_requires_revealed_dialog() {
        let (modal, _loading) = modal(None);
        assert!(matches!(modal.save(), Err(SessionError::NotRevealed)));
    }

    #[test]
    fn editor_url_uses_reported_map_size() {
        let (mut modal, _loading) = modal(Some([-10.0, -10.0, 10.0, 10.0]));
        assert_eq!(
            modal.editor_url().as_str(),
            "https://editor.example.org/id/#map=0/0/0"
        );

        let target = Rc::new(InMemoryWindow::new());
        let host = InMemoryWindow::new();
        modal.reveal(&target, Rc::new(host.clone())).expect("reveal");
        host.deliver(
            "https://editor.example.org",
            json!({"channelId": "rra-frontend", "type": "ready", "mapWidth": 800, "mapHeight": 600}),
        );
        assert_eq!(modal.map_location().zoom, 5);
        assert_eq!(
            modal.editor_url().as_str(),
            "https://editor.example.org/id/#map=5/0/0"
        );
    }

    #[test]
    fn exporter_sees_initial_settings() {
        let registry = prometheus::Registry::new();
        let exporter = ChannelMetricsExporter::register(&registry).expect("exporter");
        let (modal, _loading) = modal(None);
        let mut modal = modal.with_exporter(exporter);
        let target = Rc::new(InMemoryWindow::new());
        modal
            .reveal(&target, Rc::new(InMemoryWindow::new()))
            .expect("reveal");

        let sent = registry
            .gather()
            .iter()
            .find(|family| family.get_name() == "bridge_envelopes_sent_total")
            .map(|family| family.get_metric()[0].get_counter().get_value());
        assert_eq!(sent, Some(1.0));
    }

    #[test]
    fn missing_bbox_opens_world_view() {
        let (modal, _loading) = modal(None);
        assert_eq!(modal.map_location(), MapLocation::default());
    }
}
