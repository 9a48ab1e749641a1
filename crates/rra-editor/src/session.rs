//! ---
//! rra_section: "04-editor-session"
//! rra_subsection: "module"
//! rra_type: "source"
//! rra_scope: "code"
//! rra_description: "Host-side scenario editor session."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rra_msg::{
    Channel, EditorMessage, FrameWindow, MessageSource, MessageType, OriginPolicy, Settings,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::loading::LoadingIndicator;
use crate::{Result, SessionError};

/// Scenario opened in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioRef {
    /// Owning project.
    pub project_id: u64,
    /// Scenario within the project.
    pub scenario_id: u64,
}

impl ScenarioRef {
    fn settings(&self) -> EditorMessage {
        EditorMessage::Settings(Settings {
            project_id: self.project_id,
            scenario_id: self.scenario_id,
        })
    }
}

/// What the host knows about the embedded editor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// The editor reported `ready`.
    pub editor_loaded: bool,
    /// The editor has changes it can save.
    pub save_enabled: bool,
    /// Map width from the first `ready`.
    pub editor_width: f64,
    /// Map height from the first `ready`.
    pub editor_height: f64,
}

/// Outcome of [`EditorSession::request_save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveRequest {
    /// `save:click` was posted to the editor.
    Sent,
    /// The editor reported nothing to save; nothing was posted.
    NothingToSave,
}

struct Shared {
    state: RefCell<SessionState>,
    indicator: Rc<dyn LoadingIndicator>,
    loading: Cell<bool>,
}

impl Shared {
    fn release_loading(&self) {
        if self.loading.replace(false) {
            self.indicator.hide();
        }
    }
}

/// Host-side session with one editor frame.
///
/// Lives from the moment the frame is revealed until [`close`](Self::close)
/// or drop.
pub struct EditorSession {
    scenario: ScenarioRef,
    shared: Rc<Shared>,
    channel: Channel,
}

impl EditorSession {
    /// Open the channel, register the protocol handlers and push settings.
    ///
    /// Settings are sent straight away without waiting for the editor; they
    /// are sent again whenever the editor reports `loaded`.
    pub fn open<T>(
        channel_id: impl Into<String>,
        target: &Rc<T>,
        host: Rc<dyn MessageSource>,
        policy: OriginPolicy,
        scenario: ScenarioRef,
        indicator: Rc<dyn LoadingIndicator>,
    ) -> Result<Self>
    where
        T: FrameWindow + 'static,
    {
        let channel = Channel::create(channel_id, target, host, policy)?;
        Ok(Self::attach(channel, scenario, indicator))
    }

    /// Run the editor protocol over an already created channel.
    pub fn attach(channel: Channel, scenario: ScenarioRef, indicator: Rc<dyn LoadingIndicator>) -> Self {
        indicator.show();
        let shared = Rc::new(Shared {
            state: RefCell::new(SessionState::default()),
            indicator,
            loading: Cell::new(true),
        });

        let sender = channel.sender();
        let settings = scenario.settings();
        channel.on(MessageType::Loaded, move |_| {
            debug!(scenario_id = scenario.scenario_id, "editor loaded, resending settings");
            sender.send_message(&settings)?;
            Ok(())
        });

        let on_ready = shared.clone();
        channel.on_message(MessageType::Ready, move |message| {
            let EditorMessage::Ready(ready) = message else {
                return Ok(());
            };
            on_ready.release_loading();
            let mut state = on_ready.state.borrow_mut();
            if !state.editor_loaded {
                state.editor_width = ready.map_width;
                state.editor_height = ready.map_height;
                state.editor_loaded = true;
                info!(
                    width = ready.map_width,
                    height = ready.map_height,
                    "editor ready"
                );
            }
            Ok(())
        });

        let on_status = shared.clone();
        channel.on_message(MessageType::SaveStatus, move |message| {
            if let EditorMessage::SaveStatus(status) = message {
                on_status.state.borrow_mut().save_enabled = status.enabled;
            }
            Ok(())
        });

        channel.send_message(&scenario.settings());
        info!(
            channel_id = channel.id(),
            project_id = scenario.project_id,
            scenario_id = scenario.scenario_id,
            "editor session opened"
        );

        Self {
            scenario,
            shared,
            channel,
        }
    }

    /// Scenario being edited.
    pub fn scenario(&self) -> ScenarioRef {
        self.scenario
    }

    /// Snapshot of the session state.
    pub fn state(&self) -> SessionState {
        *self.shared.state.borrow()
    }

    /// Underlying channel.
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Whether the session still talks to the editor.
    pub fn is_open(&self) -> bool {
        self.channel.is_open()
    }

    /// Ask the editor to save. Nothing is posted while the editor reports
    /// nothing to save.
    pub fn request_save(&self) -> Result<SaveRequest> {
        if !self.is_open() {
            return Err(SessionError::Closed {
                scenario_id: self.scenario.scenario_id,
            });
        }
        if !self.shared.state.borrow().save_enabled {
            debug!(scenario_id = self.scenario.scenario_id, "nothing to save");
            return Ok(SaveRequest::NothingToSave);
        }
        self.channel.try_send_message(&EditorMessage::SaveClick)?;
        Ok(SaveRequest::Sent)
    }

    /// Tear the session down. Idempotent.
    pub fn close(&self) {
        if !self.channel.is_open() {
            return;
        }
        self.shared.state.borrow_mut().editor_loaded = false;
        self.shared.release_loading();
        self.channel.close();
        info!(scenario_id = self.scenario.scenario_id, "editor session closed");
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::GlobalLoading;
    use rra_msg::InMemoryWindow;
    use serde_json::json;

    const EDITOR: &str = "https://editor.example.org";
    const CHANNEL: &str = "rra-frontend";

    struct Fixture {
        target: Rc<InMemoryWindow>,
        host: InMemoryWindow,
        loading: Rc<GlobalLoading>,
        session: EditorSession,
    }

    fn open(project_id: u64, scenario_id: u64) -> Fixture {
        let target = Rc::new(InMemoryWindow::new());
        let host = InMemoryWindow::new();
        let loading = Rc::new(GlobalLoading::new());
        let session = EditorSession::open(
            CHANNEL,
            &target,
            Rc::new(host.clone()),
            OriginPolicy::exact(EDITOR),
            ScenarioRef {
                project_id,
                scenario_id,
            },
            loading.clone(),
        )
        .expect("session");
        Fixture {
            target,
            host,
            loading,
            session,
        }
    }

    #[test]
    fn open_pushes_settings_and_shows_loading() {
        let fx = open(42, 0);
        let posted = fx.target.take_posted();
        assert_eq!(posted.len(), 1);
        assert_eq!(
            posted[0].data,
            json!({"channelId": CHANNEL, "type": "settings", "projectId": 42, "scenarioId": 0})
        );
        assert!(fx.loading.is_visible());
        assert_eq!(fx.session.state(), SessionState::default());
    }

    #[test]
    fn loaded_triggers_settings_resend() {
        let fx = open(7, 3);
        fx.target.take_posted();
        fx.host
            .deliver(EDITOR, json!({"channelId": CHANNEL, "type": "loaded"}));
        let posted = fx.target.take_posted();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].data["type"], "settings");
        assert_eq!(posted[0].data["scenarioId"], 3);
    }

    #[test]
    fn ready_records_geometry_once() {
        let fx = open(42, 0);
        fx.host.deliver(
            EDITOR,
            json!({"channelId": CHANNEL, "type": "ready", "mapWidth": 800, "mapHeight": 600}),
        );
        fx.host.deliver(
            EDITOR,
            json!({"channelId": CHANNEL, "type": "ready", "mapWidth": 1024, "mapHeight": 768}),
        );

        let state = fx.session.state();
        assert!(state.editor_loaded);
        assert_eq!(state.editor_width, 800.0);
        assert_eq!(state.editor_height, 600.0);
        assert!(!fx.loading.is_visible());
    }

    #[test]
    fn save_status_is_last_write_wins() {
        let fx = open(42, 0);
        for enabled in [false, true] {
            fx.host.deliver(
                EDITOR,
                json!({"channelId": CHANNEL, "type": "save:status", "enabled": enabled}),
            );
        }
        assert!(fx.session.state().save_enabled);
    }

    #[test]
    fn request_save_respects_save_status() {
        let fx = open(42, 0);
        fx.target.take_posted();
        assert_eq!(
            fx.session.request_save().expect("request"),
            SaveRequest::NothingToSave
        );
        assert!(fx.target.posted().is_empty());

        fx.host.deliver(
            EDITOR,
            json!({"channelId": CHANNEL, "type": "save:status", "enabled": true}),
        );
        assert_eq!(fx.session.request_save().expect("request"), SaveRequest::Sent);
        let posted = fx.target.take_posted();
        assert_eq!(posted[0].data, json!({"channelId": CHANNEL, "type": "save:click"}));
    }

    #[test]
    fn close_releases_listener_and_loading() {
        let fx = open(42, 0);
        fx.session.close();
        fx.session.close();

        assert_eq!(fx.host.listener_count(), 0);
        assert!(!fx.loading.is_visible());
        fx.host.deliver(
            EDITOR,
            json!({"channelId": CHANNEL, "type": "ready", "mapWidth": 800, "mapHeight": 600}),
        );
        assert!(!fx.session.state().editor_loaded);
        assert!(matches!(
            fx.session.request_save(),
            Err(SessionError::Closed { scenario_id: 0 })
        ));
    }

    #[test]
    fn close_after_ready_marks_editor_unloaded() {
        let fx = open(42, 0);
        fx.host.deliver(
            EDITOR,
            json!({"channelId": CHANNEL, "type": "ready", "mapWidth": 800, "mapHeight": 600}),
        );
        fx.session.close();
        let state = fx.session.state();
        assert!(!state.editor_loaded);
        assert_eq!(state.editor_width, 800.0);
        assert_eq!(fx.loading.depth(), 0);
    }

    #[test]
    fn dropping_session_tears_down() {
        let fx = open(42, 0);
        let Fixture {
            host,
            loading,
            session,
            ..
        } = fx;
        drop(session);
        assert_eq!(host.listener_count(), 0);
        assert!(!loading.is_visible());
    }

    #[test]
    fn empty_channel_id_fails_without_touching_loading() {
        let target = Rc::new(InMemoryWindow::new());
        let loading = Rc::new(GlobalLoading::new());
        let result = EditorSession::open(
            "",
            &target,
            Rc::new(InMemoryWindow::new()),
            OriginPolicy::Any,
            ScenarioRef {
                project_id: 1,
                scenario_id: 1,
            },
            loading.clone(),
        );
        assert!(matches!(
            result,
            Err(SessionError::Messaging(rra_msg::MessagingError::EmptyChannelId))
        ));
        assert!(!loading.is_visible());
    }
}
