//! ---
//! rra_section: "02-messaging-ipc-data-model"
//! rra_subsection: "module"
//! rra_type: "source"
//! rra_scope: "code"
//! rra_description: "Cross-frame envelope schema and messaging channel."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{MessagingError, Result};

/// Key-value body carried next to the envelope header.
pub type Payload = serde_json::Map<String, JsonValue>;

/// Wire name of the channel id field.
pub const CHANNEL_ID_FIELD: &str = "channelId";
/// Wire name of the message type field.
pub const TYPE_FIELD: &str = "type";

/// Unit exchanged over a channel: `{ channelId, type, ...payload }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Channel the envelope belongs to.
    #[serde(rename = "channelId")]
    pub channel_id: String,
    /// Message type used for dispatch.
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific fields, flattened next to the header.
    #[serde(flatten)]
    pub payload: Payload,
}

/// Why an inbound message never reached a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DropReason {
    /// The message body was not a JSON object.
    NotAnObject,
    /// `type` was absent, empty or not a string.
    MissingType,
    /// `channelId` was absent or not a string.
    MissingChannelId,
    /// `channelId` named a different channel.
    ChannelMismatch,
    /// The message came from an origin the channel does not trust.
    ForeignOrigin,
}

impl Envelope {
    /// Build an envelope.
    ///
    /// A payload carrying `channelId` or `type` is rejected rather than merged,
    /// so the wire form always holds every payload field next to the header.
    pub fn new(channel_id: impl Into<String>, kind: impl Into<String>, payload: Payload) -> Result<Self> {
        if let Some(field) = [CHANNEL_ID_FIELD, TYPE_FIELD]
            .into_iter()
            .find(|field| payload.contains_key(*field))
        {
            return Err(MessagingError::ReservedField(field.to_owned()));
        }
        Ok(Self {
            channel_id: channel_id.into(),
            kind: kind.into(),
            payload,
        })
    }

    /// Decode a raw inbound message.
    pub fn decode(data: &JsonValue) -> std::result::Result<Self, DropReason> {
        let JsonValue::Object(fields) = data else {
            return Err(DropReason::NotAnObject);
        };
        let kind = match fields.get(TYPE_FIELD) {
            Some(JsonValue::String(kind)) if !kind.is_empty() => kind.clone(),
            _ => return Err(DropReason::MissingType),
        };
        let channel_id = match fields.get(CHANNEL_ID_FIELD) {
            Some(JsonValue::String(id)) => id.clone(),
            _ => return Err(DropReason::MissingChannelId),
        };
        let payload = fields
            .iter()
            .filter(|(key, _)| key.as_str() != TYPE_FIELD && key.as_str() != CHANNEL_ID_FIELD)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(Self {
            channel_id,
            kind,
            payload,
        })
    }

    /// Wire representation of the envelope.
    pub fn to_value(&self) -> JsonValue {
        let mut fields = Payload::new();
        fields.insert(
            CHANNEL_ID_FIELD.to_owned(),
            JsonValue::String(self.channel_id.clone()),
        );
        fields.insert(TYPE_FIELD.to_owned(), JsonValue::String(self.kind.clone()));
        fields.extend(self.payload.clone());
        JsonValue::Object(fields)
    }

    /// Message type, when it belongs to the known vocabulary.
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_str(&self.kind).ok()
    }
}

/// Message types understood by the host and the editor.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::AsRefStr,
    strum::Display,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
pub enum MessageType {
    /// host -> editor: session parameters.
    #[strum(serialize = "settings")]
    Settings,
    /// editor -> host: the editor booted and can take settings.
    #[strum(serialize = "loaded")]
    Loaded,
    /// editor -> host: the map is rendered, carries its geometry.
    #[strum(serialize = "ready")]
    Ready,
    /// editor -> host: whether there is anything to save.
    #[strum(serialize = "save:status")]
    SaveStatus,
    /// host -> editor: the user asked to save.
    #[strum(serialize = "save:click")]
    SaveClick,
}

impl MessageType {
    /// Wire name of the type.
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Payload of [`MessageType::Settings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Project being edited.
    pub project_id: u64,
    /// Scenario being edited.
    pub scenario_id: u64,
}

/// Payload of [`MessageType::Ready`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ready {
    /// Rendered map width in pixels.
    pub map_width: f64,
    /// Rendered map height in pixels.
    pub map_height: f64,
}

/// Payload of [`MessageType::SaveStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveStatus {
    /// Whether the editor has unsaved changes.
    pub enabled: bool,
}

/// Typed view over an [`Envelope`].
#[derive(Debug, Clone, PartialEq)]
pub enum EditorMessage {
    /// See [`MessageType::Settings`].
    Settings(Settings),
    /// See [`MessageType::Loaded`].
    Loaded,
    /// See [`MessageType::Ready`].
    Ready(Ready),
    /// See [`MessageType::SaveStatus`].
    SaveStatus(SaveStatus),
    /// See [`MessageType::SaveClick`].
    SaveClick,
    /// A type outside the known vocabulary, kept verbatim.
    Unknown {
        /// Wire type name.
        kind: String,
        /// Untouched payload.
        payload: Payload,
    },
}

fn decode_payload<T>(kind: MessageType, payload: &Payload) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(JsonValue::Object(payload.clone())).map_err(|source| {
        MessagingError::Payload {
            kind: kind.to_string(),
            source,
        }
    })
}

fn encode_payload<T: Serialize>(value: &T) -> Payload {
    match serde_json::to_value(value) {
        Ok(JsonValue::Object(fields)) => fields,
        _ => Payload::new(),
    }
}

impl EditorMessage {
    /// Decode the typed message carried by `envelope`.
    ///
    /// Unknown types decode to [`EditorMessage::Unknown`]; a known type with a
    /// malformed payload is an error.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self> {
        let Some(kind) = envelope.message_type() else {
            return Ok(EditorMessage::Unknown {
                kind: envelope.kind.clone(),
                payload: envelope.payload.clone(),
            });
        };
        Ok(match kind {
            MessageType::Settings => {
                EditorMessage::Settings(decode_payload(kind, &envelope.payload)?)
            }
            MessageType::Loaded => EditorMessage::Loaded,
            MessageType::Ready => EditorMessage::Ready(decode_payload(kind, &envelope.payload)?),
            MessageType::SaveStatus => {
                EditorMessage::SaveStatus(decode_payload(kind, &envelope.payload)?)
            }
            MessageType::SaveClick => EditorMessage::SaveClick,
        })
    }

    /// Wire type name.
    pub fn kind(&self) -> &str {
        match self {
            EditorMessage::Settings(_) => MessageType::Settings.as_str(),
            EditorMessage::Loaded => MessageType::Loaded.as_str(),
            EditorMessage::Ready(_) => MessageType::Ready.as_str(),
            EditorMessage::SaveStatus(_) => MessageType::SaveStatus.as_str(),
            EditorMessage::SaveClick => MessageType::SaveClick.as_str(),
            EditorMessage::Unknown { kind, .. } => kind,
        }
    }

    /// Payload fields, without the envelope header.
    pub fn payload(&self) -> Payload {
        match self {
            EditorMessage::Settings(settings) => encode_payload(settings),
            EditorMessage::Ready(ready) => encode_payload(ready),
            EditorMessage::SaveStatus(status) => encode_payload(status),
            EditorMessage::Loaded | EditorMessage::SaveClick => Payload::new(),
            EditorMessage::Unknown { payload, .. } => payload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strum::IntoEnumIterator;

    #[test]
    fn envelope_wire_shape_is_header_plus_payload() {
        let mut payload = Payload::new();
        payload.insert("projectId".into(), json!(42));
        payload.insert("scenarioId".into(), json!(0));
        let envelope = Envelope::new("rra-frontend", "settings", payload).expect("envelope");

        assert_eq!(
            envelope.to_value(),
            json!({"channelId": "rra-frontend", "type": "settings", "projectId": 42, "scenarioId": 0})
        );
        assert_eq!(serde_json::to_value(&envelope).expect("serialize"), envelope.to_value());
    }

    #[test]
    fn payload_with_header_keys_is_rejected() {
        let mut payload = Payload::new();
        payload.insert("type".into(), json!("layer"));
        payload.insert("projectId".into(), json!(1));
        assert!(matches!(
            Envelope::new("rra-frontend", "settings", payload),
            Err(MessagingError::ReservedField(field)) if field == "type"
        ));

        let mut payload = Payload::new();
        payload.insert("channelId".into(), json!("other"));
        assert!(matches!(
            Envelope::new("rra-frontend", "save:click", payload),
            Err(MessagingError::ReservedField(field)) if field == "channelId"
        ));
    }

    #[test]
    fn decode_splits_header_from_payload() {
        let envelope = Envelope::decode(&json!({
            "channelId": "rra-frontend",
            "type": "ready",
            "mapWidth": 800,
            "mapHeight": 600
        }))
        .expect("decodes");
        assert_eq!(envelope.channel_id, "rra-frontend");
        assert_eq!(envelope.message_type(), Some(MessageType::Ready));
        assert_eq!(envelope.payload.len(), 2);
    }

    #[test]
    fn decode_reports_drop_reasons() {
        assert_eq!(Envelope::decode(&json!("ready")), Err(DropReason::NotAnObject));
        assert_eq!(
            Envelope::decode(&json!({"channelId": "a"})),
            Err(DropReason::MissingType)
        );
        assert_eq!(
            Envelope::decode(&json!({"channelId": "a", "type": ""})),
            Err(DropReason::MissingType)
        );
        assert_eq!(
            Envelope::decode(&json!({"channelId": "a", "type": 7})),
            Err(DropReason::MissingType)
        );
        assert_eq!(
            Envelope::decode(&json!({"type": "ready"})),
            Err(DropReason::MissingChannelId)
        );
        assert_eq!(DropReason::ChannelMismatch.as_ref(), "channel_mismatch");
    }

    #[test]
    fn wire_names_match_vocabulary() {
        let names: Vec<String> = MessageType::iter().map(|kind| kind.to_string()).collect();
        assert_eq!(
            names,
            ["settings", "loaded", "ready", "save:status", "save:click"]
        );
        for kind in MessageType::iter() {
            assert_eq!(MessageType::from_str(kind.as_ref()).ok(), Some(kind));
        }
    }

    #[test]
    fn typed_messages_decode_known_payloads() {
        let ready = Envelope::decode(&json!({
            "channelId": "c", "type": "ready", "mapWidth": 800, "mapHeight": 600
        }))
        .expect("decodes");
        assert_eq!(
            EditorMessage::from_envelope(&ready).expect("typed"),
            EditorMessage::Ready(Ready {
                map_width: 800.0,
                map_height: 600.0
            })
        );

        let status = Envelope::decode(&json!({"channelId": "c", "type": "save:status", "enabled": true}))
            .expect("decodes");
        assert_eq!(
            EditorMessage::from_envelope(&status).expect("typed"),
            EditorMessage::SaveStatus(SaveStatus { enabled: true })
        );
    }

    #[test]
    fn unknown_types_fall_through_verbatim() {
        let envelope = Envelope::decode(&json!({"channelId": "c", "type": "map:moved", "zoom": 4}))
            .expect("decodes");
        let message = EditorMessage::from_envelope(&envelope).expect("typed");
        assert_eq!(message.kind(), "map:moved");
        assert_eq!(message.payload().get("zoom"), Some(&json!(4)));
    }

    #[test]
    fn malformed_known_payload_is_an_error() {
        let envelope = Envelope::decode(&json!({"channelId": "c", "type": "save:status", "enabled": "yes"}))
            .expect("decodes");
        let err = EditorMessage::from_envelope(&envelope).expect_err("bad payload");
        assert!(matches!(err, MessagingError::Payload { ref kind, .. } if kind == "save:status"));
    }

    #[test]
    fn settings_payload_uses_camel_case() {
        let message = EditorMessage::Settings(Settings {
            project_id: 42,
            scenario_id: 0,
        });
        assert_eq!(message.kind(), "settings");
        assert_eq!(
            JsonValue::Object(message.payload()),
            json!({"projectId": 42, "scenarioId": 0})
        );
        assert!(EditorMessage::SaveClick.payload().is_empty());
    }
}
