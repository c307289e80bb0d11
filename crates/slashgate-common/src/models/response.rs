//! Interaction response envelopes.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::command::{CommandChoice, wire_enum};

wire_enum! {
    InteractionResponseType {
        Pong = 1,
        ChannelMessageWithSource = 4,
        DeferredChannelMessageWithSource = 5,
        DeferredUpdateMessage = 6,
        UpdateMessage = 7,
        ApplicationCommandAutocompleteResult = 8,
        Modal = 9,
    }
}

bitflags! {
    /// Message flags settable on an interaction response.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MessageFlags: u64 {
        const SUPPRESS_EMBEDS        = 1 << 2;
        /// Only the invoking user can see the message.
        const EPHEMERAL              = 1 << 6;
        const SUPPRESS_NOTIFICATIONS = 1 << 12;
    }
}

impl Serialize for MessageFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> Deserialize<'de> for MessageFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u64::deserialize(deserializer).map(Self::from_bits_retain)
    }
}

/// The body returned for an interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: InteractionResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<CallbackData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallbackData {
    Autocomplete(AutocompleteData),
    Message(MessageData),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts: Option<bool>,
    /// Embeds are passed through untouched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<MessageFlags>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutocompleteData {
    pub choices: Vec<CommandChoice>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self { kind: InteractionResponseType::Pong, data: None }
    }

    /// Plain channel message visible to everyone.
    pub fn message(content: impl Into<String>) -> Self {
        Self::with_message(MessageData {
            content: Some(content.into()),
            ..MessageData::default()
        })
    }

    /// Channel message only the invoking user can see.
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self::with_message(MessageData {
            content: Some(content.into()),
            flags: Some(MessageFlags::EPHEMERAL),
            ..MessageData::default()
        })
    }

    pub fn with_message(data: MessageData) -> Self {
        Self {
            kind: InteractionResponseType::ChannelMessageWithSource,
            data: Some(CallbackData::Message(data)),
        }
    }

    /// "Thinking..." placeholder; the real message follows out of band.
    pub fn deferred(ephemeral: bool) -> Self {
        Self {
            kind: InteractionResponseType::DeferredChannelMessageWithSource,
            data: ephemeral.then(|| {
                CallbackData::Message(MessageData {
                    flags: Some(MessageFlags::EPHEMERAL),
                    ..MessageData::default()
                })
            }),
        }
    }

    /// Silent acknowledgement of a component or modal interaction.
    pub fn deferred_update() -> Self {
        Self { kind: InteractionResponseType::DeferredUpdateMessage, data: None }
    }

    pub fn autocomplete(choices: Vec<CommandChoice>) -> Self {
        Self {
            kind: InteractionResponseType::ApplicationCommandAutocompleteResult,
            data: Some(CallbackData::Autocomplete(AutocompleteData { choices })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pong_is_bare_type() {
        assert_eq!(serde_json::to_value(InteractionResponse::pong()).unwrap(), json!({"type": 1}));
    }

    #[test]
    fn ephemeral_sets_flag_64() {
        assert_eq!(
            serde_json::to_value(InteractionResponse::ephemeral("hi")).unwrap(),
            json!({"type": 4, "data": {"content": "hi", "flags": 64}})
        );
    }

    #[test]
    fn autocomplete_envelope() {
        assert_eq!(
            serde_json::to_value(InteractionResponse::autocomplete(vec![])).unwrap(),
            json!({"type": 8, "data": {"choices": []}})
        );
    }

    #[test]
    fn deferred_variants() {
        assert_eq!(
            serde_json::to_value(InteractionResponse::deferred(false)).unwrap(),
            json!({"type": 5})
        );
        assert_eq!(
            serde_json::to_value(InteractionResponse::deferred(true)).unwrap(),
            json!({"type": 5, "data": {"flags": 64}})
        );
        assert_eq!(
            serde_json::to_value(InteractionResponse::deferred_update()).unwrap(),
            json!({"type": 6})
        );
    }
}
