//! Inbound interaction payloads.
//!
//! An [`Interaction`] is parsed once per webhook request. Its `data` member is
//! polymorphic on the interaction type, so parsing goes through a raw form first
//! and picks the data shape from `type`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::channel::PartialChannel;
use crate::models::command::{CommandType, OptionType, wire_enum};
use crate::models::member::Member;
use crate::models::role::Role;
use crate::models::user::User;
use crate::permissions::Permissions;
use crate::snowflake::Snowflake;

wire_enum! {
    InteractionType {
        Ping = 1,
        ApplicationCommand = 2,
        MessageComponent = 3,
        ApplicationCommandAutocomplete = 4,
        ModalSubmit = 5,
    }
}

/// A verified inbound interaction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawInteraction")]
pub struct Interaction {
    pub id: Snowflake,
    pub application_id: Snowflake,
    pub kind: InteractionType,
    pub token: String,
    pub data: Option<InteractionData>,
    pub guild_id: Option<Snowflake>,
    pub channel_id: Option<Snowflake>,
    /// Invoking member, present in guilds.
    pub member: Option<Member>,
    /// Invoking user, present in DMs.
    pub user: Option<User>,
    pub locale: Option<String>,
    pub guild_locale: Option<String>,
    pub app_permissions: Option<Permissions>,
    pub version: u8,
}

/// Type-specific payload of an interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionData {
    /// Both slash command invocations and autocomplete requests.
    ApplicationCommand(ApplicationCommandData),
    MessageComponent(ComponentData),
    ModalSubmit(ModalSubmitData),
}

#[derive(Deserialize)]
struct RawInteraction {
    id: Snowflake,
    application_id: Snowflake,
    #[serde(rename = "type")]
    kind: InteractionType,
    #[serde(default)]
    token: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    guild_id: Option<Snowflake>,
    #[serde(default)]
    channel_id: Option<Snowflake>,
    #[serde(default)]
    member: Option<Member>,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    locale: Option<String>,
    #[serde(default)]
    guild_locale: Option<String>,
    #[serde(default)]
    app_permissions: Option<Permissions>,
    #[serde(default = "default_version")]
    version: u8,
}

fn default_version() -> u8 {
    1
}

impl TryFrom<RawInteraction> for Interaction {
    type Error = serde_json::Error;

    fn try_from(raw: RawInteraction) -> Result<Self, Self::Error> {
        let data = match (raw.kind, raw.data) {
            (InteractionType::Ping, _) | (_, None) => None,
            (
                InteractionType::ApplicationCommand
                | InteractionType::ApplicationCommandAutocomplete,
                Some(value),
            ) => Some(InteractionData::ApplicationCommand(serde_json::from_value(value)?)),
            (InteractionType::MessageComponent, Some(value)) => {
                Some(InteractionData::MessageComponent(serde_json::from_value(value)?))
            }
            (InteractionType::ModalSubmit, Some(value)) => {
                Some(InteractionData::ModalSubmit(serde_json::from_value(value)?))
            }
        };

        Ok(Self {
            id: raw.id,
            application_id: raw.application_id,
            kind: raw.kind,
            token: raw.token,
            data,
            guild_id: raw.guild_id,
            channel_id: raw.channel_id,
            member: raw.member,
            user: raw.user,
            locale: raw.locale,
            guild_locale: raw.guild_locale,
            app_permissions: raw.app_permissions,
            version: raw.version,
        })
    }
}

impl Interaction {
    pub fn is_ping(&self) -> bool {
        self.kind == InteractionType::Ping
    }

    pub fn is_application_command(&self) -> bool {
        self.kind == InteractionType::ApplicationCommand
    }

    pub fn is_autocomplete(&self) -> bool {
        self.kind == InteractionType::ApplicationCommandAutocomplete
    }

    pub fn is_message_component(&self) -> bool {
        self.kind == InteractionType::MessageComponent
    }

    pub fn is_modal_submit(&self) -> bool {
        self.kind == InteractionType::ModalSubmit
    }

    /// The invoking user: the member's user in guilds, `user` in DMs.
    pub fn author(&self) -> Option<&User> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
    }

    /// Command data for command and autocomplete interactions.
    pub fn command_data(&self) -> Option<&ApplicationCommandData> {
        match &self.data {
            Some(InteractionData::ApplicationCommand(data)) => Some(data),
            _ => None,
        }
    }

    /// `custom_id` of a component or modal interaction.
    pub fn custom_id(&self) -> Option<&str> {
        match &self.data {
            Some(InteractionData::MessageComponent(data)) => Some(&data.custom_id),
            Some(InteractionData::ModalSubmit(data)) => Some(&data.custom_id),
            _ => None,
        }
    }
}

/// Data of an APPLICATION_COMMAND or APPLICATION_COMMAND_AUTOCOMPLETE interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationCommandData {
    pub id: Snowflake,
    pub name: String,
    #[serde(rename = "type", default = "default_command_type")]
    pub kind: CommandType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<ResolvedData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<InteractionDataOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    /// Target of a USER or MESSAGE command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<Snowflake>,
}

fn default_command_type() -> CommandType {
    CommandType::ChatInput
}

/// One node of the inbound option tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionDataOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OptionType,
    /// Raw value. Autocomplete sends partial input here, always as typed text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<InteractionDataOption>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub focused: bool,
}

/// Entities referenced by option values, keyed by snowflake string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedData {
    #[serde(default)]
    pub users: HashMap<String, User>,
    #[serde(default)]
    pub members: HashMap<String, Member>,
    #[serde(default)]
    pub roles: HashMap<String, Role>,
    #[serde(default)]
    pub channels: HashMap<String, PartialChannel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentData {
    pub custom_id: String,
    pub component_type: u8,
    /// Selected values of a select menu.
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalSubmitData {
    pub custom_id: String,
    #[serde(default)]
    pub components: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ping_has_no_data() {
        let i: Interaction = serde_json::from_value(json!({
            "id": "1", "application_id": "2", "type": 1, "token": "t", "version": 1
        }))
        .unwrap();
        assert!(i.is_ping());
        assert!(i.data.is_none());
        assert!(i.author().is_none());
    }

    #[test]
    fn command_data_parses_nested_options() {
        let i: Interaction = serde_json::from_value(json!({
            "id": "1",
            "application_id": "2",
            "type": 2,
            "token": "t",
            "guild_id": "3",
            "member": {"user": {"id": "4", "username": "alice"}, "roles": []},
            "data": {
                "id": "5",
                "name": "buy",
                "type": 1,
                "options": [{
                    "name": "fruit",
                    "type": 2,
                    "options": [{"name": "apple", "type": 1, "options": [
                        {"name": "quantity", "type": 4, "value": 3}
                    ]}]
                }]
            }
        }))
        .unwrap();
        assert!(i.is_application_command());
        assert_eq!(i.author().map(|u| u.username.as_str()), Some("alice"));
        let data = i.command_data().unwrap();
        assert_eq!(data.name, "buy");
        assert_eq!(data.options[0].kind, OptionType::SubCommandGroup);
        assert_eq!(data.options[0].options[0].options[0].value, Some(json!(3)));
    }

    #[test]
    fn author_falls_back_to_dm_user() {
        let i: Interaction = serde_json::from_value(json!({
            "id": "1", "application_id": "2", "type": 3, "token": "t",
            "user": {"id": "9", "username": "bob"},
            "data": {"custom_id": "confirm", "component_type": 2}
        }))
        .unwrap();
        assert!(i.is_message_component());
        assert_eq!(i.custom_id(), Some("confirm"));
        assert_eq!(i.author().map(|u| u.id), Some(Snowflake::new(9)));
    }

    #[test]
    fn unknown_interaction_type_is_rejected() {
        let res = serde_json::from_value::<Interaction>(json!({
            "id": "1", "application_id": "2", "type": 42, "token": "t"
        }));
        assert!(res.is_err());
    }
}
