//! Partial channel as delivered in resolved interaction data.

use serde::{Deserialize, Serialize};

use crate::models::command::ChannelType;
use crate::permissions::Permissions;
use crate::snowflake::Snowflake;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialChannel {
    pub id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Raw channel type. Kept as an integer so new platform channel kinds do not
    /// break interaction parsing.
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Snowflake>,
}

impl PartialChannel {
    /// The known channel type, if this build understands it.
    pub fn channel_type(&self) -> Option<ChannelType> {
        ChannelType::try_from(self.kind).ok()
    }

    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_channel_kinds_still_parse() {
        let chan: PartialChannel =
            serde_json::from_value(json!({"id": "5", "type": 99, "name": "new"})).unwrap();
        assert_eq!(chan.channel_type(), None);

        let chan: PartialChannel =
            serde_json::from_value(json!({"id": "5", "type": 2})).unwrap();
        assert_eq!(chan.channel_type(), Some(ChannelType::GuildVoice));
    }
}
