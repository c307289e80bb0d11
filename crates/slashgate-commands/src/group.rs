//! Command groups and the command tree.
//!
//! Trees are at most two levels of grouping deep:
//!
//! ```text
//! root group ── sub-group ── sub-command
//!            └─ sub-command
//! ```
//!
//! A root group serializes as a chat-input command, a nested group as
//! SUB_COMMAND_GROUP and any command under a group as SUB_COMMAND.

use std::collections::BTreeMap;

use slashgate_common::error::ConstructionError;
use slashgate_common::models::{
    CommandOptionPayload, CommandPayload, CommandType, InteractionDataOption, Localizations,
    OptionType, WirePayload,
};
use slashgate_common::permissions::Permissions;
use slashgate_common::snowflake::Snowflake;
use slashgate_common::validation::{MAX_ENTRIES, validate_description, validate_name};

use crate::command::{Command, PluginRef};
use crate::namespace::normalize_key;
use crate::option::non_empty;

/// A named container of commands.
#[derive(Debug, Clone)]
pub struct Group {
    name: String,
    description: String,
    guild_id: Option<Snowflake>,
    name_localizations: Localizations,
    description_localizations: Localizations,
    default_member_permissions: Option<Permissions>,
    guild_only: Option<bool>,
    nsfw: Option<bool>,
    parent: Option<String>,
    children: BTreeMap<String, Node>,
}

/// Any node of a command tree.
#[derive(Debug, Clone)]
pub enum Node {
    Command(Command),
    Group(Group),
}

impl From<Command> for Node {
    fn from(command: Command) -> Self {
        Self::Command(command)
    }
}

impl From<Group> for Node {
    fn from(group: Group) -> Self {
        Self::Group(group)
    }
}

impl Group {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, ConstructionError> {
        let name = name.into();
        let description = description.into();
        validate_name(&name)?;
        validate_description(&name, &description)?;
        Ok(Self {
            name,
            description,
            guild_id: None,
            name_localizations: Localizations::new(),
            description_localizations: Localizations::new(),
            default_member_permissions: None,
            guild_only: None,
            nsfw: None,
            parent: None,
            children: BTreeMap::new(),
        })
    }

    pub fn guild(mut self, guild_id: Snowflake) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    pub fn localize_name(mut self, locale: impl Into<String>, name: impl Into<String>) -> Self {
        self.name_localizations.insert(locale.into(), name.into());
        self
    }

    pub fn localize_description(
        mut self,
        locale: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.description_localizations
            .insert(locale.into(), description.into());
        self
    }

    pub fn default_member_permissions(mut self, permissions: Permissions) -> Self {
        self.default_member_permissions = Some(permissions);
        self
    }

    pub fn guild_only(mut self, guild_only: bool) -> Self {
        self.guild_only = Some(guild_only);
        self
    }

    pub fn nsfw(mut self, nsfw: bool) -> Self {
        self.nsfw = Some(nsfw);
        self
    }

    /// Builder form of [`add`](Self::add).
    pub fn with(mut self, child: impl Into<Node>) -> Result<Self, ConstructionError> {
        self.add(child)?;
        Ok(self)
    }

    /// Add a command or sub-group.
    ///
    /// Fails when the group is full, the name is taken, the nesting limit would
    /// be exceeded, or the child sets fields only a root may carry.
    pub fn add(&mut self, child: impl Into<Node>) -> Result<(), ConstructionError> {
        let mut child = child.into();

        if self.children.len() >= MAX_ENTRIES {
            return Err(ConstructionError::CapacityExceeded {
                parent: self.qualified_name(),
                max: MAX_ENTRIES,
            });
        }
        let key = normalize_key(child.name());
        if self.children.keys().any(|name| normalize_key(name) == key) {
            return Err(ConstructionError::DuplicateName {
                parent: self.qualified_name(),
                name: child.name().to_string(),
            });
        }
        if let Node::Group(group) = &child {
            let grandchild_group = group.children.values().find_map(|c| match c {
                Node::Group(g) => Some(g.name.clone()),
                Node::Command(_) => None,
            });
            if self.parent.is_some() || grandchild_group.is_some() {
                return Err(ConstructionError::NestingTooDeep {
                    parent: self.qualified_name(),
                    child: grandchild_group.unwrap_or_else(|| group.name.clone()),
                });
            }
        }
        if child.guild_id().is_some() {
            return Err(ConstructionError::TopLevelOnly {
                name: child.name().to_string(),
                field: "guild_id",
            });
        }

        child.set_parent(self.qualified_name());
        self.children.insert(child.name().to_string(), child);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn guild_id(&self) -> Option<Snowflake> {
        self.guild_id
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.values()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn qualified_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{parent} {}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn dm_permission(&self) -> bool {
        !self.guild_only.unwrap_or(false)
    }

    pub fn to_wire(&self) -> WirePayload {
        match self.parent {
            Some(_) => WirePayload::Nested(self.nested_payload()),
            None => WirePayload::Root(self.root_payload()),
        }
    }

    fn child_payloads(&self) -> Vec<CommandOptionPayload> {
        self.children
            .values()
            .map(|child| match child {
                Node::Command(c) => c.nested_payload(),
                Node::Group(g) => g.nested_payload(),
            })
            .collect()
    }

    pub(crate) fn root_payload(&self) -> CommandPayload {
        CommandPayload {
            name: self.name.clone(),
            kind: CommandType::ChatInput,
            description: self.description.clone(),
            options: self.child_payloads(),
            guild_id: self.guild_id,
            name_localizations: non_empty(&self.name_localizations),
            description_localizations: non_empty(&self.description_localizations),
            default_member_permissions: self.default_member_permissions,
            dm_permission: Some(self.dm_permission()),
            nsfw: self.nsfw,
        }
    }

    pub(crate) fn nested_payload(&self) -> CommandOptionPayload {
        CommandOptionPayload {
            kind: OptionType::SubCommandGroup,
            name: self.name.clone(),
            description: self.description.clone(),
            name_localizations: None,
            description_localizations: None,
            required: None,
            choices: None,
            options: Some(self.child_payloads()),
            channel_types: None,
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            autocomplete: None,
        }
    }
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Self::Command(c) => c.name(),
            Self::Group(g) => g.name(),
        }
    }

    pub fn guild_id(&self) -> Option<Snowflake> {
        match self {
            Self::Command(c) => c.guild_id(),
            Self::Group(g) => g.guild_id(),
        }
    }

    pub fn is_root(&self) -> bool {
        match self {
            Self::Command(c) => c.parent().is_none(),
            Self::Group(g) => g.parent().is_none(),
        }
    }

    pub fn to_wire(&self) -> WirePayload {
        match self {
            Self::Command(c) => c.to_wire(),
            Self::Group(g) => g.to_wire(),
        }
    }

    /// Registration payload of a root node.
    pub fn root_payload(&self) -> CommandPayload {
        match self {
            Self::Command(c) => c.root_payload(),
            Self::Group(g) => g.root_payload(),
        }
    }

    /// Every leaf command under this node, depth first.
    pub fn commands(&self) -> Vec<&Command> {
        match self {
            Self::Command(c) => vec![c],
            Self::Group(g) => g.children().flat_map(Node::commands).collect(),
        }
    }

    /// The leaf command targeted by an invocation's option tree.
    ///
    /// Groups descend through the first option, which must be the invoked
    /// sub-command or sub-command group.
    pub fn leaf_for(&self, options: &[InteractionDataOption]) -> Option<&Command> {
        match self {
            Self::Command(c) => Some(c),
            Self::Group(g) => {
                let invoked = options.first().filter(|o| o.kind.is_subcommand_like())?;
                g.get(&invoked.name)?.leaf_for(&invoked.options)
            }
        }
    }

    fn set_parent(&mut self, parent: String) {
        match self {
            Self::Command(c) => c.parent = Some(parent),
            Self::Group(g) => {
                g.parent = Some(parent);
                let path = g.qualified_name();
                for child in g.children.values_mut() {
                    child.set_parent(path.clone());
                }
            }
        }
    }

    pub(crate) fn set_plugin(&mut self, plugin: &PluginRef) {
        match self {
            Self::Command(c) => c.plugin = Some(plugin.clone()),
            Self::Group(g) => g.children.values_mut().for_each(|c| c.set_plugin(plugin)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::{Arguments, ParamKind, Parameter};
    use crate::context::InteractionContext;
    use serde_json::json;

    async fn noop(_ctx: InteractionContext, _args: Arguments) -> anyhow::Result<()> {
        Ok(())
    }

    fn leaf(name: &str) -> Command {
        Command::new(name, "...", vec![Parameter::new("amount", ParamKind::Int)], noop).unwrap()
    }

    fn buy_tree() -> Group {
        let fruit = Group::new("fruit", "Fruit").unwrap().with(leaf("mango")).unwrap();
        Group::new("buy", "Buy things")
            .unwrap()
            .nsfw(false)
            .with(fruit)
            .unwrap()
            .with(leaf("bread"))
            .unwrap()
    }

    #[test]
    fn nested_types_are_derived_from_position() {
        let wire = serde_json::to_value(buy_tree().to_wire()).unwrap();
        assert_eq!(wire["type"], json!(1));
        assert_eq!(wire["nsfw"], json!(false));
        let bread = &wire["options"][0];
        let fruit = &wire["options"][1];
        assert_eq!(bread["type"], json!(1));
        assert_eq!(fruit["type"], json!(2));
        assert_eq!(fruit["options"][0]["type"], json!(1));
        assert_eq!(fruit["options"][0]["options"][0]["type"], json!(4));
    }

    #[test]
    fn nested_nodes_never_carry_top_level_fields() {
        let tree = Group::new("admin", "Admin")
            .unwrap()
            .with(
                Command::new("ban", "Ban", vec![], noop)
                    .unwrap()
                    .nsfw(true)
                    .guild_only(true)
                    .default_member_permissions(Permissions::BAN_MEMBERS)
                    .localize_name("de", "bannen"),
            )
            .unwrap();
        let wire = serde_json::to_value(tree.to_wire()).unwrap();
        let ban = wire["options"][0].as_object().unwrap();
        for field in [
            "guild_id",
            "name_localizations",
            "description_localizations",
            "default_member_permissions",
            "dm_permission",
            "nsfw",
        ] {
            assert!(!ban.contains_key(field), "{field} leaked onto a nested node");
        }
    }

    #[test]
    fn nested_guild_commands_are_rejected() {
        let err = Group::new("g", "g")
            .unwrap()
            .with(leaf("c").guild(Snowflake::new(1)))
            .unwrap_err();
        assert!(matches!(err, ConstructionError::TopLevelOnly { .. }));
    }

    #[test]
    fn sub_groups_cannot_hold_groups() {
        let mut root = Group::new("root", "r").unwrap();
        root.add(Group::new("sub", "s").unwrap()).unwrap();
        let Some(Node::Group(sub)) = root.children.get_mut("sub") else {
            panic!("sub-group missing");
        };
        let err = sub.add(Group::new("deeper", "d").unwrap()).unwrap_err();
        assert!(matches!(err, ConstructionError::NestingTooDeep { .. }));

        // Same limit when a group that already has sub-groups is nested.
        let inner = Group::new("mid", "m")
            .unwrap()
            .with(Group::new("leafgroup", "l").unwrap())
            .unwrap();
        let err = Group::new("top", "t").unwrap().with(inner).unwrap_err();
        assert!(matches!(err, ConstructionError::NestingTooDeep { .. }));
    }

    #[test]
    fn groups_hold_at_most_25_children() {
        let mut group = Group::new("big", "b").unwrap();
        for i in 0..25 {
            group.add(leaf(&format!("c{i}"))).unwrap();
        }
        assert!(matches!(
            group.add(leaf("c25")),
            Err(ConstructionError::CapacityExceeded { max: 25, .. })
        ));
    }

    #[test]
    fn duplicate_children_are_rejected() {
        let err = Group::new("g", "g")
            .unwrap()
            .with(leaf("a"))
            .unwrap()
            .with(leaf("a"))
            .unwrap_err();
        assert!(matches!(err, ConstructionError::DuplicateName { .. }));
    }

    #[test]
    fn children_colliding_after_normalization_are_rejected() {
        let err = Group::new("g", "g")
            .unwrap()
            .with(leaf("clear-all"))
            .unwrap()
            .with(leaf("clear_all"))
            .unwrap_err();
        assert!(matches!(err, ConstructionError::DuplicateName { ref name, .. } if name == "clear_all"));
    }

    #[test]
    fn parents_are_qualified_paths() {
        let tree = Node::from(buy_tree());
        let names: Vec<_> = tree.commands().iter().map(|c| c.qualified_name()).collect();
        assert_eq!(names, vec!["buy bread", "buy fruit mango"]);
    }

    #[test]
    fn leaf_lookup_descends_by_invoked_names() {
        let tree = Node::from(buy_tree());
        let options: Vec<InteractionDataOption> = serde_json::from_value(json!([
            {"name": "fruit", "type": 2, "options": [
                {"name": "mango", "type": 1, "options": [{"name": "amount", "type": 4, "value": 1}]}
            ]}
        ]))
        .unwrap();
        assert_eq!(tree.leaf_for(&options).map(Command::name), Some("mango"));

        let options: Vec<InteractionDataOption> =
            serde_json::from_value(json!([{"name": "bread", "type": 1}])).unwrap();
        assert_eq!(tree.leaf_for(&options).map(Command::name), Some("bread"));

        let options: Vec<InteractionDataOption> =
            serde_json::from_value(json!([{"name": "cheese", "type": 1}])).unwrap();
        assert!(tree.leaf_for(&options).is_none());
        assert!(tree.leaf_for(&[]).is_none());
    }

    #[test]
    fn group_round_trip_keeps_child_count() {
        let group = buy_tree();
        let text = serde_json::to_string(&group.to_wire()).unwrap();
        let back: CommandPayload = serde_json::from_str(&text).unwrap();
        assert_eq!(back.options.len(), group.len());
    }
}
