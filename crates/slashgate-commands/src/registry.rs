//! Registered command table.
//!
//! Owns every command tree of an application, partitioned into the global queue
//! and one queue per guild. After a registration fetch the table also mirrors
//! the platform-assigned metadata of each live command.

use std::collections::BTreeMap;

use async_trait::async_trait;
use slashgate_common::error::ConstructionError;
use slashgate_common::models::{ApplicationCommandData, CommandPayload, RegisteredCommand};
use slashgate_common::snowflake::Snowflake;
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::group::Node;

/// Outbound command registration API.
#[async_trait]
pub trait CommandRegistrar: Send + Sync {
    async fn get_global_commands(&self) -> anyhow::Result<Vec<RegisteredCommand>>;

    /// Replace every global command with `commands`.
    async fn bulk_override_commands(
        &self,
        commands: &[CommandPayload],
    ) -> anyhow::Result<Vec<RegisteredCommand>>;

    async fn get_guild_commands(&self, guild_id: Snowflake) -> anyhow::Result<Vec<RegisteredCommand>>;

    async fn bulk_override_guild_commands(
        &self,
        guild_id: Snowflake,
        commands: &[CommandPayload],
    ) -> anyhow::Result<Vec<RegisteredCommand>>;
}

/// Platform metadata of a registered command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveCommand {
    pub id: Snowflake,
    pub application_id: Snowflake,
    pub version: Snowflake,
}

#[derive(Debug, Default)]
pub struct CommandTable {
    global: BTreeMap<String, Node>,
    guilds: BTreeMap<Snowflake, BTreeMap<String, Node>>,
    live: BTreeMap<(Option<Snowflake>, String), LiveCommand>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root node to the queue of its guild, or the global queue.
    pub fn insert(&mut self, node: impl Into<Node>) -> Result<(), ConstructionError> {
        let node = node.into();
        if !node.is_root() {
            return Err(ConstructionError::NotRoot {
                name: node.name().to_string(),
            });
        }
        for command in node.commands() {
            for option in command.missing_autocompletes() {
                warn!(
                    command = %command.qualified_name(),
                    option,
                    "autocomplete option has no callback; it will get no suggestions"
                );
            }
        }

        let guild_id = node.guild_id();
        let queue = match guild_id {
            Some(guild) => self.guilds.entry(guild).or_default(),
            None => &mut self.global,
        };
        if queue.contains_key(node.name()) {
            return Err(ConstructionError::DuplicateName {
                parent: guild_id.map_or_else(|| "global".to_string(), |g| format!("guild {g}")),
                name: node.name().to_string(),
            });
        }
        debug!(command = %node.name(), guild = ?guild_id, "command queued");
        queue.insert(node.name().to_string(), node);
        Ok(())
    }

    /// Look up a root node, preferring the guild queue over the global one.
    pub fn get(&self, guild_id: Option<Snowflake>, name: &str) -> Option<&Node> {
        guild_id
            .and_then(|g| self.guilds.get(&g))
            .and_then(|queue| queue.get(name))
            .or_else(|| self.global.get(name))
    }

    /// The leaf command an invocation targets.
    pub fn find_leaf(
        &self,
        guild_id: Option<Snowflake>,
        data: &ApplicationCommandData,
    ) -> Option<&Command> {
        self.get(guild_id, &data.name)?.leaf_for(&data.options)
    }

    pub fn global(&self) -> impl Iterator<Item = &Node> {
        self.global.values()
    }

    pub fn guild(&self, guild_id: Snowflake) -> impl Iterator<Item = &Node> {
        self.guilds.get(&guild_id).into_iter().flat_map(BTreeMap::values)
    }

    pub fn guild_ids(&self) -> impl Iterator<Item = Snowflake> + '_ {
        self.guilds.keys().copied()
    }

    /// Number of root nodes across all queues.
    pub fn len(&self) -> usize {
        self.global.len() + self.guilds.values().map(BTreeMap::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn global_payloads(&self) -> Vec<CommandPayload> {
        self.global.values().map(Node::root_payload).collect()
    }

    pub fn guild_payloads(&self, guild_id: Snowflake) -> Vec<CommandPayload> {
        self.guild(guild_id).map(Node::root_payload).collect()
    }

    pub fn live(&self, guild_id: Option<Snowflake>, name: &str) -> Option<&LiveCommand> {
        self.live.get(&(guild_id, name.to_string()))
    }

    /// Match fetched commands to local ones by name and record their ids.
    ///
    /// Local commands the platform does not know are logged, not registered.
    /// Returns how many local commands matched.
    pub fn reconcile(&mut self, guild_id: Option<Snowflake>, remote: &[RegisteredCommand]) -> usize {
        let local: Vec<String> = match guild_id {
            Some(guild) => self.guild(guild).map(|n| n.name().to_string()).collect(),
            None => self.global.keys().cloned().collect(),
        };

        let mut matched = 0;
        for name in local {
            match remote.iter().find(|r| r.name == name) {
                Some(r) => {
                    self.live.insert(
                        (guild_id, name),
                        LiveCommand {
                            id: r.id,
                            application_id: r.application_id,
                            version: r.version,
                        },
                    );
                    matched += 1;
                }
                None => warn!(command = %name, guild = ?guild_id, "command is not registered on the platform"),
            }
        }
        matched
    }

    /// Fetch the registered commands and reconcile, without changing them.
    pub async fn refresh(&mut self, registrar: &dyn CommandRegistrar) -> anyhow::Result<()> {
        let remote = registrar.get_global_commands().await?;
        let matched = self.reconcile(None, &remote);
        info!(matched, remote = remote.len(), "global commands reconciled");

        let guilds: Vec<Snowflake> = self.guild_ids().collect();
        for guild in guilds {
            let remote = registrar.get_guild_commands(guild).await?;
            let matched = self.reconcile(Some(guild), &remote);
            info!(%guild, matched, remote = remote.len(), "guild commands reconciled");
        }
        Ok(())
    }

    /// Overwrite the platform's commands with this table, then reconcile.
    pub async fn sync(&mut self, registrar: &dyn CommandRegistrar) -> anyhow::Result<()> {
        let payloads = self.global_payloads();
        let registered = registrar.bulk_override_commands(&payloads).await?;
        info!(count = registered.len(), "global commands synchronized");
        self.reconcile(None, &registered);

        let guilds: Vec<Snowflake> = self.guild_ids().collect();
        for guild in guilds {
            let payloads = self.guild_payloads(guild);
            let registered = registrar.bulk_override_guild_commands(guild, &payloads).await?;
            info!(%guild, count = registered.len(), "guild commands synchronized");
            self.reconcile(Some(guild), &registered);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Arguments;
    use crate::context::InteractionContext;
    use crate::group::Group;
    use serde_json::json;
    use tokio::sync::Mutex;

    async fn noop(_ctx: InteractionContext, _args: Arguments) -> anyhow::Result<()> {
        Ok(())
    }

    fn cmd(name: &str) -> Command {
        Command::new(name, "...", vec![], noop).unwrap()
    }

    fn registered(id: u64, name: &str) -> RegisteredCommand {
        RegisteredCommand {
            id: Snowflake::new(id),
            application_id: Snowflake::new(1),
            name: name.to_string(),
            description: "...".into(),
            kind: slashgate_common::models::CommandType::ChatInput,
            guild_id: None,
            version: Snowflake::new(id + 1),
        }
    }

    /// Echoes overwritten commands back with sequential ids.
    #[derive(Default)]
    struct FakeRegistrar {
        overwritten: Mutex<Vec<(Option<Snowflake>, Vec<String>)>>,
    }

    #[async_trait]
    impl CommandRegistrar for FakeRegistrar {
        async fn get_global_commands(&self) -> anyhow::Result<Vec<RegisteredCommand>> {
            Ok(vec![registered(100, "ping")])
        }

        async fn bulk_override_commands(
            &self,
            commands: &[CommandPayload],
        ) -> anyhow::Result<Vec<RegisteredCommand>> {
            let names: Vec<String> = commands.iter().map(|c| c.name.clone()).collect();
            self.overwritten.lock().await.push((None, names));
            Ok(commands
                .iter()
                .enumerate()
                .map(|(i, c)| registered(200 + i as u64, &c.name))
                .collect())
        }

        async fn get_guild_commands(&self, _guild_id: Snowflake) -> anyhow::Result<Vec<RegisteredCommand>> {
            Ok(Vec::new())
        }

        async fn bulk_override_guild_commands(
            &self,
            guild_id: Snowflake,
            commands: &[CommandPayload],
        ) -> anyhow::Result<Vec<RegisteredCommand>> {
            let names: Vec<String> = commands.iter().map(|c| c.name.clone()).collect();
            self.overwritten.lock().await.push((Some(guild_id), names));
            Ok(commands.iter().map(|c| registered(300, &c.name)).collect())
        }
    }

    #[test]
    fn guild_queue_shadows_global() {
        let mut table = CommandTable::new();
        table.insert(cmd("ping")).unwrap();
        table
            .insert(Command::new("ping", "guild ping", vec![], noop).unwrap().guild(Snowflake::new(5)))
            .unwrap();

        let in_guild = table.get(Some(Snowflake::new(5)), "ping").unwrap();
        assert_eq!(in_guild.guild_id(), Some(Snowflake::new(5)));
        let elsewhere = table.get(Some(Snowflake::new(6)), "ping").unwrap();
        assert_eq!(elsewhere.guild_id(), None);
        assert!(table.get(None, "ghost").is_none());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn duplicate_roots_are_rejected() {
        let mut table = CommandTable::new();
        table.insert(cmd("ping")).unwrap();
        assert!(matches!(
            table.insert(cmd("ping")),
            Err(ConstructionError::DuplicateName { .. })
        ));
    }

    #[test]
    fn find_leaf_walks_groups() {
        let mut table = CommandTable::new();
        table
            .insert(Group::new("buy", "b").unwrap().with(cmd("apple")).unwrap())
            .unwrap();
        let data: ApplicationCommandData = serde_json::from_value(json!({
            "id": "1", "name": "buy", "options": [{"name": "apple", "type": 1}]
        }))
        .unwrap();
        assert_eq!(table.find_leaf(None, &data).map(Command::qualified_name), Some("buy apple".into()));
    }

    #[test]
    fn reconcile_records_matches_only() {
        let mut table = CommandTable::new();
        table.insert(cmd("ping")).unwrap();
        table.insert(cmd("local-only")).unwrap();

        let matched = table.reconcile(None, &[registered(100, "ping"), registered(101, "remote-only")]);
        assert_eq!(matched, 1);
        let live = table.live(None, "ping").unwrap();
        assert_eq!(live.id, Snowflake::new(100));
        assert_eq!(live.version, Snowflake::new(101));
        assert!(table.live(None, "local-only").is_none());
    }

    #[tokio::test]
    async fn sync_overwrites_each_queue() {
        let mut table = CommandTable::new();
        table.insert(cmd("ping")).unwrap();
        table.insert(cmd("admin").guild(Snowflake::new(9))).unwrap();

        let registrar = FakeRegistrar::default();
        table.sync(&registrar).await.unwrap();

        let calls = registrar.overwritten.lock().await.clone();
        assert_eq!(
            calls,
            vec![
                (None, vec!["ping".to_string()]),
                (Some(Snowflake::new(9)), vec!["admin".to_string()]),
            ]
        );
        assert_eq!(table.live(None, "ping").map(|l| l.id), Some(Snowflake::new(200)));
        assert_eq!(table.live(Some(Snowflake::new(9)), "admin").map(|l| l.id), Some(Snowflake::new(300)));
    }

    #[tokio::test]
    async fn refresh_only_reads() {
        let mut table = CommandTable::new();
        table.insert(cmd("ping")).unwrap();
        let registrar = FakeRegistrar::default();
        table.refresh(&registrar).await.unwrap();
        assert!(registrar.overwritten.lock().await.is_empty());
        assert_eq!(table.live(None, "ping").map(|l| l.id), Some(Snowflake::new(100)));
    }
}
