//! Plugins: named bundles of commands with a shared error handler and an
//! optional async load hook.

use std::sync::Arc;

use tracing::info;

use crate::command::PluginRef;
use crate::group::Node;
use crate::handler::{ErrorHandler, LoadHook, SharedErrorHandler};

#[derive(Debug, thiserror::Error)]
pub enum PluginLoadError {
    #[error("plugin {plugin:?} failed to load: {source:#}")]
    Hook {
        plugin: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("plugin {0:?} is already loaded")]
    Duplicate(String),

    #[error("plugin {plugin:?} defines {command:?}, which is already registered")]
    CommandConflict { plugin: String, command: String },
}

pub struct Plugin {
    name: String,
    nodes: Vec<Node>,
    error_handler: Option<SharedErrorHandler>,
    on_load: Option<Arc<dyn LoadHook>>,
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("commands", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

impl Plugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            error_handler: None,
            on_load: None,
        }
    }

    /// Add a top-level command or group.
    pub fn command(mut self, node: impl Into<Node>) -> Self {
        self.nodes.push(node.into());
        self
    }

    /// Error handler for every command in this plugin that has none of its own.
    pub fn on_error(mut self, handler: impl ErrorHandler) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    pub fn on_load(mut self, hook: impl LoadHook) -> Self {
        self.on_load = Some(Arc::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Await the load hook, then hand over the plugin's commands tagged with
    /// their owning plugin.
    pub async fn load(self) -> Result<Vec<Node>, PluginLoadError> {
        if let Some(hook) = &self.on_load {
            hook.call().await.map_err(|source| PluginLoadError::Hook {
                plugin: self.name.clone(),
                source,
            })?;
        }

        let owner = PluginRef {
            name: self.name.clone(),
            error_handler: self.error_handler.clone(),
        };
        let mut nodes = self.nodes;
        for node in &mut nodes {
            node.set_plugin(&owner);
        }
        info!(plugin = %self.name, commands = nodes.len(), "plugin loaded");
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Arguments;
    use crate::command::Command;
    use crate::context::InteractionContext;
    use crate::group::Group;

    async fn noop(_ctx: InteractionContext, _args: Arguments) -> anyhow::Result<()> {
        Ok(())
    }

    async fn failing_hook() -> anyhow::Result<()> {
        anyhow::bail!("database unreachable")
    }

    async fn ok_hook() -> anyhow::Result<()> {
        Ok(())
    }

    #[tokio::test]
    async fn load_tags_every_leaf_with_the_plugin() {
        let group = Group::new("shop", "Shop")
            .unwrap()
            .with(Command::new("buy", "Buy", vec![], noop).unwrap())
            .unwrap();
        let plugin = Plugin::new("commerce")
            .command(group)
            .command(Command::new("ping", "Ping", vec![], noop).unwrap())
            .on_load(ok_hook);

        let nodes = plugin.load().await.unwrap();
        let owners: Vec<_> = nodes
            .iter()
            .flat_map(Node::commands)
            .map(|c| c.plugin())
            .collect();
        assert_eq!(owners, vec![Some("commerce"), Some("commerce")]);
    }

    #[tokio::test]
    async fn hook_failure_is_a_load_error() {
        let err = Plugin::new("broken").on_load(failing_hook).load().await.unwrap_err();
        assert!(matches!(err, PluginLoadError::Hook { ref plugin, .. } if plugin == "broken"));
        assert!(err.to_string().contains("database unreachable"));
    }
}
