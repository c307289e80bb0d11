//! Dispatch engine.
//!
//! ```text
//! request ─ verify ─ parse ─┬─ PING ───────────── PONG
//!                           ├─ APPLICATION_COMMAND ─ route ─ resolve ─ bind ─ invoke ─┬─ response
//!                           │                                                          └─ error chain
//!                           ├─ AUTOCOMPLETE ─ route ─ resolve ─ focused callback ─ choices
//!                           └─ COMPONENT / MODAL ─ deferred update
//! ```
//!
//! The [`Application`] is assembled once by an [`ApplicationBuilder`] and is
//! read-only afterwards, so dispatch needs no locking.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use slashgate_commands::handler::SharedErrorHandler;
use slashgate_commands::{
    Choice, Command, CommandRegistrar, CommandTable, ErrorHandler, InlineResponder,
    InteractionContext, InvocationError, Node, Plugin, PluginLoadError, resolve,
};
use slashgate_common::error::{ConstructionError, DispatchError, DispatchResult};
use slashgate_common::models::{Interaction, InteractionResponse, InteractionType};
use slashgate_common::validation::MAX_ENTRIES;
use tracing::{debug, error, info, instrument, warn};

use crate::verify::Verifier;

/// Ephemeral text shown when a command fails and nothing recovered.
pub const FAILURE_MESSAGE: &str = "Something went wrong while running this command.";

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Plugin(#[from] PluginLoadError),

    #[error("command registration failed: {0:#}")]
    Registration(#[source] anyhow::Error),
}

/// Collects commands, plugins and handlers before serving.
pub struct ApplicationBuilder {
    verifier: Verifier,
    table: CommandTable,
    plugins: Vec<Plugin>,
    error_handler: Option<SharedErrorHandler>,
    registrar: Option<(Arc<dyn CommandRegistrar>, bool)>,
}

impl ApplicationBuilder {
    /// Register a top-level command or group.
    pub fn command(mut self, node: impl Into<Node>) -> Result<Self, ConstructionError> {
        self.table.insert(node)?;
        Ok(self)
    }

    /// Plugins are loaded, in order, by [`build`](Self::build).
    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Last handler in the error chain.
    pub fn on_error(mut self, handler: impl ErrorHandler) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Reconcile with the platform during build; with `overwrite` the local
    /// commands are pushed first.
    pub fn registrar(mut self, registrar: Arc<dyn CommandRegistrar>, overwrite: bool) -> Self {
        self.registrar = Some((registrar, overwrite));
        self
    }

    pub async fn build(self) -> Result<Arc<Application>, BuildError> {
        let Self {
            verifier,
            mut table,
            plugins,
            error_handler,
            registrar,
        } = self;

        let mut loaded: Vec<String> = Vec::new();
        for plugin in plugins {
            let name = plugin.name().to_string();
            if loaded.contains(&name) {
                return Err(PluginLoadError::Duplicate(name).into());
            }
            for node in plugin.load().await? {
                let command = node.name().to_string();
                table.insert(node).map_err(|err| match err {
                    ConstructionError::DuplicateName { .. } => {
                        BuildError::Plugin(PluginLoadError::CommandConflict {
                            plugin: name.clone(),
                            command,
                        })
                    }
                    other => BuildError::Construction(other),
                })?;
            }
            loaded.push(name);
        }

        if let Some((registrar, overwrite)) = registrar {
            let outcome = if overwrite {
                table.sync(registrar.as_ref()).await
            } else {
                table.refresh(registrar.as_ref()).await
            };
            outcome.map_err(BuildError::Registration)?;
        }

        info!(commands = table.len(), plugins = loaded.len(), "application ready");
        Ok(Arc::new(Application {
            verifier,
            table,
            error_handler,
        }))
    }
}

/// A built application: verifier, command table and default error handler.
pub struct Application {
    verifier: Verifier,
    table: CommandTable,
    error_handler: Option<SharedErrorHandler>,
}

impl Application {
    pub fn builder(verifier: Verifier) -> ApplicationBuilder {
        ApplicationBuilder {
            verifier,
            table: CommandTable::new(),
            plugins: Vec::new(),
            error_handler: None,
            registrar: None,
        }
    }

    pub fn commands(&self) -> &CommandTable {
        &self.table
    }

    /// Verify, parse and dispatch one webhook request.
    ///
    /// Authentication happens before the body is parsed at all.
    pub async fn handle_webhook(
        &self,
        signature: Option<&str>,
        timestamp: Option<&str>,
        body: &[u8],
    ) -> DispatchResult<InteractionResponse> {
        let (Some(signature), Some(timestamp)) = (signature, timestamp) else {
            warn!("interaction request without signature headers");
            return Err(DispatchError::MissingSignature);
        };
        if !self.verifier.verify(body, signature, timestamp) {
            warn!("interaction request with invalid signature");
            return Err(DispatchError::InvalidSignature);
        }

        let interaction: Interaction = serde_json::from_slice(body)?;
        self.dispatch(interaction).await
    }

    /// Dispatch an already verified interaction.
    #[instrument(
        skip_all,
        fields(id = %interaction.id, kind = ?interaction.kind, guild = ?interaction.guild_id)
    )]
    pub async fn dispatch(&self, interaction: Interaction) -> DispatchResult<InteractionResponse> {
        match interaction.kind {
            InteractionType::Ping => {
                debug!("ping");
                Ok(InteractionResponse::pong())
            }
            InteractionType::ApplicationCommand => self.run_command(interaction).await,
            InteractionType::ApplicationCommandAutocomplete => {
                self.run_autocomplete(interaction).await
            }
            InteractionType::MessageComponent | InteractionType::ModalSubmit => {
                debug!(custom_id = ?interaction.custom_id(), "acknowledging unrouted interaction");
                Ok(InteractionResponse::deferred_update())
            }
        }
    }

    async fn run_command(&self, interaction: Interaction) -> DispatchResult<InteractionResponse> {
        let data = interaction.command_data().ok_or(DispatchError::MissingData)?;
        let Some(command) = self.table.find_leaf(interaction.guild_id, data) else {
            return Err(DispatchError::CommandNotFound { name: data.name.clone() });
        };
        let namespace = resolve(interaction.kind, data);

        let responder = Arc::new(InlineResponder::new());
        let ctx = InteractionContext::new(interaction, namespace, responder.clone());

        let failed = match command.invoke(ctx.clone()).await {
            Ok(()) => false,
            Err(err) => {
                self.recover(command, &ctx, err).await;
                true
            }
        };

        Ok(match responder.take().await {
            Some(response) => response,
            None if failed => InteractionResponse::ephemeral(FAILURE_MESSAGE),
            None => {
                debug!(command = %command.qualified_name(), "handler did not respond, deferring");
                InteractionResponse::deferred(false)
            }
        })
    }

    /// Route an invocation error through command → plugin → application
    /// handlers. The first one found is the only one called.
    async fn recover(&self, command: &Command, ctx: &InteractionContext, err: InvocationError) {
        let error = Arc::new(err);
        let Some(handler) = command.error_handler(self.error_handler.as_ref()) else {
            error!(command = %error.command, error = %error.source, "unhandled command error");
            return;
        };

        match AssertUnwindSafe(handler.call(ctx.clone(), error.clone()))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => debug!(command = %error.command, "command error handled"),
            Ok(Err(handler_err)) => error!(
                command = %error.command,
                error = %error.source,
                handler_error = %handler_err,
                "error handler failed"
            ),
            Err(_) => error!(command = %error.command, "error handler panicked"),
        }
    }

    async fn run_autocomplete(&self, interaction: Interaction) -> DispatchResult<InteractionResponse> {
        let data = interaction.command_data().ok_or(DispatchError::MissingData)?;
        let Some(command) = self.table.find_leaf(interaction.guild_id, data) else {
            warn!(command = %data.name, "autocomplete for unregistered command");
            return Ok(InteractionResponse::autocomplete(Vec::new()));
        };
        let namespace = resolve(interaction.kind, data);
        let focused = namespace.focused().ok().flatten().cloned();

        let responder = Arc::new(InlineResponder::new());
        let ctx = InteractionContext::new(interaction, namespace, responder.clone());

        let mut choices = match focused {
            Some(focused) => command
                .invoke_autocomplete(ctx, focused)
                .await
                .unwrap_or_default(),
            None => Vec::new(),
        };

        // A callback that answered through the context wins.
        if let Some(response) = responder.take().await {
            return Ok(response);
        }
        if choices.len() > MAX_ENTRIES {
            warn!(
                command = %command.qualified_name(),
                offered = choices.len(),
                "too many autocomplete choices, truncating"
            );
            choices.truncate(MAX_ENTRIES);
        }
        Ok(InteractionResponse::autocomplete(
            choices.iter().map(Choice::to_wire).collect(),
        ))
    }
}
