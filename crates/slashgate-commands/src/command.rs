//! Leaf commands.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use slashgate_common::error::ConstructionError;
use slashgate_common::models::{
    CommandOptionPayload, CommandPayload, CommandType, Localizations, OptionType, WirePayload,
};
use slashgate_common::permissions::Permissions;
use slashgate_common::snowflake::Snowflake;
use slashgate_common::validation::{MAX_ENTRIES, validate_description, validate_name};
use tracing::{debug, warn};

use crate::binder::{Arguments, Binding, Parameter, bind, derive_options};
use crate::context::InteractionContext;
use crate::handler::{
    AutocompleteHandler, CommandHandler, ErrorHandler, InvocationError,
    SharedAutocompleteHandler, SharedCommandHandler, SharedErrorHandler,
};
use crate::namespace::{ResolvedOption, normalize_key};
use crate::option::{Choice, CommandOption, non_empty};

/// Plugin that owns a command, with its error handler.
#[derive(Clone)]
pub struct PluginRef {
    pub name: String,
    pub error_handler: Option<SharedErrorHandler>,
}

/// An invocable command: top-level, or a sub-command inside a group.
#[derive(Clone)]
pub struct Command {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) options: Vec<CommandOption>,
    bindings: Vec<Binding>,
    pub(crate) guild_id: Option<Snowflake>,
    pub(crate) name_localizations: Localizations,
    pub(crate) description_localizations: Localizations,
    pub(crate) default_member_permissions: Option<Permissions>,
    pub(crate) guild_only: Option<bool>,
    pub(crate) nsfw: Option<bool>,
    /// Qualified name of the owning group, if nested.
    pub(crate) parent: Option<String>,
    pub(crate) plugin: Option<PluginRef>,
    handler: SharedCommandHandler,
    autocompletes: HashMap<String, SharedAutocompleteHandler>,
    error_handler: Option<SharedErrorHandler>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("options", &self.options.len())
            .field("guild_id", &self.guild_id)
            .finish_non_exhaustive()
    }
}

impl Command {
    /// Define a command from its declared parameters.
    ///
    /// Options are derived from `params` here, once; an invalid name,
    /// description or option fails immediately.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        params: Vec<Parameter>,
        handler: impl CommandHandler,
    ) -> Result<Self, ConstructionError> {
        let name = name.into();
        let description = description.into();
        validate_name(&name)?;
        validate_description(&name, &description)?;

        let (options, bindings) = derive_options(&name, &params)?;
        if options.len() > MAX_ENTRIES {
            return Err(ConstructionError::CapacityExceeded { parent: name, max: MAX_ENTRIES });
        }
        // Handlers look options up by normalized key, so `fav-fruit` and
        // `fav_fruit` would collide.
        let mut seen = std::collections::HashSet::new();
        for option in &options {
            if !seen.insert(normalize_key(&option.name)) {
                return Err(ConstructionError::DuplicateName {
                    parent: name.clone(),
                    name: option.name.clone(),
                });
            }
        }

        Ok(Self {
            name,
            description,
            options,
            bindings,
            guild_id: None,
            name_localizations: Localizations::new(),
            description_localizations: Localizations::new(),
            default_member_permissions: None,
            guild_only: None,
            nsfw: None,
            parent: None,
            plugin: None,
            handler: Arc::new(handler),
            autocompletes: HashMap::new(),
            error_handler: None,
        })
    }

    /// Register the command in one guild instead of globally.
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

    /// Hide the command in DMs.
    pub fn guild_only(mut self, guild_only: bool) -> Self {
        self.guild_only = Some(guild_only);
        self
    }

    pub fn nsfw(mut self, nsfw: bool) -> Self {
        self.nsfw = Some(nsfw);
        self
    }

    /// Command-level error handler, tried before the plugin's and the
    /// application's.
    pub fn on_error(mut self, handler: impl ErrorHandler) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Attach the autocomplete callback for one of this command's options.
    pub fn autocomplete(
        mut self,
        option: &str,
        handler: impl AutocompleteHandler,
    ) -> Result<Self, ConstructionError> {
        if !self.options.iter().any(|o| o.name == option) {
            return Err(ConstructionError::UnknownAutocompleteOption {
                command: self.name.clone(),
                option: option.to_string(),
            });
        }
        self.autocompletes.insert(option.to_string(), Arc::new(handler));
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn options(&self) -> &[CommandOption] {
        &self.options
    }

    pub fn guild_id(&self) -> Option<Snowflake> {
        self.guild_id
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn plugin(&self) -> Option<&str> {
        self.plugin.as_ref().map(|p| p.name.as_str())
    }

    /// Space-separated path from the root, as users type it.
    pub fn qualified_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{parent} {}", self.name),
            None => self.name.clone(),
        }
    }

    /// Negation of `guild_only`; commands are usable in DMs unless told otherwise.
    pub fn dm_permission(&self) -> bool {
        !self.guild_only.unwrap_or(false)
    }

    pub fn has_autocomplete(&self, option: &str) -> bool {
        self.autocompletes.contains_key(option)
    }

    /// Options flagged `autocomplete` that have no callback.
    pub(crate) fn missing_autocompletes(&self) -> impl Iterator<Item = &str> {
        self.options
            .iter()
            .filter(|o| o.autocomplete && !self.autocompletes.contains_key(&o.name))
            .map(|o| o.name.as_str())
    }

    pub fn to_wire(&self) -> WirePayload {
        match self.parent {
            Some(_) => WirePayload::Nested(self.nested_payload()),
            None => WirePayload::Root(self.root_payload()),
        }
    }

    pub(crate) fn root_payload(&self) -> CommandPayload {
        CommandPayload {
            name: self.name.clone(),
            kind: CommandType::ChatInput,
            description: self.description.clone(),
            options: self.options.iter().map(CommandOption::to_wire).collect(),
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
            kind: OptionType::SubCommand,
            name: self.name.clone(),
            description: self.description.clone(),
            name_localizations: None,
            description_localizations: None,
            required: None,
            choices: None,
            options: Some(self.options.iter().map(CommandOption::to_wire).collect()),
            channel_types: None,
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            autocomplete: None,
        }
    }

    /// Bind arguments from the context's namespace and run the handler.
    ///
    /// Handler errors and panics come back as an [`InvocationError`].
    pub async fn invoke(&self, ctx: InteractionContext) -> Result<(), InvocationError> {
        let args: Arguments = bind(&self.bindings, ctx.namespace());
        debug!(command = %self.qualified_name(), args = args.len(), "invoking command");

        let outcome = AssertUnwindSafe(self.handler.call(ctx, args))
            .catch_unwind()
            .await;

        let source = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => err,
            Err(panic) => anyhow::anyhow!("handler panicked: {}", panic_message(&*panic)),
        };
        Err(InvocationError { command: self.qualified_name(), source })
    }

    /// Run the autocomplete callback for the focused option.
    ///
    /// `None` when no callback is registered for it or the callback has
    /// nothing to offer.
    pub async fn invoke_autocomplete(
        &self,
        ctx: InteractionContext,
        focused: ResolvedOption,
    ) -> Option<Vec<Choice>> {
        let Some(handler) = self.autocompletes.get(&focused.name) else {
            debug!(command = %self.qualified_name(), option = %focused.name, "no autocomplete callback");
            return None;
        };

        match AssertUnwindSafe(handler.call(ctx, focused)).catch_unwind().await {
            Ok(choices) => choices,
            Err(panic) => {
                warn!(
                    command = %self.qualified_name(),
                    "autocomplete callback panicked: {}",
                    panic_message(&*panic)
                );
                None
            }
        }
    }

    /// First error handler in the chain command → plugin → `fallback`.
    pub fn error_handler(&self, fallback: Option<&SharedErrorHandler>) -> Option<SharedErrorHandler> {
        self.error_handler
            .clone()
            .or_else(|| self.plugin.as_ref().and_then(|p| p.error_handler.clone()))
            .or_else(|| fallback.cloned())
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::ParamKind;
    use crate::context::InlineResponder;
    use crate::context::tests::interaction;
    use crate::namespace::resolve;
    use crate::option::OptionSpec;
    use serde_json::json;

    async fn noop(_ctx: InteractionContext, _args: Arguments) -> anyhow::Result<()> {
        Ok(())
    }

    fn buy() -> Command {
        Command::new(
            "buy",
            "Buy fruit",
            vec![
                Parameter::context("ctx"),
                Parameter::new("name", ParamKind::Str),
                Parameter::new("quantity", ParamKind::Int).with_default(),
            ],
            noop,
        )
        .unwrap()
    }

    fn ctx_for(data: serde_json::Value, kind: u8) -> InteractionContext {
        let i = interaction(kind, data);
        let kind = i.kind;
        let ns = resolve(kind, i.command_data().unwrap());
        InteractionContext::new(i, ns, Arc::new(InlineResponder::new()))
    }

    #[test]
    fn root_wire_form_carries_top_level_fields() {
        let cmd = buy()
            .guild(Snowflake::new(7))
            .nsfw(true)
            .guild_only(true)
            .default_member_permissions(Permissions::MANAGE_GUILD)
            .localize_name("fr", "acheter");
        let wire = serde_json::to_value(cmd.to_wire()).unwrap();
        assert_eq!(wire["type"], json!(1));
        assert_eq!(wire["guild_id"], json!("7"));
        assert_eq!(wire["dm_permission"], json!(false));
        assert_eq!(wire["nsfw"], json!(true));
        assert_eq!(wire["default_member_permissions"], json!("32"));
        assert_eq!(wire["name_localizations"], json!({"fr": "acheter"}));
        assert!(wire.get("description_localizations").is_none());
        assert_eq!(wire["options"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn dm_permission_defaults_to_allowed() {
        assert!(buy().dm_permission());
        assert!(!buy().guild_only(true).dm_permission());
    }

    #[test]
    fn wire_round_trip_keeps_option_count() {
        let cmd = buy();
        let text = serde_json::to_string(&cmd.to_wire()).unwrap();
        let back: CommandPayload = serde_json::from_str(&text).unwrap();
        assert_eq!(back.options.len(), cmd.options().len());
    }

    #[test]
    fn invalid_definitions_fail_at_construction() {
        assert!(matches!(
            Command::new("has space", "x", vec![], noop),
            Err(ConstructionError::InvalidName { .. })
        ));
        let dupes = vec![
            Parameter::new("a", ParamKind::Str),
            Parameter::new("b", ParamKind::Str).with_option(OptionSpec::new().name("a")),
        ];
        assert!(matches!(
            Command::new("dup", "x", dupes, noop),
            Err(ConstructionError::DuplicateName { .. })
        ));
        let many: Vec<_> = (0..26).map(|i| Parameter::new(format!("p{i}"), ParamKind::Str)).collect();
        assert!(matches!(
            Command::new("many", "x", many, noop),
            Err(ConstructionError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn option_names_colliding_after_normalization_are_rejected() {
        let params = vec![
            Parameter::new("a", ParamKind::Str).with_option(OptionSpec::new().name("fav-fruit")),
            Parameter::new("b", ParamKind::Str).with_option(OptionSpec::new().name("fav_fruit")),
        ];
        let err = Command::new("pick", "x", params, noop).unwrap_err();
        assert_eq!(
            err,
            ConstructionError::DuplicateName { parent: "pick".into(), name: "fav_fruit".into() }
        );
    }

    #[test]
    fn autocomplete_requires_a_known_option() {
        let err = buy()
            .autocomplete("colour", no_suggestions)
            .unwrap_err();
        assert!(matches!(err, ConstructionError::UnknownAutocompleteOption { .. }));
    }

    async fn fail(_ctx: InteractionContext, _args: Arguments) -> anyhow::Result<()> {
        anyhow::bail!("boom")
    }

    async fn explode(_ctx: InteractionContext, _args: Arguments) -> anyhow::Result<()> {
        panic!("kaboom")
    }

    async fn echo(ctx: InteractionContext, args: Arguments) -> anyhow::Result<()> {
        let text = args.str("text").unwrap_or_default().to_string();
        ctx.respond(text).await?;
        Ok(())
    }

    async fn no_suggestions(_ctx: InteractionContext, _focused: ResolvedOption) -> Option<Vec<Choice>> {
        None
    }

    #[tokio::test]
    async fn handler_errors_become_invocation_errors() {
        let cmd = Command::new("fail", "x", vec![], fail).unwrap();
        let err = cmd
            .invoke(ctx_for(json!({"id": "1", "name": "fail"}), 2))
            .await
            .unwrap_err();
        assert_eq!(err.command, "fail");
        assert_eq!(err.source.to_string(), "boom");
    }

    #[tokio::test]
    async fn handler_panics_are_contained() {
        let cmd = Command::new("panic", "x", vec![], explode).unwrap();
        let err = cmd
            .invoke(ctx_for(json!({"id": "1", "name": "panic"}), 2))
            .await
            .unwrap_err();
        assert!(err.source.to_string().contains("kaboom"));
    }

    #[tokio::test]
    async fn handler_receives_bound_arguments() {
        let cmd = Command::new("echo", "x", vec![Parameter::new("text", ParamKind::Str)], echo).unwrap();
        let ctx = ctx_for(
            json!({"id": "1", "name": "echo", "options": [{"name": "text", "type": 3, "value": "hi"}]}),
            2,
        );
        cmd.invoke(ctx.clone()).await.unwrap();
        assert!(ctx.is_responded());
    }

    #[tokio::test]
    async fn autocomplete_without_callback_yields_none() {
        let cmd = buy();
        let ctx = ctx_for(
            json!({"id": "1", "name": "buy", "options": [
                {"name": "name", "type": 3, "value": "Al", "focused": true}
            ]}),
            4,
        );
        let focused = ctx.focused().unwrap().cloned().unwrap();
        assert!(!cmd.has_autocomplete("name"));
        assert!(cmd.invoke_autocomplete(ctx, focused).await.is_none());
    }
}
