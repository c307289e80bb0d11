//! Parameter binding.
//!
//! A handler declares its parameters explicitly: a name, a semantic type and
//! optional [`OptionSpec`] metadata. At definition time [`derive_options`] turns
//! that list into the command's wire options. At invocation time [`bind`] picks
//! each parameter's value out of the resolved namespace.

use slashgate_common::error::ConstructionError;
use slashgate_common::models::{ChannelType, OptionType};
use tracing::warn;

use crate::namespace::{Namespace, OptionValue, normalize_key};
use crate::option::{CommandOption, OptionSpec};

/// Placeholder description for options that do not set one.
pub const DEFAULT_DESCRIPTION: &str = "...";

/// Semantic type of a handler parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    Str,
    User,
    /// Guild member; binds as a USER option.
    Member,
    Role,
    /// Any channel, or one specific channel kind.
    Channel(Option<ChannelType>),
    Mentionable,
    Attachment,
    /// A type with no option mapping. Bound as STRING.
    Other(&'static str),
}

impl ParamKind {
    /// Wire option type for this parameter type, if one exists.
    pub fn option_type(self) -> Option<OptionType> {
        match self {
            Self::Bool => Some(OptionType::Boolean),
            Self::Int => Some(OptionType::Integer),
            Self::Float => Some(OptionType::Number),
            Self::Str => Some(OptionType::String),
            Self::User | Self::Member => Some(OptionType::User),
            Self::Role => Some(OptionType::Role),
            Self::Channel(_) => Some(OptionType::Channel),
            Self::Mentionable => Some(OptionType::Mentionable),
            Self::Attachment => Some(OptionType::Attachment),
            Self::Other(_) => None,
        }
    }
}

/// A declared handler parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamKind,
    /// Whether the handler supplies its own default for this parameter.
    pub has_default: bool,
    /// `None` for parameters that are not command options (e.g. the context).
    pub option: Option<OptionSpec>,
}

impl Parameter {
    /// A command option parameter with no handler-side default.
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            has_default: false,
            option: Some(OptionSpec::default()),
        }
    }

    /// A parameter that is not exposed as an option.
    pub fn context(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Other("context"),
            has_default: false,
            option: None,
        }
    }

    /// The handler provides a default, so the option is optional unless the
    /// attached `OptionSpec` says otherwise.
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    pub fn with_option(mut self, spec: OptionSpec) -> Self {
        self.option = Some(spec);
        self
    }
}

/// Where a parameter's value comes from in the namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub param: String,
    /// Normalized namespace key of the option.
    pub key: String,
    pub has_default: bool,
}

/// Derive wire options from a parameter list, in declaration order.
///
/// Returns the options together with the namespace bindings used at
/// invocation time.
pub fn derive_options(
    command: &str,
    params: &[Parameter],
) -> Result<(Vec<CommandOption>, Vec<Binding>), ConstructionError> {
    let mut options = Vec::new();
    let mut bindings = Vec::new();
    let mut seen_optional: Option<&str> = None;

    for param in params {
        let Some(spec) = param.option.clone() else {
            continue;
        };

        let kind = match spec.kind.or_else(|| param.kind.option_type()) {
            Some(kind) => kind,
            None => {
                warn!(
                    command,
                    parameter = %param.name,
                    ty = ?param.kind,
                    "parameter type has no option mapping, registering as STRING"
                );
                OptionType::String
            }
        };
        let name = spec.name.clone().unwrap_or_else(|| param.name.clone());
        let description = spec
            .description
            .clone()
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());
        let required = spec.required.unwrap_or(!param.has_default);

        let mut spec = spec;
        if let ParamKind::Channel(Some(channel)) = param.kind {
            if spec.channel_types.is_empty() {
                spec.channel_types.push(channel);
            }
        }

        let option = CommandOption::from_spec(spec, name, description, kind, required)?;

        if option.required {
            if let Some(optional) = seen_optional {
                tracing::debug!(command, optional, "required option after optional");
                return Err(ConstructionError::RequiredAfterOptional {
                    command: command.to_string(),
                    name: option.name,
                });
            }
        } else if seen_optional.is_none() {
            seen_optional = Some(param.name.as_str());
        }

        bindings.push(Binding {
            param: param.name.clone(),
            key: normalize_key(&option.name),
            has_default: param.has_default,
        });
        options.push(option);
    }

    Ok((options, bindings))
}

/// Values bound to a handler's parameters.
///
/// Parameters without a handler default are positional; parameters with one are
/// passed by keyword. Parameters absent from the namespace are not passed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    positional: Vec<(String, OptionValue)>,
    keyword: Vec<(String, OptionValue)>,
}

impl Arguments {
    pub fn positional(&self) -> &[(String, OptionValue)] {
        &self.positional
    }

    pub fn keyword(&self) -> &[(String, OptionValue)] {
        &self.keyword
    }

    /// Value bound to a parameter, by parameter name.
    pub fn get(&self, param: &str) -> Option<&OptionValue> {
        self.positional
            .iter()
            .chain(&self.keyword)
            .find(|(name, _)| name == param)
            .map(|(_, value)| value)
    }

    /// Like [`get`](Self::get) but an error when the value is missing.
    pub fn require(&self, param: &str) -> anyhow::Result<&OptionValue> {
        self.get(param)
            .ok_or_else(|| anyhow::anyhow!("missing argument {param:?}"))
    }

    pub fn str(&self, param: &str) -> Option<&str> {
        self.get(param).and_then(OptionValue::as_str)
    }

    pub fn int(&self, param: &str) -> Option<i64> {
        self.get(param).and_then(OptionValue::as_i64)
    }

    pub fn float(&self, param: &str) -> Option<f64> {
        self.get(param).and_then(OptionValue::as_f64)
    }

    pub fn bool(&self, param: &str) -> Option<bool> {
        self.get(param).and_then(OptionValue::as_bool)
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bind parameters against a resolved namespace.
pub fn bind(bindings: &[Binding], namespace: &Namespace) -> Arguments {
    let mut args = Arguments::default();
    for binding in bindings {
        let Some(value) = namespace.get(&binding.key) else {
            continue;
        };
        let entry = (binding.param.clone(), value.clone());
        if binding.has_default {
            args.keyword.push(entry);
        } else {
            args.positional.push(entry);
        }
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::resolve;
    use slashgate_common::models::{ApplicationCommandData, InteractionType};
    use serde_json::json;

    fn params() -> Vec<Parameter> {
        vec![
            Parameter::context("ctx"),
            Parameter::new("name", ParamKind::Str),
            Parameter::new("fav_fruit", ParamKind::Str)
                .with_option(OptionSpec::new().name("fav-fruit").description("Favourite fruit")),
            Parameter::new("quantity", ParamKind::Int).with_default(),
        ]
    }

    #[test]
    fn options_follow_declaration_order_and_defaults() {
        let (options, bindings) = derive_options("buy", &params()).unwrap();
        let summary: Vec<_> = options
            .iter()
            .map(|o| (o.name.as_str(), o.kind, o.required, o.description.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("name", OptionType::String, true, DEFAULT_DESCRIPTION),
                ("fav-fruit", OptionType::String, true, "Favourite fruit"),
                ("quantity", OptionType::Integer, false, DEFAULT_DESCRIPTION),
            ]
        );
        assert_eq!(bindings[1].key, "fav_fruit");
    }

    #[test]
    fn semantic_types_map_to_option_types() {
        let cases = [
            (ParamKind::Bool, OptionType::Boolean),
            (ParamKind::Float, OptionType::Number),
            (ParamKind::Member, OptionType::User),
            (ParamKind::Role, OptionType::Role),
            (ParamKind::Channel(None), OptionType::Channel),
            (ParamKind::Mentionable, OptionType::Mentionable),
            (ParamKind::Other("Duration"), OptionType::String),
        ];
        for (kind, expected) in cases {
            let (options, _) = derive_options("t", &[Parameter::new("p", kind)]).unwrap();
            assert_eq!(options[0].kind, expected, "{kind:?}");
        }
    }

    #[test]
    fn channel_subtype_restricts_channel_types() {
        let params = [Parameter::new("target", ParamKind::Channel(Some(ChannelType::GuildVoice)))];
        let (options, _) = derive_options("join", &params).unwrap();
        assert_eq!(options[0].channel_types, vec![ChannelType::GuildVoice]);

        let explicit = [Parameter::new("target", ParamKind::Channel(Some(ChannelType::GuildVoice)))
            .with_option(OptionSpec::new().channel_types([ChannelType::GuildStageVoice]))];
        let (options, _) = derive_options("join", &explicit).unwrap();
        assert_eq!(options[0].channel_types, vec![ChannelType::GuildStageVoice]);
    }

    #[test]
    fn explicit_required_overrides_inference() {
        let params = [Parameter::new("note", ParamKind::Str)
            .with_default()
            .with_option(OptionSpec::new().required(true))];
        let (options, bindings) = derive_options("t", &params).unwrap();
        assert!(options[0].required);
        assert!(bindings[0].has_default);
    }

    #[test]
    fn required_after_optional_is_rejected() {
        let params = [
            Parameter::new("a", ParamKind::Str).with_default(),
            Parameter::new("b", ParamKind::Str),
        ];
        assert_eq!(
            derive_options("t", &params).unwrap_err(),
            ConstructionError::RequiredAfterOptional { command: "t".into(), name: "b".into() }
        );
    }

    #[test]
    fn binds_positional_and_keyword_by_default_presence() {
        let (_, bindings) = derive_options("buy", &params()).unwrap();
        let data: ApplicationCommandData = serde_json::from_value(json!({
            "id": "1",
            "name": "buy",
            "options": [
                {"name": "name", "type": 3, "value": "Alice"},
                {"name": "fav-fruit", "type": 3, "value": "Mango"},
                {"name": "quantity", "type": 4, "value": 2}
            ]
        }))
        .unwrap();
        let ns = resolve(InteractionType::ApplicationCommand, &data);
        let args = bind(&bindings, &ns);

        let positional: Vec<_> = args.positional().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(positional, vec!["name", "fav_fruit"]);
        assert_eq!(args.keyword().len(), 1);
        assert_eq!(args.str("fav_fruit"), Some("Mango"));
        assert_eq!(args.int("quantity"), Some(2));
    }

    #[test]
    fn absent_values_are_not_passed() {
        let (_, bindings) = derive_options("buy", &params()).unwrap();
        let data: ApplicationCommandData = serde_json::from_value(json!({
            "id": "1",
            "name": "buy",
            "options": [{"name": "name", "type": 3, "value": "Alice"}]
        }))
        .unwrap();
        let args = bind(&bindings, &resolve(InteractionType::ApplicationCommand, &data));
        assert_eq!(args.len(), 1);
        assert!(args.get("quantity").is_none());
        assert!(args.require("quantity").is_err());
    }
}
