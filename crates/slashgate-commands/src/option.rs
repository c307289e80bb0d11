//! Parameter options and choices.
//!
//! [`OptionSpec`] is the declarative metadata attached to a handler parameter;
//! any field left unset is filled in by the binder. [`CommandOption`] is the
//! validated result that ends up on a command and in its registration payload.

use slashgate_common::error::ConstructionError;
use slashgate_common::models::{
    ChannelType, ChoiceValue, CommandChoice, CommandOptionPayload, Localizations, NumericBound,
    OptionType,
};
use slashgate_common::validation::{
    MAX_ENTRIES, validate_description, validate_length_bounds, validate_name,
};

/// Longest choice name the platform accepts.
const MAX_CHOICE_NAME_LEN: usize = 100;

/// A fixed choice offered for an option.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub name: String,
    pub value: ChoiceValue,
    pub name_localizations: Localizations,
}

impl Choice {
    /// A choice whose value is its own name.
    pub fn new(name: impl Into<String>) -> Result<Self, ConstructionError> {
        let name = name.into();
        let value = ChoiceValue::String(name.clone());
        Self::with_value(name, value)
    }

    pub fn with_value(
        name: impl Into<String>,
        value: impl Into<ChoiceValue>,
    ) -> Result<Self, ConstructionError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConstructionError::InvalidName { name });
        }
        if name.chars().count() > MAX_CHOICE_NAME_LEN {
            return Err(ConstructionError::TooLong {
                name,
                field: "choice name",
                max: MAX_CHOICE_NAME_LEN,
            });
        }
        Ok(Self {
            name,
            value: value.into(),
            name_localizations: Localizations::new(),
        })
    }

    pub fn localize(mut self, locale: impl Into<String>, name: impl Into<String>) -> Self {
        self.name_localizations.insert(locale.into(), name.into());
        self
    }

    pub fn to_wire(&self) -> CommandChoice {
        CommandChoice {
            name: self.name.clone(),
            name_localizations: non_empty(&self.name_localizations),
            value: self.value.clone(),
        }
    }
}

/// Option metadata attached to a handler parameter. Unset fields are inferred.
#[derive(Debug, Clone, Default)]
pub struct OptionSpec {
    pub name: Option<String>,
    pub description: Option<String>,
    pub kind: Option<OptionType>,
    pub required: Option<bool>,
    pub choices: Vec<Choice>,
    pub autocomplete: bool,
    pub min_value: Option<NumericBound>,
    pub max_value: Option<NumericBound>,
    pub min_length: Option<u16>,
    pub max_length: Option<u16>,
    pub channel_types: Vec<ChannelType>,
    pub name_localizations: Localizations,
    pub description_localizations: Localizations,
}

impl OptionSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Override the option type inferred from the parameter.
    pub fn kind(mut self, kind: OptionType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn choices(mut self, choices: impl IntoIterator<Item = Choice>) -> Self {
        self.choices.extend(choices);
        self
    }

    /// Mark the option as autocompleted. A callback must be registered for it.
    pub fn autocomplete(mut self) -> Self {
        self.autocomplete = true;
        self
    }

    pub fn min_value(mut self, value: NumericBound) -> Self {
        self.min_value = Some(value);
        self
    }

    pub fn max_value(mut self, value: NumericBound) -> Self {
        self.max_value = Some(value);
        self
    }

    pub fn min_length(mut self, len: u16) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: u16) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn channel_types(mut self, types: impl IntoIterator<Item = ChannelType>) -> Self {
        self.channel_types.extend(types);
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
}

/// A validated parameter option.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOption {
    pub name: String,
    pub description: String,
    pub kind: OptionType,
    pub required: bool,
    pub choices: Vec<Choice>,
    pub autocomplete: bool,
    pub min_value: Option<NumericBound>,
    pub max_value: Option<NumericBound>,
    pub min_length: Option<u16>,
    pub max_length: Option<u16>,
    pub channel_types: Vec<ChannelType>,
    pub name_localizations: Localizations,
    pub description_localizations: Localizations,
}

impl CommandOption {
    /// Build an option from a spec whose name, description, type and required
    /// flag have been resolved.
    pub fn from_spec(
        spec: OptionSpec,
        name: String,
        description: String,
        kind: OptionType,
        required: bool,
    ) -> Result<Self, ConstructionError> {
        let option = Self {
            name,
            description,
            kind,
            required,
            choices: spec.choices,
            autocomplete: spec.autocomplete,
            min_value: spec.min_value,
            max_value: spec.max_value,
            min_length: spec.min_length,
            max_length: spec.max_length,
            channel_types: spec.channel_types,
            name_localizations: spec.name_localizations,
            description_localizations: spec.description_localizations,
        };
        option.validate()?;
        Ok(option)
    }

    fn validate(&self) -> Result<(), ConstructionError> {
        validate_name(&self.name)?;
        validate_description(&self.name, &self.description)?;
        if self.kind.is_subcommand_like() {
            return Err(ConstructionError::IllegalOptionType {
                name: self.name.clone(),
                kind: match self.kind {
                    OptionType::SubCommand => "SUB_COMMAND",
                    _ => "SUB_COMMAND_GROUP",
                },
            });
        }
        validate_length_bounds(&self.name, self.min_length, self.max_length)?;
        if self.autocomplete && !self.choices.is_empty() {
            return Err(ConstructionError::ChoicesWithAutocomplete {
                name: self.name.clone(),
            });
        }
        if self.choices.len() > MAX_ENTRIES {
            return Err(ConstructionError::TooManyChoices {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    pub fn to_wire(&self) -> CommandOptionPayload {
        let is_string = self.kind == OptionType::String;
        let is_numeric = matches!(self.kind, OptionType::Integer | OptionType::Number);
        CommandOptionPayload {
            kind: self.kind,
            name: self.name.clone(),
            description: self.description.clone(),
            name_localizations: non_empty(&self.name_localizations),
            description_localizations: non_empty(&self.description_localizations),
            required: self.required.then_some(true),
            choices: (!self.choices.is_empty())
                .then(|| self.choices.iter().map(Choice::to_wire).collect()),
            options: None,
            channel_types: (self.kind == OptionType::Channel && !self.channel_types.is_empty())
                .then(|| self.channel_types.clone()),
            min_value: self.min_value.filter(|_| is_numeric),
            max_value: self.max_value.filter(|_| is_numeric),
            min_length: self.min_length.filter(|_| is_string),
            max_length: self.max_length.filter(|_| is_string),
            autocomplete: self.autocomplete.then_some(true),
        }
    }
}

pub(crate) fn non_empty(map: &Localizations) -> Option<Localizations> {
    (!map.is_empty()).then(|| map.clone())
}
