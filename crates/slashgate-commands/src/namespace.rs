//! Namespace resolution.
//!
//! Flattens the nested option tree of a command interaction into an ordered
//! list of typed values. Sub-command and sub-command-group layers are unwrapped
//! and recorded separately, so the value namespace only ever holds the leaf
//! command's own options.
//!
//! ```text
//! [group[sub[values..]]]  |  [sub[values..]]  |  [values..]
//! ```

use std::collections::{BTreeMap, BTreeSet};

use slashgate_common::error::NamespaceError;
use slashgate_common::models::{
    ApplicationCommandData, InteractionDataOption, InteractionType, OptionType, ResolvedData,
    Role, User,
};
use slashgate_common::snowflake::Snowflake;

/// A typed option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    /// Entity reference with no resolved stub available.
    Snowflake(Snowflake),
    User(Box<User>),
    Role(Box<Role>),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numbers, and integers widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_user(&self) -> Option<&User> {
        match self {
            Self::User(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_role(&self) -> Option<&Role> {
        match self {
            Self::Role(r) => Some(r),
            _ => None,
        }
    }

    /// Snowflake of any entity value, resolved or not.
    pub fn as_snowflake(&self) -> Option<Snowflake> {
        match self {
            Self::Snowflake(id) => Some(*id),
            Self::User(u) => Some(u.id),
            Self::Role(r) => Some(r.id),
            _ => None,
        }
    }
}

/// One flattened value option.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOption {
    /// Name as sent by the platform.
    pub name: String,
    /// Lookup key: the name with `-` replaced by `_`.
    pub key: String,
    pub kind: OptionType,
    pub value: Option<OptionValue>,
    pub focused: bool,
}

/// Flattened view of a command interaction's options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
    options: Vec<ResolvedOption>,
    invoked: BTreeSet<String>,
    groups: BTreeMap<String, InteractionDataOption>,
    autocomplete: bool,
}

/// Map an option name to its namespace key.
pub fn normalize_key(name: &str) -> String {
    name.replace('-', "_")
}

/// Resolve the option tree of `data`. Pure: the same input always yields the
/// same namespace.
pub fn resolve(kind: InteractionType, data: &ApplicationCommandData) -> Namespace {
    let mut ns = Namespace {
        autocomplete: kind == InteractionType::ApplicationCommandAutocomplete,
        ..Namespace::default()
    };
    let resolved = data.resolved.as_ref();

    for option in &data.options {
        match option.kind {
            OptionType::SubCommand => {
                ns.invoked.insert(normalize_key(&option.name));
                ns.push_values(&option.options, resolved);
            }
            OptionType::SubCommandGroup => {
                let key = normalize_key(&option.name);
                ns.invoked.insert(key.clone());
                ns.groups.insert(key, option.clone());
                for sub in &option.options {
                    ns.invoked.insert(normalize_key(&sub.name));
                    ns.push_values(&sub.options, resolved);
                }
            }
            _ => ns.push_value(option, resolved),
        }
    }
    ns
}

impl Namespace {
    fn push_values(&mut self, options: &[InteractionDataOption], resolved: Option<&ResolvedData>) {
        for option in options {
            self.push_value(option, resolved);
        }
    }

    fn push_value(&mut self, option: &InteractionDataOption, resolved: Option<&ResolvedData>) {
        let value = option
            .value
            .as_ref()
            .and_then(|raw| convert(option.kind, raw, resolved));
        self.options.push(ResolvedOption {
            name: option.name.clone(),
            key: normalize_key(&option.name),
            kind: option.kind,
            value,
            focused: option.focused,
        });
    }

    /// Value for a key. Hyphenated names are accepted too.
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.option(key).and_then(|o| o.value.as_ref())
    }

    pub fn option(&self, key: &str) -> Option<&ResolvedOption> {
        let key = normalize_key(key);
        self.options.iter().find(|o| o.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedOption> {
        self.options.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|o| o.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Whether a sub-command or sub-command group of this name was invoked.
    pub fn is_invoked(&self, name: &str) -> bool {
        self.invoked.contains(&normalize_key(name))
    }

    /// Names of every invoked sub-command and group, normalized.
    pub fn invoked(&self) -> impl Iterator<Item = &str> {
        self.invoked.iter().map(String::as_str)
    }

    /// The raw sub-command-group node of this name.
    pub fn group(&self, name: &str) -> Option<&InteractionDataOption> {
        self.groups.get(&normalize_key(name))
    }

    /// The option the user is typing into.
    ///
    /// Only autocomplete interactions have one; asking on any other
    /// interaction is an error.
    pub fn focused(&self) -> Result<Option<&ResolvedOption>, NamespaceError> {
        if !self.autocomplete {
            return Err(NamespaceError::NotAutocomplete);
        }
        Ok(self.options.iter().find(|o| o.focused))
    }
}

fn convert(
    kind: OptionType,
    raw: &serde_json::Value,
    resolved: Option<&ResolvedData>,
) -> Option<OptionValue> {
    use serde_json::Value;

    // Autocomplete sends partial input as text for every option type, so
    // anything that does not parse stays a string.
    let text = || match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if kind.is_entity() {
        let key = text();
        if let Some(entity) = resolved.and_then(|r| lookup_entity(kind, &key, r)) {
            return Some(entity);
        }
        return Some(match key.parse::<Snowflake>() {
            Ok(id) => OptionValue::Snowflake(id),
            Err(_) => OptionValue::String(key),
        });
    }

    let value = match kind {
        OptionType::String => OptionValue::String(text()),
        OptionType::Integer => raw
            .as_i64()
            .or_else(|| raw.as_str().and_then(|s| s.parse().ok()))
            .map(OptionValue::Integer)
            .unwrap_or_else(|| OptionValue::String(text())),
        OptionType::Number => raw
            .as_f64()
            .or_else(|| raw.as_str().and_then(|s| s.parse().ok()))
            .map(OptionValue::Number)
            .unwrap_or_else(|| OptionValue::String(text())),
        OptionType::Boolean => match raw {
            Value::Bool(b) => OptionValue::Boolean(*b),
            _ => OptionValue::String(text()),
        },
        // Sub-command layers carry no value of their own.
        _ => return None,
    };
    Some(value)
}

fn lookup_entity(kind: OptionType, key: &str, resolved: &ResolvedData) -> Option<OptionValue> {
    let user = || {
        resolved
            .users
            .get(key)
            .map(|u| OptionValue::User(Box::new(u.clone())))
    };
    let role = || {
        resolved
            .roles
            .get(key)
            .map(|r| OptionValue::Role(Box::new(r.clone())))
    };
    match kind {
        OptionType::User => user(),
        OptionType::Role => role(),
        OptionType::Mentionable => user().or_else(role),
        _ => None,
    }
}
