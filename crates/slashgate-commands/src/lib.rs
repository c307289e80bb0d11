//! # slashgate-commands
//!
//! The command model of slashgate: options, commands and groups, the parameter
//! binder, namespace resolution, handler traits and the registered command
//! table. Transport concerns (signatures, HTTP) live in `slashgate-api`.

pub mod binder;
pub mod command;
pub mod context;
pub mod group;
pub mod handler;
pub mod namespace;
pub mod option;
pub mod plugin;
pub mod registry;

pub use binder::{Arguments, ParamKind, Parameter};
pub use command::Command;
pub use context::{InlineResponder, InteractionContext, ResponseTransport};
pub use group::{Group, Node};
pub use handler::{AutocompleteHandler, CommandHandler, ErrorHandler, InvocationError, LoadHook};
pub use namespace::{Namespace, OptionValue, ResolvedOption, resolve};
pub use option::{Choice, CommandOption, OptionSpec};
pub use plugin::{Plugin, PluginLoadError};
pub use registry::{CommandRegistrar, CommandTable, LiveCommand};
