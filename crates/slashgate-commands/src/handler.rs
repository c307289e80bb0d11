//! Handler traits.
//!
//! Handlers are stored type-erased behind `Arc<dyn ...>` and return boxed
//! futures. Async closures with the right shape implement the traits directly:
//!
//! ```ignore
//! Command::new("ping", "Pong!", vec![], |ctx: InteractionContext, _args| async move {
//!     ctx.respond("pong").await?;
//!     Ok(())
//! })?;
//! ```

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::binder::Arguments;
use crate::context::InteractionContext;
use crate::namespace::ResolvedOption;
use crate::option::Choice;

/// A failure raised by a command handler, tagged with the command.
#[derive(Debug, thiserror::Error)]
#[error("command {command:?} failed: {source:#}")]
pub struct InvocationError {
    /// Qualified command name, e.g. `buy fruit mango`.
    pub command: String,
    #[source]
    pub source: anyhow::Error,
}

/// Runs a slash command.
pub trait CommandHandler: Send + Sync + 'static {
    fn call(&self, ctx: InteractionContext, args: Arguments) -> BoxFuture<'static, anyhow::Result<()>>;
}

impl<F, Fut> CommandHandler for F
where
    F: Fn(InteractionContext, Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn call(&self, ctx: InteractionContext, args: Arguments) -> BoxFuture<'static, anyhow::Result<()>> {
        Box::pin(self(ctx, args))
    }
}

/// Produces suggestions for the focused option of an autocomplete interaction.
/// `None` means "no suggestions".
pub trait AutocompleteHandler: Send + Sync + 'static {
    fn call(&self, ctx: InteractionContext, focused: ResolvedOption) -> BoxFuture<'static, Option<Vec<Choice>>>;
}

impl<F, Fut> AutocompleteHandler for F
where
    F: Fn(InteractionContext, ResolvedOption) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<Vec<Choice>>> + Send + 'static,
{
    fn call(&self, ctx: InteractionContext, focused: ResolvedOption) -> BoxFuture<'static, Option<Vec<Choice>>> {
        Box::pin(self(ctx, focused))
    }
}

/// Recovers from an [`InvocationError`], usually by responding to the user.
pub trait ErrorHandler: Send + Sync + 'static {
    fn call(&self, ctx: InteractionContext, error: Arc<InvocationError>) -> BoxFuture<'static, anyhow::Result<()>>;
}

impl<F, Fut> ErrorHandler for F
where
    F: Fn(InteractionContext, Arc<InvocationError>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn call(&self, ctx: InteractionContext, error: Arc<InvocationError>) -> BoxFuture<'static, anyhow::Result<()>> {
        Box::pin(self(ctx, error))
    }
}

/// Plugin lifecycle hook, awaited once while the application is built.
pub trait LoadHook: Send + Sync + 'static {
    fn call(&self) -> BoxFuture<'static, anyhow::Result<()>>;
}

impl<F, Fut> LoadHook for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn call(&self) -> BoxFuture<'static, anyhow::Result<()>> {
        Box::pin(self())
    }
}

pub type SharedCommandHandler = Arc<dyn CommandHandler>;
pub type SharedAutocompleteHandler = Arc<dyn AutocompleteHandler>;
pub type SharedErrorHandler = Arc<dyn ErrorHandler>;
