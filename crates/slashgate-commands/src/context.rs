//! Per-interaction context handed to handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use slashgate_common::error::{NamespaceError, ResponseError};
use slashgate_common::models::{Interaction, InteractionResponse, MessageData, User};
use slashgate_common::snowflake::Snowflake;
use tokio::sync::Mutex;

use crate::namespace::{Namespace, ResolvedOption};
use crate::option::Choice;

/// Delivers the initial response of an interaction.
#[async_trait]
pub trait ResponseTransport: Send + Sync {
    async fn send_initial_response(
        &self,
        interaction_id: Snowflake,
        token: &str,
        response: &InteractionResponse,
    ) -> Result<(), ResponseError>;
}

/// Transport that keeps the response so it can be returned as the webhook's
/// HTTP body.
#[derive(Debug, Default)]
pub struct InlineResponder {
    slot: Mutex<Option<InteractionResponse>>,
}

impl InlineResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn take(&self) -> Option<InteractionResponse> {
        self.slot.lock().await.take()
    }
}

#[async_trait]
impl ResponseTransport for InlineResponder {
    async fn send_initial_response(
        &self,
        _interaction_id: Snowflake,
        _token: &str,
        response: &InteractionResponse,
    ) -> Result<(), ResponseError> {
        let mut slot = self.slot.lock().await;
        if slot.is_some() {
            return Err(ResponseError::AlreadyResponded);
        }
        *slot = Some(response.clone());
        Ok(())
    }
}

/// Context of one interaction. Cheap to clone; clones share response state.
#[derive(Clone)]
pub struct InteractionContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    interaction: Interaction,
    namespace: Namespace,
    transport: Arc<dyn ResponseTransport>,
    responded: AtomicBool,
}

impl std::fmt::Debug for InteractionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionContext")
            .field("interaction", &self.inner.interaction.id)
            .field("responded", &self.is_responded())
            .finish_non_exhaustive()
    }
}

impl InteractionContext {
    pub fn new(
        interaction: Interaction,
        namespace: Namespace,
        transport: Arc<dyn ResponseTransport>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                interaction,
                namespace,
                transport,
                responded: AtomicBool::new(false),
            }),
        }
    }

    pub fn interaction(&self) -> &Interaction {
        &self.inner.interaction
    }

    pub fn namespace(&self) -> &Namespace {
        &self.inner.namespace
    }

    pub fn author(&self) -> Option<&User> {
        self.inner.interaction.author()
    }

    pub fn guild_id(&self) -> Option<Snowflake> {
        self.inner.interaction.guild_id
    }

    pub fn focused(&self) -> Result<Option<&ResolvedOption>, NamespaceError> {
        self.inner.namespace.focused()
    }

    /// Whether the initial response has been sent.
    pub fn is_responded(&self) -> bool {
        self.inner.responded.load(Ordering::Acquire)
    }

    /// Send an arbitrary initial response. Only the first call succeeds.
    pub async fn respond_with(&self, response: InteractionResponse) -> Result<(), ResponseError> {
        if self
            .inner
            .responded
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ResponseError::AlreadyResponded);
        }
        let interaction = &self.inner.interaction;
        let sent = self
            .inner
            .transport
            .send_initial_response(interaction.id, &interaction.token, &response)
            .await;
        if sent.is_err() {
            // Nothing reached the platform; allow another attempt.
            self.inner.responded.store(false, Ordering::Release);
        }
        sent
    }

    pub async fn respond(&self, content: impl Into<String>) -> Result<(), ResponseError> {
        self.respond_with(InteractionResponse::message(content)).await
    }

    /// Reply visible only to the invoking user.
    pub async fn respond_ephemeral(&self, content: impl Into<String>) -> Result<(), ResponseError> {
        self.respond_with(InteractionResponse::ephemeral(content)).await
    }

    pub async fn respond_message(&self, data: MessageData) -> Result<(), ResponseError> {
        self.respond_with(InteractionResponse::with_message(data)).await
    }

    /// Acknowledge now and answer later with a follow-up.
    pub async fn defer(&self, ephemeral: bool) -> Result<(), ResponseError> {
        self.respond_with(InteractionResponse::deferred(ephemeral)).await
    }

    pub async fn autocomplete(&self, choices: Vec<Choice>) -> Result<(), ResponseError> {
        let choices = choices.iter().map(Choice::to_wire).collect();
        self.respond_with(InteractionResponse::autocomplete(choices)).await
    }
}
