use std::time::Duration;

use async_trait::async_trait;

use herald_core::alert::Alert;

use crate::context::Context;
use crate::error::{ChatError, PagingError, PortError, PublishError};
use crate::types::{ChatMessage, MessageRef, PagingEvent, PagingResponse};

/// A durable key/value store whose conditional create doubles as a
/// cross-process lock.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Creates `key` only if it is absent. `Ok(false)` means another caller
    /// already holds it; errors are reserved for backend failures.
    async fn try_lock(&self, ctx: &Context, key: &str, ttl: Duration) -> Result<bool, PortError>;

    /// Upserts `value` under `key`.
    async fn set(
        &self,
        ctx: &Context,
        key: &str,
        ttl: Duration,
        value: &str,
    ) -> Result<(), PortError>;

    /// Returns the recorded value. An absent key, or a key that is locked
    /// but carries no value yet, is `None`.
    async fn get(&self, ctx: &Context, key: &str) -> Result<Option<String>, PortError>;

    /// A view sharing this store's backend under another key prefix.
    fn with_namespace(&self, namespace: &str) -> Self
    where
        Self: Sized;
}

#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Posts `message`, as a reply when `thread` is set. Returns the posted
    /// message's handle.
    async fn post_message(
        &self,
        ctx: &Context,
        channel: &str,
        message: &ChatMessage,
        thread: Option<&str>,
    ) -> Result<String, ChatError>;

    async fn add_reaction(
        &self,
        ctx: &Context,
        name: &str,
        item: &MessageRef,
    ) -> Result<(), ChatError>;

    async fn remove_reaction(
        &self,
        ctx: &Context,
        name: &str,
        item: &MessageRef,
    ) -> Result<(), ChatError>;
}

#[async_trait]
pub trait PagingApi: Send + Sync {
    async fn send_event(
        &self,
        ctx: &Context,
        event: &PagingEvent,
    ) -> Result<PagingResponse, PagingError>;
}

/// A delivery destination.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, ctx: &Context, source: &str, alert: &Alert)
        -> Result<(), PublishError>;

    fn name(&self) -> &str;
}
