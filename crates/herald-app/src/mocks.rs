// --- Mock Adapters ---

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use herald_core::alert::Alert;
use herald_ports::context::Context;
use herald_ports::error::{ChatError, PagingError, PortError, PublishError};
use herald_ports::outbound::{ChatApi, LockStore, PagingApi, Publisher};
use herald_ports::types::{ChatMessage, MessageRef, PagingEvent, PagingResponse};

#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Option<String>,
    pub expires: Instant,
}

/// In-memory lock store. Clones and namespaced views share one map.
/// Like the sqlite store, an expired lock that never got a value can be
/// taken over; recorded entries never can.
#[derive(Clone, Default)]
pub struct MemoryLockStore {
    namespace: String,
    pub entries: Arc<Mutex<HashMap<String, Entry>>>,
    pub ops: Arc<Mutex<Vec<String>>>,
    /// Fails every operation.
    pub broken: Arc<AtomicBool>,
    /// Fails `try_lock` only.
    pub lock_broken: Arc<AtomicBool>,
}

impl MemoryLockStore {
    fn full_key(&self, key: &str) -> String {
        format!("{}|{}", self.namespace, key)
    }

    fn check(&self) -> Result<(), PortError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(PortError::Connection("store unreachable".into()));
        }
        Ok(())
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    pub fn value(&self, namespace: &str, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .get(&format!("{namespace}|{key}"))
            .and_then(|entry| entry.value.clone())
    }

    /// Moves every entry's expiry to now, as if its TTL had run out.
    pub fn expire_all(&self) {
        let now = Instant::now();
        for entry in self.entries.lock().unwrap().values_mut() {
            entry.expires = now;
        }
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn try_lock(&self, _ctx: &Context, key: &str, ttl: Duration) -> Result<bool, PortError> {
        self.check()?;
        if self.lock_broken.load(Ordering::SeqCst) {
            return Err(PortError::Persistence("conditional write failed".into()));
        }
        self.ops.lock().unwrap().push(format!("lock {key}"));
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        let full = self.full_key(key);
        if let Some(entry) = entries.get(&full) {
            if entry.value.is_some() || entry.expires > now {
                return Ok(false);
            }
        }
        entries.insert(
            full,
            Entry {
                value: None,
                expires: now + ttl,
            },
        );
        Ok(true)
    }

    async fn set(
        &self,
        _ctx: &Context,
        key: &str,
        ttl: Duration,
        value: &str,
    ) -> Result<(), PortError> {
        self.check()?;
        self.ops.lock().unwrap().push(format!("set {key}={value}"));
        self.entries.lock().unwrap().insert(
            self.full_key(key),
            Entry {
                value: Some(value.to_string()),
                expires: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, _ctx: &Context, key: &str) -> Result<Option<String>, PortError> {
        self.check()?;
        self.ops.lock().unwrap().push(format!("get {key}"));
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&self.full_key(key))
            .and_then(|entry| entry.value.clone()))
    }

    fn with_namespace(&self, namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub channel: String,
    pub message: ChatMessage,
    pub thread: Option<String>,
}

#[derive(Default)]
pub struct RecordingChat {
    pub posts: Mutex<Vec<Post>>,
    pub post_results: Mutex<VecDeque<Result<String, ChatError>>>,
    pub reactions: Mutex<Vec<(String, String, MessageRef)>>,
    pub add_reaction_error: Mutex<Option<String>>,
    pub remove_reaction_error: Mutex<Option<String>>,
    counter: AtomicUsize,
}

impl RecordingChat {
    pub fn with_post_results(results: Vec<Result<String, ChatError>>) -> Self {
        Self {
            post_results: Mutex::new(results.into()),
            ..Default::default()
        }
    }

    pub fn posts(&self) -> Vec<Post> {
        self.posts.lock().unwrap().clone()
    }

    pub fn reactions(&self) -> Vec<(String, String, MessageRef)> {
        self.reactions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatApi for RecordingChat {
    async fn post_message(
        &self,
        _ctx: &Context,
        channel: &str,
        message: &ChatMessage,
        thread: Option<&str>,
    ) -> Result<String, ChatError> {
        self.posts.lock().unwrap().push(Post {
            channel: channel.to_string(),
            message: message.clone(),
            thread: thread.map(str::to_string),
        });
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        self.post_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("1689457043.{n:06}")))
    }

    async fn add_reaction(
        &self,
        _ctx: &Context,
        name: &str,
        item: &MessageRef,
    ) -> Result<(), ChatError> {
        self.reactions
            .lock()
            .unwrap()
            .push(("add".into(), name.to_string(), item.clone()));
        match self.add_reaction_error.lock().unwrap().clone() {
            Some(code) => Err(ChatError::api(code)),
            None => Ok(()),
        }
    }

    async fn remove_reaction(
        &self,
        _ctx: &Context,
        name: &str,
        item: &MessageRef,
    ) -> Result<(), ChatError> {
        self.reactions
            .lock()
            .unwrap()
            .push(("remove".into(), name.to_string(), item.clone()));
        match self.remove_reaction_error.lock().unwrap().clone() {
            Some(code) => Err(ChatError::api(code)),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct RecordingPaging {
    pub events: Mutex<Vec<PagingEvent>>,
    pub responses: Mutex<VecDeque<Result<PagingResponse, PagingError>>>,
}

impl RecordingPaging {
    pub fn with_responses(responses: Vec<Result<PagingResponse, PagingError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    pub fn events(&self) -> Vec<PagingEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl PagingApi for RecordingPaging {
    async fn send_event(
        &self,
        _ctx: &Context,
        event: &PagingEvent,
    ) -> Result<PagingResponse, PagingError> {
        self.events.lock().unwrap().push(event.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(PagingResponse::default()))
    }
}

/// Records what it is asked to publish; answers from a queue of results.
#[derive(Default)]
pub struct RecordingPublisher {
    pub name: String,
    pub published: Arc<Mutex<Vec<(String, Alert)>>>,
    pub results: Mutex<VecDeque<Result<(), PublishError>>>,
}

impl RecordingPublisher {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn failing_with(name: &str, results: Vec<Result<(), PublishError>>) -> Self {
        Self {
            name: name.to_string(),
            results: Mutex::new(results.into()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(
        &self,
        _ctx: &Context,
        source: &str,
        alert: &Alert,
    ) -> Result<(), PublishError> {
        self.published
            .lock()
            .unwrap()
            .push((source.to_string(), alert.clone()));
        self.results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
