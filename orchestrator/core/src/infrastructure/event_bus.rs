// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Domain Events
//
// In-process publish/subscribe for file and action lifecycle events.
// - `emit` is synchronous: handlers registered for the event type run before
//   `emit` returns, in registration order, so observers see events in the
//   order they were emitted
// - async handlers are spawned on the current tokio runtime; their failures
//   are logged and never reach the emitter
// - an ordered middleware chain may rewrite or veto an event before dispatch
// - every dispatched event is also recorded in a bounded history and pushed to
//   a tokio broadcast channel for observers that prefer a stream

use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::domain::config::EventBusConfig;
use crate::domain::events::{DomainEvent, EventPayload};

/// Subscribes to every event type.
pub const WILDCARD: &str = "*";

pub type EventHandler = Arc<dyn Fn(&DomainEvent) + Send + Sync>;
pub type AsyncEventHandler = Arc<dyn Fn(DomainEvent) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

enum Handler {
    Sync(EventHandler),
    Async(AsyncEventHandler),
}

struct Subscription {
    id: u64,
    handler: Handler,
    once: bool,
    fired: AtomicBool,
}

/// Rewrites or vetoes events before dispatch. Returning `None` drops the event.
pub trait EventMiddleware: Send + Sync {
    fn name(&self) -> &str;

    fn process(&self, event: DomainEvent) -> Option<DomainEvent>;
}

struct Inner {
    subscriptions: RwLock<HashMap<String, Vec<Arc<Subscription>>>>,
    middleware: RwLock<Vec<Arc<dyn EventMiddleware>>>,
    history: Mutex<VecDeque<DomainEvent>>,
    history_limit: usize,
    sender: broadcast::Sender<DomainEvent>,
    next_id: AtomicU64,
}

/// Event bus for publishing and subscribing to domain events
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

/// Disposable handle returned by [`EventBus::on`] and friends.
#[derive(Clone)]
pub struct SubscriptionHandle {
    id: u64,
    event_type: String,
    bus: Weak<Inner>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Removes the subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self) -> bool {
        match self.bus.upgrade() {
            Some(inner) => inner.remove(&self.event_type, self.id),
            None => false,
        }
    }
}

impl Inner {
    fn remove(&self, event_type: &str, id: u64) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let Some(list) = subscriptions.get_mut(event_type) else {
            return false;
        };
        let before = list.len();
        list.retain(|s| s.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            subscriptions.remove(event_type);
        }
        removed
    }
}

impl EventBus {
    pub fn new(config: &EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.stream_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                subscriptions: RwLock::new(HashMap::new()),
                middleware: RwLock::new(Vec::new()),
                history: Mutex::new(VecDeque::new()),
                history_limit: config.history_limit,
                sender,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Event bus with the default limits and the built-in validation and
    /// logging middleware installed.
    pub fn with_default_middleware() -> Self {
        let bus = Self::default();
        bus.use_middleware(Arc::new(ValidationMiddleware));
        bus.use_middleware(Arc::new(LoggingMiddleware));
        bus
    }

    /// Appends a middleware to the end of the chain.
    pub fn use_middleware(&self, middleware: Arc<dyn EventMiddleware>) {
        debug!(middleware = middleware.name(), "Event middleware installed");
        self.inner.middleware.write().push(middleware);
    }

    pub fn on<F>(&self, event_type: &str, handler: F) -> SubscriptionHandle
    where
        F: Fn(&DomainEvent) + Send + Sync + 'static,
    {
        self.subscribe_handler(event_type, Handler::Sync(Arc::new(handler)), false)
    }

    pub fn once<F>(&self, event_type: &str, handler: F) -> SubscriptionHandle
    where
        F: Fn(&DomainEvent) + Send + Sync + 'static,
    {
        self.subscribe_handler(event_type, Handler::Sync(Arc::new(handler)), true)
    }

    /// Registers an async handler. Each delivery is spawned as its own task.
    pub fn on_async<F, Fut>(&self, event_type: &str, handler: F) -> SubscriptionHandle
    where
        F: Fn(DomainEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handler: AsyncEventHandler =
            Arc::new(move |event: DomainEvent| -> BoxFuture<'static, anyhow::Result<()>> { Box::pin(handler(event)) });
        self.subscribe_handler(event_type, Handler::Async(handler), false)
    }

    fn subscribe_handler(&self, event_type: &str, handler: Handler, once: bool) -> SubscriptionHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let subscription = Arc::new(Subscription {
            id,
            handler,
            once,
            fired: AtomicBool::new(false),
        });
        self.inner
            .subscriptions
            .write()
            .entry(event_type.to_string())
            .or_default()
            .push(subscription);

        SubscriptionHandle {
            id,
            event_type: event_type.to_string(),
            bus: Arc::downgrade(&self.inner),
        }
    }

    pub fn off(&self, handle: &SubscriptionHandle) -> bool {
        self.inner.remove(&handle.event_type, handle.id)
    }

    /// Removes every subscription, or only those for `event_type`.
    pub fn clear(&self, event_type: Option<&str>) {
        let mut subscriptions = self.inner.subscriptions.write();
        match event_type {
            Some(t) => {
                subscriptions.remove(t);
            }
            None => subscriptions.clear(),
        }
    }

    pub fn subscription_count(&self, event_type: Option<&str>) -> usize {
        let subscriptions = self.inner.subscriptions.read();
        match event_type {
            Some(t) => subscriptions.get(t).map_or(0, Vec::len),
            None => subscriptions.values().map(Vec::len).sum(),
        }
    }

    /// Dispatches `event` to current subscribers.
    ///
    /// Subscribers of the exact event type run first, in registration order,
    /// followed by `*` subscribers, regardless of when either registered.
    ///
    /// Returns `Ok(())` without dispatching when a middleware vetoes the event.
    pub fn emit(&self, event: DomainEvent) -> Result<(), EventBusError> {
        validate_event(&event)?;

        let middleware = self.inner.middleware.read().clone();
        let mut event = event;
        for m in &middleware {
            match m.process(event) {
                Some(next) => event = next,
                None => {
                    debug!(middleware = m.name(), "Event vetoed by middleware");
                    return Ok(());
                }
            }
        }

        self.record(&event);

        let event_type = event.event_type().to_string();
        let targets: Vec<Arc<Subscription>> = {
            let subscriptions = self.inner.subscriptions.read();
            subscriptions
                .get(&event_type)
                .into_iter()
                .chain(subscriptions.get(WILDCARD))
                .flatten()
                .cloned()
                .collect()
        };

        let mut spent = Vec::new();
        for subscription in &targets {
            if subscription.once {
                if subscription.fired.swap(true, Ordering::AcqRel) {
                    continue;
                }
                spent.push(subscription.id);
            }
            self.deliver(&subscription.handler, &event);
        }

        // once-subscriptions leave only after the whole pass
        if !spent.is_empty() {
            let mut subscriptions = self.inner.subscriptions.write();
            for list in subscriptions.values_mut() {
                list.retain(|s| !spent.contains(&s.id));
            }
            subscriptions.retain(|_, list| !list.is_empty());
        }

        if self.inner.sender.send(event).is_err() {
            debug!("No stream subscribers listening to event");
        }

        Ok(())
    }

    fn deliver(&self, handler: &Handler, event: &DomainEvent) {
        match handler {
            Handler::Sync(handler) => handler(event),
            Handler::Async(handler) => {
                let event_type = event.event_type().to_string();
                match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => {
                        let fut = handler(event.clone());
                        runtime.spawn(async move {
                            if let Err(e) = fut.await {
                                error!(event_type = %event_type, error = %e, "Async event handler failed");
                            }
                        });
                    }
                    Err(_) => {
                        warn!(event_type = %event_type, "No tokio runtime; async event handler skipped");
                    }
                }
            }
        }
    }

    fn record(&self, event: &DomainEvent) {
        if self.inner.history_limit == 0 {
            return;
        }
        let mut history = self.inner.history.lock();
        history.push_back(event.clone());
        while history.len() > self.inner.history_limit {
            history.pop_front();
        }
    }

    /// Recorded events, oldest first, optionally filtered by type.
    pub fn history(&self, event_type: Option<&str>) -> Vec<DomainEvent> {
        self.inner
            .history
            .lock()
            .iter()
            .filter(|e| event_type.map_or(true, |t| e.event_type() == t))
            .cloned()
            .collect()
    }

    pub fn clear_history(&self) {
        self.inner.history.lock().clear();
    }

    /// Subscribe to all domain events as a stream
    pub fn subscribe_stream(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.inner.sender.subscribe(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(&EventBusConfig::default())
    }
}

fn validate_event(event: &DomainEvent) -> Result<(), EventBusError> {
    let event_type = event.event_type();
    if event_type.trim().is_empty() {
        return Err(EventBusError::InvalidEvent("event type is required".to_string()));
    }
    if event_type == WILDCARD {
        return Err(EventBusError::InvalidEvent(format!(
            "'{}' is reserved for subscriptions",
            WILDCARD
        )));
    }
    Ok(())
}

/// Vetoes file events that do not identify their workspace and file.
pub struct ValidationMiddleware;

impl EventMiddleware for ValidationMiddleware {
    fn name(&self) -> &str {
        "validation"
    }

    fn process(&self, event: DomainEvent) -> Option<DomainEvent> {
        let well_formed = match &event.payload {
            EventPayload::FileCreated { workspace_id, file_path, .. }
            | EventPayload::FileUpdated { workspace_id, file_path, .. }
            | EventPayload::FileDeleted { workspace_id, file_path } => {
                !workspace_id.is_empty() && !file_path.is_empty()
            }
            EventPayload::AiActionProcessed { workspace_id, .. } => !workspace_id.is_empty(),
            EventPayload::Custom { .. } => true,
        };
        if well_formed {
            Some(event)
        } else {
            warn!(event_type = event.event_type(), "Dropping malformed event");
            None
        }
    }
}

/// Debug-logs every event. Never vetoes.
pub struct LoggingMiddleware;

impl EventMiddleware for LoggingMiddleware {
    fn name(&self) -> &str {
        "logging"
    }

    fn process(&self, event: DomainEvent) -> Option<DomainEvent> {
        debug!(
            event_type = event.event_type(),
            file_path = event.file_path().unwrap_or("-"),
            source = ?event.source,
            "Event emitted"
        );
        Some(event)
    }
}

/// Receiver for all domain events
pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => EventBusError::Closed,
            broadcast::error::RecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}
