use crate::config::HubConfig;
use crate::error::HubError;
use crate::listener::{Listener, ListenerId, ListenerOptions, Predicate, Removal};
use fxhash::FxHashMap;
use std::fmt;
use std::ops::ControlFlow;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Listener streams hold one value: a handoff completes when it is taken.
const HANDOFF_SLOTS: usize = 1;

/// Marker trait for payloads that can travel through a [`Hub`].
///
/// Every listener receives its own copy, hence `Clone`.
pub trait Event: Clone + Send + 'static {}
impl<T: Clone + Send + 'static> Event for T {}

struct Emission<T> {
    event: T,
    ack: oneshot::Sender<()>,
}

struct Registration<T> {
    id: ListenerId,
    subscription: Subscription<T>,
    ack: oneshot::Sender<()>,
}

/// Registry entry: the write side of a listener stream and its filter.
struct Subscription<T> {
    sender: mpsc::Sender<T>,
    predicate: Predicate<T>,
}

impl<T> Subscription<T> {
    /// `None` when the predicate panicked.
    fn accepts(&self, event: &T) -> Option<bool> {
        catch_unwind(AssertUnwindSafe(|| (self.predicate)(event))).ok()
    }
}

enum Request<T> {
    Emit(Emission<T>),
    Add(Registration<T>),
    Remove(Removal),
}

enum Delivery {
    Sent,
    TimedOut,
    Disconnected,
}

/// A single-owner event hub for payloads of type `T`.
///
/// All registration, removal and delivery is serialized through one control
/// loop task, which exclusively owns the listener registry. Handles are cheap
/// to clone and all talk to the same loop.
///
/// The loop runs until the [`CancellationToken`] passed at construction is
/// cancelled or every `Hub` handle has been dropped. On exit it drops the
/// registry, closing every listener stream, and any pending or later request
/// fails with [`HubError::Closed`].
///
/// # Example
/// ```rust
/// use relay_events::{Hub, ListenerOptions};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), relay_events::HubError> {
/// let token = CancellationToken::new();
/// let hub = Hub::<u32>::new(token.clone());
///
/// let mut large = hub.listener_with(ListenerOptions::new().filter(|n| *n >= 100)).await?;
/// let reader = tokio::spawn(async move { large.recv().await });
///
/// hub.emit(7).await?;
/// hub.emit(120).await?;
/// assert_eq!(reader.await.ok().flatten(), Some(120));
///
/// token.cancel();
/// # Ok(())
/// # }
/// ```
pub struct Hub<T> {
    emit_tx: mpsc::Sender<Emission<T>>,
    add_tx: mpsc::Sender<Registration<T>>,
    remove_tx: mpsc::Sender<Removal>,
    next_id: Arc<AtomicU64>,
    name: Arc<str>,
}

impl<T> Clone for Hub<T> {
    fn clone(&self) -> Self {
        Self {
            emit_tx: self.emit_tx.clone(),
            add_tx: self.add_tx.clone(),
            remove_tx: self.remove_tx.clone(),
            next_id: Arc::clone(&self.next_id),
            name: Arc::clone(&self.name),
        }
    }
}

impl<T> fmt::Debug for Hub<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("name", &self.name)
            .field("event", &std::any::type_name::<T>())
            .field("closed", &self.emit_tx.is_closed())
            .finish_non_exhaustive()
    }
}

impl<T: Event> Hub<T> {
    /// Creates a hub with the default [`HubConfig`] and starts its control
    /// loop on the current tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime, like [`tokio::spawn`].
    #[must_use]
    pub fn new(token: CancellationToken) -> Self {
        Self::spawn(HubConfig::default(), token)
    }

    /// Creates a hub with a custom configuration.
    ///
    /// # Errors
    /// Returns [`HubError::InvalidCapacity`] if `request_capacity` is zero.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime, like [`tokio::spawn`].
    pub fn with_config(config: HubConfig, token: CancellationToken) -> Result<Self, HubError> {
        config.validate()?;
        Ok(Self::spawn(config, token))
    }

    fn spawn(config: HubConfig, token: CancellationToken) -> Self {
        let (emit_tx, emit_rx) = mpsc::channel(config.request_capacity);
        let (add_tx, add_rx) = mpsc::channel(config.request_capacity);
        let (remove_tx, remove_rx) = mpsc::channel(config.request_capacity);
        let name: Arc<str> = Arc::from(config.name.as_str());

        let control = ControlLoop {
            name: Arc::clone(&name),
            listeners: FxHashMap::default(),
            delivery_timeout: config.delivery_timeout(),
            emit_rx,
            add_rx,
            remove_rx,
        };
        tokio::spawn(control.run(token));

        Self {
            emit_tx,
            add_tx,
            remove_tx,
            next_id: Arc::new(AtomicU64::new(0)),
            name,
        }
    }

    /// Publishes `event` to every listener whose filter accepts it.
    ///
    /// Returns once the control loop has taken the event, not once every
    /// listener has received it. Delivery is a blocking handoff per listener:
    /// the loop moves on only after the reader has taken the event, so a
    /// listener nobody reads from stalls the hub (unless
    /// [`HubConfig::delivery_timeout_ms`] is set).
    ///
    /// # Errors
    /// Returns [`HubError::Closed`] if the control loop has exited.
    pub async fn emit(&self, event: T) -> Result<(), HubError> {
        let (ack, accepted) = oneshot::channel();
        self.emit_tx.send(Emission { event, ack }).await.map_err(|_| HubError::closed("emit"))?;
        accepted.await.map_err(|_| HubError::closed("emit"))
    }

    /// Registers an unfiltered listener.
    ///
    /// # Errors
    /// Returns [`HubError::Closed`] if the control loop has exited.
    pub async fn listener(&self) -> Result<Listener<T>, HubError> {
        self.listener_with(ListenerOptions::new()).await
    }

    /// Registers a listener configured by `options` and waits until the
    /// control loop has added it. Events emitted after this returns reach it.
    ///
    /// # Errors
    /// Returns [`HubError::Closed`] if the control loop has exited.
    pub async fn listener_with(
        &self,
        options: ListenerOptions<T>,
    ) -> Result<Listener<T>, HubError> {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(HANDOFF_SLOTS);
        let subscription = Subscription { sender, predicate: options.into_predicate() };

        let (ack, accepted) = oneshot::channel();
        self.add_tx
            .send(Registration { id, subscription, ack })
            .await
            .map_err(|_| HubError::closed("listener"))?;
        accepted.await.map_err(|_| HubError::closed("listener"))?;

        Ok(Listener::new(id, receiver, self.remove_tx.clone()))
    }

    /// `true` once the control loop has exited.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.emit_tx.is_closed()
    }

    /// The name recorded on the control loop's log lines.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The task that owns the registry.
struct ControlLoop<T> {
    name: Arc<str>,
    listeners: FxHashMap<ListenerId, Subscription<T>>,
    delivery_timeout: Option<Duration>,
    emit_rx: mpsc::Receiver<Emission<T>>,
    add_rx: mpsc::Receiver<Registration<T>>,
    remove_rx: mpsc::Receiver<Removal>,
}

impl<T: Event> ControlLoop<T> {
    async fn run(mut self, token: CancellationToken) {
        debug!(hub = %self.name, event = std::any::type_name::<T>(), "Hub control loop started");

        loop {
            let request = tokio::select! {
                () = token.cancelled() => break,
                emission = self.emit_rx.recv() => match emission {
                    Some(emission) => Request::Emit(emission),
                    // Every hub handle is gone; nothing can emit or register again.
                    None => break,
                },
                Some(registration) = self.add_rx.recv() => Request::Add(registration),
                Some(removal) = self.remove_rx.recv() => Request::Remove(removal),
            };

            // select! does not prefer cancellation over a request that became
            // ready at the same time.
            if token.is_cancelled() {
                break;
            }

            match request {
                Request::Emit(Emission { event, ack }) => {
                    let _ = ack.send(());
                    if self.dispatch(event, &token).await.is_break() {
                        break;
                    }
                },
                Request::Add(Registration { id, subscription, ack }) => {
                    self.listeners.insert(id, subscription);
                    trace!(
                        hub = %self.name,
                        listener = %id,
                        total = self.listeners.len(),
                        "Listener added"
                    );
                    let _ = ack.send(());
                },
                Request::Remove(Removal { id, ack }) => {
                    if self.listeners.remove(&id).is_some() {
                        trace!(hub = %self.name, listener = %id, "Listener removed; stream closed");
                    } else {
                        trace!(hub = %self.name, listener = %id, "Listener already removed");
                    }
                    let _ = ack.send(());
                },
            }
        }

        debug!(
            hub = %self.name,
            listeners = self.listeners.len(),
            "Hub control loop stopped; closing listener streams"
        );
    }

    /// Delivers `event` to every matching listener, one blocking handoff at a
    /// time. Breaks only when cancellation interrupts a pending handoff.
    async fn dispatch(&mut self, event: T, token: &CancellationToken) -> ControlFlow<()> {
        let mut evicted = Vec::new();
        let mut delivered = 0usize;

        for (id, subscription) in &self.listeners {
            if subscription.sender.is_closed() {
                trace!(hub = %self.name, listener = %id, "Listener receiver dropped; pruning");
                evicted.push(*id);
                continue;
            }

            match subscription.accepts(&event) {
                Some(true) => {},
                Some(false) => continue,
                None => {
                    warn!(
                        hub = %self.name,
                        listener = %id,
                        "Listener filter panicked; evicting listener"
                    );
                    evicted.push(*id);
                    continue;
                },
            }

            let outcome = tokio::select! {
                biased;
                () = token.cancelled() => return ControlFlow::Break(()),
                outcome = deliver(&subscription.sender, event.clone(), self.delivery_timeout) => {
                    outcome
                },
            };

            match outcome {
                Delivery::Sent => delivered += 1,
                Delivery::TimedOut => {
                    warn!(
                        hub = %self.name,
                        listener = %id,
                        timeout = ?self.delivery_timeout,
                        "Listener did not take the event in time; moving on"
                    );
                },
                Delivery::Disconnected => {
                    trace!(hub = %self.name, listener = %id, "Listener receiver dropped; pruning");
                    evicted.push(*id);
                },
            }
        }

        for id in evicted {
            self.listeners.remove(&id);
        }

        trace!(hub = %self.name, delivered, total = self.listeners.len(), "Event dispatched");
        ControlFlow::Continue(())
    }
}

async fn deliver<T>(sender: &mpsc::Sender<T>, event: T, timeout: Option<Duration>) -> Delivery {
    match timeout {
        None => handoff(sender, event).await,
        Some(limit) => {
            tokio::time::timeout(limit, handoff(sender, event)).await.unwrap_or(Delivery::TimedOut)
        },
    }
}

/// Completes only once the reader has taken `event` off its stream.
///
/// The stream has a single slot, so capacity comes back exactly when the
/// reader dequeues the value.
async fn handoff<T>(sender: &mpsc::Sender<T>, event: T) -> Delivery {
    if sender.send(event).await.is_err() {
        return Delivery::Disconnected;
    }
    match sender.reserve().await {
        Ok(permit) => {
            drop(permit);
            Delivery::Sent
        },
        Err(_) => Delivery::Disconnected,
    }
}
