use crate::error::HubError;
use std::fmt;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// Match predicate evaluated by the hub for every emitted event.
pub(crate) type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Identity of a listener within its hub.
///
/// Identities are never reused, so two listeners with identical filters are
/// still two distinct subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Construction-time options for a [`Listener`].
///
/// ```rust
/// use relay_events::ListenerOptions;
///
/// let options = ListenerOptions::<u32>::new().filter(|n| *n >= 100);
/// assert!(options.is_filtered());
/// ```
pub struct ListenerOptions<T> {
    filter: Option<Predicate<T>>,
}

impl<T> Default for ListenerOptions<T> {
    fn default() -> Self {
        Self { filter: None }
    }
}

impl<T> fmt::Debug for ListenerOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerOptions").field("filtered", &self.filter.is_some()).finish()
    }
}

impl<T: 'static> ListenerOptions<T> {
    /// Options for an unfiltered listener.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only deliver events for which `filter` returns `true`.
    ///
    /// The filter runs on the hub's control loop, so it must be cheap and must
    /// not block. Calling this more than once replaces the previous filter:
    /// the last one wins.
    #[must_use = "The options must be passed to Hub::listener_with"]
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        if self.filter.is_some() {
            warn!(
                event = std::any::type_name::<T>(),
                "Listener filter replaced; only the last filter applies"
            );
        }
        self.filter = Some(Box::new(filter));
        self
    }

    /// Whether a filter has been set.
    #[must_use]
    pub const fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }

    pub(crate) fn into_predicate(self) -> Predicate<T> {
        self.filter.unwrap_or_else(|| Box::new(|_: &T| true))
    }
}

/// Removal request sent to the control loop.
#[derive(Debug)]
pub(crate) struct Removal {
    pub(crate) id: ListenerId,
    pub(crate) ack: oneshot::Sender<()>,
}

/// A cloneable handle that deregisters one listener.
///
/// Obtained from [`Listener::stop_handle`] so that a task other than the
/// reader can end the subscription.
#[derive(Debug, Clone)]
pub struct StopHandle {
    id: ListenerId,
    remove_tx: mpsc::Sender<Removal>,
}

impl StopHandle {
    /// Asks the hub to remove the listener and waits until the control loop
    /// has processed the request. Once this returns, the listener's stream
    /// yields whatever was already delivered and then `None`.
    ///
    /// Stopping an already removed listener is a no-op.
    ///
    /// # Errors
    /// Returns [`HubError::Closed`] if the control loop has exited.
    pub async fn stop(&self) -> Result<(), HubError> {
        let (ack, processed) = oneshot::channel();
        self.remove_tx
            .send(Removal { id: self.id, ack })
            .await
            .map_err(|_| HubError::closed("stop"))?;
        processed.await.map_err(|_| HubError::closed("stop"))
    }

    /// The listener this handle removes.
    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }
}

/// One subscription to a [`Hub`](crate::Hub).
///
/// Events arrive in the order the hub dequeued them, restricted to those the
/// listener's filter accepted.
#[derive(Debug)]
pub struct Listener<T> {
    receiver: mpsc::Receiver<T>,
    stop: StopHandle,
}

impl<T> Listener<T> {
    pub(crate) const fn new(
        id: ListenerId,
        receiver: mpsc::Receiver<T>,
        remove_tx: mpsc::Sender<Removal>,
    ) -> Self {
        Self { receiver, stop: StopHandle { id, remove_tx } }
    }

    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.stop.id
    }

    /// Receives the next event, or `None` once the listener has been removed
    /// (or the hub has shut down) and everything delivered before has been
    /// drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// The underlying delivery stream, for use in `tokio::select!`.
    pub const fn channel(&mut self) -> &mut mpsc::Receiver<T> {
        &mut self.receiver
    }

    /// See [`StopHandle::stop`].
    ///
    /// # Errors
    /// Returns [`HubError::Closed`] if the control loop has exited.
    pub async fn stop(&self) -> Result<(), HubError> {
        self.stop.stop().await
    }

    /// A handle that can stop this listener from another task.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Splits the listener into its stop handle and its delivery stream.
    #[must_use]
    pub fn into_parts(self) -> (StopHandle, mpsc::Receiver<T>) {
        (self.stop, self.receiver)
    }
}
