//! # Event Hub
//!
//! A type-generic, in-process publish/subscribe multiplexer built around a
//! single owner task.
//!
//! ## Overview
//!
//! A [`Hub<T>`] spawns one control loop that exclusively owns the registry of
//! listeners. Registration, removal and emission are requests sent to that
//! loop over `tokio` channels, each acknowledged once the loop has dequeued
//! it, so the registry needs no locks and every listener observes events in
//! the same global order.
//!
//! ## Features
//!
//! * **Type-Safe**: one hub per payload type, checked at compile time.
//! * **Filtered listeners**: an optional predicate per [`Listener`].
//! * **Identity-keyed**: identical filters still make distinct subscribers.
//! * **Cancellation-bound**: the loop ends with its `CancellationToken`,
//!   closing every listener stream; later requests fail with
//!   [`HubError::Closed`].
//! * **Fault isolation**: a panicking filter evicts only its own listener.
//!
//! # Example
//!
//! ```rust
//! use relay_events::{Hub, HubError, ListenerOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), HubError> {
//!     let token = CancellationToken::new();
//!     let hub = Hub::<u64>::new(token.clone());
//!
//!     let mut all = hub.listener().await?;
//!     let stop = all.stop_handle();
//!     let reader = tokio::spawn(async move {
//!         let mut seen = Vec::new();
//!         while let Some(n) = all.recv().await {
//!             seen.push(n);
//!         }
//!         seen
//!     });
//!
//!     for n in [5, 4, 9] {
//!         hub.emit(n).await?;
//!     }
//!
//!     // Processed after the last delivery, then the stream closes.
//!     stop.stop().await?;
//!     assert_eq!(reader.await.unwrap_or_default(), vec![5, 4, 9]);
//!
//!     token.cancel();
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod hub;
mod listener;

pub use config::HubConfig;
pub use error::{HubError, HubErrorExt};
pub use hub::{Event, Hub};
pub use listener::{Listener, ListenerId, ListenerOptions, StopHandle};
