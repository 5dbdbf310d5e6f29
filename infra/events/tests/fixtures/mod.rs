use relay_events::{Event, Listener, StopHandle};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Upper bound for anything a test waits on; a hung hub fails instead of hanging.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(2);

/// The sequence used throughout the fan-out tests.
pub const EVENTS: [u64; 12] = [5, 4, 9, 1, 2, 2, 10, 120, 100, 1, 3, 4];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reading {
    pub sensor: &'static str,
    pub value: u32,
}

/// Drains a listener on its own task until its stream closes.
pub fn spawn_collector<T: Event>(listener: Listener<T>) -> (StopHandle, JoinHandle<Vec<T>>) {
    let (stop, mut stream) = listener.into_parts();
    let handle = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(event) = stream.recv().await {
            seen.push(event);
        }
        seen
    });
    (stop, handle)
}

pub async fn join_collector<T>(handle: JoinHandle<Vec<T>>) -> Vec<T> {
    tokio::time::timeout(TEST_TIMEOUT, handle)
        .await
        .expect("collector should finish once its listener is stopped")
        .expect("collector task should not panic")
}

pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(TEST_TIMEOUT, future).await.expect("operation should not block")
}
