use crate::error::HubError;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_REQUEST_CAPACITY: usize = 1;
const MIN_CAPACITY: usize = 1;
const DEFAULT_NAME: &str = "hub";

/// Configuration for a [`Hub`](crate::Hub).
///
/// Deserializable so it can sit inside an application config file:
///
/// ```toml
/// [hub]
/// name = "orders"
/// request_capacity = 4
/// delivery_timeout_ms = 250
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HubConfig {
    /// Recorded as the `hub` field on every log line of the control loop.
    pub name: String,
    /// Buffer slots of the emit, add and remove request surfaces.
    pub request_capacity: usize,
    /// Upper bound for a single handoff. `None` blocks until the reader takes
    /// the event. `Some` moves on once the bound elapses: an event the reader
    /// has not picked up yet stays readable, and later events are dropped for
    /// that listener while it is still pending.
    pub delivery_timeout_ms: Option<u64>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_owned(),
            request_capacity: DEFAULT_REQUEST_CAPACITY,
            delivery_timeout_ms: None,
        }
    }
}

impl HubConfig {
    #[must_use = "Customize the name recorded on hub log lines"]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = if name.trim().is_empty() { DEFAULT_NAME.to_owned() } else { name };
        self
    }

    #[must_use = "Customize the buffer of the hub request surfaces"]
    pub const fn with_request_capacity(mut self, capacity: usize) -> Self {
        self.request_capacity = capacity;
        self
    }

    #[must_use = "Bound how long a single delivery may block the hub"]
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// The delivery bound as a [`Duration`], if any.
    #[must_use]
    pub fn delivery_timeout(&self) -> Option<Duration> {
        self.delivery_timeout_ms.map(Duration::from_millis)
    }

    pub(crate) fn validate(&self) -> Result<(), HubError> {
        if self.request_capacity < MIN_CAPACITY {
            return Err(HubError::InvalidCapacity {
                message: format!("request_capacity must be >= {MIN_CAPACITY}").into(),
                context: None,
            });
        }
        Ok(())
    }
}
