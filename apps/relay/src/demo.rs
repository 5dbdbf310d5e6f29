use crate::config::DemoConfig;
use anyhow::Context;
use relay_events::{Hub, HubConfig, Listener, ListenerOptions};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What each demo listener ended up receiving.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DemoReport {
    /// Unfiltered listener that stays to the end.
    pub(crate) all: Vec<u64>,
    /// Listener filtered by the configured threshold.
    pub(crate) filtered: Vec<u64>,
    /// Unfiltered listener stopped after `stop_after` emissions.
    pub(crate) short: Vec<u64>,
}

/// Runs the fan-out scenario on a fresh hub bound to `token`.
///
/// The hub is left running; cancelling `token` is up to the caller.
///
/// # Errors
/// Fails if the hub configuration is invalid, the hub closes early, or a
/// reader task panics.
pub(crate) async fn run(
    hub_config: HubConfig,
    demo: &DemoConfig,
    token: CancellationToken,
) -> anyhow::Result<DemoReport> {
    let hub = Hub::<u64>::with_config(hub_config, token)?;
    let threshold = demo.threshold;

    let all = hub.listener().await?;
    let filtered =
        hub.listener_with(ListenerOptions::new().filter(move |n: &u64| *n >= threshold)).await?;
    let short = hub.listener().await?;
    let short_stop = short.stop_handle();
    let all_stop = all.stop_handle();
    let filtered_stop = filtered.stop_handle();

    let readers =
        [("all", collect(all)), ("filtered", collect(filtered)), ("short", collect(short))];

    info!(hub = hub.name(), events = demo.events.len(), threshold, "Emitting");
    for (i, event) in demo.events.iter().copied().enumerate() {
        if i == demo.stop_after {
            short_stop.stop().await?;
            debug!(listener = %short_stop.id(), after = i, "Stopped short-lived listener");
        }
        hub.emit(event).await?;
    }

    // Removal is ordered after every emission above, so the readers drain fully.
    short_stop.stop().await?;
    all_stop.stop().await?;
    filtered_stop.stop().await?;

    let mut report = DemoReport::default();
    for (label, reader) in readers {
        let received = reader.await.with_context(|| format!("Reader task '{label}' failed"))?;
        info!(listener = label, ?received, "Listener finished");
        match label {
            "all" => report.all = received,
            "filtered" => report.filtered = received,
            _ => report.short = received,
        }
    }

    Ok(report)
}

fn collect(mut listener: Listener<u64>) -> JoinHandle<Vec<u64>> {
    tokio::spawn(async move {
        let mut received = Vec::new();
        while let Some(event) = listener.recv().await {
            received.push(event);
        }
        received
    })
}
