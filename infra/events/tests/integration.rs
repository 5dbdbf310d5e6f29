pub mod fixtures;

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use relay_events::*;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_fan_out_with_filter_and_early_stop() {
        let token = CancellationToken::new();
        let hub = Hub::<u64>::new(token.clone());

        let (stop1, l1) = spawn_collector(hub.listener().await.unwrap());
        let (stop2, l2) = spawn_collector(hub.listener().await.unwrap());
        let (stop3, l3) = spawn_collector(
            hub.listener_with(ListenerOptions::new().filter(|n| *n >= 100)).await.unwrap(),
        );

        for (i, event) in EVENTS.into_iter().enumerate() {
            if i == 2 {
                stop1.stop().await.unwrap();
            }
            within(hub.emit(event)).await.unwrap();
        }
        stop2.stop().await.unwrap();
        stop3.stop().await.unwrap();

        assert_eq!(join_collector(l1).await, EVENTS[..2].to_vec());
        assert_eq!(join_collector(l2).await, EVENTS.to_vec());
        assert_eq!(join_collector(l3).await, vec![120, 100]);

        token.cancel();
    }

    #[tokio::test]
    async fn test_ordering_is_preserved() {
        let token = CancellationToken::new();
        let hub = Hub::<u32>::new(token.clone());
        let (stop, collector) = spawn_collector(hub.listener().await.unwrap());

        for i in 0..100 {
            hub.emit(i).await.unwrap();
        }
        stop.stop().await.unwrap();

        let received = join_collector(collector).await;
        assert_eq!(received, (0..100).collect::<Vec<_>>(), "Events should arrive in order");
        token.cancel();
    }

    #[tokio::test]
    async fn test_struct_payloads_are_cloned_per_listener() {
        let token = CancellationToken::new();
        let hub = Hub::<Reading>::new(token.clone());
        let (stop_a, a) = spawn_collector(hub.listener().await.unwrap());
        let (stop_b, b) = spawn_collector(
            hub.listener_with(ListenerOptions::new().filter(|r: &Reading| r.sensor == "boiler"))
                .await
                .unwrap(),
        );

        hub.emit(Reading { sensor: "boiler", value: 71 }).await.unwrap();
        hub.emit(Reading { sensor: "attic", value: 19 }).await.unwrap();
        stop_a.stop().await.unwrap();
        stop_b.stop().await.unwrap();

        assert_eq!(join_collector(a).await.len(), 2);
        assert_eq!(join_collector(b).await, vec![Reading { sensor: "boiler", value: 71 }]);
        token.cancel();
    }

    #[tokio::test]
    async fn test_channel_in_select() {
        let token = CancellationToken::new();
        let hub = Hub::<u64>::new(token.clone());
        let mut listener = hub.listener().await.unwrap();

        let reader = tokio::spawn(async move {
            tokio::select! {
                event = listener.channel().recv() => event,
                () = tokio::time::sleep(TEST_TIMEOUT) => None,
            }
        });
        hub.emit(42).await.unwrap();

        assert_eq!(within(reader).await.unwrap(), Some(42));
        token.cancel();
    }

    #[tokio::test]
    async fn test_stop_twice_is_noop() {
        let token = CancellationToken::new();
        let hub = Hub::<u64>::new(token.clone());
        let mut stopped = hub.listener().await.unwrap();
        let (stop_other, other) = spawn_collector(hub.listener().await.unwrap());

        stopped.stop().await.unwrap();
        stopped.stop().await.unwrap();
        hub.emit(1).await.unwrap();
        stop_other.stop().await.unwrap();

        assert_eq!(within(stopped.recv()).await, None, "stopped stream should report closed");
        assert_eq!(join_collector(other).await, vec![1]);
        token.cancel();
    }

    #[tokio::test]
    async fn test_identical_filters_are_distinct_listeners() {
        let token = CancellationToken::new();
        let hub = Hub::<u64>::new(token.clone());
        let even = |n: &u64| n % 2 == 0;

        let first = hub.listener_with(ListenerOptions::new().filter(even)).await.unwrap();
        let second = hub.listener_with(ListenerOptions::new().filter(even)).await.unwrap();
        assert_ne!(first.id(), second.id());

        let (stop_first, first) = spawn_collector(first);
        let (stop_second, second) = spawn_collector(second);

        hub.emit(2).await.unwrap();
        stop_first.stop().await.unwrap();
        hub.emit(3).await.unwrap();
        hub.emit(4).await.unwrap();
        stop_second.stop().await.unwrap();

        assert_eq!(join_collector(first).await, vec![2]);
        assert_eq!(join_collector(second).await, vec![2, 4]);
        token.cancel();
    }

    #[tokio::test]
    async fn test_last_filter_wins() {
        let token = CancellationToken::new();
        let hub = Hub::<u64>::new(token.clone());
        let options = ListenerOptions::new().filter(|n| *n < 10).filter(|n| *n >= 100);
        let (stop, collector) = spawn_collector(hub.listener_with(options).await.unwrap());

        for event in EVENTS {
            hub.emit(event).await.unwrap();
        }
        stop.stop().await.unwrap();

        assert_eq!(join_collector(collector).await, vec![120, 100]);
        token.cancel();
    }

    #[tokio::test]
    async fn test_cancellation_closes_streams_and_rejects_requests() {
        let token = CancellationToken::new();
        let hub = Hub::<u64>::new(token.clone());
        let mut listener = hub.listener().await.unwrap();

        token.cancel();

        assert_eq!(within(listener.recv()).await, None, "cancellation should close streams");
        assert!(matches!(within(hub.emit(1)).await, Err(HubError::Closed { .. })));
        assert!(matches!(within(hub.listener()).await, Err(HubError::Closed { .. })));
        assert!(matches!(within(listener.stop()).await, Err(HubError::Closed { .. })));
        assert!(hub.is_closed());
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_pending_handoff() {
        let token = CancellationToken::new();
        let hub = Hub::<u64>::new(token.clone());
        let mut idle = hub.listener().await.unwrap();

        // Nobody reads, so the loop parks handing `1` to the idle listener.
        hub.emit(1).await.unwrap();
        let queued = tokio::spawn({
            let hub = hub.clone();
            async move { hub.emit(2).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        assert!(matches!(within(queued).await.unwrap(), Err(HubError::Closed { .. })));
        let mut drained = Vec::new();
        while let Some(event) = within(idle.recv()).await {
            drained.push(event);
        }
        assert!(!drained.contains(&2), "an event queued behind the handoff must never arrive");
    }

    #[tokio::test]
    async fn test_emit_stalls_behind_a_listener_nobody_reads() {
        let token = CancellationToken::new();
        let hub = Hub::<u64>::new(token.clone());
        let _idle = hub.listener().await.unwrap();

        hub.emit(1).await.unwrap();
        let second = tokio::time::timeout(Duration::from_millis(200), hub.emit(2)).await;

        assert!(second.is_err(), "the loop must wait until the first event is taken");
        token.cancel();
    }

    #[tokio::test]
    async fn test_stop_behind_pending_handoff_leaves_nothing_to_read() {
        let token = CancellationToken::new();
        let hub = Hub::<u64>::new(token.clone());
        let mut listener = hub.listener().await.unwrap();
        let stop = listener.stop_handle();

        hub.emit(7).await.unwrap();
        let stopping = tokio::spawn(async move { stop.stop().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!stopping.is_finished(), "stop is processed after the pending handoff");

        assert_eq!(within(listener.recv()).await, Some(7));
        within(stopping).await.unwrap().unwrap();
        assert_eq!(within(listener.recv()).await, None, "nothing arrives once stop is processed");
        token.cancel();
    }

    #[tokio::test]
    async fn test_dropping_every_hub_handle_closes_streams() {
        let token = CancellationToken::new();
        let hub = Hub::<u64>::new(token);
        let mut listener = hub.listener().await.unwrap();

        drop(hub);

        assert_eq!(within(listener.recv()).await, None);
    }

    #[tokio::test]
    async fn test_panicking_filter_evicts_only_its_listener() {
        let token = CancellationToken::new();
        let hub = Hub::<u64>::new(token.clone());
        let fragile = ListenerOptions::new().filter(|n: &u64| {
            assert!(*n != 3, "filter cannot handle 3");
            true
        });
        let (_, fragile) = spawn_collector(hub.listener_with(fragile).await.unwrap());
        let (stop, sturdy) = spawn_collector(hub.listener().await.unwrap());

        for event in 1..=5 {
            within(hub.emit(event)).await.unwrap();
        }
        stop.stop().await.unwrap();

        assert_eq!(join_collector(fragile).await, vec![1, 2]);
        assert_eq!(join_collector(sturdy).await, vec![1, 2, 3, 4, 5]);
        assert!(!hub.is_closed(), "hub must survive a panicking filter");
        token.cancel();
    }

    #[tokio::test]
    async fn test_delivery_timeout_drops_for_slow_listener() {
        let token = CancellationToken::new();
        let config = HubConfig::default().with_delivery_timeout(Duration::from_millis(20));
        let hub = Hub::<u64>::with_config(config, token.clone()).unwrap();

        let mut slow = hub.listener().await.unwrap();
        let (stop_fast, fast) = spawn_collector(hub.listener().await.unwrap());

        for event in 1..=3 {
            within(hub.emit(event)).await.unwrap();
        }
        stop_fast.stop().await.unwrap();

        assert_eq!(join_collector(fast).await, vec![1, 2, 3]);
        assert_eq!(within(slow.recv()).await, Some(1));
        slow.stop().await.unwrap();
        assert_eq!(within(slow.recv()).await, None, "timed-out events are dropped");
        token.cancel();
    }

    #[tokio::test]
    async fn test_dropped_listener_is_pruned() {
        let token = CancellationToken::new();
        let hub = Hub::<u64>::new(token.clone());
        let abandoned = hub.listener().await.unwrap();
        let (stop, kept) = spawn_collector(hub.listener().await.unwrap());

        drop(abandoned);
        for event in 1..=3 {
            within(hub.emit(event)).await.unwrap();
        }
        stop.stop().await.unwrap();

        assert_eq!(join_collector(kept).await, vec![1, 2, 3]);
        token.cancel();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_emitters() {
        let token = CancellationToken::new();
        let hub = Hub::<u32>::new(token.clone());
        let (stop, collector) = spawn_collector(hub.listener().await.unwrap());

        let low = hub.clone();
        let first = tokio::spawn(async move {
            for i in 0..50 {
                low.emit(i).await.unwrap();
            }
        });
        let high = hub.clone();
        let second = tokio::spawn(async move {
            for i in 50..100 {
                high.emit(i).await.unwrap();
            }
        });

        within(first).await.unwrap();
        within(second).await.unwrap();
        stop.stop().await.unwrap();

        let received = join_collector(collector).await;
        assert_eq!(received.len(), 100, "Should receive all events");
        let low: Vec<_> = received.iter().copied().filter(|n| *n < 50).collect();
        let high: Vec<_> = received.iter().copied().filter(|n| *n >= 50).collect();
        assert_eq!(low, (0..50).collect::<Vec<_>>());
        assert_eq!(high, (50..100).collect::<Vec<_>>());
        token.cancel();
    }

    #[tokio::test]
    async fn test_invalid_capacity_rejected() {
        let token = CancellationToken::new();

        let result = Hub::<u64>::with_config(HubConfig::default().with_request_capacity(0), token);
        assert!(matches!(result, Err(HubError::InvalidCapacity { .. })));
    }

    #[tokio::test]
    async fn test_closed_error_carries_operation_context() {
        let token = CancellationToken::new();
        let hub = Hub::<u64>::new(token.clone());
        token.cancel();

        let err = within(hub.emit(7)).await.unwrap_err();
        assert!(err.to_string().contains("(emit)"), "unexpected message: {err}");
    }
}
