//! # Integration Tests
//!
//! End-to-end tests across crates.
//!
//! Responsibilities:
//! - Producers -> fan-out -> forwarders -> capturing/expecting handlers
//! - Configuration driven wiring
//! - Map path and metrics path producing identical captured state

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{Context, DispatchHandler, Event, Metric, MetricMap};
    use dispatcher::{create_dispatcher, DispatcherBuilder, ExpectingHandler, NopHandler};
    use tokio::time::timeout;

    /// Several producers fan out through forwarders into an expecting handler
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_e2e_concurrent_producers() {
        let expecting = Arc::new(ExpectingHandler::new());
        let producers = 4u64;
        let batches_per_producer = 5u64;
        let batch_size = 3u64;
        expecting.expect(
            producers * batches_per_producer * batch_size,
            producers,
            producers,
        );

        let fanout: Arc<dyn DispatchHandler> = Arc::new(
            DispatcherBuilder::new()
                .handler("expecting", expecting.clone(), 1024)
                .handler("nop", Arc::new(NopHandler), 1024)
                .build(),
        );

        let mut tasks = Vec::new();
        for p in 0..producers {
            let handler = Arc::clone(&fanout);
            tasks.push(tokio::spawn(async move {
                let ctx = Context::new();
                for b in 0..batches_per_producer {
                    let batch = (0..batch_size)
                        .map(|i| Metric::counter(format!("p{p}.b{b}.m{i}"), 1.0))
                        .collect();
                    handler.dispatch_metrics(&ctx, batch);
                }
                let mm: MetricMap = std::iter::once(Metric::gauge(format!("p{p}.g"), 1.0)).collect();
                handler.dispatch_metric_map(&ctx, mm);
                handler.dispatch_event(&ctx, Event::new(format!("p{p}"), "done"));
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        timeout(Duration::from_secs(5), expecting.wait_all())
            .await
            .expect("pipeline timed out")
            .unwrap();
        fanout.wait_for_events().await;

        assert_eq!(expecting.metrics().len() as u64, 60 + producers);
        assert_eq!(expecting.events().len() as u64, producers);
    }

    /// Map path and metrics path end up with identical captured state
    #[tokio::test]
    async fn test_e2e_map_path_equals_metrics_path() {
        let direct = Arc::new(ExpectingHandler::new());
        let via_map = Arc::new(ExpectingHandler::new());
        direct.expect(3, 0, 0);
        via_map.expect(0, 1, 0);

        let input = vec![
            Metric::counter("requests", 2.0).with_tag("env", "prod"),
            Metric::gauge("load", 0.5).with_source("host-1"),
            Metric::set("users", "alice"),
        ];

        let ctx = Context::new();
        direct.dispatch_metrics(&ctx, input.clone());
        via_map.dispatch_metric_map(&ctx, input.into_iter().collect());

        direct.wait_all().await.unwrap();
        via_map.wait_all().await.unwrap();
        assert_eq!(direct.metrics(), via_map.metrics());
    }

    /// Configuration file drives the dispatcher
    #[tokio::test]
    async fn test_e2e_config_driven_dispatcher() {
        let config = ConfigLoader::load_from_str(
            r#"
[[handlers]]
name = "capture"
handler_type = "capture"
estimated_tags = 3
acknowledge = true

[[handlers]]
name = "log"
handler_type = "log"

[[handlers]]
name = "nop"
handler_type = "nop"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let fanout = create_dispatcher(&config).unwrap();
        assert_eq!(fanout.estimated_tags(), 3);

        let acked = Arc::new(AtomicUsize::new(0));
        let ctx = Context::new();
        for i in 0..10 {
            let acked = Arc::clone(&acked);
            fanout.dispatch_metrics(
                &ctx,
                vec![Metric::timer("latency", i as f64).with_done(Arc::new(move || {
                    acked.fetch_add(1, Ordering::SeqCst);
                }))],
            );
        }
        fanout.dispatch_event(&ctx, Event::new("deploy", "v2"));
        fanout.wait_for_events().await;

        // Acknowledged once by the fan-out, never per forwarder
        assert_eq!(acked.load(Ordering::SeqCst), 10);
        for (name, snapshot) in fanout.metrics() {
            assert_eq!(snapshot.events_forwarded, 1, "handler {name}");
            assert_eq!(snapshot.dropped_count, 0, "handler {name}");
        }

        fanout.shutdown().await;
    }

    /// Cancelling the producer's context stops new downstream work
    #[tokio::test]
    async fn test_e2e_cancellation() {
        let expecting = Arc::new(ExpectingHandler::new());
        expecting.expect(1, 0, 0);
        let fanout = DispatcherBuilder::new()
            .handler("expecting", expecting.clone(), 16)
            .build();

        let ctx = Context::new();
        fanout.dispatch_metrics(&ctx, vec![Metric::counter("before", 1.0)]);
        expecting.wait_all().await.unwrap();

        ctx.cancel();
        fanout.dispatch_metrics(&ctx, vec![Metric::counter("after", 1.0)]);
        fanout.dispatch_event(&ctx, Event::new("after", ""));
        fanout.wait_for_events().await;

        let names: Vec<_> = expecting.metrics().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["before"]);
        assert!(expecting.events().is_empty());
        assert_eq!(fanout.metrics()[0].1.cancelled_count, 2);

        fanout.shutdown().await;
    }
}
