// tests/aggregator_fetch_all.rs
use ai_tools_monitor::ingest::providers::sample::StaticAdapter;
use ai_tools_monitor::{fetch_all, Aggregator, FailureKind, Record, SourceAdapter};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

struct FailingAdapter;

#[async_trait]
impl SourceAdapter for FailingAdapter {
    fn name(&self) -> &str {
        "failing"
    }
    async fn fetch(&self) -> Result<Vec<Record>> {
        Err(anyhow!("ConnectionError: connection refused"))
    }
}

struct PanickingAdapter;

#[async_trait]
impl SourceAdapter for PanickingAdapter {
    fn name(&self) -> &str {
        "panicking"
    }
    async fn fetch(&self) -> Result<Vec<Record>> {
        panic!("adapter bug");
    }
}

fn rec(source: &str, name: &str, url: &str) -> Record {
    Record::new(source, name, url)
}

fn keys(records: &[Record]) -> Vec<(String, String)> {
    records
        .iter()
        .map(|r| (r.name.clone(), r.url.clone()))
        .collect()
}

#[tokio::test]
async fn scenario_first_declared_wins_and_failure_is_isolated() {
    let a = StaticAdapter::new("A", vec![rec("A", "Foo", "http://x")]);
    let b = StaticAdapter::new(
        "B",
        vec![rec("B", "Foo", "http://x"), rec("B", "Bar", "http://y")],
    );
    let adapters: Vec<Arc<dyn SourceAdapter>> =
        vec![Arc::new(a), Arc::new(b), Arc::new(FailingAdapter)];
    let agg = Aggregator::new(adapters);

    let report = agg.fetch_all_report().await;

    assert_eq!(
        keys(&report.records),
        vec![
            ("Foo".to_string(), "http://x".to_string()),
            ("Bar".to_string(), "http://y".to_string())
        ]
    );
    assert_eq!(report.records[0].source, "A");
    assert_eq!(report.fetched, 3);
    assert_eq!(report.duplicates, 1);
    // Each failure entry is pushed together with exactly one warn! log line.
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].adapter, "failing");
    assert_eq!(report.failures[0].kind, FailureKind::Error);
    assert!(report.failures[0].error.contains("connection refused"));
}

#[tokio::test]
async fn middle_adapter_failing_keeps_neighbours() {
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(StaticAdapter::new("one", vec![rec("one", "A", "u1"), rec("one", "B", "u2")])),
        Arc::new(FailingAdapter),
        Arc::new(StaticAdapter::new("three", vec![rec("three", "C", "u3")])),
    ];
    let report = Aggregator::new(adapters).fetch_all_report().await;
    let names: Vec<_> = report.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].adapter, "failing");
}

#[tokio::test(start_paused = true)]
async fn merge_order_follows_declaration_not_completion() {
    // The first adapter finishes last.
    let slow = StaticAdapter::new("slow", vec![rec("slow", "S", "s")])
        .with_delay(Duration::from_secs(5));
    let fast = StaticAdapter::new("fast", vec![rec("fast", "F", "f")]);
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(slow), Arc::new(fast)];
    let agg = Aggregator::new(adapters);

    let first = agg.fetch_all().await;
    let second = agg.fetch_all().await;
    assert_eq!(keys(&first), keys(&second));
    assert_eq!(first[0].name, "S");
    assert_eq!(first[1].name, "F");
}

#[tokio::test(start_paused = true)]
async fn adapters_run_concurrently() {
    let adapters: Vec<Arc<dyn SourceAdapter>> = (0..4)
        .map(|i| {
            Arc::new(
                StaticAdapter::new(format!("a{i}"), vec![rec("t", &format!("n{i}"), "u")])
                    .with_delay(Duration::from_secs(10)),
            ) as Arc<dyn SourceAdapter>
        })
        .collect();
    let t0 = tokio::time::Instant::now();
    let out = fetch_all(&adapters).await;
    assert_eq!(out.len(), 4);
    assert!(t0.elapsed() < Duration::from_secs(20));
}

#[tokio::test]
async fn records_are_stamped_on_a_copy() {
    let original = rec("A", "Foo", "http://x").with_raw("votes", json!(3));
    let adapters: Vec<Arc<dyn SourceAdapter>> =
        vec![Arc::new(StaticAdapter::new("A", vec![original.clone()]))];
    let agg = Aggregator::new(adapters);
    let out = agg.fetch_all().await;
    assert_eq!(out.len(), 1);
    assert!(out[0].fetched_at.is_some());
    assert_eq!(out[0].raw, original.raw);
    assert!(original.fetched_at.is_none());
}

#[tokio::test]
async fn panic_in_adapter_is_reported_not_propagated() {
    let adapters: Vec<Arc<dyn SourceAdapter>> =
        vec![Arc::new(PanickingAdapter), Arc::new(StaticAdapter::sample())];
    let agg = Aggregator::new(adapters);
    let report = agg.fetch_all_report().await;
    assert_eq!(report.records.len(), 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, FailureKind::Panicked);
}

#[tokio::test(start_paused = true)]
async fn deadline_drops_only_the_slow_adapter() {
    let hanging = StaticAdapter::new("hanging", vec![rec("h", "H", "h")])
        .with_delay(Duration::from_secs(3600));
    let adapters: Vec<Arc<dyn SourceAdapter>> =
        vec![Arc::new(StaticAdapter::sample()), Arc::new(hanging)];
    let agg = Aggregator::new(adapters).with_timeout(Duration::from_secs(30));

    let report = agg.fetch_all_report().await;
    assert_eq!(report.records.len(), 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].adapter, "hanging");
    assert_eq!(report.failures[0].kind, FailureKind::TimedOut);
}

#[tokio::test]
async fn total_failure_is_an_empty_collection() {
    let adapters: Vec<Arc<dyn SourceAdapter>> =
        vec![Arc::new(FailingAdapter), Arc::new(FailingAdapter)];
    let agg = Aggregator::new(adapters);
    let report = agg.fetch_all_report().await;
    assert!(report.records.is_empty());
    assert_eq!(report.failures.len(), 2);
    assert!(report.is_total_failure());

    let none: Vec<Arc<dyn SourceAdapter>> = vec![];
    assert!(fetch_all(&none).await.is_empty());
}
