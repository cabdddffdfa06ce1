// tests/providers_feed.rs
use ai_tools_monitor::ingest::providers::feed::FeedAdapter;
use ai_tools_monitor::ingest::retry::is_permanent;
use ai_tools_monitor::SourceAdapter;
use serde_json::json;

#[tokio::test]
async fn fixture_feed_parses_items() {
    let xml: &str = include_str!("fixtures/directory_rss.xml");
    let feed = FeedAdapter::from_fixture("futuretools", xml);
    let out = feed.fetch().await.unwrap();

    let names: Vec<_> = out.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["PromptPilot", "VoiceForge - TTS"]);

    let first = &out[0];
    assert_eq!(first.source, "futuretools");
    assert_eq!(first.url, "https://promptpilot.example.test");
    assert_eq!(first.description, "Autocomplete for your prompts");
    assert_eq!(
        first.raw.get("categories"),
        Some(&json!(["Productivity", "Writing"]))
    );
    assert_eq!(first.raw.get("published_at"), Some(&json!(1_727_784_000)));

    // Unparseable pubDate is simply left out.
    assert_eq!(out[1].description, "Realistic voices in seconds");
    assert!(out[1].raw.get("published_at").is_none());
}

#[tokio::test]
async fn malformed_xml_is_a_permanent_failure() {
    let feed = FeedAdapter::from_fixture("broken", "<rss><channel><item>");
    let err = feed.fetch().await.unwrap_err();
    assert!(is_permanent(&err));
}

#[tokio::test]
async fn fetch_after_close_fails() {
    let feed = FeedAdapter::from_fixture("closed", include_str!("fixtures/directory_rss.xml"));
    feed.close().await;
    feed.close().await;
    assert!(feed.fetch().await.is_err());
}
