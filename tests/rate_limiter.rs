// tests/rate_limiter.rs
use ai_tools_monitor::ingest::rate_limit::RateLimiter;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn ten_calls_at_two_per_second_take_at_least_four_and_a_half_seconds() {
    let rl = RateLimiter::new(2.0);
    let t0 = Instant::now();
    for _ in 0..10 {
        rl.acquire().await;
    }
    let elapsed = t0.elapsed();
    assert!(elapsed >= Duration::from_millis(4_500), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(5_000), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_are_serialized() {
    let rl = Arc::new(RateLimiter::new(1.0));
    let t0 = Instant::now();

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let rl = Arc::clone(&rl);
            tokio::spawn(async move {
                rl.acquire().await;
                Instant::now()
            })
        })
        .collect();

    let mut stamps = Vec::new();
    for h in handles {
        stamps.push(h.await.unwrap());
    }
    stamps.sort();
    for pair in stamps.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(1));
    }
    assert!(t0.elapsed() >= Duration::from_secs(4));
}
