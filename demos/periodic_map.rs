//! Example showing a price table refreshed in the background.
//!
//! Run with: RUST_LOG=debug cargo run --example periodic_map

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use wheels::listener::RefreshEvent;
use wheels::map::periodic::PeriodicMap;
#[cfg(feature = "metrics")]
use wheels::metrics::exporter::PrometheusTextExporter;
#[cfg(feature = "metrics")]
use wheels::metrics::traits::MetricsExporter;

fn main() {
    env_logger::init();
    println!("=== PeriodicMap Example ===\n");

    // Stand-in for an upstream price feed: every third call fails.
    let ticks = Arc::new(AtomicU64::new(0));
    let feed = ticks.clone();

    let prices: PeriodicMap<String, f64> = PeriodicMap::builder(Duration::from_millis(200))
        .try_fetch(move || -> Result<HashMap<String, f64>, String> {
            let n = feed.fetch_add(1, Ordering::SeqCst);
            if n % 3 == 2 {
                return Err(format!("feed timeout on tick {}", n));
            }
            let drift = n as f64;
            Ok(HashMap::from([
                ("BTC-USDT".to_string(), 67_000.0 + drift),
                ("ETH-USDT".to_string(), 3_500.0 + drift),
            ]))
        })
        .refresh_on_start(true)
        .thread_name("price-refresh")
        .on_refresh(|event| match event {
            RefreshEvent::Completed { entries, elapsed } => {
                println!("   refreshed {} prices in {:?}", entries, elapsed)
            },
            RefreshEvent::Failed { error, .. } => println!("   refresh failed: {}", error),
        })
        .build();

    println!("1. Background refresh");
    prices.start();
    thread::sleep(Duration::from_millis(700));
    println!("   BTC-USDT = {:?}", prices.get("BTC-USDT"));
    println!();

    println!("2. Manual writes last until the next refresh");
    prices.put("DOGE-USDT".to_string(), 0.15);
    println!("   DOGE-USDT = {:?}", prices.get("DOGE-USDT"));
    thread::sleep(Duration::from_millis(450));
    println!("   DOGE-USDT after refresh = {:?}", prices.get("DOGE-USDT"));
    println!();

    println!("3. Shutdown");
    prices.shutdown();
    println!("   running? {}", prices.is_running());
    println!("   fetch calls: {}", ticks.load(Ordering::SeqCst));

    #[cfg(feature = "metrics")]
    {
        println!();
        println!("4. Metrics");
        let exporter = PrometheusTextExporter::new("prices", std::io::stdout());
        exporter.export(&prices.metrics());
    }
}
