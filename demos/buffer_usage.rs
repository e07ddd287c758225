//! Buffer Store Usage Example
//!
//! Fills a small store with audio segments, reads some of them back and shows
//! which segments each eviction strategy keeps.
//!
//! Run with: RUST_LOG=debug cargo run --example buffer_usage

use media_buffer_cache::{
    BufferEvent, BufferStore, CacheConfig, CacheMetrics, ConfigUpdate, EvictionStrategy, Metadata,
};
use serde_json::json;
use std::time::Duration;

fn segment_metadata(index: usize) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("type".into(), json!("audio/aac"));
    metadata.insert("segment".into(), json!(index));
    metadata
}

fn run(strategy: EvictionStrategy) {
    println!("\n=== {} ===", strategy.as_str().to_uppercase());

    let mut store = BufferStore::new(CacheConfig {
        max_buffers: 4,
        cleanup_threshold: 1.0,
        strategy,
        ..CacheConfig::default()
    });

    let subscription = store.on_buffer_event(|event| match event {
        BufferEvent::Removed { entry, reason, .. } => {
            println!("  segment {} {}", entry.metadata["segment"], reason)
        }
        BufferEvent::Threshold { removed_count, .. } => {
            println!("  cleanup pass evicted {} segment(s)", removed_count)
        }
        _ => {}
    });

    let mut ids = Vec::new();
    for index in 0..4 {
        let payload = vec![index as u8; 16 * 1024];
        match store.add(payload, Duration::from_secs(2), segment_metadata(index)) {
            Ok(id) => ids.push(id),
            Err(err) => println!("  segment {} rejected: {}", index, err),
        }
    }

    // segment 0 is hot, segment 1 is read once
    for _ in 0..3 {
        let _ = store.get(&ids[0]);
    }
    let _ = store.get(&ids[1]);

    for index in 4..6 {
        let payload = vec![index as u8; 16 * 1024];
        if let Err(err) = store.add(payload, Duration::from_secs(2), segment_metadata(index)) {
            println!("  segment {} rejected: {}", index, err);
        }
    }

    let resident: Vec<String> = store
        .items()
        .iter()
        .map(|entry| entry.metadata["segment"].to_string())
        .collect();
    println!("  resident segments: [{}]", resident.join(", "));
    println!(
        "  {} bytes, {:?} buffered, {:.0}% of target",
        store.current_size(),
        store.current_duration(),
        store.target_fill() * 100.0
    );
    println!(
        "  hit rate {:.2}, {} evictions",
        store.metrics()["hit_rate"],
        store.metrics()["evictions"]
    );

    subscription.unsubscribe();
}

fn main() {
    env_logger::init();

    for strategy in [
        EvictionStrategy::Fifo,
        EvictionStrategy::Lru,
        EvictionStrategy::Lfu,
    ] {
        run(strategy);
    }

    println!("\n=== Admission ===");
    let mut store = BufferStore::new(CacheConfig {
        max_size: 1024,
        ..CacheConfig::default()
    });
    if let Err(err) = store.add(vec![0u8; 2048], Duration::from_secs(1), Metadata::new()) {
        println!("  rejected: {}", err);
    }

    println!("\n=== Reconfiguration ===");
    let json = r#"{ "maxBuffers": 8, "strategy": "lfu", "autoCleanup": false }"#;
    let config: CacheConfig = match serde_json::from_str(json) {
        Ok(config) => config,
        Err(err) => {
            println!("  invalid configuration: {}", err);
            return;
        }
    };
    store.configure(ConfigUpdate::from(config));
    println!("  {:?}", store.config());
}
