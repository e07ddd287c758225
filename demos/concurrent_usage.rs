//! Concurrent Store Usage Example
//!
//! A producer thread pushes media segments into a shared store while several
//! reader threads play them back, and a subscriber tallies evictions.
//!
//! Run with: cargo run --example concurrent_usage --features concurrent

use media_buffer_cache::{
    BufferEvent, BufferId, CacheConfig, CacheMetrics, EvictionStrategy, Metadata, RemovalReason,
    SharedBufferStore,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const SEGMENTS: usize = 500;
const READERS: usize = 4;

fn main() {
    env_logger::init();

    let store = SharedBufferStore::new(CacheConfig {
        max_buffers: 32,
        min_duration: Duration::from_secs(20),
        strategy: EvictionStrategy::Lru,
        ..CacheConfig::default()
    });

    let evictions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&evictions);
    let _subscription = store.on_buffer_event(move |event| {
        if let BufferEvent::Removed {
            reason: RemovalReason::Evicted,
            ..
        } = event
        {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    });

    let published: Arc<Mutex<Vec<BufferId>>> = Arc::new(Mutex::new(Vec::new()));
    let start = Instant::now();

    let producer = {
        let store = store.clone();
        let published = Arc::clone(&published);
        thread::spawn(move || {
            for index in 0..SEGMENTS {
                let payload = vec![(index % 256) as u8; 8 * 1024];
                match store.add(payload, Duration::from_millis(500), Metadata::new()) {
                    Ok(id) => {
                        if let Ok(mut ids) = published.lock() {
                            ids.push(id);
                        }
                    }
                    Err(err) => eprintln!("segment {} rejected: {}", index, err),
                }
            }
        })
    };

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let store = store.clone();
            let published = Arc::clone(&published);
            thread::spawn(move || {
                let mut hits = 0usize;
                for _ in 0..SEGMENTS {
                    let latest = published
                        .lock()
                        .ok()
                        .and_then(|ids| ids.last().cloned());
                    if let Some(id) = latest {
                        if store.get_with(&id, |bytes| bytes.len()).is_some() {
                            hits += 1;
                        }
                    }
                }
                hits
            })
        })
        .collect();

    if producer.join().is_err() {
        eprintln!("producer panicked");
    }
    let hits: usize = readers
        .into_iter()
        .filter_map(|reader| reader.join().ok())
        .sum();

    println!("=== Shared {} store ===", store.algorithm_name());
    println!("  elapsed:        {:?}", start.elapsed());
    println!("  reader hits:    {}", hits);
    println!("  evictions seen: {}", evictions.load(Ordering::Relaxed));
    println!("  resident:       {}", store.buffer_count());
    println!("  buffered:       {:?}", store.current_duration());

    for (name, value) in store.metrics() {
        println!("  {:<24} {}", name, value);
    }
}
