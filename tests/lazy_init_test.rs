mod helpers;

use ganglion::config::GanglionConfig;
use ganglion::vector::{self, LazyStore};
use helpers::{test_embedding, test_options};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn concurrent_first_access_initializes_once() {
    let tmp = TempDir::new().unwrap();
    let lazy = LazyStore::new(test_options(tmp.path(), 100));
    assert!(!lazy.is_initialized());

    let handles: Vec<_> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..8).map(|_| s.spawn(|| lazy.get())).collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert!(lazy.is_initialized());
    for handle in &handles {
        assert!(Arc::ptr_eq(handle, &handles[0]));
    }
}

#[test]
fn concurrent_writers_get_distinct_labels() {
    let tmp = TempDir::new().unwrap();
    let lazy = LazyStore::new(test_options(tmp.path(), 100));

    std::thread::scope(|s| {
        for t in 0..4 {
            let lazy = &lazy;
            s.spawn(move || {
                let store = lazy.get();
                for i in 0..10 {
                    let n = t * 10 + i;
                    store.add_vector(&test_embedding(n), &format!("w{n}")).unwrap();
                }
            });
        }
    });

    let stats = lazy.get().stats().unwrap();
    assert_eq!(stats.count, 40);
    assert_eq!(stats.next_label, 40);
}

#[test]
fn global_store_is_shared() {
    let tmp = TempDir::new().unwrap();
    let mut config = GanglionConfig::default();
    config.storage.data_dir = tmp.path().to_string_lossy().into_owned();

    let first = vector::global(&config);
    let second = vector::global(&config);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.paths().index, tmp.path().join("vectors.hnsw"));
}
