use courier_core::prelude::*;
use courier_examples::placeholder::models::Post;
use std::sync::{Arc, Mutex};

fn config(dir: &std::path::Path) -> CacheConfig {
    CacheConfig {
        dir: Some(dir.to_path_buf()),
        persist_on_drop: true,
        capacity: 2,
        ..CacheConfig::named("posts")
    }
}

fn post(id: u32) -> Post {
    Post {
        user_id: 1,
        id,
        title: format!("post {id}"),
        body: String::new(),
    }
}

#[test]
fn cache_survives_drop_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let cache = TtlCache::<u32, Post>::open(config(dir.path())).unwrap();
        assert!(cache.is_empty());
        cache.insert(1, post(1));
        cache.insert(2, post(2));
    }
    assert!(dir.path().join("posts.cache").exists());

    let cache = TtlCache::<u32, Post>::open(config(dir.path())).unwrap();
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get(&2), Some(post(2)));
    assert!(cache.is_tracked(&1));
}

#[test]
fn eviction_hook_sees_the_least_recent_key() {
    let dir = tempfile::tempdir().unwrap();
    let evicted = Arc::new(Mutex::new(Vec::new()));
    let sink = evicted.clone();
    let cache = TtlCache::<u32, Post>::new(CacheConfig {
        persist_on_drop: false,
        ..config(dir.path())
    })
    .with_eviction_hook(move |k| sink.lock().unwrap().push(*k));

    cache.insert(1, post(1));
    cache.insert(2, post(2));
    assert!(cache.get(&1).is_some());
    cache.insert(3, post(3));

    assert_eq!(*evicted.lock().unwrap(), vec![2]);
    assert!(!cache.is_tracked(&2));
    assert_eq!(cache.get(&2), None);
    drop(cache);
    assert!(!dir.path().join("posts.cache").exists());
}
