//! Tests for the in-memory resolution cache

use super::*;
use crate::EnvironmentCode;

fn route(target: &str) -> CachedRoute {
    CachedRoute {
        target_url: target.to_string(),
        secret_bundle: None,
        environment_name: "Production".to_string(),
        environment_code: EnvironmentCode::new("prod").unwrap(),
    }
}

fn key(vendor: &str, sender: &str) -> CacheKey {
    CacheKey::new(&VendorCode::new(vendor).unwrap(), sender)
}

#[tokio::test]
async fn test_basic_operations() {
    let cache = InMemoryResolutionCache::default();
    let k = key("acme", "15551234567");

    assert_eq!(cache.get(&k).await.unwrap(), None);

    cache
        .set(k.clone(), route("https://prod.example.com/hook"))
        .await
        .unwrap();
    assert_eq!(
        cache.get(&k).await.unwrap(),
        Some(route("https://prod.example.com/hook"))
    );

    assert!(cache.delete(&k).await.unwrap());
    assert_eq!(cache.get(&k).await.unwrap(), None);
}

#[tokio::test]
async fn test_deleting_missing_key_is_noop() {
    let cache = InMemoryResolutionCache::default();
    assert!(!cache.delete(&key("acme", "1")).await.unwrap());

    let stats = cache.statistics().await.unwrap();
    assert_eq!(stats.evictions, 0);
}

#[tokio::test]
async fn test_set_overwrites_existing_entry() {
    let cache = InMemoryResolutionCache::default();
    let k = key("acme", "1");

    cache.set(k.clone(), route("https://a.example.com")).await.unwrap();
    cache.set(k.clone(), route("https://b.example.com")).await.unwrap();

    let cached = cache.get(&k).await.unwrap().unwrap();
    assert_eq!(cached.target_url, "https://b.example.com");
}

#[tokio::test]
async fn test_expired_entries_are_not_returned() {
    let cache = InMemoryResolutionCache::new(Duration::ZERO);
    let k = key("acme", "1");

    cache.set(k.clone(), route("https://a.example.com")).await.unwrap();

    assert_eq!(cache.get(&k).await.unwrap(), None);
    let stats = cache.statistics().await.unwrap();
    assert_eq!(stats.expired_removed, 1);
    assert_eq!(stats.entries, 0);
}

#[tokio::test]
async fn test_delete_vendor_only_touches_that_vendor() {
    let cache = InMemoryResolutionCache::default();
    cache.set(key("acme", "1"), route("https://a")).await.unwrap();
    cache.set(key("acme", "2"), route("https://a")).await.unwrap();
    cache.set(key("globex", "1"), route("https://g")).await.unwrap();

    let removed = cache
        .delete_vendor(&VendorCode::new("acme").unwrap())
        .await
        .unwrap();

    assert_eq!(removed, 2);
    assert_eq!(cache.get(&key("acme", "1")).await.unwrap(), None);
    assert!(cache.get(&key("globex", "1")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_statistics_track_hits_and_misses() {
    let cache = InMemoryResolutionCache::default();
    let k = key("acme", "1");

    cache.get(&k).await.unwrap();
    cache.set(k.clone(), route("https://a")).await.unwrap();
    cache.get(&k).await.unwrap();
    cache.get(&k).await.unwrap();

    let stats = cache.statistics().await.unwrap();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entries, 1);
    assert!((stats.hit_ratio - 2.0 / 3.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_clones_share_entries() {
    let cache = InMemoryResolutionCache::default();
    let other = cache.clone();
    let k = key("acme", "1");

    cache.set(k.clone(), route("https://a")).await.unwrap();

    assert!(other.get(&k).await.unwrap().is_some());
}

fn held(cache: &InMemoryResolutionCache) -> usize {
    cache.entries.read().unwrap().len()
}

#[tokio::test]
async fn test_cleanup_expired_releases_entries() {
    let cache = InMemoryResolutionCache::new(Duration::from_millis(10));
    for sender in 0..100 {
        cache
            .set(key("acme", &sender.to_string()), route("https://a.example.com"))
            .await
            .unwrap();
    }

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(cache.cleanup_expired().unwrap(), 100);
    assert_eq!(held(&cache), 0);
    assert_eq!(cache.statistics().await.unwrap().expired_removed, 100);
}

#[tokio::test]
async fn test_cleanup_keeps_live_entries() {
    let cache = InMemoryResolutionCache::default();
    cache
        .set(key("acme", "1"), route("https://a.example.com"))
        .await
        .unwrap();

    assert_eq!(cache.cleanup_expired().unwrap(), 0);
    assert_eq!(held(&cache), 1);
}

#[tokio::test]
async fn test_distinct_senders_do_not_grow_cache_unbounded() {
    let cache = InMemoryResolutionCache::new(Duration::from_millis(10));
    for sender in 0..REAP_THRESHOLD {
        cache
            .set(key("acme", &sender.to_string()), route("https://a.example.com"))
            .await
            .unwrap();
    }

    tokio::time::sleep(Duration::from_millis(50)).await;

    cache
        .set(key("acme", "fresh"), route("https://a.example.com"))
        .await
        .unwrap();

    assert_eq!(held(&cache), 1);
    assert_eq!(
        cache.statistics().await.unwrap().expired_removed,
        REAP_THRESHOLD as u64
    );
}
