//! Identity handling: the reserved empty identity, half-empty identities and
//! isolation between identities.

use keyjar::{BackendSelector, ErrorKind, Job};
use keyjar_integration_tests::{delete, memory_selector, random_password, read, write};

#[tokio::test]
async fn test_reserved_identity_is_never_found() {
    let selector = memory_selector();

    assert_eq!(write(&selector, "", "", b"pw").await.error(), ErrorKind::EntryNotFound);
    assert_eq!(read(&selector, "", "").await.error(), ErrorKind::EntryNotFound);
    assert_eq!(delete(&selector, "", "").await.error(), ErrorKind::EntryNotFound);
}

#[tokio::test]
async fn test_reserved_identity_without_backend() {
    // No backend at all still yields EntryNotFound: the check happens first.
    let selector = BackendSelector::unavailable();
    assert_eq!(read(&selector, "", "").await.error(), ErrorKind::EntryNotFound);
    assert_eq!(
        read(&selector, "svc", "").await.error(),
        ErrorKind::NoBackendAvailable
    );
}

#[tokio::test]
async fn test_half_empty_identities_are_independent() {
    let selector = memory_selector();

    assert!(write(&selector, "svc", "", b"service only").await.is_ok());
    assert!(write(&selector, "", "svc", b"key only").await.is_ok());

    assert_eq!(
        read(&selector, "svc", "").await.binary_data(),
        Some(&b"service only"[..])
    );
    assert_eq!(
        read(&selector, "", "svc").await.binary_data(),
        Some(&b"key only"[..])
    );
}

#[tokio::test]
async fn test_no_cross_contamination() {
    let selector = memory_selector();
    let ids = [
        ("svc-a", "user1"),
        ("svc-a", "user2"),
        ("svc-b", "user1"),
        ("svc-a/user1", ""),
        ("svc-a", "/user1"),
    ];

    for (i, (service, key)) in ids.iter().enumerate() {
        let payload = format!("secret-{i}");
        assert!(write(&selector, service, key, payload.as_bytes()).await.is_ok());
    }

    for (i, (service, key)) in ids.iter().enumerate() {
        let outcome = read(&selector, service, key).await;
        assert_eq!(outcome.text_data(), Some(format!("secret-{i}")), "{service}/{key}");
    }
}

#[tokio::test]
async fn test_concurrent_jobs_on_distinct_identities() {
    let selector = memory_selector();

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let mut job = Job::write(&selector, "concurrent");
            job.set_key(format!("user{i}"));
            job.set_text_data(&format!("pw{i}"));
            job.start()
        })
        .collect();
    for handle in &handles {
        assert!(handle.finished().await.is_ok());
    }

    let reads = (0..32).map(|i| {
        let selector = selector.clone();
        async move { read(&selector, "concurrent", &format!("user{i}")).await }
    });
    let outcomes = futures::future::join_all(reads).await;
    for (i, outcome) in outcomes.iter().enumerate() {
        assert_eq!(outcome.text_data(), Some(format!("pw{i}")));
    }
}

#[tokio::test]
async fn test_overlapping_writes_to_one_identity() {
    let selector = memory_selector();
    let payloads: Vec<Vec<u8>> = (0..8).map(|_| random_password(10_000)).collect();

    // All started before any is awaited.
    let handles: Vec<_> = payloads
        .iter()
        .map(|payload| {
            let mut job = Job::write(&selector, "overlap");
            job.set_key("user1");
            job.set_binary_data(payload.as_slice());
            job.start()
        })
        .collect();
    for handle in &handles {
        assert!(handle.finished().await.is_ok());
    }

    let outcome = read(&selector, "overlap", "user1").await;
    let stored = outcome.binary_data().unwrap();
    assert_eq!(payloads.iter().filter(|p| p.as_slice() == stored).count(), 1);
}

#[tokio::test]
async fn test_invalid_identity() {
    let selector = memory_selector();
    let outcome = write(&selector, "svc\0", "user", b"pw").await;
    assert_eq!(outcome.error(), ErrorKind::InvalidIdentity);
    assert!(!outcome.error_string().is_empty());
}
