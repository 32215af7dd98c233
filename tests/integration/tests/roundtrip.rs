//! Write / read / delete round trips through the job layer.
//!
//! Mirrors the keychain autotest matrix: several payload sizes, each stored
//! under an empty and two named accounts of the same service.

use keyjar::ErrorKind;
use keyjar_integration_tests::{
    capped_selector, delete, memory_selector, random_password, read, write, CAPACITY,
};

const USERNAMES: [&str; 3] = ["", "user1", "user2"];

fn rows() -> Vec<(&'static str, Vec<u8>)> {
    vec![
        ("normal", b"this is a password".to_vec()),
        ("1000", random_password(1000)),
        ("2000", random_password(2000)),
        ("3000", random_password(3000)),
        ("10000", random_password(10000)),
        ("18944", random_password(18944)),
    ]
}

#[tokio::test]
async fn test_matrix_round_trip() {
    let selector = memory_selector();

    for (tag, password) in rows() {
        let service = format!("QtKeychainTest-{tag}");

        for user in USERNAMES {
            let outcome = write(&selector, &service, user, &password).await;
            assert_eq!(outcome.error(), ErrorKind::NoError, "{tag}/{user}: {}", outcome.error_string());
        }

        for user in USERNAMES {
            let outcome = read(&selector, &service, user).await;
            assert_eq!(outcome.error(), ErrorKind::NoError, "{tag}/{user}");
            assert_eq!(outcome.binary_data(), Some(password.as_slice()), "{tag}/{user}");
        }

        for user in USERNAMES {
            let outcome = delete(&selector, &service, user).await;
            assert_eq!(outcome.error(), ErrorKind::NoError, "{tag}/{user}");
        }
    }
}

#[tokio::test]
async fn test_matrix_with_capacity_limit() {
    let selector = capped_selector();

    for (tag, password) in rows() {
        let service = format!("QtKeychainTest-{tag}");
        let fits = password.len() <= CAPACITY;

        for user in USERNAMES {
            let outcome = write(&selector, &service, user, &password).await;
            if fits {
                assert_eq!(outcome.error(), ErrorKind::NoError, "{tag}/{user}");
            } else {
                assert_eq!(outcome.error(), ErrorKind::OtherError, "{tag}/{user}");
                assert!(outcome.error_string().contains("too large"));
            }
        }

        for user in USERNAMES {
            let outcome = read(&selector, &service, user).await;
            if fits {
                assert_eq!(outcome.binary_data(), Some(password.as_slice()));
            } else {
                // Nothing was stored, not even a truncated prefix.
                assert_eq!(outcome.error(), ErrorKind::EntryNotFound);
                assert_eq!(outcome.binary_data(), None);
            }
        }
    }
}

#[tokio::test]
async fn test_size_boundary() {
    let selector = capped_selector();

    let at_limit = random_password(CAPACITY);
    assert!(write(&selector, "boundary", "user", &at_limit).await.is_ok());
    assert_eq!(
        read(&selector, "boundary", "user").await.binary_data(),
        Some(at_limit.as_slice())
    );

    let over = random_password(CAPACITY + 1);
    let outcome = write(&selector, "boundary", "user", &over).await;
    assert_eq!(outcome.error(), ErrorKind::OtherError);

    // The failed write left the previous value untouched.
    assert_eq!(
        read(&selector, "boundary", "user").await.binary_data(),
        Some(at_limit.as_slice())
    );
}

#[tokio::test]
async fn test_binary_payload_round_trip() {
    let selector = memory_selector();
    let payload: Vec<u8> = (0..=255u8).chain([0, 0, 255]).collect();

    assert!(write(&selector, "binary", "blob", &payload).await.is_ok());
    let outcome = read(&selector, "binary", "blob").await;
    assert_eq!(outcome.binary_data(), Some(payload.as_slice()));
    assert_eq!(outcome.text_data(), None);
}

#[tokio::test]
async fn test_delete_removes() {
    let selector = memory_selector();

    assert!(write(&selector, "svc", "user1", b"pw").await.is_ok());
    assert!(delete(&selector, "svc", "user1").await.is_ok());

    let outcome = read(&selector, "svc", "user1").await;
    assert_eq!(outcome.error(), ErrorKind::EntryNotFound);
}

#[tokio::test]
async fn test_delete_missing_is_entry_not_found() {
    let selector = memory_selector();

    let outcome = delete(&selector, "svc", "never-written").await;
    assert_eq!(outcome.error(), ErrorKind::EntryNotFound);

    // Deleting twice behaves the same way.
    assert!(write(&selector, "svc", "once", b"pw").await.is_ok());
    assert!(delete(&selector, "svc", "once").await.is_ok());
    assert_eq!(
        delete(&selector, "svc", "once").await.error(),
        ErrorKind::EntryNotFound
    );
}

#[tokio::test]
async fn test_overwrite_keeps_last_value() {
    let selector = memory_selector();

    assert!(write(&selector, "svc", "user1", b"first").await.is_ok());
    assert!(write(&selector, "svc", "user1", b"second").await.is_ok());
    assert_eq!(
        read(&selector, "svc", "user1").await.binary_data(),
        Some(&b"second"[..])
    );
}
