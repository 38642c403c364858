//! Review session coordinator: availability, primary review, store listing and
//! the correlated alternate-review callback.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{FakeProvider, PACKAGE_ID, attached, build};
use store_review::error::{Missing, ReviewError};
use store_review::outcome::{ALTERNATE_REVIEW_ACTION, ALTERNATE_REVIEW_PACKAGE};
use store_review::platform::Surface;
use store_review::probe::EnvironmentSnapshot;
use store_review::session::SessionOptions;
use tokio_test::{assert_pending, assert_ready};

// ---------------------------------------------------------------------------
// is_available
// ---------------------------------------------------------------------------

#[tokio::test]
async fn available_when_environment_met_and_token_fetched() {
    let h = attached(FakeProvider::succeeding(), EnvironmentSnapshot::all_met());

    assert!(h.session.is_available().await);
    assert!(h.session.tokens().is_warm());

    // The warmed token is used directly: no second fetch.
    h.session.request_review().await.unwrap();
    assert_eq!(h.provider.fetch_count(), 1);
    assert_eq!(h.provider.launch_count(), 1);
}

#[tokio::test]
async fn any_unmet_precondition_answers_false_without_fetching() {
    let variants = [
        EnvironmentSnapshot {
            provider_package_installed: false,
            ..EnvironmentSnapshot::all_met()
        },
        EnvironmentSnapshot {
            provider_services_reachable: false,
            ..EnvironmentSnapshot::all_met()
        },
        EnvironmentSnapshot {
            platform_version_sufficient: false,
            ..EnvironmentSnapshot::all_met()
        },
    ];
    for env in variants {
        let h = attached(FakeProvider::succeeding(), env);
        assert!(!h.session.is_available().await, "{env:?}");
        assert_eq!(h.provider.fetch_count(), 0, "{env:?}");
    }
}

#[tokio::test]
async fn unavailable_without_context_or_surface() {
    let h = build(
        FakeProvider::succeeding(),
        EnvironmentSnapshot::all_met(),
        SessionOptions::default(),
        false,
    );
    assert!(!h.session.is_available().await);
    assert_eq!(h.provider.fetch_count(), 0);
}

#[tokio::test]
async fn unavailable_after_surface_detaches() {
    let h = attached(FakeProvider::succeeding(), EnvironmentSnapshot::all_met());
    h.binding().on_detached_for_config_changes();
    assert!(!h.session.is_available().await);

    h.binding()
        .on_reattached_for_config_changes(Surface::new("rotated"));
    assert!(h.session.is_available().await);
}

#[tokio::test]
async fn provider_decline_answers_false() {
    let h = attached(FakeProvider::declining(), EnvironmentSnapshot::all_met());
    assert!(!h.session.is_available().await);
    assert_eq!(h.provider.fetch_count(), 1);
}

// ---------------------------------------------------------------------------
// request_review
// ---------------------------------------------------------------------------

#[tokio::test]
async fn request_review_without_binding_is_an_error() {
    let h = build(
        FakeProvider::succeeding(),
        EnvironmentSnapshot::all_met(),
        SessionOptions::default(),
        false,
    );
    let err = h.session.request_review().await.unwrap_err();
    assert!(matches!(
        err,
        ReviewError::Unbound {
            missing: Missing::Context
        }
    ));
    assert!(err.to_string().starts_with("context/activity not available"));
    assert_eq!(h.provider.fetch_count(), 0);
}

#[tokio::test]
async fn request_review_reports_missing_activity() {
    let h = attached(FakeProvider::succeeding(), EnvironmentSnapshot::all_met());
    h.binding().on_detached_from_surface();
    let err = h.session.request_review().await.unwrap_err();
    assert!(matches!(
        err,
        ReviewError::Unbound {
            missing: Missing::Activity
        }
    ));
}

#[tokio::test]
async fn request_review_fetches_when_cold() {
    let h = attached(FakeProvider::succeeding(), EnvironmentSnapshot::all_met());
    h.session.request_review().await.unwrap();
    assert_eq!(h.provider.fetch_count(), 1);
    let launched = h.provider.launched_with.lock().unwrap().clone();
    assert_eq!(launched, vec![("main".to_string(), "token-0".to_string())]);
}

#[tokio::test]
async fn request_review_reports_unavailable_api() {
    let h = attached(FakeProvider::declining(), EnvironmentSnapshot::all_met());
    let err = h.session.request_review().await.unwrap_err();
    assert!(matches!(err, ReviewError::ProviderUnavailable));
    assert_eq!(h.provider.launch_count(), 0);
}

#[tokio::test]
async fn request_review_rechecks_surface_after_fetch() {
    let h = attached(FakeProvider::gated(), EnvironmentSnapshot::all_met());

    let session = h.session.clone();
    let task = tokio::spawn(async move { session.request_review().await });
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    h.binding().on_detached_from_surface();
    h.provider.release();

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        ReviewError::Unbound {
            missing: Missing::Activity
        }
    ));
    assert_eq!(h.provider.launch_count(), 0);
}

// ---------------------------------------------------------------------------
// open_store_listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_listing_opens_canonical_url() {
    let h = attached(FakeProvider::succeeding(), EnvironmentSnapshot::all_met());
    h.session.open_store_listing().await.unwrap();
    let urls = h.navigator.urls.lock().unwrap().clone();
    assert_eq!(
        urls,
        vec![format!(
            "https://play.google.com/store/apps/details?id={PACKAGE_ID}"
        )]
    );
}

#[tokio::test]
async fn store_listing_uses_configured_storefront() {
    let options = SessionOptions {
        storefront_domain: "store.example.org".to_string(),
        ..SessionOptions::default()
    };
    let h = build(
        FakeProvider::succeeding(),
        EnvironmentSnapshot::all_met(),
        options,
        true,
    );
    h.session.open_store_listing().await.unwrap();
    assert!(h.navigator.urls.lock().unwrap()[0].starts_with("https://store.example.org/"));
}

#[tokio::test]
async fn store_listing_needs_binding() {
    let h = build(
        FakeProvider::succeeding(),
        EnvironmentSnapshot::all_met(),
        SessionOptions::default(),
        false,
    );
    assert!(matches!(
        h.session.open_store_listing().await,
        Err(ReviewError::Unbound { .. })
    ));
    assert!(h.navigator.urls.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// request_alternate_review + on_activity_result
// ---------------------------------------------------------------------------

#[tokio::test]
async fn alternate_launch_failure_answers_false() {
    let h = attached(FakeProvider::succeeding(), EnvironmentSnapshot::all_met());
    h.launcher.fail.store(true, Ordering::SeqCst);

    assert!(!h.session.request_alternate_review().await.unwrap());
    assert!(!h.session.is_awaiting_alternate());
}

#[tokio::test]
async fn alternate_without_surface_answers_false() {
    let h = build(
        FakeProvider::succeeding(),
        EnvironmentSnapshot::all_met(),
        SessionOptions::default(),
        false,
    );
    assert!(!h.session.request_alternate_review().await.unwrap());
    assert!(!h.session.is_awaiting_alternate());
}

#[tokio::test]
async fn alternate_user_cancel_resolves_failure() {
    let h = attached(FakeProvider::succeeding(), EnvironmentSnapshot::all_met());

    let mut fut = tokio_test::task::spawn(h.session.request_alternate_review());
    assert_pending!(fut.poll());
    // The pending entry is in place before control returns to the host.
    assert!(h.session.is_awaiting_alternate());

    assert!(h.session.on_activity_result(1001, 108));
    let outcome = assert_ready!(fut.poll());
    match outcome {
        Err(ReviewError::Provider { code, message }) => {
            assert_eq!(code, "108");
            assert_eq!(message, "user canceled");
        }
        other => panic!("expected provider failure, got {other:?}"),
    }
    assert!(!h.session.is_awaiting_alternate());
}

#[tokio::test]
async fn alternate_ok_resolves_true() {
    let h = attached(FakeProvider::succeeding(), EnvironmentSnapshot::all_met());

    let mut fut = tokio_test::task::spawn(h.session.request_alternate_review());
    assert_pending!(fut.poll());
    assert!(h.session.on_activity_result(1001, -1));
    assert!(assert_ready!(fut.poll()).unwrap());

    let intents = h.launcher.intents.lock().unwrap().clone();
    assert_eq!(intents.len(), 1);
    assert_eq!(intents[0].action, ALTERNATE_REVIEW_ACTION);
    assert_eq!(intents[0].package, ALTERNATE_REVIEW_PACKAGE);
    assert_eq!(intents[0].request_code, 1001);
}

#[tokio::test]
async fn unmatched_request_code_leaves_request_pending() {
    let h = attached(FakeProvider::succeeding(), EnvironmentSnapshot::all_met());

    let mut fut = tokio_test::task::spawn(h.session.request_alternate_review());
    assert_pending!(fut.poll());

    assert!(!h.session.on_activity_result(42, -1));
    assert_pending!(fut.poll());
    assert!(h.session.is_awaiting_alternate());

    assert!(h.session.on_activity_result(1001, 103));
    assert!(assert_ready!(fut.poll()).unwrap());
}

#[tokio::test]
async fn callback_while_idle_is_dropped() {
    let h = attached(FakeProvider::succeeding(), EnvironmentSnapshot::all_met());
    assert!(!h.session.on_activity_result(1001, -1));
    assert!(!h.session.is_awaiting_alternate());
}

#[tokio::test]
async fn duplicate_callback_is_dropped() {
    let h = attached(FakeProvider::succeeding(), EnvironmentSnapshot::all_met());

    let mut fut = tokio_test::task::spawn(h.session.request_alternate_review());
    assert_pending!(fut.poll());
    assert!(h.session.on_activity_result(1001, 102));
    assert!(!h.session.on_activity_result(1001, 108));
    assert!(assert_ready!(fut.poll()).unwrap());
}

#[tokio::test]
async fn second_alternate_request_is_rejected_while_pending() {
    let h = attached(FakeProvider::succeeding(), EnvironmentSnapshot::all_met());

    let mut first = tokio_test::task::spawn(h.session.request_alternate_review());
    assert_pending!(first.poll());

    let err = h.session.request_alternate_review().await.unwrap_err();
    assert!(matches!(
        err,
        ReviewError::AlreadyPending { request_code: 1001 }
    ));
    // Only the first launch reached the storefront.
    assert_eq!(h.launcher.intents.lock().unwrap().len(), 1);

    assert!(h.session.on_activity_result(1001, -1));
    assert!(assert_ready!(first.poll()).unwrap());
}

#[tokio::test]
async fn dropped_alternate_request_frees_the_request_code() {
    let h = attached(FakeProvider::succeeding(), EnvironmentSnapshot::all_met());

    let mut abandoned = tokio_test::task::spawn(h.session.request_alternate_review());
    assert_pending!(abandoned.poll());
    assert!(h.session.is_awaiting_alternate());

    drop(abandoned);
    assert!(!h.session.is_awaiting_alternate());
    // The stale callback finds nothing to resolve.
    assert!(!h.session.on_activity_result(1001, -1));

    let mut retry = tokio_test::task::spawn(h.session.request_alternate_review());
    assert_pending!(retry.poll());
    assert_eq!(h.launcher.intents.lock().unwrap().len(), 2);

    assert!(h.session.on_activity_result(1001, 102));
    assert!(assert_ready!(retry.poll()).unwrap());
    assert!(!h.session.is_awaiting_alternate());
}

#[tokio::test]
async fn alternate_request_times_out() {
    let options = SessionOptions {
        alternate_timeout: Some(Duration::from_millis(20)),
        ..SessionOptions::default()
    };
    let h = build(
        FakeProvider::succeeding(),
        EnvironmentSnapshot::all_met(),
        options,
        true,
    );

    let err = h.session.request_alternate_review().await.unwrap_err();
    assert!(matches!(err, ReviewError::Timeout(20)));
    assert!(!h.session.is_awaiting_alternate());
    // A late result finds nothing waiting.
    assert!(!h.session.on_activity_result(1001, -1));
}

#[tokio::test]
async fn cancel_pending_fails_waiting_request() {
    let h = attached(FakeProvider::succeeding(), EnvironmentSnapshot::all_met());

    let session = h.session.clone();
    let task = tokio::spawn(async move { session.request_alternate_review().await });
    while !h.session.is_awaiting_alternate() {
        tokio::task::yield_now().await;
    }
    h.session.cancel_pending();

    assert!(matches!(
        task.await.unwrap(),
        Err(ReviewError::Cancelled)
    ));
    assert!(!h.session.is_awaiting_alternate());

    // A fresh request after cancellation works normally.
    let mut fut = tokio_test::task::spawn(h.session.request_alternate_review());
    assert_pending!(fut.poll());
    assert!(h.session.on_activity_result(1001, -1));
    assert!(assert_ready!(fut.poll()).unwrap());
}

#[tokio::test]
async fn engine_detach_cancels_and_forgets_token() {
    let h = attached(FakeProvider::succeeding(), EnvironmentSnapshot::all_met());
    assert!(h.session.is_available().await);

    let session = h.session.clone();
    let task = tokio::spawn(async move { session.request_alternate_review().await });
    while !h.session.is_awaiting_alternate() {
        tokio::task::yield_now().await;
    }

    h.session.on_detached_from_engine();
    assert!(matches!(task.await.unwrap(), Err(ReviewError::Cancelled)));
    assert!(!h.session.tokens().is_warm());
    assert!(h.binding().context().is_none());
}

#[tokio::test]
async fn custom_request_code_is_honoured() {
    let options = SessionOptions {
        alternate_request_code: 7,
        ..SessionOptions::default()
    };
    let h = build(
        FakeProvider::succeeding(),
        EnvironmentSnapshot::all_met(),
        options,
        true,
    );

    let mut fut = tokio_test::task::spawn(h.session.request_alternate_review());
    assert_pending!(fut.poll());
    assert!(!h.session.on_activity_result(1001, -1));
    assert!(h.session.on_activity_result(7, 0));
    match assert_ready!(fut.poll()) {
        Err(ReviewError::Provider { code, message }) => {
            assert_eq!(code, "0");
            assert_eq!(message, "Internal Error");
        }
        other => panic!("expected provider failure, got {other:?}"),
    }
}
