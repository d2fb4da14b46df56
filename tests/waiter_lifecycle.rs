//! End-to-end token lifecycle on isolated registries.

use std::sync::Arc;
use std::time::Duration;

use test_waiters::bridge::{install_legacy_bridge, LegacyTestRunner, SettledCallback};
use test_waiters::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("test_waiters=trace")
        .with_test_writer()
        .try_init();
}

/// Component-like object used as a token.
#[derive(Debug)]
struct Component {
    id: u32,
}

#[test]
fn test_object_token_lifecycle() {
    init_tracing();
    let registry = WaiterRegistry::new();
    let waiter = TestWaiter::new("component", &registry);
    let component = Arc::new(Component { id: 1 });

    let token = waiter
        .begin_async(Some(Token::object(component.clone())), Some("didInsertElement"))
        .unwrap();
    assert_eq!(token.kind(), TokenKind::Identity);

    // A different object with the same contents is a different token.
    let twin = Arc::new(Component { id: 1 });
    assert!(waiter
        .end_async(&Token::object(twin.clone()))
        .unwrap_err()
        .is_missing_begin());
    assert_eq!(twin.id, component.id);

    let again = waiter.begin_async(Some(Token::object(component.clone())), None);
    assert!(again.unwrap_err().is_already_pending());

    waiter.end_async(&token).unwrap();
    waiter.end_async(&Token::object(component)).unwrap();
    assert!(waiter.wait_until());
}

#[test]
fn test_error_reports_waiter_and_token() {
    let registry = WaiterRegistry::new();
    let waiter = TestWaiter::new("settings", &registry);
    waiter.begin_async(Some(Token::from("save")), None).unwrap();

    let err = waiter.begin_async(Some(Token::from("save")), None).unwrap_err();
    assert_eq!(err.waiter(), "settings");
    assert!(err.to_string().contains("\"save\""));
    assert!(matches!(err, Error::AlreadyPending { .. }));
}

#[test]
fn test_report_lists_pending_items() {
    let registry = WaiterRegistry::new();
    let waiter = TestWaiter::new("uploads", &registry);
    waiter.begin_async(Some(Token::from(7)), Some("avatar.png")).unwrap();

    let report = registry.pending_waiter_state().to_string();
    assert!(report.starts_with("1 pending waiter(s)"));
    assert!(report.contains("uploads:"));
    assert!(report.contains("avatar.png (7)"));

    waiter.reset();
    assert_eq!(registry.pending_waiter_state().to_string(), "no pending waiters");
}

#[tokio::test]
async fn test_end_from_spawned_tasks() {
    init_tracing();
    let registry = WaiterRegistry::new();
    let waiter = TestWaiter::new("requests", &registry);

    let mut handles = Vec::new();
    for i in 0..8_u64 {
        let token = waiter.begin_labeled("request").unwrap();
        let worker = waiter.clone();
        handles.push(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(i)).await;
            worker.end_async(&token).unwrap();
        }));
    }

    assert_eq!(registry.pending_waiter_state().waiters["requests"].items().len(), 8);
    for handle in handles {
        handle.await.unwrap();
    }
    assert!(!registry.has_pending_waiters());
    registry.reset();
}

#[tokio::test]
async fn test_legacy_runner_polls_until_settled() {
    struct Runner(parking_lot::Mutex<Option<SettledCallback>>);

    impl LegacyTestRunner for Runner {
        fn is_test_mode(&self) -> bool {
            true
        }

        fn register_waiter(&self, callback: SettledCallback) {
            *self.0.lock() = Some(callback);
        }
    }

    let runner = Runner(parking_lot::Mutex::new(None));
    let registry = WaiterRegistry::new();
    assert!(install_legacy_bridge(&runner, &registry));

    let waiter = TestWaiter::new("timer", &registry);
    let fut = wait_for_future(
        waiter.clone(),
        tokio::time::sleep(Duration::from_millis(10)),
        Some("timer"),
    )
    .unwrap();
    let task = tokio::spawn(fut);

    let settled = || runner.0.lock().as_ref().is_some_and(|cb| cb());
    assert!(!settled());

    task.await.unwrap().unwrap();
    assert!(settled());
    registry.reset();
}
