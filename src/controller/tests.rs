//! Tests for controller module

use super::*;
use crate::config::PagerConfig;
use crate::error::{Error, Result};
use crate::fetcher::{loader_fn, PageLoader};
use crate::pagination::Seed;
use crate::projector::Snapshot;
use crate::types::{PageRequest, PageResult};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

// ============================================================================
// Test Loaders
// ============================================================================

type Reply = oneshot::Sender<Result<PageResult<u32>>>;

/// Loader whose calls are answered by the test, one at a time
struct GatedLoader {
    calls: mpsc::UnboundedSender<(PageRequest, Reply)>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

#[async_trait]
impl PageLoader<u32> for GatedLoader {
    async fn load_page(&self, request: PageRequest) -> Result<PageResult<u32>> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        let (tx, rx) = oneshot::channel();
        let _ = self.calls.send((request, tx));
        let outcome = rx
            .await
            .unwrap_or_else(|_| Err(Error::Other("reply dropped".to_string())));

        self.active.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

fn gated() -> (
    GatedLoader,
    mpsc::UnboundedReceiver<(PageRequest, Reply)>,
    Arc<AtomicUsize>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let max_active = Arc::new(AtomicUsize::new(0));
    let loader = GatedLoader {
        calls: tx,
        active: Arc::new(AtomicUsize::new(0)),
        max_active: Arc::clone(&max_active),
    };
    (loader, rx, max_active)
}

fn items(offset: u64, count: u64) -> Vec<u32> {
    (offset..offset + count).map(|i| i as u32).collect()
}

/// Loader serving `total` sequential integers with the total count attached
fn dataset(total: u64) -> impl PageLoader<u32> {
    loader_fn(move |req: PageRequest| async move {
        let end = (req.offset + u64::from(req.limit)).min(total);
        let count = end.saturating_sub(req.offset);
        Ok::<_, Error>(PageResult::new(items(req.offset, count), total))
    })
}

fn config(page_size: u32) -> PagerConfig {
    PagerConfig::builder().page_size(page_size).build().unwrap()
}

async fn settle(controller: &Controller<u32>) -> Snapshot<u32> {
    tokio::time::timeout(Duration::from_secs(5), controller.settled())
        .await
        .expect("controller did not settle")
}

async fn next_call(
    calls: &mut mpsc::UnboundedReceiver<(PageRequest, Reply)>,
) -> (PageRequest, Reply) {
    tokio::time::timeout(Duration::from_secs(5), calls.recv())
        .await
        .expect("loader was not called")
        .expect("loader dropped")
}

async fn let_tasks_run() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

// ============================================================================
// Mount Tests
// ============================================================================

#[tokio::test]
async fn test_mount_starts_blank() {
    let controller = tokio_test::assert_ok!(Controller::mount(config(10), dataset(25)));

    let snapshot = controller.snapshot();
    assert!(snapshot.is_blank());
    assert!(snapshot.has_more);
    assert!(controller.is_mounted());
    assert_eq!(controller.load_calls(), 0);
}

#[tokio::test]
async fn test_mount_rejects_invalid_config() {
    let mut config = PagerConfig::default();
    config.page_size = 0;

    let result = Controller::mount(config, dataset(25));
    assert!(matches!(
        tokio_test::assert_err!(result),
        Error::InvalidConfigValue { .. }
    ));
}

#[test]
fn test_mount_without_runtime_fails() {
    let result = Controller::mount(PagerConfig::default(), dataset(25));
    assert!(matches!(tokio_test::assert_err!(result), Error::Config { .. }));
}

// ============================================================================
// Fetch Tests
// ============================================================================

#[tokio::test]
async fn test_successive_pages_until_exhausted() {
    let controller = Controller::mount(config(10), dataset(25)).unwrap();
    let mut lengths = Vec::new();

    while controller.request_next_page() {
        lengths.push(settle(&controller).await.len());
    }

    assert_eq!(lengths, vec![10, 20, 25]);
    let snapshot = controller.snapshot();
    assert!(!snapshot.has_more);
    assert_eq!(snapshot.visible_items.as_slice(), items(0, 25).as_slice());
    assert!(!controller.request_next_page());
    assert_eq!(controller.load_calls(), 3);
}

#[tokio::test]
async fn test_rapid_triggers_issue_one_request() {
    let (loader, mut calls, max_active) = gated();
    let controller = Controller::mount(config(10), loader).unwrap();

    assert!(controller.request_next_page());
    assert!(!controller.request_next_page());
    assert!(!controller.request_next_page());
    assert!(controller.snapshot().loading);

    let (request, reply) = next_call(&mut calls).await;
    assert_eq!(request, PageRequest::new(0, 10, 1));
    assert!(calls.try_recv().is_err());

    reply.send(Ok(PageResult::new(items(0, 10), 100))).unwrap();
    let snapshot = settle(&controller).await;

    assert_eq!(snapshot.len(), 10);
    assert_eq!(controller.load_calls(), 1);
    assert_eq!(max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_triggers_from_many_tasks() {
    let (loader, mut calls, max_active) = gated();
    let controller = Controller::mount(config(10), loader).unwrap();

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let controller = controller.clone();
            tokio::spawn(async move { controller.request_next_page() })
        })
        .collect();

    let mut issued = 0;
    for handle in handles {
        if handle.await.unwrap() {
            issued += 1;
        }
    }

    assert_eq!(issued, 1);
    let (_, reply) = next_call(&mut calls).await;
    reply.send(Ok(PageResult::new(items(0, 10), 100))).unwrap();
    settle(&controller).await;

    assert_eq!(controller.load_calls(), 1);
    assert_eq!(max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_warm_start_continues_after_seed() {
    let (loader, mut calls, _) = gated();
    let controller = Controller::builder(loader)
        .config(config(20))
        .seed(Seed::new(items(0, 40)).with_total(1302))
        .mount()
        .unwrap();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.len(), 40);
    assert!(snapshot.has_more);
    assert!(!snapshot.loading);

    controller.request_next_page();
    let (request, reply) = next_call(&mut calls).await;
    assert_eq!(request, PageRequest::new(40, 20, 3));

    reply.send(Ok(PageResult::new(items(40, 20), 1302))).unwrap();
    assert_eq!(settle(&controller).await.len(), 60);
}

#[tokio::test]
async fn test_subscribers_see_loading_then_settled() {
    let controller = Controller::mount(config(5), dataset(5)).unwrap();
    let mut rx = controller.subscribe();

    controller.request_next_page();
    let loading = rx.borrow_and_update().clone();
    assert!(loading.loading);

    rx.changed().await.unwrap();
    let done = rx.borrow_and_update().clone();
    assert!(!done.loading);
    assert_eq!(done.len(), 5);
    assert!(!done.has_more);
}

// ============================================================================
// Failure and Retry Tests
// ============================================================================

#[tokio::test]
async fn test_failure_then_retry_recovers() {
    let (loader, mut calls, _) = gated();
    let controller = Controller::mount(config(10), loader).unwrap();

    controller.request_next_page();
    let (_, reply) = next_call(&mut calls).await;
    reply.send(Ok(PageResult::new(items(0, 10), 30))).unwrap();
    settle(&controller).await;

    controller.request_next_page();
    let (failed, reply) = next_call(&mut calls).await;
    reply.send(Err(Error::load(2, 10, "offline"))).unwrap();
    let snapshot = settle(&controller).await;

    assert_eq!(snapshot.len(), 10);
    assert!(snapshot.has_more);
    let error = snapshot.error.unwrap();
    assert_eq!(error.message, "Failed to load page 2 (offset 10): offline");
    assert!(error.retryable);

    let public = controller.public_state();
    assert!(public.snapshot.error.is_some());
    assert!(public.retry.retry());
    assert!(controller.snapshot().error.is_none());

    let (retried, reply) = next_call(&mut calls).await;
    assert_eq!(retried, failed);
    reply.send(Ok(PageResult::new(items(10, 10), 30))).unwrap();

    let snapshot = settle(&controller).await;
    assert_eq!(snapshot.len(), 20);
    assert!(snapshot.error.is_none());
    assert_eq!(controller.load_calls(), 3);
}

#[tokio::test]
async fn test_retry_when_not_failed_is_noop() {
    let controller = Controller::mount(config(10), dataset(25)).unwrap();
    assert!(!controller.retry());
    assert!(!controller.public_state().retry.retry());
    assert_eq!(controller.load_calls(), 0);
}

#[tokio::test]
async fn test_loader_panic_becomes_error() {
    let loader = loader_fn(|req: PageRequest| async move {
        if req.page > 0 {
            panic!("loader bug");
        }
        Ok::<_, Error>(PageResult::<u32>::without_total(vec![]))
    });
    let controller = Controller::mount(config(10), loader).unwrap();

    controller.request_next_page();
    let snapshot = settle(&controller).await;

    assert_eq!(
        snapshot.error.map(|e| e.message),
        Some("page loader panicked".to_string())
    );
    assert!(controller.is_mounted());
}

// ============================================================================
// Reset and Unmount Tests
// ============================================================================

#[tokio::test]
async fn test_reset_discards_in_flight_result() {
    let (loader, mut calls, _) = gated();
    let controller = Controller::mount(config(10), loader).unwrap();

    controller.request_next_page();
    let (_, reply) = next_call(&mut calls).await;

    controller.reset(None);
    let _ = reply.send(Ok(PageResult::new(items(0, 10), 100)));
    let_tasks_run().await;

    let snapshot = controller.snapshot();
    assert!(snapshot.is_blank());
    assert!(snapshot.has_more);

    controller.request_next_page();
    let (request, reply) = next_call(&mut calls).await;
    assert_eq!(request, PageRequest::new(0, 10, 1));
    reply.send(Ok(PageResult::new(items(0, 10), 100))).unwrap();
    assert_eq!(settle(&controller).await.len(), 10);
}

#[tokio::test]
async fn test_reset_with_seed() {
    let controller = Controller::mount(config(10), dataset(25)).unwrap();
    controller.request_next_page();
    settle(&controller).await;

    controller.reset(Some(Seed::new(items(0, 20)).with_total(25)));
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.len(), 20);

    controller.request_next_page();
    let snapshot = settle(&controller).await;
    assert_eq!(snapshot.len(), 25);
    assert!(!snapshot.has_more);
}

#[tokio::test]
async fn test_unmount_discards_late_result() {
    let (loader, mut calls, _) = gated();
    let controller = Controller::mount(config(10), loader).unwrap();

    controller.request_next_page();
    let (_, reply) = next_call(&mut calls).await;

    controller.unmount();
    let _ = reply.send(Ok(PageResult::new(items(0, 10), 100)));
    let_tasks_run().await;

    let snapshot = controller.snapshot();
    assert!(snapshot.is_empty());
    assert!(!snapshot.loading);
    assert!(!controller.is_mounted());
    assert!(!controller.request_next_page());
    assert!(!controller.retry());
    assert_eq!(controller.load_calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unmount_racing_trigger_never_leaves_loading() {
    for _ in 0..200 {
        let loader =
            loader_fn(|_req: PageRequest| futures::future::pending::<Result<PageResult<u32>>>());
        let controller = Controller::mount(config(10), loader).unwrap();

        let trigger = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.request_next_page() })
        };
        let unmount = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.unmount() })
        };
        trigger.await.unwrap();
        unmount.await.unwrap();

        let snapshot = controller.snapshot();
        assert!(!snapshot.loading);
        assert!(!controller.is_mounted());
    }
}

#[tokio::test]
async fn test_unmount_is_idempotent() {
    let controller = Controller::mount(config(10), dataset(25)).unwrap();
    controller.unmount();
    controller.unmount();
    controller.reset(None);
    assert!(!controller.is_mounted());
}

#[tokio::test]
async fn test_retry_handle_outlives_controller() {
    let controller = Controller::mount(config(10), dataset(25)).unwrap();
    let retry = controller.public_state().retry;
    drop(controller);
    assert!(!retry.retry());
}

// ============================================================================
// Debug View Tests
// ============================================================================

#[tokio::test]
async fn test_debug_view_disabled_by_default() {
    let controller = Controller::mount(config(10), dataset(25)).unwrap();
    assert!(controller.debug_view().is_none());
    assert!(controller.snapshot().debug.is_none());
}

#[tokio::test]
async fn test_debug_view_tracks_counters() {
    let config = PagerConfig::builder().page_size(10).debug(true).build().unwrap();
    let controller = Controller::mount(config, dataset(25)).unwrap();

    controller.request_next_page();
    settle(&controller).await;

    let view = controller.debug_view().unwrap();
    assert_eq!(view.cursor, 2);
    assert_eq!(view.fetched_count, 10);
    assert_eq!(view.total_count, Some(25));
    assert_eq!(view.pages_loaded, 1);
    assert_eq!(controller.snapshot().debug, Some(view));
}
