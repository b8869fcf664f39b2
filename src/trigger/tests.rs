//! Tests for trigger module

use super::*;
use crate::config::{ObserverOptions, PagerConfig, RootMargin};
use crate::controller::Controller;
use crate::error::{Error, Result};
use crate::fetcher::loader_fn;
use crate::types::{PageRequest, PageResult};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Test Source
// ============================================================================

/// Source whose events are emitted by the test
#[derive(Default)]
struct FakeSource {
    observed: Mutex<Vec<ObserverOptions>>,
    callback: Mutex<Option<VisibilityCallback>>,
    rechecks: AtomicUsize,
    unobserves: AtomicUsize,
}

impl FakeSource {
    fn emit(&self, event: VisibilityEvent) {
        let callback = self.callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(event);
        }
    }

    fn last_options(&self) -> ObserverOptions {
        self.observed.lock().unwrap().last().cloned().unwrap()
    }

    fn observe_count(&self) -> usize {
        self.observed.lock().unwrap().len()
    }
}

impl VisibilitySource for FakeSource {
    fn observe(&self, options: &ObserverOptions, callback: VisibilityCallback) -> Result<()> {
        self.observed.lock().unwrap().push(options.clone());
        *self.callback.lock().unwrap() = Some(callback);
        Ok(())
    }

    fn unobserve(&self) {
        self.unobserves.fetch_add(1, Ordering::SeqCst);
        *self.callback.lock().unwrap() = None;
    }

    fn recheck(&self) {
        self.rechecks.fetch_add(1, Ordering::SeqCst);
    }
}

fn config(page_size: u32, bias: f64) -> PagerConfig {
    PagerConfig::builder()
        .page_size(page_size)
        .bias(bias)
        .observer(ObserverOptions::default().root_margin(RootMargin::bottom(100.0)))
        .build()
        .unwrap()
}

fn dataset(total: u64) -> impl crate::fetcher::PageLoader<u64> {
    loader_fn(move |req: PageRequest| async move {
        let end = (req.offset + u64::from(req.limit)).min(total);
        Ok::<_, Error>(PageResult::new((req.offset..end).collect(), total))
    })
}

async fn let_tasks_run() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

// ============================================================================
// Intersection Trigger Tests
// ============================================================================

#[tokio::test]
async fn test_attach_adds_bias_to_bottom_margin() {
    let controller = Controller::mount(config(10, 50.0), dataset(100)).unwrap();
    let source = Arc::new(FakeSource::default());

    let trigger = IntersectionTrigger::attach(&controller, source.clone()).unwrap();

    let options = source.last_options();
    assert_eq!(options.root_margin, RootMargin::bottom(150.0));
    assert_eq!(trigger.options(), options);
    assert!(trigger.is_active());
}

#[tokio::test]
async fn test_visible_sentinel_requests_next_page() {
    let controller = Controller::mount(config(10, 0.0), dataset(100)).unwrap();
    let source = Arc::new(FakeSource::default());
    let _trigger = IntersectionTrigger::attach(&controller, source.clone()).unwrap();

    source.emit(VisibilityEvent::visible(1.0));
    let snapshot = tokio::time::timeout(Duration::from_secs(5), controller.wait_for(|s| s.len() == 10))
        .await
        .unwrap();

    assert!(!snapshot.loading);
    assert_eq!(controller.load_calls(), 1);
}

#[tokio::test]
async fn test_hidden_sentinel_does_nothing() {
    let controller = Controller::mount(config(10, 0.0), dataset(100)).unwrap();
    let source = Arc::new(FakeSource::default());
    let _trigger = IntersectionTrigger::attach(&controller, source.clone()).unwrap();

    source.emit(VisibilityEvent::hidden());
    let_tasks_run().await;

    assert_eq!(controller.load_calls(), 0);
}

#[tokio::test]
async fn test_event_burst_issues_single_request() {
    let loader = loader_fn(|req: PageRequest| async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        Ok::<_, Error>(PageResult::new(vec![req.offset; req.limit as usize], 100))
    });
    let controller = Controller::mount(config(10, 0.0), loader).unwrap();
    let source = Arc::new(FakeSource::default());
    let _trigger = IntersectionTrigger::attach(&controller, source.clone()).unwrap();

    for _ in 0..20 {
        source.emit(VisibilityEvent::visible(1.0));
    }
    let_tasks_run().await;

    assert_eq!(controller.load_calls(), 1);
    assert!(controller.snapshot().loading);
}

#[tokio::test]
async fn test_settled_fetch_asks_source_to_recheck() {
    let controller = Controller::mount(config(10, 0.0), dataset(100)).unwrap();
    let source = Arc::new(FakeSource::default());
    let _trigger = IntersectionTrigger::attach(&controller, source.clone()).unwrap();

    source.emit(VisibilityEvent::visible(1.0));
    let_tasks_run().await;

    assert_eq!(controller.snapshot().len(), 10);
    assert_eq!(source.rechecks.load(Ordering::SeqCst), 1);
    assert_eq!(controller.load_calls(), 1);
}

#[tokio::test]
async fn test_exhausted_controller_ignores_visibility() {
    let controller = Controller::mount(config(10, 0.0), dataset(5)).unwrap();
    controller.request_next_page();
    controller.settled().await;
    assert!(!controller.snapshot().has_more);

    let source = Arc::new(FakeSource::default());
    let _trigger = IntersectionTrigger::attach(&controller, source.clone()).unwrap();
    source.emit(VisibilityEvent::visible(1.0));
    let_tasks_run().await;

    assert_eq!(controller.load_calls(), 1);
}

#[tokio::test]
async fn test_errored_controller_waits_for_retry() {
    let loader = loader_fn(|req: PageRequest| async move {
        Err::<PageResult<u64>, _>(Error::load(req.page, req.offset, "offline"))
    });
    let controller = Controller::mount(config(10, 0.0), loader).unwrap();
    let source = Arc::new(FakeSource::default());
    let _trigger = IntersectionTrigger::attach(&controller, source.clone()).unwrap();

    source.emit(VisibilityEvent::visible(1.0));
    let_tasks_run().await;
    source.emit(VisibilityEvent::visible(1.0));
    let_tasks_run().await;

    assert!(controller.snapshot().error.is_some());
    assert_eq!(controller.load_calls(), 1);
    assert_eq!(source.rechecks.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_reconfigure_recreates_observer() {
    let controller = Controller::mount(config(10, 25.0), dataset(100)).unwrap();
    let source = Arc::new(FakeSource::default());
    let trigger = IntersectionTrigger::attach(&controller, source.clone()).unwrap();

    let options = ObserverOptions::default()
        .root_margin(RootMargin::uniform(10.0))
        .threshold(vec![0.0, 0.5]);
    trigger.reconfigure(options).unwrap();

    assert_eq!(source.observe_count(), 2);
    assert_eq!(source.unobserves.load(Ordering::SeqCst), 1);
    let applied = source.last_options();
    assert_eq!(applied.root_margin.bottom.px, 35.0);
    assert_eq!(applied.root_margin.top.px, 10.0);
    assert_eq!(applied.threshold.ratios(), vec![0.0, 0.5]);

    trigger.reconfigure(trigger_options_without_bias(&applied)).unwrap();
    assert_eq!(source.observe_count(), 2);
}

fn trigger_options_without_bias(applied: &ObserverOptions) -> ObserverOptions {
    let mut options = applied.clone();
    options.root_margin.bottom.px -= 25.0;
    options
}

#[tokio::test]
async fn test_reconfigure_rejects_invalid_options() {
    let controller = Controller::mount(config(10, 0.0), dataset(100)).unwrap();
    let source = Arc::new(FakeSource::default());
    let trigger = IntersectionTrigger::attach(&controller, source.clone()).unwrap();

    let err = trigger
        .reconfigure(ObserverOptions::default().threshold(1.5))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfigValue { .. }));
    assert_eq!(source.observe_count(), 1);
}

#[tokio::test]
async fn test_detach_unobserves() {
    let controller = Controller::mount(config(10, 0.0), dataset(100)).unwrap();
    let source = Arc::new(FakeSource::default());
    let trigger = IntersectionTrigger::attach(&controller, source.clone()).unwrap();

    trigger.detach();
    source.emit(VisibilityEvent::visible(1.0));
    let_tasks_run().await;

    assert_eq!(source.unobserves.load(Ordering::SeqCst), 1);
    assert_eq!(controller.load_calls(), 0);
}

#[tokio::test]
async fn test_attach_to_unmounted_controller_fails() {
    let controller = Controller::mount(config(10, 0.0), dataset(100)).unwrap();
    controller.unmount();

    let result = IntersectionTrigger::attach(&controller, Arc::new(FakeSource::default()));
    assert!(matches!(result, Err(Error::NotMounted)));
}

// ============================================================================
// Viewport Source Tests
// ============================================================================

fn recorder() -> (VisibilityCallback, Arc<Mutex<Vec<VisibilityEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let callback: VisibilityCallback = Arc::new(move |event| sink.lock().unwrap().push(event));
    (callback, events)
}

#[test]
fn test_viewport_reports_on_observe() {
    let viewport = ViewportSource::new(Layout::list(300.0, 5, 30.0));
    let (callback, events) = recorder();

    viewport.observe(&ObserverOptions::default(), callback).unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].is_intersecting);
    assert_eq!(events[0].intersection_ratio, 1.0);
}

#[test]
fn test_viewport_root_margin_extends_reach() {
    // Sentinel at 400px, viewport 300px tall
    let layout = Layout::list(300.0, 10, 40.0);
    let viewport = ViewportSource::new(layout);
    let (callback, _) = recorder();

    viewport.observe(&ObserverOptions::default(), callback.clone()).unwrap();
    assert!(!viewport.current().unwrap().is_intersecting);

    let options = ObserverOptions::default().root_margin("0px 0px 100px 0px".parse().unwrap());
    viewport.observe(&options, callback).unwrap();
    assert!(viewport.current().unwrap().is_intersecting);
}

#[test]
fn test_viewport_percent_margin_resolves_against_height() {
    let viewport = ViewportSource::new(Layout::list(200.0, 5, 50.0));
    let (callback, _) = recorder();

    let options = ObserverOptions::default().root_margin("0px 0px 25% 0px".parse().unwrap());
    viewport.observe(&options, callback).unwrap();

    assert!(viewport.current().unwrap().is_intersecting);
}

#[test]
fn test_viewport_reports_only_on_crossing() {
    let viewport = ViewportSource::new(Layout::list(300.0, 20, 30.0));
    let (callback, events) = recorder();
    viewport.observe(&ObserverOptions::default(), callback).unwrap();

    viewport.scroll_to(50.0);
    viewport.scroll_to(100.0);
    viewport.scroll_to_end();
    viewport.scroll_by(-0.5);

    let recorded: Vec<bool> = events.lock().unwrap().iter().map(|e| e.is_intersecting).collect();
    assert_eq!(recorded, vec![false, true]);
}

#[test]
fn test_viewport_recheck_forces_report() {
    let viewport = ViewportSource::new(Layout::list(300.0, 2, 30.0));
    let (callback, events) = recorder();
    viewport.observe(&ObserverOptions::default(), callback).unwrap();

    viewport.recheck();
    viewport.recheck();

    assert_eq!(events.lock().unwrap().len(), 3);
}

#[test]
fn test_viewport_layout_change_hides_sentinel() {
    let viewport = ViewportSource::new(Layout::list(300.0, 5, 30.0));
    let (callback, events) = recorder();
    viewport.observe(&ObserverOptions::default(), callback).unwrap();

    viewport.set_layout(Layout::list(300.0, 20, 30.0));

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert!(!events[1].is_intersecting);
}

#[test]
fn test_viewport_threshold_requires_ratio() {
    let layout = Layout {
        viewport_height: 100.0,
        sentinel_top: 80.0,
        sentinel_height: 40.0,
    };
    let viewport = ViewportSource::new(layout);
    let (callback, _) = recorder();

    viewport
        .observe(&ObserverOptions::default().threshold(0.75), callback.clone())
        .unwrap();
    let event = viewport.current().unwrap();
    assert!(!event.is_intersecting);

    viewport
        .observe(&ObserverOptions::default().threshold(0.5), callback)
        .unwrap();
    let event = viewport.current().unwrap();
    assert!(event.is_intersecting);
    assert_eq!(event.intersection_ratio, 0.5);
}

#[test]
fn test_viewport_unknown_root_is_rejected() {
    let viewport = ViewportSource::named("feed", Layout::list(300.0, 0, 30.0));
    let (callback, _) = recorder();

    let err = viewport
        .observe(&ObserverOptions::with_root("sidebar"), callback.clone())
        .unwrap_err();
    assert!(matches!(err, Error::Observer { .. }));
    assert!(!viewport.is_observing());

    viewport
        .observe(&ObserverOptions::with_root("feed"), callback)
        .unwrap();
    assert!(viewport.is_observing());
}

#[test]
fn test_viewport_unobserve_stops_reports() {
    let viewport = ViewportSource::new(Layout::list(300.0, 20, 30.0));
    let (callback, events) = recorder();
    viewport.observe(&ObserverOptions::default(), callback).unwrap();

    viewport.unobserve();
    viewport.scroll_to_end();

    assert_eq!(events.lock().unwrap().len(), 1);
    assert!(viewport.current().is_none());
}

// ============================================================================
// End-to-End Tests
// ============================================================================

#[tokio::test]
async fn test_viewport_fills_then_loads_on_scroll() {
    let viewport = Arc::new(ViewportSource::new(Layout::list(300.0, 0, 30.0)));
    let rendered = Arc::clone(&viewport);

    // The loader stands in for rendering: rows appear as the page lands
    let loader = loader_fn(move |req: PageRequest| {
        let viewport = Arc::clone(&rendered);
        async move {
            let end = (req.offset + u64::from(req.limit)).min(100);
            viewport.set_layout(Layout::list(300.0, end as usize, 30.0));
            Ok::<_, Error>(PageResult::new((req.offset..end).collect::<Vec<u64>>(), 100))
        }
    });
    let controller = Controller::mount(config(5, 0.0), loader).unwrap();
    let _trigger = IntersectionTrigger::attach(&controller, viewport.clone()).unwrap();

    tokio::time::timeout(Duration::from_secs(5), controller.wait_for(|s| s.len() == 15))
        .await
        .unwrap();
    let_tasks_run().await;
    assert_eq!(controller.load_calls(), 3);
    assert_eq!(controller.snapshot().len(), 15);

    viewport.scroll_to_end();
    tokio::time::timeout(Duration::from_secs(5), controller.wait_for(|s| s.len() == 20))
        .await
        .unwrap();
    let_tasks_run().await;
    assert_eq!(controller.load_calls(), 4);
}

// ============================================================================
// Load More Trigger Tests
// ============================================================================

#[tokio::test]
async fn test_load_more_trigger() {
    let controller = Controller::mount(config(10, 0.0), dataset(15)).unwrap();
    let button = LoadMoreTrigger::new(&controller);

    assert!(!button.is_disabled());
    assert!(button.press());
    assert!(button.is_busy());
    assert!(!button.press());

    controller.settled().await;
    assert!(button.press());
    controller.settled().await;

    assert!(button.is_disabled());
    assert!(!button.press());
    assert_eq!(controller.load_calls(), 2);
}

#[tokio::test]
async fn test_load_more_disabled_after_unmount() {
    let controller = Controller::mount(config(10, 0.0), dataset(15)).unwrap();
    let button = LoadMoreTrigger::new(&controller);

    controller.unmount();
    assert!(button.is_disabled());
    assert!(!button.press());
}
