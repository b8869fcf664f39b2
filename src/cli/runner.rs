//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, FetchArgs, OutputFormat, SimulateArgs};
use crate::config::{load_config, PagerConfig};
use crate::controller::Controller;
use crate::error::{Error, Result};
use crate::fetcher::{
    HttpPageLoader, PageLoader, RateLimitedLoader, RateLimiterConfig, TimeoutLoader,
};
use crate::projector::Snapshot;
use crate::trigger::{IntersectionTrigger, Layout, ViewportSource, VisibilitySource};
use crate::types::{PageRequest, PageResult};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// How long the simulator waits for a state change before scrolling
const QUIET_PERIOD: Duration = Duration::from_millis(100);

/// Consecutive scrolls without any state change before giving up
const MAX_STALLS: u32 = 3;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Fetch(args) => self.fetch(args).await,
            Commands::Simulate(args) => self.simulate(args).await,
            Commands::Validate => self.validate(),
        }
    }

    /// Load the config file, or defaults when none was given
    fn load_config(&self) -> Result<PagerConfig> {
        match &self.cli.config {
            Some(path) => load_config(path),
            None => Ok(PagerConfig::default()),
        }
    }

    /// Validate the config file
    fn validate(&self) -> Result<()> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use -C flag)"))?;
        let config = load_config(path)?;

        self.output_message(&json!({
            "type": "CONFIG",
            "config": config
        }));
        Ok(())
    }

    // ========================================================================
    // Fetch
    // ========================================================================

    /// Page through an HTTP endpoint, retrying failed pages explicitly
    async fn fetch(&self, args: &FetchArgs) -> Result<()> {
        let mut config = self.load_config()?;
        if let Some(size) = args.page_size {
            config.page_size = size;
        }
        config.auto_advance = false;
        config.validate()?;

        let loader = build_http_loader(args)?;
        let controller = Controller::builder_shared(loader).config(config).mount()?;
        info!("Fetching {}", args.url);

        let started = Instant::now();
        let mut emitted = 0;
        let mut pages = 0u32;
        let mut retries = 0u32;

        loop {
            let snapshot = controller.snapshot();
            if let Some(error) = &snapshot.error {
                if retries >= args.retries || !error.retryable {
                    controller.unmount();
                    return Err(Error::Other(format!(
                        "Giving up after {retries} retries: {error}"
                    )));
                }
                retries += 1;
                let delay = RETRY_BASE_DELAY * 2u32.pow((retries - 1).min(6));
                warn!(
                    "Page failed ({error}), retry {retries}/{} in {delay:?}",
                    args.retries
                );
                tokio::time::sleep(delay).await;
                controller.retry();
            } else if !snapshot.has_more || args.max_pages.is_some_and(|max| pages >= max) {
                break;
            } else {
                controller.request_next_page();
            }

            let snapshot = controller.settled().await;
            if snapshot.error.is_none() {
                pages += 1;
                retries = 0;
                emitted = self.emit_records(&snapshot, emitted);
            }
        }

        let snapshot = controller.snapshot();
        controller.unmount();

        self.output_message(&json!({
            "type": "SUMMARY",
            "summary": {
                "records": emitted,
                "pages": pages,
                "has_more": snapshot.has_more,
                "elapsed_ms": started.elapsed().as_millis() as u64
            }
        }));
        Ok(())
    }

    /// Output records past `from`, returning the new count
    fn emit_records<T: Serialize>(&self, snapshot: &Snapshot<T>, from: usize) -> usize {
        for record in snapshot.visible_items.iter().skip(from) {
            self.output_message(&json!({
                "type": "RECORD",
                "record": record
            }));
        }
        snapshot.len()
    }

    // ========================================================================
    // Simulate
    // ========================================================================

    /// Scroll a headless viewport over an in-memory dataset
    async fn simulate(&self, args: &SimulateArgs) -> Result<()> {
        let mut config = self.load_config()?;
        if let Some(size) = args.page_size {
            config.page_size = size;
        }
        if let Some(bias) = args.bias {
            config.bias = bias;
        }
        config.auto_advance = false;
        config.debug = true;
        config.validate()?;

        if args.fail_every.is_some_and(|k| k < 2) {
            return Err(Error::invalid_value(
                "fail_every",
                "must be at least 2 so retries can succeed",
            ));
        }

        let viewport = Arc::new(ViewportSource::new(Layout::list(
            args.viewport,
            0,
            args.item_height,
        )));
        let backend = SimulatedBackend::new(args, Arc::clone(&viewport));
        let controller = Controller::builder(backend).config(config).mount()?;
        let trigger = IntersectionTrigger::attach(&controller, viewport.clone())?;

        let mut updates = controller.subscribe();
        let mut stalls = 0u32;
        let mut scrolls = 0u32;
        let mut retries = 0u32;

        loop {
            match tokio::time::timeout(QUIET_PERIOD, updates.changed()).await {
                Ok(Ok(())) => {
                    stalls = 0;
                    let snapshot = updates.borrow_and_update().clone();
                    self.output_state(&snapshot);
                }
                Ok(Err(_)) => break,
                Err(_) => {
                    let snapshot = controller.snapshot();
                    if snapshot.is_exhausted() {
                        break;
                    }
                    if snapshot.loading {
                        continue;
                    }
                    if snapshot.error.is_some() {
                        retries += 1;
                        info!("Retrying failed page");
                        controller.retry();
                        continue;
                    }

                    stalls += 1;
                    if stalls > MAX_STALLS {
                        return Err(Error::Other(format!(
                            "Simulation stalled after {} items",
                            snapshot.len()
                        )));
                    }

                    let before = viewport.scroll_top();
                    viewport.scroll_to_end();
                    if (viewport.scroll_top() - before).abs() < f64::EPSILON {
                        viewport.recheck();
                    }
                    scrolls += 1;
                    self.output_message(&json!({
                        "type": "SCROLL",
                        "scroll": { "top": viewport.scroll_top() }
                    }));
                }
            }
        }

        trigger.detach();
        let snapshot = controller.snapshot();
        let load_calls = controller.load_calls();
        controller.unmount();

        self.output_message(&json!({
            "type": "SUMMARY",
            "summary": {
                "items": snapshot.len(),
                "load_calls": load_calls,
                "scrolls": scrolls,
                "retries": retries,
                "has_more": snapshot.has_more
            }
        }));
        Ok(())
    }

    /// Output the debug view of a snapshot
    fn output_state<T>(&self, snapshot: &Snapshot<T>) {
        let Some(view) = &snapshot.debug else {
            return;
        };

        match self.cli.format {
            OutputFormat::Json => self.output_message(&json!({
                "type": "STATE",
                "state": view,
                "error": snapshot.error
            })),
            OutputFormat::Pretty => match &snapshot.error {
                Some(error) => println!("{view} error=\"{error}\""),
                None => println!("{view}"),
            },
        }
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Build the HTTP loader stack from `fetch` arguments
fn build_http_loader(args: &FetchArgs) -> Result<Arc<dyn PageLoader<Value>>> {
    let mut http = HttpPageLoader::<Value>::new(&args.url)?
        .with_params(&args.offset_param, &args.limit_param)
        .with_items_path(&args.items_path)
        .with_total_path((!args.no_total).then(|| args.total_path.clone()));
    if let Some(page_param) = &args.page_param {
        http = http.with_page_param(page_param);
    }
    for header in &args.headers {
        let (name, value) = parse_header(header)?;
        http = http.header(name, value);
    }

    let loader = TimeoutLoader::new(http, Duration::from_millis(args.timeout_ms));
    Ok(match args.rps {
        Some(rps) => Arc::new(RateLimitedLoader::new(
            loader,
            &RateLimiterConfig::per_second(rps),
        )),
        None => Arc::new(loader),
    })
}

/// Split `Name: value`
fn parse_header(header: &str) -> Result<(String, String)> {
    match header.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(Error::invalid_value(
            "header",
            format!("expected 'Name: value', got '{header}'"),
        )),
    }
}

/// In-memory dataset of sequential ids with optional injected failures
///
/// Also plays the renderer: a delivered page is laid out in the viewport
/// before the controller publishes it, so the trigger's recheck after a
/// settle always measures the new rows.
struct SimulatedBackend {
    total: u64,
    fail_every: Option<u32>,
    latency: Duration,
    report_total: bool,
    calls: AtomicU32,
    viewport: Arc<ViewportSource>,
    viewport_height: f64,
    item_height: f64,
}

impl SimulatedBackend {
    fn new(args: &SimulateArgs, viewport: Arc<ViewportSource>) -> Self {
        Self {
            total: args.total,
            fail_every: args.fail_every,
            latency: Duration::from_millis(args.latency_ms),
            report_total: !args.no_total,
            calls: AtomicU32::new(0),
            viewport,
            viewport_height: args.viewport,
            item_height: args.item_height,
        }
    }

    fn render(&self, rows: u64) {
        self.viewport.set_layout(Layout::list(
            self.viewport_height,
            rows as usize,
            self.item_height,
        ));
    }
}

#[async_trait]
impl PageLoader<u64> for SimulatedBackend {
    async fn load_page(&self, request: PageRequest) -> Result<PageResult<u64>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.fail_every.is_some_and(|k| call % k == 0) {
            return Err(Error::load(
                request.page,
                request.offset,
                format!("simulated failure on call {call}"),
            ));
        }

        let end = (request.offset + u64::from(request.limit)).min(self.total);
        let items: Vec<u64> = (request.offset..end).collect();
        self.render(request.offset + items.len() as u64);
        Ok(if self.report_total {
            PageResult::new(items, self.total)
        } else {
            PageResult::without_total(items)
        })
    }
}
