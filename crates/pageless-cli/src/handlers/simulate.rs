use crate::cli::{GeometryArgs, SimulateArgs};
use crate::context::CliContext;
use crate::output;
use pageless_domain::FillPlan;
use pageless_runtime::{
    Fetcher, HttpSource, Layout, LoadEvent, LoaderSnapshot, MemoryDocument, RangeLoader,
    RangeSource,
};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Serialize)]
struct SimulationReport {
    count: usize,
    page_size: usize,
    item_size: f64,
    viewport_height: f64,
    steps: Vec<SimulationStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fetches: Option<usize>,
    content_height: f64,
}

#[derive(Serialize)]
struct SimulationStep {
    scroll_top: f64,
    plans: Vec<FillPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<LoadEvent>,
    state: LoaderSnapshot,
}

/// Mount a loader over the in-memory dataset, or an HTTP endpoint when one
/// is given, then visit each scroll position and wait for the load it
/// triggers to finish.
pub async fn handle(ctx: &mut CliContext, args: SimulateArgs) -> anyhow::Result<()> {
    ctx.apply_geometry(&args.geometry);
    ctx.apply_debounce(args.debounce_ms);

    let latency = Duration::from_millis(args.latency_ms);
    let timeout = ctx.step_timeout(latency);

    let report = match args.endpoint {
        Some(endpoint) => {
            let source = match HttpSource::new(&endpoint) {
                Ok(source) => source,
                Err(e) => output::output_error(&e.to_string()),
            };
            tracing::debug!(base = %source.base(), "Simulating against HTTP endpoint");
            simulate(ctx, &args.geometry, source, timeout).await?
        }
        None => {
            let mut source = RangeSource::new(args.geometry.count).with_latency(latency);
            if let Some(template) = args.template {
                source = source.with_template(template);
            }
            let mut report = simulate(ctx, &args.geometry, source.clone(), timeout).await?;
            report.fetches = Some(source.fetch_count());
            report
        }
    };

    output::output_success(report)
}

async fn simulate<F>(
    ctx: &CliContext,
    geometry: &GeometryArgs,
    fetcher: F,
    timeout: Duration,
) -> anyhow::Result<SimulationReport>
where
    F: Fetcher + 'static,
{
    let document = MemoryDocument::new(geometry.viewport_height, ctx.config.item_size);
    let loader = match RangeLoader::mount(
        ctx.config.clone(),
        geometry.count,
        fetcher,
        document.clone(),
    ) {
        Ok(loader) => loader,
        Err(e) => output::output_error(&e.to_string()),
    };
    let mut events = loader.subscribe();

    let mut steps = Vec::with_capacity(geometry.scrolls.len() + 1);
    // Mount already scheduled the first load; re-planning only reports it.
    let plans = loader.plan();
    let event = settle(&loader, &mut events, timeout).await?;
    steps.push(SimulationStep {
        scroll_top: 0.0,
        plans,
        event,
        state: loader.snapshot(),
    });

    for &requested in &geometry.scrolls {
        let scroll_top = document.scroll_to(requested);
        let plans = loader.update();
        let event = settle(&loader, &mut events, timeout).await?;
        steps.push(SimulationStep {
            scroll_top,
            plans,
            event,
            state: loader.snapshot(),
        });
    }

    Ok(SimulationReport {
        count: loader.count(),
        page_size: loader.page_size(),
        item_size: ctx.config.item_size,
        viewport_height: geometry.viewport_height,
        steps,
        fetches: None,
        content_height: document.content_height(),
    })
}

/// Wait for the outcome of the pending load, if there is one.
///
/// Runs on a single-threaded runtime, so nothing has fired between scheduling
/// and this call.
async fn settle<F, L>(
    loader: &RangeLoader<F, L>,
    events: &mut broadcast::Receiver<LoadEvent>,
    timeout: Duration,
) -> anyhow::Result<Option<LoadEvent>>
where
    F: Fetcher + 'static,
    L: Layout + 'static,
{
    if !loader.has_pending() {
        return Ok(None);
    }

    match tokio::time::timeout(timeout, events.recv()).await {
        Ok(Ok(event)) => Ok(Some(event)),
        Ok(Err(e)) => Err(anyhow::anyhow!("load events unavailable: {}", e)),
        Err(_) => Err(anyhow::anyhow!(
            "no load finished within {}ms",
            timeout.as_millis()
        )),
    }
}
