use crate::cli::PlanArgs;
use crate::context::CliContext;
use crate::output;
use pageless_domain::{page_size, plan_fill, scan, visible_window, FillPlan, GapList, PixelRange};
use serde::Serialize;

#[derive(Serialize)]
struct PlannedStep {
    scroll_top: f64,
    plans: Vec<FillPlan>,
}

/// Plan fills against an untouched list, one step per scroll position.
///
/// Nothing is fetched, so every step sees the single root gap.
pub fn handle(ctx: &mut CliContext, args: PlanArgs) -> anyhow::Result<()> {
    ctx.apply_geometry(&args.geometry);
    if let Err(e) = ctx.config.validate() {
        output::output_error(&e.to_string());
    }

    let geometry = &args.geometry;
    let item_size = ctx.config.item_size;
    let page = page_size(geometry.viewport_height, item_size);
    let gaps = GapList::new(geometry.count, ());
    let extent = PixelRange::new(0.0, geometry.count as f64 * item_size);
    let max_scroll = (extent.height() - geometry.viewport_height).max(0.0);

    let positions = if geometry.scrolls.is_empty() {
        vec![0.0]
    } else {
        geometry.scrolls.clone()
    };

    let steps = positions
        .into_iter()
        .map(|scroll_top| {
            let scroll_top = scroll_top.clamp(0.0, max_scroll);
            let window = visible_window(scroll_top, geometry.viewport_height, ctx.config.margin);
            let plans = scan(&gaps, window, |_| extent)
                .iter()
                .map(|hit| plan_fill(hit, item_size, page))
                .collect();
            PlannedStep { scroll_top, plans }
        })
        .collect();

    output::output_list(steps)
}
