pub mod fill;
pub mod gap_list;
pub mod viewport;

pub use fill::{page_size, plan_fill, FillPlan, FillStrategy};
pub use gap_list::{Gap, GapId, GapList, Iter, Shrunk, Split};
pub use viewport::{intersect, scan, visible_window, GapHit, PixelRange, DEFAULT_MARGIN};
