mod outline;
mod view;

pub use outline::{OutlineNode, parse_outline};
pub use view::{
    MAX_SCALE, MIN_SCALE, MindmapHandle, MindmapRenderer, OutlineMap, OutlineMapView, SCALE_STEP,
};
