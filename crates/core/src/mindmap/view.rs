use crate::error::Result;

use super::outline::{OutlineNode, parse_outline};

pub const MIN_SCALE: f64 = 0.2;
pub const MAX_SCALE: f64 = 3.0;
pub const SCALE_STEP: f64 = 0.05;

const REFIT_THRESHOLD: f64 = 0.3;
const FIT_RATIO: f64 = 0.95;
const MAX_FIT_SCALE: f64 = 1.0;
const LEVEL_SPAN: f64 = 100.0;
const NODE_HEIGHT: f64 = 16.0;
const VERTICAL_GAP: f64 = 5.0;
const PADDING: f64 = 20.0;
const VIEWPORT: (f64, f64) = (800.0, 500.0);

/// Swappable rendering engine seam. The polling core and the frontend only
/// ever talk to these two traits, so the concrete engine can be replaced
/// without touching anything else.
pub trait MindmapRenderer: Send + Sync {
    /// Build a fresh view for this markdown. The view is recreated from
    /// scratch whenever the input changes; there is no incremental diffing.
    fn render(&self, markdown: &str) -> Result<Box<dyn MindmapHandle>>;
}

/// A live mind-map view. All internal state is released when the handle is
/// dropped; owners drop the old handle before rendering a replacement.
pub trait MindmapHandle: Send {
    /// Drag offset, in layout units.
    fn pan(&mut self, dx: f64, dy: f64);

    /// Apply wheel notches; positive steps zoom in. The scale is clamped to
    /// [MIN_SCALE, MAX_SCALE] at every notch, and dropping to the low end
    /// of the range triggers a re-fit. Returns the resulting scale.
    fn zoom(&mut self, steps: i32) -> f64;

    /// Recompute scale and offset so the whole tree fits the viewport.
    fn fit(&mut self);

    fn scale(&self) -> f64;

    /// Plain-text projection of the outline, two spaces per level.
    fn to_text(&self) -> String;
}

/// The built-in engine: markdown outline to node tree, laid out left to
/// right, projected as indented text.
#[derive(Default)]
pub struct OutlineMap;

impl MindmapRenderer for OutlineMap {
    fn render(&self, markdown: &str) -> Result<Box<dyn MindmapHandle>> {
        Ok(Box::new(OutlineMapView::new(markdown)))
    }
}

pub struct OutlineMapView {
    root: OutlineNode,
    bounds: (f64, f64),
    scale: f64,
    x: f64,
    y: f64,
}

impl OutlineMapView {
    pub fn new(markdown: &str) -> Self {
        let root = parse_outline(markdown);
        let width = PADDING * 2.0 + root.depth() as f64 * LEVEL_SPAN;
        let height = PADDING * 2.0 + root.count() as f64 * (NODE_HEIGHT + VERTICAL_GAP);
        let mut view = Self {
            root,
            bounds: (width, height),
            scale: 1.0,
            x: 0.0,
            y: 0.0,
        };
        view.fit();
        view
    }

    pub fn root(&self) -> &OutlineNode {
        &self.root
    }

    pub fn offset(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

impl MindmapHandle for OutlineMapView {
    fn pan(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    fn zoom(&mut self, steps: i32) -> f64 {
        let factor = if steps >= 0 {
            1.0 + SCALE_STEP
        } else {
            1.0 - SCALE_STEP
        };
        for _ in 0..steps.unsigned_abs() {
            self.scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        }
        if self.scale <= REFIT_THRESHOLD {
            self.fit();
        }
        self.scale
    }

    fn fit(&mut self) {
        let (vw, vh) = VIEWPORT;
        let (bw, bh) = self.bounds;
        let fitted = (vw / bw).min(vh / bh) * FIT_RATIO;
        self.scale = fitted.min(MAX_FIT_SCALE).clamp(MIN_SCALE, MAX_SCALE);
        self.x = (vw - bw * self.scale) / 2.0;
        self.y = (vh - bh * self.scale) / 2.0;
    }

    fn scale(&self) -> f64 {
        self.scale
    }

    fn to_text(&self) -> String {
        let mut out = String::new();
        if self.root.label.is_empty() {
            for child in &self.root.children {
                write_node(&mut out, child, 0);
            }
        } else {
            write_node(&mut out, &self.root, 0);
        }
        out
    }
}

fn write_node(out: &mut String, node: &OutlineNode, depth: usize) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(&node.label);
    out.push('\n');
    for child in &node.children {
        write_node(out, child, depth + 1);
    }
}
