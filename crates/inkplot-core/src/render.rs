//! Draw batches and the drawing-backend boundary.
//!
//! Elements never talk to a rasterizer. They fill a [`Batch`] with
//! world-space primitives and flush it through the [`DrawSurface`] trait as
//! a stroke or a fill. What happens on the far side (software canvas, GPU,
//! or the [`RecordingSurface`] used by tests and headless runs) is the
//! host's business.

use kurbo::{Affine, Point, Size};
use peniko::Color;

use crate::math::WorldRect;

/// Default stroke width in physical pixels.
pub const DEFAULT_LINE_WIDTH: f64 = 1.0;

/// Default radius of a point marker in physical pixels.
pub const DEFAULT_MARKER_RADIUS: f64 = 5.0;

/// Default text size in physical pixels.
pub const DEFAULT_FONT_PX: f64 = 14.0;

/// How a submitted batch is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintMode {
    /// Outline the primitives.
    Stroke,
    /// Fill the primitives.
    Fill,
}

/// Horizontal anchoring of a text run relative to its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    /// Position is the left edge of the run.
    #[default]
    Left,
    /// Position is the middle of the run.
    Center,
    /// Position is the right edge of the run.
    Right,
}

/// A single drawing primitive in world coordinates.
///
/// Pixel-denominated fields (`radius_px`, `font_px`) stay constant on screen
/// regardless of zoom; the backend resolves them against the view transform.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Straight segment.
    Line { from: Point, to: Point },
    /// Polyline through `points`, optionally closed back to the start.
    Path { points: Vec<Point>, closed: bool },
    /// Axis-aligned rectangle outline.
    Rect(WorldRect),
    /// Circular arc. Angles are in radians, measured screen-side
    /// (clockwise-positive), `radius` is in world units.
    Arc {
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        anticlockwise: bool,
    },
    /// Round dot of fixed pixel radius.
    Marker { at: Point, radius_px: f64 },
    /// Text run of fixed pixel size.
    Text {
        at: Point,
        text: String,
        font_px: f64,
        align: TextAlign,
    },
}

/// An accumulating list of primitives sharing one color and stroke width.
///
/// A batch is flushed with [`Batch::stroke`] or [`Batch::fill`] and can then
/// be refilled; [`Batch::renew`] switches the color and discards anything
/// not yet flushed.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Paint color for every op in the batch.
    pub color: Color,
    /// Stroke width in physical pixels.
    pub line_width: f64,
    /// Accumulated primitives, in submission order.
    pub ops: Vec<BatchOp>,
}

impl Batch {
    /// Create an empty batch painting in `color`.
    pub fn new(color: Color) -> Self {
        Self {
            color,
            line_width: DEFAULT_LINE_WIDTH,
            ops: Vec::new(),
        }
    }

    /// Set the stroke width.
    pub fn with_line_width(mut self, line_width: f64) -> Self {
        self.line_width = line_width;
        self
    }

    /// Add a straight segment.
    pub fn line(&mut self, from: Point, to: Point) {
        self.ops.push(BatchOp::Line { from, to });
    }

    /// Add an open polyline.
    pub fn path(&mut self, points: Vec<Point>) {
        self.ops.push(BatchOp::Path {
            points,
            closed: false,
        });
    }

    /// Add a closed polygon outline.
    pub fn polygon(&mut self, points: Vec<Point>) {
        self.ops.push(BatchOp::Path {
            points,
            closed: true,
        });
    }

    /// Add a rectangle outline.
    pub fn rect(&mut self, rect: WorldRect) {
        self.ops.push(BatchOp::Rect(rect));
    }

    /// Add a circular arc with a world-unit radius.
    pub fn arc(
        &mut self,
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        anticlockwise: bool,
    ) {
        self.ops.push(BatchOp::Arc {
            center,
            radius,
            start_angle,
            end_angle,
            anticlockwise,
        });
    }

    /// Add a point marker at the default pixel radius.
    pub fn point(&mut self, at: Point) {
        self.point_sized(at, DEFAULT_MARKER_RADIUS);
    }

    /// Add a point marker with an explicit pixel radius.
    pub fn point_sized(&mut self, at: Point, radius_px: f64) {
        self.ops.push(BatchOp::Marker { at, radius_px });
    }

    /// Add a text run.
    pub fn text(&mut self, at: Point, text: impl Into<String>, font_px: f64, align: TextAlign) {
        self.ops.push(BatchOp::Text {
            at,
            text: text.into(),
            font_px,
            align,
        });
    }

    /// Flush the accumulated ops as an outline pass.
    pub fn stroke(&mut self, surface: &mut dyn DrawSurface) {
        self.flush(surface, PaintMode::Stroke);
    }

    /// Flush the accumulated ops as a fill pass.
    pub fn fill(&mut self, surface: &mut dyn DrawSurface) {
        self.flush(surface, PaintMode::Fill);
    }

    /// Switch to a new color, dropping any ops not yet flushed.
    pub fn renew(&mut self, color: Color) {
        self.color = color;
        self.ops.clear();
    }

    fn flush(&mut self, surface: &mut dyn DrawSurface, mode: PaintMode) {
        if self.ops.is_empty() {
            return;
        }
        let batch = Batch {
            color: self.color,
            line_width: self.line_width,
            ops: std::mem::take(&mut self.ops),
        };
        surface.submit(mode, batch);
    }
}

/// The drawing backend as seen by the engine and the elements.
///
/// One frame is bracketed by [`DrawSurface::begin_frame`] and
/// [`DrawSurface::end_frame`]; in between, batches arrive in painter's
/// order and rotation transforms nest strictly.
pub trait DrawSurface {
    /// Start a frame with the current world-to-screen transform and the
    /// canvas size in physical pixels.
    fn begin_frame(&mut self, view: Affine, size: Size);

    /// Paint a flushed batch.
    fn submit(&mut self, mode: PaintMode, batch: Batch);

    /// Rotate subsequent batches by `angle` radians around a screen-space
    /// pivot. Must be balanced by [`DrawSurface::pop_rotation`].
    fn push_rotation(&mut self, pivot: Point, angle: f64);

    /// Undo the innermost [`DrawSurface::push_rotation`].
    fn pop_rotation(&mut self);

    /// Measure a text run at `font_px`, in physical pixels.
    fn measure_text(&mut self, text: &str, font_px: f64) -> Size;

    /// Finish the frame.
    fn end_frame(&mut self);
}

/// Everything a [`RecordingSurface`] captures.
#[derive(Debug, Clone)]
pub enum RenderCommand {
    BeginFrame { view: Affine, size: Size },
    Submit { mode: PaintMode, batch: Batch },
    PushRotation { pivot: Point, angle: f64 },
    PopRotation,
    EndFrame,
}

/// A [`DrawSurface`] that records commands instead of rasterizing.
///
/// Used by tests and headless hosts to assert on what would be drawn. Text
/// measurement uses a flat per-character estimate.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    commands: Vec<RenderCommand>,
}

impl RecordingSurface {
    /// Create an empty recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, in order.
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// The batches submitted so far, in order.
    pub fn batches(&self) -> impl Iterator<Item = &Batch> {
        self.commands.iter().filter_map(|command| match command {
            RenderCommand::Submit { batch, .. } => Some(batch),
            _ => None,
        })
    }

    /// Number of completed frames.
    pub fn frames(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, RenderCommand::EndFrame))
            .count()
    }

    /// Drop everything recorded so far.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl DrawSurface for RecordingSurface {
    fn begin_frame(&mut self, view: Affine, size: Size) {
        self.commands.push(RenderCommand::BeginFrame { view, size });
    }

    fn submit(&mut self, mode: PaintMode, batch: Batch) {
        self.commands.push(RenderCommand::Submit { mode, batch });
    }

    fn push_rotation(&mut self, pivot: Point, angle: f64) {
        self.commands.push(RenderCommand::PushRotation { pivot, angle });
    }

    fn pop_rotation(&mut self) {
        self.commands.push(RenderCommand::PopRotation);
    }

    fn measure_text(&mut self, text: &str, font_px: f64) -> Size {
        Size::new(text.chars().count() as f64 * font_px * 0.6, font_px)
    }

    fn end_frame(&mut self) {
        self.commands.push(RenderCommand::EndFrame);
    }
}
